//! GLSL source emission for one resolved pass.
//!
//! Emission folds over an already resolved [`Linkage`] and never mutates
//! shared state, so emitting the same pass twice yields identical text.
//! Declaration order is part of the output contract: downstream caches key
//! off the generated source.

use std::collections::HashSet;

use crate::layers::LayerLayout;
use crate::utils::indent_body;
use super::pass_builder::PassBuilder;
use super::program::LinkOptions;
use super::resolve::Linkage;
use super::sampler_arrays::generate_accessors;
use super::types::{GlslType, PassKind};
use super::variable::{Variable, VariableSet};

/// Everything emission needs besides the pass itself.
pub struct EmitContext<'a> {
    pub linkage: &'a Linkage,
    /// Values crossing the rasterizer: written by the vertex pass, read by
    /// the fragment pass.
    pub varyings: &'a VariableSet,
    pub layers: Option<&'a LayerLayout>,
    pub options: &'a LinkOptions,
}

fn sorted<'a>(vars: impl Iterator<Item = &'a Variable>) -> Vec<&'a Variable> {
    let mut out: Vec<&Variable> = vars.collect();
    out.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    out
}

fn push_section(sections: &mut Vec<String>, lines: Vec<String>) {
    if !lines.is_empty() {
        sections.push(lines.join("\n"));
    }
}

fn varying_declaration(var: &Variable, qualifier: &str, prefix: &str) -> String {
    let flat = if var.ty.is_integer() { "flat " } else { "" };
    format!(
        "{flat}{qualifier} {} {prefix}{}{};",
        var.ty,
        var.name,
        var.array_suffix()
    )
}

/// Assemble the complete source text of `pass`.
pub fn emit_pass(pass: &PassBuilder, ctx: &EmitContext<'_>) -> String {
    let kind = pass.kind();
    let linkage = ctx.linkage;
    let options = ctx.options;
    let prefix = options.varying_prefix.as_str();
    let mut sections: Vec<String> = Vec::new();

    let mut header: Vec<String> = Vec::new();
    if let Some(version) = &options.glsl_version {
        header.push(format!("#version {version}"));
    }
    header.extend(pass.defines().iter().map(|d| format!("#define {d}")));
    push_section(&mut sections, header);

    if kind == PassKind::Vertex {
        let inputs = sorted(linkage.attributes.iter().chain(linkage.imported.iter()));
        push_section(
            &mut sections,
            inputs
                .into_iter()
                .map(|v| format!("in {};", v.declarator()))
                .collect(),
        );
    }

    let (qualifier, crossing) = match kind {
        PassKind::Vertex => ("out", sorted(ctx.varyings.iter())),
        PassKind::Fragment => ("in", sorted(linkage.imported.iter())),
    };
    push_section(
        &mut sections,
        crossing
            .into_iter()
            .map(|v| varying_declaration(v, qualifier, prefix))
            .collect(),
    );

    if kind == PassKind::Fragment {
        let outputs = match ctx.layers {
            Some(layers) => layers.output_declarations(),
            None => vec![format!(
                "layout(location = 0) out vec4 {};",
                options.fragment_output
            )],
        };
        push_section(&mut sections, outputs);
    }

    // Rounding uniforms are declared next to the layer outputs.
    let layer_uniforms: Vec<String> = match (kind, ctx.layers) {
        (PassKind::Fragment, Some(layers)) => layers
            .rounding_uniforms()
            .into_iter()
            .map(|v| v.name)
            .collect(),
        _ => Vec::new(),
    };
    let uniforms = sorted(
        linkage
            .uniforms
            .iter()
            .filter(|v| !layer_uniforms.contains(&v.name)),
    );
    push_section(
        &mut sections,
        uniforms
            .iter()
            .map(|v| format!("uniform {};", v.declarator()))
            .collect(),
    );

    for func in pass.functions().iter() {
        sections.push(func.body.trim().to_string());
    }
    if let (PassKind::Fragment, Some(layers)) = (kind, ctx.layers) {
        for func in layers.writer_functions() {
            if !pass.functions().contains(&func.key) {
                sections.push(func.body.trim().to_string());
            }
        }
    }

    sections.extend(generate_accessors(&uniforms));

    sections.push(emit_main(pass, ctx));

    let mut out = sections.join("\n\n");
    out.push('\n');
    out
}

fn emit_main(pass: &PassBuilder, ctx: &EmitContext<'_>) -> String {
    let linkage = ctx.linkage;
    let options = ctx.options;
    let prefix = options.varying_prefix.as_str();
    let mut body: Vec<String> = Vec::new();
    let mut defined: HashSet<String> = linkage.defined_at_entry();

    if pass.kind() == PassKind::Fragment {
        for var in sorted(linkage.imported.iter()) {
            body.push(format!("{} = {prefix}{};", var.declarator(), var.name));
        }
    }

    for stage in pass.stages() {
        body.push(format!("// {}", stage.name));
        for var in stage.writes() {
            if defined.insert(var.name.clone()) {
                body.push(format!("{};", var.declarator()));
            }
        }
        if !stage.body.trim().is_empty() {
            body.push(stage.body.clone());
        }
    }

    match (pass.kind(), ctx.layers) {
        (PassKind::Vertex, _) => {
            for var in sorted(ctx.varyings.iter()) {
                body.push(format!("{prefix}{} = {};", var.name, var.name));
            }
        }
        (PassKind::Fragment, Some(layers)) => {
            body.extend(layers.writer_code(&defined, &options.alpha_signal));
        }
        (PassKind::Fragment, None) => {
            body.extend(single_output_tail(pass, &defined, options));
        }
    }

    if body.is_empty() {
        return "void main() {\n}".to_string();
    }
    format!("void main() {{\n{}\n}}", indent_body(&body.join("\n"), 1))
}

/// How the last stage of a fragment pass feeds the single color output.
enum OutputRoute<'a> {
    /// One `vec4`, assigned as is.
    Alias(&'a Variable),
    /// 1 to 4 float channels, padded with zeros and an alpha of one.
    Padded(Vec<&'a Variable>),
    /// Anything else: built from the color and alpha signals.
    Signals,
}

fn output_route(pass: &PassBuilder) -> OutputRoute<'_> {
    let outputs: Vec<&Variable> = pass
        .stages()
        .last()
        .map(|stage| {
            stage
                .writes()
                .filter(|v| !pass.builtins().contains(&v.name))
                .collect()
        })
        .unwrap_or_default();

    let width: u32 = outputs.iter().map(|v| v.channel_width()).sum();
    let all_float = !outputs.is_empty()
        && outputs
            .iter()
            .all(|v| v.ty.is_float_vector() && !v.is_array());

    if all_float && outputs.len() == 1 && width == 4 {
        OutputRoute::Alias(outputs[0])
    } else if all_float && (1..=4).contains(&width) {
        OutputRoute::Padded(outputs)
    } else {
        OutputRoute::Signals
    }
}

/// True when the single color output is built from the color and alpha
/// signals rather than from the last stage's outputs.
pub(crate) fn needs_signal_fallback(pass: &PassBuilder) -> bool {
    matches!(output_route(pass), OutputRoute::Signals)
}

/// Route the last stage's outputs to the single color output.
///
/// The signal fallback writes `vec4(<color>, <alpha>)`; a `vec4` color
/// signal already carries its own alpha unless the alpha signal is defined.
fn single_output_tail(
    pass: &PassBuilder,
    defined: &HashSet<String>,
    options: &LinkOptions,
) -> Vec<String> {
    let target = &options.fragment_output;
    match output_route(pass) {
        OutputRoute::Alias(output) => vec![format!("{target} = {};", output.name)],
        OutputRoute::Padded(outputs) => {
            let width: u32 = outputs.iter().map(|v| v.channel_width()).sum();
            let mut parts: Vec<String> = outputs.iter().map(|v| v.name.clone()).collect();
            for channel in width..4 {
                parts.push(if channel == 3 { "1.0" } else { "0.0" }.to_string());
            }
            vec![format!("{target} = vec4({});", parts.join(", "))]
        }
        OutputRoute::Signals => {
            let color = &options.color_signal;
            let alpha = &options.alpha_signal;
            let color_is_vec4 = pass
                .declared()
                .get(color)
                .is_some_and(|v| v.ty == GlslType::Vec4);
            if color_is_vec4 {
                let value = if defined.contains(alpha) {
                    format!("vec4({color}.rgb, {alpha})")
                } else {
                    color.clone()
                };
                return vec![format!("{target} = {value};")];
            }

            let mut lines = Vec::new();
            if !defined.contains(color) {
                lines.push(format!("vec3 {color} = vec3(1.0);"));
            }
            if !defined.contains(alpha) {
                lines.push(format!("float {alpha} = 1.0;"));
            }
            lines.push(format!("{target} = vec4({color}, {alpha});"));
            lines
        }
    }
}
