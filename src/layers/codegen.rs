//! GLSL generation for packed layers: the read side used by later passes and
//! the write side appended to the fragment pass that produces the layers.

use std::collections::{BTreeSet, HashSet};

use crate::error::Result;
use crate::linker::stage::{ShaderFunction, Stage};
use crate::linker::types::GlslType;
use crate::linker::variable::Variable;
use crate::utils::{capitalize, fmt_f32, sanitize_glsl_ident};
use super::packer::LayerLayout;

pub const RANDOM_FUNCTION_KEY: &str = "float deferredRandom(vec2)";

const RANDOM_FUNCTION: &str = "\
float deferredRandom(vec2 co) {
    return fract(sin(dot(co, vec2(12.9898, 78.233))) * 43758.5453);
}";

/// Name of the generated read function for `layer` (`readNormal`).
pub fn reader_function_name(layer: &str) -> String {
    format!("read{}", capitalize(&sanitize_glsl_ident(layer)))
}

/// How a later pass samples the packed images.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadMode {
    /// Filtered lookup at normalized coordinates held in `uv`.
    Filtered { uv: String },
    /// Nearest fetch at the destination pixel of sample `sample`.
    Multisampled { sample: String },
}

impl ReadMode {
    fn sampler_type(&self) -> GlslType {
        match self {
            ReadMode::Filtered { .. } => GlslType::Sampler2D,
            ReadMode::Multisampled { .. } => GlslType::Sampler2DMS,
        }
    }
}

impl LayerLayout {
    /// GLSL expression reading `layer` back in its computed range.
    pub fn read_expression(&self, layer: &str, mode: &ReadMode) -> Result<String> {
        let placement = self.placement(layer)?;
        let texture = format!("defLayerTex{}", placement.slot);
        let fetch = match mode {
            ReadMode::Filtered { uv } => format!("texture({texture}, {uv})"),
            ReadMode::Multisampled { sample } => {
                format!("texelFetch({texture}, ivec2(gl_FragCoord.xy), {sample})")
            }
        };
        Ok(placement
            .layer
            .range
            .decode(&format!("{fetch}.{}", placement.mask())))
    }

    /// Stage for a consumer pass that reads `layers` into their variables.
    ///
    /// The slot samplers are declared as plain inputs, so the linker turns
    /// them into uniforms and texture bindings like any other sampler.
    pub fn reader_stage(&self, layers: &[&str], mode: &ReadMode) -> Result<Stage> {
        let mut slots: BTreeSet<usize> = BTreeSet::new();
        let mut lines: Vec<String> = Vec::new();
        let mut outputs: Vec<Variable> = Vec::new();
        for name in layers {
            let placement = self.placement(name)?;
            slots.insert(placement.slot);
            lines.push(format!(
                "{} = {};",
                placement.layer.variable,
                self.read_expression(name, mode)?
            ));
            outputs.push(Variable::output(
                placement.layer.glsl_type(),
                placement.layer.variable.clone(),
            ));
        }

        let mut params: Vec<Variable> = slots
            .iter()
            .map(|&slot| Variable::input(mode.sampler_type(), format!("defLayerTex{slot}")))
            .collect();
        match mode {
            ReadMode::Filtered { uv } => params.push(Variable::input(GlslType::Vec2, uv.clone())),
            ReadMode::Multisampled { sample } => {
                params.push(Variable::input(GlslType::Vec4, "gl_FragCoord"));
                params.push(Variable::input(GlslType::Int, sample.clone()));
            }
        }
        params.extend(outputs);

        Ok(Stage::new("deferred-read", params, lines.join("\n")))
    }

    /// Stage that only carries `read<Layer>` functions for `layers`, e.g.
    /// `vec3 readNormal(vec2 uv)`. Later stages of the consumer pass call
    /// them directly; the slot samplers are declared like in
    /// [`LayerLayout::reader_stage`].
    pub fn accessor_stage(&self, layers: &[&str], mode: &ReadMode) -> Result<Stage> {
        let (arg_ty, local_mode) = match mode {
            ReadMode::Filtered { .. } => (GlslType::Vec2, ReadMode::Filtered { uv: "uv".into() }),
            ReadMode::Multisampled { .. } => (
                GlslType::Int,
                ReadMode::Multisampled { sample: "sampleIndex".into() },
            ),
        };
        let arg_name = match &local_mode {
            ReadMode::Filtered { uv } => uv.as_str(),
            ReadMode::Multisampled { sample } => sample.as_str(),
        };
        let mut slots: BTreeSet<usize> = BTreeSet::new();
        let mut stage = Stage::new("deferred-accessors", Vec::new(), "");
        for name in layers {
            let placement = self.placement(name)?;
            slots.insert(placement.slot);
            let ty = placement.layer.glsl_type();
            let function = reader_function_name(name);
            stage = stage.with_function(
                format!("{ty} {function}({arg_ty})"),
                format!(
                    "{ty} {function}({arg_ty} {arg_name}) {{\n    return {};\n}}",
                    self.read_expression(name, &local_mode)?
                ),
            );
        }
        for slot in slots {
            stage = stage.with_parameter(Variable::input(
                mode.sampler_type(),
                format!("defLayerTex{slot}"),
            ));
        }
        if matches!(mode, ReadMode::Multisampled { .. }) {
            stage = stage.with_parameter(Variable::input(GlslType::Vec4, "gl_FragCoord"));
        }
        Ok(stage)
    }

    /// Functions the layer writer calls.
    pub fn writer_functions(&self) -> Vec<ShaderFunction> {
        vec![ShaderFunction::new(RANDOM_FUNCTION_KEY, RANDOM_FUNCTION)]
    }

    /// Declarations of the per-image outputs and rounding uniforms.
    pub fn output_declarations(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.slots.len() * 2);
        for slot in &self.slots {
            out.push(format!(
                "layout(location = {}) out vec4 {};",
                slot.index,
                slot.output_name()
            ));
        }
        for var in self.rounding_uniforms() {
            out.push(format!("uniform {};", var.declarator()));
        }
        out
    }

    /// Statements writing every layer into its image, given the names
    /// already defined at the end of `main()`.
    ///
    /// Missing layer variables get their default value first. Each image is
    /// then dithered by its rounding uniform, and unused channels carry the
    /// alpha signal.
    pub fn writer_code(&self, defined: &HashSet<String>, alpha_signal: &str) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();

        for placement in &self.placements {
            let layer = &placement.layer;
            if !defined.contains(&layer.variable) {
                lines.push(format!(
                    "{} {} = {};",
                    layer.glsl_type(),
                    layer.variable,
                    layer.default_expr()
                ));
            }
        }

        for slot in &self.slots {
            lines.push(format!("{} = vec4(0.0);", slot.output_name()));
        }
        for placement in &self.placements {
            let slot = &self.slots[placement.slot];
            lines.push(format!(
                "{}.{} = {};",
                slot.output_name(),
                placement.mask(),
                placement.layer.range.encode(&placement.layer.variable)
            ));
        }

        for slot in &self.slots {
            let rr = slot.rounding_uniform();
            lines.push(format!(
                "{} += (deferredRandom(gl_FragCoord.xy + vec2({})) - 0.5) * {rr}.x * {rr}.y;",
                slot.output_name(),
                fmt_f32(slot.index as f32),
            ));
        }

        let alpha = if defined.contains(alpha_signal) {
            alpha_signal.to_string()
        } else {
            "1.0".to_string()
        };
        for empty in &self.empty_channels {
            let width = empty.mask.len() as u32;
            let value = match GlslType::float_vector(width) {
                Some(GlslType::Float) | None => alpha.clone(),
                Some(ty) => format!("{ty}({alpha})"),
            };
            lines.push(format!(
                "{}.{} = {value};",
                self.slots[empty.slot].output_name(),
                empty.mask
            ));
        }

        lines
    }
}
