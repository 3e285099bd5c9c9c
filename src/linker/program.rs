//! Program assembly: resolves the vertex and fragment passes against each
//! other, merges their uniforms and packs deferred layers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LinkError, Result};
use crate::layers::{ImageDescriptor, LayerDescriptor, LayerLayout, RoundingUniform};
use crate::utils::number_lines;
use super::pass_builder::PassBuilder;
use super::resolve::Linkage;
use super::stage::Stage;
use super::types::PassKind;
use super::variable::{Variable, VariableSet};

/// Knobs affecting the generated source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
    /// Text after `#version`; `None` omits the line.
    pub glsl_version: Option<String>,
    pub varying_prefix: String,
    /// Fragment output used when no layers are packed.
    pub fragment_output: String,
    pub color_signal: String,
    pub alpha_signal: String,
    /// Upper bound on packed output images.
    pub max_layer_slots: Option<usize>,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            glsl_version: Some("330 core".to_string()),
            varying_prefix: "v_".to_string(),
            fragment_output: "fragColor".to_string(),
            color_signal: "finalColor".to_string(),
            alpha_signal: "finalAlpha".to_string(),
            max_layer_slots: None,
        }
    }
}

/// Accumulates the two passes of one program. Consumed by [`ProgramBuilder::link`].
#[derive(Clone, Debug)]
pub struct ProgramBuilder {
    name: String,
    options: LinkOptions,
    vertex: PassBuilder,
    fragment: PassBuilder,
    layers: Option<Vec<LayerDescriptor>>,
}

impl ProgramBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: LinkOptions::default(),
            vertex: PassBuilder::new(PassKind::Vertex),
            fragment: PassBuilder::new(PassKind::Fragment),
            layers: None,
        }
    }

    pub fn with_options(mut self, options: LinkOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &LinkOptions {
        &self.options
    }

    pub fn vertex(&self) -> &PassBuilder {
        &self.vertex
    }

    pub fn fragment(&self) -> &PassBuilder {
        &self.fragment
    }

    pub fn vertex_mut(&mut self) -> &mut PassBuilder {
        &mut self.vertex
    }

    pub fn fragment_mut(&mut self) -> &mut PassBuilder {
        &mut self.fragment
    }

    pub fn add_vertex_stage(&mut self, stage: Stage) -> Result<()> {
        self.vertex.add_stage(stage)
    }

    pub fn add_fragment_stage(&mut self, stage: Stage) -> Result<()> {
        self.fragment.add_stage(stage)
    }

    /// Route the fragment pass into packed deferred layers instead of the
    /// single color output.
    pub fn set_layers(&mut self, layers: Vec<LayerDescriptor>) {
        self.layers = Some(layers);
    }

    pub fn link(self) -> Result<LinkedProgram> {
        let layout = match &self.layers {
            Some(layers) => Some(LayerLayout::pack(layers, self.options.max_layer_slots)?),
            None => None,
        };

        let forwarded = self.fragment.attribute_requests()?;
        let mut vertex_linkage = self.vertex.resolve(None, &forwarded)?;
        let vertex_view = vertex_linkage.successor_view()?;
        let fragment_linkage = self.fragment.resolve(Some(&vertex_view), &VariableSet::new())?;

        // Fragment imports are taken from the vertex view, so their types
        // already agree with the vertex side.
        let varyings = fragment_linkage.imported.clone();
        vertex_linkage.exported = varyings.clone();

        // A fragment read the vertex pass does produce, but which could not
        // be offered as a varying, would otherwise turn into a uniform.
        for var in fragment_linkage.uniforms.iter() {
            let from_vertex = vertex_linkage
                .produced
                .get(&var.name)
                .or_else(|| vertex_linkage.attributes.get(&var.name))
                .or_else(|| vertex_linkage.imported.get(&var.name));
            if let Some(vertex_var) = from_vertex {
                return Err(LinkError::NotVaryingCompatible {
                    name: vertex_var.name.clone(),
                    ty: vertex_var.type_label(),
                });
            }
        }

        let mut uniforms = vertex_linkage.uniforms.clone();
        uniforms.extend_from(&fragment_linkage.uniforms)?;
        if let Some(layout) = &layout {
            for var in layout.rounding_uniforms() {
                uniforms.insert(&var)?;
            }
        }

        self.fragment.check_outputs(layout.as_ref(), &self.options)?;

        let texture_bindings = texture_bindings(&vertex_linkage, &fragment_linkage);

        let vertex_source = self
            .vertex
            .emit(&vertex_linkage, &varyings, None, &self.options);
        let fragment_source =
            self.fragment
                .emit(&fragment_linkage, &varyings, layout.as_ref(), &self.options);

        debug!(
            program = %self.name,
            varyings = varyings.len(),
            uniforms = uniforms.len(),
            textures = texture_bindings.len(),
            images = layout.as_ref().map_or(0, |l| l.slots.len()),
            "program linked"
        );

        Ok(LinkedProgram {
            name: self.name,
            vertex_source,
            fragment_source,
            vertex_linkage,
            fragment_linkage,
            varyings,
            uniforms,
            texture_bindings,
            layers: layout,
        })
    }
}

/// Texture unit names in binding order: samplers as first encountered,
/// vertex pass first, arrays expanded element by element.
fn texture_bindings(vertex: &Linkage, fragment: &Linkage) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for var in vertex.uniforms.iter().chain(fragment.uniforms.iter()) {
        if !var.ty.is_sampler() {
            continue;
        }
        let units: Vec<String> = if var.is_array() {
            (0..var.array_size)
                .map(|i| format!("{}[{i}]", var.name))
                .collect()
        } else {
            vec![var.name.clone()]
        };
        for unit in units {
            if !out.contains(&unit) {
                out.push(unit);
            }
        }
    }
    out
}

/// Generated sources plus the interface the host binds against.
#[derive(Clone, Debug)]
pub struct LinkedProgram {
    pub name: String,
    pub vertex_source: String,
    pub fragment_source: String,
    pub vertex_linkage: Linkage,
    pub fragment_linkage: Linkage,
    pub varyings: VariableSet,
    pub uniforms: VariableSet,
    pub texture_bindings: Vec<String>,
    pub layers: Option<LayerLayout>,
}

/// Serializable summary of a [`LinkedProgram`].
#[derive(Clone, Debug, Serialize)]
pub struct LinkReport {
    pub name: String,
    pub attributes: Vec<Variable>,
    pub varyings: Vec<Variable>,
    pub uniforms: Vec<Variable>,
    pub texture_bindings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageDescriptor>>,
    /// Values to bind to the layer writer's rounding uniforms.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rounding_uniforms: Vec<RoundingUniform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<LayerLayout>,
}

impl LinkedProgram {
    pub fn source(&self, kind: PassKind) -> &str {
        match kind {
            PassKind::Vertex => &self.vertex_source,
            PassKind::Fragment => &self.fragment_source,
        }
    }

    /// Line-numbered source, for matching driver error messages.
    pub fn annotated_source(&self, kind: PassKind) -> String {
        number_lines(self.source(kind))
    }

    /// Vertex stream inputs, including attributes pulled in only to be
    /// forwarded to the fragment pass.
    pub fn attributes(&self) -> Vec<&Variable> {
        let mut out: Vec<&Variable> = self
            .vertex_linkage
            .attributes
            .iter()
            .chain(self.vertex_linkage.imported.iter())
            .collect();
        out.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        out
    }

    pub fn report(&self) -> LinkReport {
        LinkReport {
            name: self.name.clone(),
            attributes: self.attributes().into_iter().cloned().collect(),
            varyings: self.varyings.iter().cloned().collect(),
            uniforms: self.uniforms.iter().cloned().collect(),
            texture_bindings: self.texture_bindings.clone(),
            images: self.layers.as_ref().map(LayerLayout::images),
            rounding_uniforms: self
                .layers
                .as_ref()
                .map(LayerLayout::rounding_values)
                .unwrap_or_default(),
            layers: self.layers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::types::GlslType;

    fn transform_stage() -> Stage {
        Stage::new(
            "transform",
            vec![
                Variable::attribute(GlslType::Vec3, "coords"),
                Variable::input(GlslType::Mat4, "transform"),
                Variable::output(GlslType::Vec3, "worldPos"),
                Variable::output(GlslType::Vec4, "gl_Position"),
            ],
            "worldPos = (transform * vec4(coords, 1.0)).xyz;\n\
             gl_Position = vec4(worldPos, 1.0);",
        )
    }

    #[test]
    fn test_produced_value_crosses_as_varying() {
        let mut program = ProgramBuilder::new("basic");
        program.add_vertex_stage(transform_stage()).unwrap();
        program
            .add_fragment_stage(Stage::new(
                "shade",
                vec![
                    Variable::input(GlslType::Vec3, "worldPos"),
                    Variable::output(GlslType::Vec4, "color"),
                ],
                "color = vec4(worldPos, 1.0);",
            ))
            .unwrap();
        let linked = program.link().unwrap();

        assert_eq!(linked.varyings.names(), vec!["worldPos"]);
        assert_eq!(linked.vertex_linkage.exported.names(), vec!["worldPos"]);
        assert!(linked.fragment_linkage.uniforms.is_empty());
        assert!(linked.vertex_source.starts_with("#version 330 core\n"));
        assert!(linked.vertex_source.contains("in vec3 coords;"));
        assert!(linked.vertex_source.contains("out vec3 v_worldPos;"));
        assert!(linked.vertex_source.contains("    v_worldPos = worldPos;\n}"));
        assert!(linked.fragment_source.contains("in vec3 v_worldPos;"));
        assert!(linked.fragment_source.contains("    vec3 worldPos = v_worldPos;"));
    }

    #[test]
    fn test_uniform_shared_by_both_passes_is_merged() {
        let mut program = ProgramBuilder::new("shared");
        program.add_vertex_stage(transform_stage()).unwrap();
        program
            .add_fragment_stage(Stage::new(
                "shade",
                vec![
                    Variable::input(GlslType::Mat4, "transform"),
                    Variable::output(GlslType::Vec4, "color"),
                ],
                "color = transform[0];",
            ))
            .unwrap();
        let linked = program.link().unwrap();
        assert_eq!(linked.uniforms.names(), vec!["transform"]);
        assert!(linked.varyings.is_empty());
        assert!(linked.fragment_source.contains("uniform mat4 transform;"));
    }

    #[test]
    fn test_uniform_type_mismatch_across_passes() {
        let mut program = ProgramBuilder::new("mismatch");
        program.add_vertex_stage(transform_stage()).unwrap();
        program
            .add_fragment_stage(Stage::new(
                "shade",
                vec![
                    Variable::input(GlslType::Mat3, "transform"),
                    Variable::output(GlslType::Vec4, "color"),
                ],
                "",
            ))
            .unwrap();
        let err = program.link().unwrap_err();
        assert_eq!(
            err,
            LinkError::TypeConflict {
                name: "transform".to_string(),
                first: "mat4".to_string(),
                second: "mat3".to_string(),
            }
        );
    }

    #[test]
    fn test_non_varying_vertex_value_is_rejected() {
        let mut program = ProgramBuilder::new("flags");
        program.add_vertex_stage(transform_stage()).unwrap();
        program
            .add_vertex_stage(Stage::constant("flag", GlslType::Bool, "mirrored", "true"))
            .unwrap();
        program
            .add_fragment_stage(Stage::new(
                "shade",
                vec![
                    Variable::input(GlslType::Bool, "mirrored"),
                    Variable::output(GlslType::Vec4, "color"),
                ],
                "color = mirrored ? vec4(1.0) : vec4(0.0);",
            ))
            .unwrap();
        assert_eq!(
            program.link().unwrap_err(),
            LinkError::NotVaryingCompatible {
                name: "mirrored".to_string(),
                ty: "bool".to_string(),
            }
        );
    }

    #[test]
    fn test_integer_varyings_are_flat() {
        let mut program = ProgramBuilder::new("flat");
        program
            .add_vertex_stage(Stage::new(
                "id",
                vec![
                    Variable::input(GlslType::Int, "gl_InstanceID"),
                    Variable::output(GlslType::Int, "instance"),
                ],
                "instance = gl_InstanceID;",
            ))
            .unwrap();
        program
            .add_fragment_stage(Stage::new(
                "shade",
                vec![
                    Variable::input(GlslType::Int, "instance"),
                    Variable::output(GlslType::Vec4, "color"),
                ],
                "color = vec4(float(instance));",
            ))
            .unwrap();
        let linked = program.link().unwrap();
        assert!(linked.vertex_source.contains("flat out int v_instance;"));
        assert!(linked.fragment_source.contains("flat in int v_instance;"));
        assert!(!linked.vertex_source.contains("uniform int gl_InstanceID"));
    }

    #[test]
    fn test_options_change_naming() {
        let options = LinkOptions {
            glsl_version: Some("300 es".to_string()),
            varying_prefix: "vary_".to_string(),
            fragment_output: "outColor".to_string(),
            ..LinkOptions::default()
        };
        let mut program = ProgramBuilder::new("opts").with_options(options);
        program.add_vertex_stage(transform_stage()).unwrap();
        program
            .add_fragment_stage(Stage::new(
                "shade",
                vec![
                    Variable::input(GlslType::Vec3, "worldPos"),
                    Variable::output(GlslType::Vec3, "finalColor"),
                ],
                "finalColor = worldPos;",
            ))
            .unwrap();
        let linked = program.link().unwrap();
        assert!(linked.fragment_source.starts_with("#version 300 es\n"));
        assert!(linked.fragment_source.contains("in vec3 vary_worldPos;"));
        assert!(linked.fragment_source.contains("outColor = vec4(finalColor, 1.0);"));
    }

    #[test]
    fn test_annotated_source_numbers_lines() {
        let mut program = ProgramBuilder::new("dump");
        program
            .add_fragment_stage(Stage::constant("c", GlslType::Vec4, "color", "vec4(1.0)"))
            .unwrap();
        let linked = program.link().unwrap();
        let dump = linked.annotated_source(PassKind::Fragment);
        assert!(dump.starts_with("   1 | #version 330 core\n"));
        assert_eq!(dump.lines().count(), linked.fragment_source.lines().count());
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: LinkOptions =
            serde_json::from_str(r#"{ "varying_prefix": "io_" }"#).unwrap();
        assert_eq!(options.varying_prefix, "io_");
        assert_eq!(options.glsl_version.as_deref(), Some("330 core"));
        assert_eq!(options.max_layer_slots, None);
    }
}
