//! JSON program descriptions.
//!
//! ```json
//! {
//!   "name": "lit",
//!   "options": { "varying_prefix": "v_" },
//!   "vertex": [{ "name": "transform", "params": [...], "body": "..." }],
//!   "fragment": [...],
//!   "layers": ["color", "normal", { "name": "mask", "variable": "finalMask", "width": 1 }]
//! }
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::layers::{LayerDescriptor, standard};
use crate::linker::{LinkOptions, LinkedProgram, ProgramBuilder, Stage};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProgramDesc {
    pub name: String,
    #[serde(default)]
    pub options: LinkOptions,
    #[serde(default)]
    pub vertex: Vec<Stage>,
    #[serde(default)]
    pub fragment: Vec<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<LayerSpec>>,
}

/// A layer given either by standard name or spelled out in full.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum LayerSpec {
    Standard(String),
    Custom(LayerDescriptor),
}

impl LayerSpec {
    pub fn descriptor(&self) -> Result<LayerDescriptor> {
        match self {
            LayerSpec::Standard(name) => match standard::by_name(name) {
                Some(layer) => Ok(layer),
                None => bail!("unknown standard layer '{name}'"),
            },
            LayerSpec::Custom(layer) => Ok(layer.clone()),
        }
    }
}

impl ProgramDesc {
    pub fn layer_descriptors(&self) -> Result<Option<Vec<LayerDescriptor>>> {
        let Some(specs) = self.layers.as_ref() else {
            return Ok(None);
        };
        let layers = specs
            .iter()
            .map(LayerSpec::descriptor)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(layers))
    }

    pub fn builder(&self) -> Result<ProgramBuilder> {
        let mut program = ProgramBuilder::new(&self.name).with_options(self.options.clone());
        for stage in &self.vertex {
            program
                .add_vertex_stage(stage.clone())
                .with_context(|| format!("vertex stage '{}'", stage.name))?;
        }
        for stage in &self.fragment {
            program
                .add_fragment_stage(stage.clone())
                .with_context(|| format!("fragment stage '{}'", stage.name))?;
        }
        if let Some(layers) = self.layer_descriptors()? {
            program.set_layers(layers);
        }
        Ok(program)
    }

    pub fn link(&self) -> Result<LinkedProgram> {
        self.builder()?
            .link()
            .with_context(|| format!("failed to link program '{}'", self.name))
    }
}

pub fn parse_program_json(text: &str) -> Result<ProgramDesc> {
    serde_json::from_str(text).context("failed to parse program json")
}

pub fn load_program_from_path(path: impl AsRef<std::path::Path>) -> Result<ProgramDesc> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read program json at {}", path.display()))?;
    parse_program_json(&text).with_context(|| format!("in {}", path.display()))
}
