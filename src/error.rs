//! Error taxonomy for program linking and layer packing.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinkError>;

/// Structural errors raised while assembling a program.
///
/// All of these abort construction: a half-linked program is never returned.
/// Driver compile failures are not represented here; they are reported by
/// whatever compiles the emitted sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("variable `{name}` declared as {first} and as {second}")]
    TypeConflict {
        name: String,
        first: String,
        second: String,
    },

    #[error("`{name}` ({ty}) is written by the vertex pass but cannot reach the fragment pass")]
    NotVaryingCompatible { name: String, ty: String },

    #[error("function `{key}` declared twice with different bodies")]
    FunctionKeyConflict { key: String },

    #[error("layer `{layer}` does not fit into {max_slots} output image(s)")]
    PackingOverflow { layer: String, max_slots: usize },

    #[error("layer `{layer}` has channel width {width} (expected 1..=4)")]
    InvalidLayerWidth { layer: String, width: u32 },

    #[error("layer `{name}` listed more than once")]
    DuplicateLayer { name: String },

    #[error("layer `{name}` is not part of this layout")]
    UnknownLayer { name: String },
}
