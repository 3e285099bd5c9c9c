//! Shader program linker.
//!
//! Module layout:
//! - `types`: GLSL value types, parameter directions and pass kinds
//! - `variable`: Stage parameters and insertion-ordered variable sets
//! - `stage`: Opaque shading code plus its declared interface
//! - `functions`: Per-pass function table keyed by signature
//! - `resolve`: Classification of every value a pass reads
//! - `sampler_arrays`: Switch-based accessors for arrayed samplers
//! - `emit`: GLSL source emission for one resolved pass
//! - `pass_builder`: Ordered stages of one pass
//! - `program`: Vertex/fragment program assembly

pub mod emit;
pub mod functions;
pub mod pass_builder;
pub mod program;
pub mod resolve;
pub mod sampler_arrays;
pub mod stage;
pub mod types;
pub mod variable;

pub use functions::FunctionTable;
pub use pass_builder::PassBuilder;
pub use program::{LinkOptions, LinkReport, LinkedProgram, ProgramBuilder};
pub use resolve::{Classification, Linkage};
pub use stage::{ShaderFunction, Stage};
pub use types::{Direction, GlslType, PassKind};
pub use variable::{Variable, VariableSet};
