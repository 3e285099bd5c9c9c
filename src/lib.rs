pub mod dsl;
pub mod error;
pub mod layers;
pub mod linker;
pub mod utils;

pub use error::{LinkError, Result};
pub use linker::{
    Direction, GlslType, LinkOptions, LinkedProgram, PassBuilder, PassKind, ProgramBuilder, Stage,
    Variable,
};
