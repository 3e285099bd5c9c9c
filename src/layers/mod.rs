//! Deferred layer packing.
//!
//! - `precision`: Storage precision ladder
//! - `descriptor`: Semantic layer descriptors and value ranges
//! - `standard`: Common layer types
//! - `packer`: First-fit packing into 4-channel images
//! - `codegen`: Read-side accessors and the write-side layer writer

pub mod codegen;
pub mod descriptor;
pub mod packer;
pub mod precision;
pub mod standard;

pub use codegen::ReadMode;
pub use descriptor::{LayerDescriptor, ValueRange};
pub use packer::{
    EmptyChannels, ImageDescriptor, ImageSlot, LayerLayout, LayerPlacement, RoundingUniform,
};
pub use precision::StoragePrecision;
