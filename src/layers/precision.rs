//! Storage precision ladder for packed output images.

use serde::{Deserialize, Serialize};

/// Per-channel storage precision of one output image.
///
/// The variants are declared in ladder order, so `Ord` / `max` picks the
/// coarsest precision that still satisfies every requirement.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StoragePrecision {
    #[default]
    Unorm8,
    Unorm16,
    Float16,
    Float32,
}

impl StoragePrecision {
    pub const LADDER: [StoragePrecision; 4] = [
        StoragePrecision::Unorm8,
        StoragePrecision::Unorm16,
        StoragePrecision::Float16,
        StoragePrecision::Float32,
    ];

    pub fn lowest() -> Self {
        StoragePrecision::Unorm8
    }

    /// Texture format name handed to the framebuffer allocator.
    pub fn format(self) -> &'static str {
        match self {
            StoragePrecision::Unorm8 => "rgba8",
            StoragePrecision::Unorm16 => "rgba16",
            StoragePrecision::Float16 => "rgba16f",
            StoragePrecision::Float32 => "rgba32f",
        }
    }

    pub fn bits_per_channel(self) -> u32 {
        match self {
            StoragePrecision::Unorm8 => 8,
            StoragePrecision::Unorm16 | StoragePrecision::Float16 => 16,
            StoragePrecision::Float32 => 32,
        }
    }

    /// Quantization step of a normalized format; 0 for float formats, which
    /// need no stochastic rounding.
    pub fn rounding_step(self) -> f32 {
        match self {
            StoragePrecision::Unorm8 => 1.0 / 255.0,
            StoragePrecision::Unorm16 => 1.0 / 65535.0,
            StoragePrecision::Float16 | StoragePrecision::Float32 => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_is_strictly_ordered() {
        for pair in StoragePrecision::LADDER.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(
            StoragePrecision::Unorm16.max(StoragePrecision::Unorm8),
            StoragePrecision::Unorm16
        );
    }

    #[test]
    fn test_float_formats_have_no_rounding() {
        assert_eq!(StoragePrecision::Float16.rounding_step(), 0.0);
        assert!(
            StoragePrecision::Unorm8.rounding_step() > StoragePrecision::Unorm16.rounding_step()
        );
        assert_eq!(StoragePrecision::Unorm8.bits_per_channel(), 8);
        assert_eq!(StoragePrecision::Float16.bits_per_channel(), 16);
    }
}
