//! First-fit packing of semantic layers into 4-channel output images.
//!
//! Placements are never reconsidered once made. The result is not an optimal
//! bin packing, but it is a pure function of the layer order, which keeps
//! image layouts (and the generated source) stable.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::error::{LinkError, Result};
use crate::linker::types::GlslType;
use crate::linker::variable::Variable;
use super::descriptor::LayerDescriptor;
use super::precision::StoragePrecision;

pub const CHANNELS_PER_SLOT: u32 = 4;

const SWIZZLE: &str = "xyzw";

/// Swizzle selecting `width` channels starting at `first` (`"yz"`).
pub fn channel_mask(first: u32, width: u32) -> &'static str {
    let start = first.min(CHANNELS_PER_SLOT) as usize;
    let end = (first + width).min(CHANNELS_PER_SLOT) as usize;
    &SWIZZLE[start..end]
}

/// One physical output image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageSlot {
    pub index: usize,
    pub precision: StoragePrecision,
    pub used_channels: u32,
    /// Names of the layers packed into this image, in channel order.
    pub layers: Vec<String>,
}

impl ImageSlot {
    fn open(index: usize) -> Self {
        Self {
            index,
            precision: StoragePrecision::lowest(),
            used_channels: 0,
            layers: Vec::new(),
        }
    }

    pub fn remaining_channels(&self) -> u32 {
        CHANNELS_PER_SLOT - self.used_channels
    }

    /// Fragment output variable writing this image.
    pub fn output_name(&self) -> String {
        format!("defLayer{}", self.index)
    }

    /// Sampler a later pass reads this image through.
    pub fn texture_name(&self) -> String {
        format!("defLayerTex{}", self.index)
    }

    /// `vec2` uniform scaling the stochastic rounding of this image:
    /// `x` is the quantization step, `y` the strength.
    pub fn rounding_uniform(&self) -> String {
        format!("defRR{}", self.index)
    }

    /// Suggested value for [`ImageSlot::rounding_uniform`].
    pub fn random_rounding(&self) -> [f32; 2] {
        [self.precision.rounding_step(), 1.0]
    }
}

/// Where one layer lives.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayerPlacement {
    pub layer: LayerDescriptor,
    pub slot: usize,
    pub first_channel: u32,
}

impl LayerPlacement {
    pub fn channels(&self) -> std::ops::Range<u32> {
        self.first_channel..self.first_channel + self.layer.width
    }

    pub fn mask(&self) -> &'static str {
        channel_mask(self.first_channel, self.layer.width)
    }
}

/// Unused trailing channels of an image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmptyChannels {
    pub slot: usize,
    pub first_channel: u32,
    pub mask: String,
}

/// Physical image description for the framebuffer allocator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageDescriptor {
    pub name: String,
    pub channels: u32,
    pub precision: StoragePrecision,
    pub bits_per_channel: u32,
    pub format: &'static str,
}

/// Rounding uniform of one image with the value the host should bind.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundingUniform {
    pub name: String,
    pub value: [f32; 2],
}

/// Result of packing an ordered list of layers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayerLayout {
    pub slots: Vec<ImageSlot>,
    pub placements: Vec<LayerPlacement>,
    pub empty_channels: Vec<EmptyChannels>,
}

impl LayerLayout {
    /// Pack `layers` first-fit, in order. `max_slots` optionally caps the
    /// number of images.
    pub fn pack(layers: &[LayerDescriptor], max_slots: Option<usize>) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut slots: Vec<ImageSlot> = Vec::new();
        let mut placements: Vec<LayerPlacement> = Vec::with_capacity(layers.len());

        for layer in layers {
            if !(1..=CHANNELS_PER_SLOT).contains(&layer.width) {
                return Err(LinkError::InvalidLayerWidth {
                    layer: layer.name.clone(),
                    width: layer.width,
                });
            }
            if !seen.insert(layer.name.as_str()) {
                return Err(LinkError::DuplicateLayer {
                    name: layer.name.clone(),
                });
            }

            let index = match slots
                .iter()
                .position(|s| s.remaining_channels() >= layer.width)
            {
                Some(index) => index,
                None => {
                    if max_slots.is_some_and(|max| slots.len() >= max) {
                        return Err(LinkError::PackingOverflow {
                            layer: layer.name.clone(),
                            max_slots: max_slots.unwrap_or_default(),
                        });
                    }
                    slots.push(ImageSlot::open(slots.len()));
                    slots.len() - 1
                }
            };

            let slot = &mut slots[index];
            let first_channel = slot.used_channels;
            slot.used_channels += layer.width;
            slot.precision = slot.precision.max(layer.min_precision);
            slot.layers.push(layer.name.clone());

            placements.push(LayerPlacement {
                layer: layer.clone(),
                slot: index,
                first_channel,
            });
        }

        let empty_channels = slots
            .iter()
            .filter(|s| s.remaining_channels() > 0)
            .map(|s| EmptyChannels {
                slot: s.index,
                first_channel: s.used_channels,
                mask: channel_mask(s.used_channels, s.remaining_channels()).to_string(),
            })
            .collect();

        debug!(
            layers = layers.len(),
            images = slots.len(),
            "packed deferred layers"
        );

        Ok(Self {
            slots,
            placements,
            empty_channels,
        })
    }

    pub fn images(&self) -> Vec<ImageDescriptor> {
        self.slots
            .iter()
            .map(|s| ImageDescriptor {
                name: s.output_name(),
                channels: CHANNELS_PER_SLOT,
                precision: s.precision,
                bits_per_channel: s.precision.bits_per_channel(),
                format: s.precision.format(),
            })
            .collect()
    }

    /// Uniforms the layer writer reads, one `vec2` per image. They belong to
    /// the program interface like any uniform a stage reads.
    pub fn rounding_uniforms(&self) -> Vec<Variable> {
        self.slots
            .iter()
            .map(|s| Variable::input(GlslType::Vec2, s.rounding_uniform()))
            .collect()
    }

    pub fn rounding_values(&self) -> Vec<RoundingUniform> {
        self.slots
            .iter()
            .map(|s| RoundingUniform {
                name: s.rounding_uniform(),
                value: s.random_rounding(),
            })
            .collect()
    }

    pub fn placement(&self, layer: &str) -> Result<&LayerPlacement> {
        self.placements
            .iter()
            .find(|p| p.layer.name == layer)
            .ok_or_else(|| LinkError::UnknownLayer {
                name: layer.to_string(),
            })
    }

    pub fn slot(&self, index: usize) -> Option<&ImageSlot> {
        self.slots.get(index)
    }

    pub fn layers(&self) -> impl Iterator<Item = &LayerDescriptor> {
        self.placements.iter().map(|p| &p.layer)
    }
}
