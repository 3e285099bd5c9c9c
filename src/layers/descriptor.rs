//! Semantic output layer descriptors.

use serde::{Deserialize, Serialize};

use crate::linker::types::GlslType;
use crate::utils::fmt_f32;
use super::precision::StoragePrecision;

/// Mapping between the value a stage computes and what is stored in the
/// image channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueRange {
    /// Already in `0..1`.
    #[default]
    Unit,
    /// `-1..1`, stored as `x * 0.5 + 0.5`.
    Signed,
    /// Stored as-is; only meaningful for float precisions.
    Raw,
    /// `min..max`, stored normalized to `0..1`.
    Linear { min: f32, max: f32 },
}

impl ValueRange {
    /// GLSL expression turning a computed value into stored data.
    pub fn encode(&self, expr: &str) -> String {
        match *self {
            ValueRange::Unit | ValueRange::Raw => expr.to_string(),
            ValueRange::Signed => format!("({expr}) * 0.5 + 0.5"),
            ValueRange::Linear { min, max } => {
                let span = max - min;
                if span.abs() <= f32::EPSILON {
                    return expr.to_string();
                }
                format!("(({expr}) - {}) * {}", fmt_f32(min), fmt_f32(1.0 / span))
            }
        }
    }

    /// GLSL expression turning stored data back into the computed value.
    pub fn decode(&self, expr: &str) -> String {
        match *self {
            ValueRange::Unit | ValueRange::Raw => expr.to_string(),
            ValueRange::Signed => format!("({expr}) * 2.0 - 1.0"),
            ValueRange::Linear { min, max } => {
                let span = max - min;
                if span.abs() <= f32::EPSILON {
                    return expr.to_string();
                }
                format!("({expr}) * {} + {}", fmt_f32(span), fmt_f32(min))
            }
        }
    }
}

/// One semantic per-pixel output, e.g. the surface normal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub name: String,
    /// Fragment variable holding the value (e.g. `finalNormal`).
    pub variable: String,
    /// Channel width, 1..=4.
    pub width: u32,
    #[serde(rename = "precision", default)]
    pub min_precision: StoragePrecision,
    #[serde(default)]
    pub range: ValueRange,
    /// Value written when no stage produced the variable.
    #[serde(rename = "default", default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl LayerDescriptor {
    pub fn new(
        name: impl Into<String>,
        variable: impl Into<String>,
        width: u32,
        min_precision: StoragePrecision,
    ) -> Self {
        Self {
            name: name.into(),
            variable: variable.into(),
            width,
            min_precision,
            range: ValueRange::Unit,
            default_value: None,
        }
    }

    pub fn with_range(mut self, range: ValueRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_default(mut self, expr: impl Into<String>) -> Self {
        self.default_value = Some(expr.into());
        self
    }

    /// GLSL type of the layer variable. Widths outside 1..=4 are rejected by
    /// the packer before any code is generated.
    pub fn glsl_type(&self) -> GlslType {
        GlslType::float_vector(self.width).unwrap_or(GlslType::Vec4)
    }

    pub fn default_expr(&self) -> String {
        match &self.default_value {
            Some(expr) => expr.clone(),
            None => self
                .glsl_type()
                .default_literal()
                .unwrap_or("0.0")
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_range_round_trips_symbolically() {
        let r = ValueRange::Signed;
        assert_eq!(r.encode("n"), "(n) * 0.5 + 0.5");
        assert_eq!(r.decode("d"), "(d) * 2.0 - 1.0");
    }

    #[test]
    fn test_linear_range() {
        let r = ValueRange::Linear { min: 1.0, max: 3.0 };
        assert_eq!(r.encode("ior"), "((ior) - 1.0) * 0.5");
        assert_eq!(r.decode("d"), "(d) * 2.0 + 1.0");
    }

    #[test]
    fn test_degenerate_linear_range_is_identity() {
        let r = ValueRange::Linear { min: 2.0, max: 2.0 };
        assert_eq!(r.encode("x"), "x");
        assert_eq!(r.decode("x"), "x");
    }

    #[test]
    fn test_default_expr_falls_back_to_zero() {
        let layer = LayerDescriptor::new("motion", "finalMotion", 2, StoragePrecision::Float16);
        assert_eq!(layer.glsl_type(), GlslType::Vec2);
        assert_eq!(layer.default_expr(), "vec2(0.0)");
        let layer = layer.with_default("vec2(1.0)");
        assert_eq!(layer.default_expr(), "vec2(1.0)");
    }

    #[test]
    fn test_deserialize_descriptor() {
        let layer: LayerDescriptor = serde_json::from_str(
            r#"{
                "name": "normal",
                "variable": "finalNormal",
                "width": 3,
                "precision": "unorm16",
                "range": "signed"
            }"#,
        )
        .unwrap();
        assert_eq!(layer.min_precision, StoragePrecision::Unorm16);
        assert_eq!(layer.range, ValueRange::Signed);
        assert_eq!(layer.default_value, None);
    }
}
