//! Core type definitions for the linker.

use serde::{Deserialize, Serialize};

/// GLSL value type of a stage parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlslType {
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "uint")]
    UInt,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "vec2")]
    Vec2,
    #[serde(rename = "vec3")]
    Vec3,
    #[serde(rename = "vec4")]
    Vec4,
    #[serde(rename = "ivec2")]
    IVec2,
    #[serde(rename = "ivec3")]
    IVec3,
    #[serde(rename = "ivec4")]
    IVec4,
    #[serde(rename = "uvec2")]
    UVec2,
    #[serde(rename = "uvec3")]
    UVec3,
    #[serde(rename = "uvec4")]
    UVec4,
    #[serde(rename = "mat2")]
    Mat2,
    #[serde(rename = "mat3")]
    Mat3,
    #[serde(rename = "mat4")]
    Mat4,
    #[serde(rename = "sampler2D")]
    Sampler2D,
    #[serde(rename = "sampler3D")]
    Sampler3D,
    #[serde(rename = "samplerCube")]
    SamplerCube,
    #[serde(rename = "sampler2DArray")]
    Sampler2DArray,
    #[serde(rename = "sampler2DShadow")]
    Sampler2DShadow,
    #[serde(rename = "samplerCubeShadow")]
    SamplerCubeShadow,
    #[serde(rename = "sampler2DMS")]
    Sampler2DMS,
}

impl GlslType {
    /// Returns the GLSL spelling of this type.
    pub fn glsl(self) -> &'static str {
        match self {
            GlslType::Bool => "bool",
            GlslType::Int => "int",
            GlslType::UInt => "uint",
            GlslType::Float => "float",
            GlslType::Vec2 => "vec2",
            GlslType::Vec3 => "vec3",
            GlslType::Vec4 => "vec4",
            GlslType::IVec2 => "ivec2",
            GlslType::IVec3 => "ivec3",
            GlslType::IVec4 => "ivec4",
            GlslType::UVec2 => "uvec2",
            GlslType::UVec3 => "uvec3",
            GlslType::UVec4 => "uvec4",
            GlslType::Mat2 => "mat2",
            GlslType::Mat3 => "mat3",
            GlslType::Mat4 => "mat4",
            GlslType::Sampler2D => "sampler2D",
            GlslType::Sampler3D => "sampler3D",
            GlslType::SamplerCube => "samplerCube",
            GlslType::Sampler2DArray => "sampler2DArray",
            GlslType::Sampler2DShadow => "sampler2DShadow",
            GlslType::SamplerCubeShadow => "samplerCubeShadow",
            GlslType::Sampler2DMS => "sampler2DMS",
        }
    }

    /// Number of scalar channels. Samplers report 0.
    pub fn components(self) -> u32 {
        match self {
            GlslType::Bool | GlslType::Int | GlslType::UInt | GlslType::Float => 1,
            GlslType::Vec2 | GlslType::IVec2 | GlslType::UVec2 => 2,
            GlslType::Vec3 | GlslType::IVec3 | GlslType::UVec3 => 3,
            GlslType::Vec4 | GlslType::IVec4 | GlslType::UVec4 | GlslType::Mat2 => 4,
            GlslType::Mat3 => 9,
            GlslType::Mat4 => 16,
            _ => 0,
        }
    }

    /// Stable ordering key used for attribute and uniform declarations:
    /// smaller values first, samplers after every plain value.
    pub fn size_key(self) -> u32 {
        if self.is_sampler() {
            1000
        } else {
            self.components()
        }
    }

    pub fn is_sampler(self) -> bool {
        matches!(
            self,
            GlslType::Sampler2D
                | GlslType::Sampler3D
                | GlslType::SamplerCube
                | GlslType::Sampler2DArray
                | GlslType::Sampler2DShadow
                | GlslType::SamplerCubeShadow
                | GlslType::Sampler2DMS
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            GlslType::Int
                | GlslType::UInt
                | GlslType::IVec2
                | GlslType::IVec3
                | GlslType::IVec4
                | GlslType::UVec2
                | GlslType::UVec3
                | GlslType::UVec4
        )
    }

    /// Float scalar or vector (the only types that can be packed into a
    /// color output without conversion).
    pub fn is_float_vector(self) -> bool {
        matches!(
            self,
            GlslType::Float | GlslType::Vec2 | GlslType::Vec3 | GlslType::Vec4
        )
    }

    /// Whether a value of this type may cross the rasterizer as a varying.
    pub fn is_varying_compatible(self) -> bool {
        !self.is_sampler() && self != GlslType::Bool
    }

    /// Float vector type with `width` channels.
    pub fn float_vector(width: u32) -> Option<GlslType> {
        match width {
            1 => Some(GlslType::Float),
            2 => Some(GlslType::Vec2),
            3 => Some(GlslType::Vec3),
            4 => Some(GlslType::Vec4),
            _ => None,
        }
    }

    /// Coordinate type a lookup into this sampler kind takes.
    pub fn sampler_coord(self) -> Option<GlslType> {
        match self {
            GlslType::Sampler2D | GlslType::Sampler2DShadow => Some(GlslType::Vec2),
            GlslType::Sampler3D
            | GlslType::SamplerCube
            | GlslType::SamplerCubeShadow
            | GlslType::Sampler2DArray => Some(GlslType::Vec3),
            GlslType::Sampler2DMS => Some(GlslType::IVec2),
            _ => None,
        }
    }

    /// Zero-initialized literal for this type. Samplers have none.
    pub fn default_literal(self) -> Option<&'static str> {
        Some(match self {
            GlslType::Bool => "false",
            GlslType::Int => "0",
            GlslType::UInt => "0u",
            GlslType::Float => "0.0",
            GlslType::Vec2 => "vec2(0.0)",
            GlslType::Vec3 => "vec3(0.0)",
            GlslType::Vec4 => "vec4(0.0)",
            GlslType::IVec2 => "ivec2(0)",
            GlslType::IVec3 => "ivec3(0)",
            GlslType::IVec4 => "ivec4(0)",
            GlslType::UVec2 => "uvec2(0u)",
            GlslType::UVec3 => "uvec3(0u)",
            GlslType::UVec4 => "uvec4(0u)",
            GlslType::Mat2 => "mat2(1.0)",
            GlslType::Mat3 => "mat3(1.0)",
            GlslType::Mat4 => "mat4(1.0)",
            _ => return None,
        })
    }
}

impl std::fmt::Display for GlslType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.glsl())
    }
}

/// Data flow direction of a stage parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
    InOut,
}

impl Direction {
    pub fn reads(self) -> bool {
        matches!(self, Direction::In | Direction::InOut)
    }

    pub fn writes(self) -> bool {
        matches!(self, Direction::Out | Direction::InOut)
    }
}

/// Programmable pass a `PassBuilder` emits source for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    Vertex,
    Fragment,
}

impl PassKind {
    /// Built-in variables that are defined without any stage producing them.
    pub fn builtins(self) -> &'static [(&'static str, GlslType)] {
        match self {
            PassKind::Vertex => &[
                ("gl_Position", GlslType::Vec4),
                ("gl_PointSize", GlslType::Float),
                ("gl_VertexID", GlslType::Int),
                ("gl_InstanceID", GlslType::Int),
            ],
            PassKind::Fragment => &[
                ("gl_FragCoord", GlslType::Vec4),
                ("gl_FrontFacing", GlslType::Bool),
                ("gl_PointCoord", GlslType::Vec2),
                ("gl_FragDepth", GlslType::Float),
                ("gl_SampleID", GlslType::Int),
            ],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PassKind::Vertex => "vertex",
            PassKind::Fragment => "fragment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_key_orders_samplers_last() {
        assert!(GlslType::Float.size_key() < GlslType::Vec3.size_key());
        assert!(GlslType::Vec4.size_key() < GlslType::Mat4.size_key());
        assert!(GlslType::Mat4.size_key() < GlslType::Sampler2D.size_key());
    }

    #[test]
    fn test_varying_compatibility() {
        assert!(GlslType::Vec3.is_varying_compatible());
        assert!(GlslType::IVec2.is_varying_compatible());
        assert!(!GlslType::Bool.is_varying_compatible());
        assert!(!GlslType::SamplerCube.is_varying_compatible());
    }

    #[test]
    fn test_serde_names_match_glsl() {
        let ty: GlslType = serde_json::from_str("\"sampler2DShadow\"").unwrap();
        assert_eq!(ty, GlslType::Sampler2DShadow);
        assert_eq!(serde_json::to_string(&GlslType::Vec3).unwrap(), "\"vec3\"");
        let dir: Direction = serde_json::from_str("\"inout\"").unwrap();
        assert_eq!(dir, Direction::InOut);
    }

    #[test]
    fn test_sampler_coord() {
        assert_eq!(GlslType::Sampler2D.sampler_coord(), Some(GlslType::Vec2));
        assert_eq!(GlslType::SamplerCube.sampler_coord(), Some(GlslType::Vec3));
        assert_eq!(GlslType::Vec3.sampler_coord(), None);
    }
}
