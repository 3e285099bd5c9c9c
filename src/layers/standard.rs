//! Catalogue of the common deferred layer types.

use super::descriptor::{LayerDescriptor, ValueRange};
use super::precision::StoragePrecision;

pub fn color() -> LayerDescriptor {
    LayerDescriptor::new("color", "finalColor", 3, StoragePrecision::Unorm8)
        .with_default("vec3(1.0)")
}

pub fn emissive() -> LayerDescriptor {
    LayerDescriptor::new("emissive", "finalEmissive", 3, StoragePrecision::Float16)
        .with_range(ValueRange::Raw)
}

pub fn normal() -> LayerDescriptor {
    LayerDescriptor::new("normal", "finalNormal", 3, StoragePrecision::Unorm16)
        .with_range(ValueRange::Signed)
        .with_default("vec3(0.0, 0.0, 1.0)")
}

pub fn tangent() -> LayerDescriptor {
    LayerDescriptor::new("tangent", "finalTangent", 3, StoragePrecision::Unorm8)
        .with_range(ValueRange::Signed)
        .with_default("vec3(1.0, 0.0, 0.0)")
}

pub fn position() -> LayerDescriptor {
    LayerDescriptor::new("position", "finalPosition", 3, StoragePrecision::Float32)
        .with_range(ValueRange::Raw)
}

pub fn metallic() -> LayerDescriptor {
    LayerDescriptor::new("metallic", "finalMetallic", 1, StoragePrecision::Unorm8)
}

pub fn roughness() -> LayerDescriptor {
    LayerDescriptor::new("roughness", "finalRoughness", 1, StoragePrecision::Unorm8)
        .with_default("1.0")
}

pub fn occlusion() -> LayerDescriptor {
    LayerDescriptor::new("occlusion", "finalOcclusion", 1, StoragePrecision::Unorm8)
        .with_default("1.0")
}

pub fn reflectivity() -> LayerDescriptor {
    LayerDescriptor::new("reflectivity", "finalReflectivity", 1, StoragePrecision::Unorm8)
        .with_default("0.04")
}

pub fn motion() -> LayerDescriptor {
    LayerDescriptor::new("motion", "finalMotion", 2, StoragePrecision::Float16)
        .with_range(ValueRange::Raw)
}

pub fn translucency() -> LayerDescriptor {
    LayerDescriptor::new("translucency", "finalTranslucency", 1, StoragePrecision::Unorm8)
}

pub fn sheen() -> LayerDescriptor {
    LayerDescriptor::new("sheen", "finalSheen", 1, StoragePrecision::Unorm8)
}

/// Clear coat tint in `rgb`, strength in `a`.
pub fn clear_coat() -> LayerDescriptor {
    LayerDescriptor::new("clearCoat", "finalClearCoat", 4, StoragePrecision::Unorm8)
}

pub fn anisotropy() -> LayerDescriptor {
    LayerDescriptor::new("anisotropy", "finalAnisotropy", 1, StoragePrecision::Unorm8)
        .with_range(ValueRange::Signed)
}

pub fn index_of_refraction() -> LayerDescriptor {
    LayerDescriptor::new("indexOfRefraction", "finalIOR", 1, StoragePrecision::Unorm8)
        .with_range(ValueRange::Linear { min: 1.0, max: 3.0 })
        .with_default("1.5")
}

pub fn all() -> Vec<LayerDescriptor> {
    vec![
        color(),
        emissive(),
        normal(),
        tangent(),
        position(),
        metallic(),
        roughness(),
        occlusion(),
        reflectivity(),
        motion(),
        translucency(),
        sheen(),
        clear_coat(),
        anisotropy(),
        index_of_refraction(),
    ]
}

/// Look up a standard layer by its name (`"normal"`, `"clearCoat"`, ...).
pub fn by_name(name: &str) -> Option<LayerDescriptor> {
    all().into_iter().find(|layer| layer.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_is_consistent() {
        let layers = all();
        let names: HashSet<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        let vars: HashSet<&str> = layers.iter().map(|l| l.variable.as_str()).collect();
        assert_eq!(names.len(), layers.len());
        assert_eq!(vars.len(), layers.len());
        assert!(layers.iter().all(|l| (1..=4).contains(&l.width)));
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("normal").map(|l| l.variable), Some("finalNormal".to_string()));
        assert!(by_name("nope").is_none());
    }
}
