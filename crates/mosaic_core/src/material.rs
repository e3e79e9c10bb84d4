//! Material definitions bound to meshes.
//!
//! A material is an opaque type tag plus an ordered list of named
//! parameters. Meshes hold materials through `Arc`, so two meshes that name
//! the same material id share one instance.

use std::sync::Arc;

use mosaic_math::Vec3;

use crate::texture::Texture;

/// Type tag of the default material.
pub const DEFAULT_MATERIAL_KIND: &str = "OBJMaterial";

/// A single material parameter value.
#[derive(Clone, Debug)]
pub enum MaterialParam {
    Float(f32),
    Float3(Vec3),
    Texture(Arc<Texture>),
}

impl MaterialParam {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            MaterialParam::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float3(&self) -> Option<Vec3> {
        match self {
            MaterialParam::Float3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_texture(&self) -> Option<&Arc<Texture>> {
        match self {
            MaterialParam::Texture(t) => Some(t),
            _ => None,
        }
    }
}

/// A material: type tag plus named parameters in document order.
#[derive(Clone, Debug)]
pub struct Material {
    /// Identifier the material was registered under, if any
    pub id: Option<String>,

    /// Material type tag (e.g. "OBJMaterial", "Metal")
    pub kind: String,

    /// Parameters in the order they were set
    pub params: Vec<(String, MaterialParam)>,
}

impl Material {
    /// Create a material with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            params: Vec::new(),
        }
    }

    /// The material meshes receive when they name none.
    pub fn default_material() -> Self {
        let mut material = Self::new(DEFAULT_MATERIAL_KIND);
        material.set("Kd", MaterialParam::Float3(Vec3::splat(0.7)));
        material.set("Ks", MaterialParam::Float3(Vec3::splat(0.3)));
        material.set("Ns", MaterialParam::Float(99.0));
        material
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a parameter, replacing an earlier value of the same name.
    pub fn set(&mut self, name: impl Into<String>, value: MaterialParam) {
        let name = name.into();
        match self.params.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.params.push((name, value)),
        }
    }

    pub fn param(&self, name: &str) -> Option<&MaterialParam> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Check if this material uses any textures.
    pub fn has_textures(&self) -> bool {
        self.params
            .iter()
            .any(|(_, value)| matches!(value, MaterialParam::Texture(_)))
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::default_material()
    }
}

/// Normalize a material type code as written in a document: enclosing
/// quotes are stripped and the `OBJ` shorthand names the default kind.
pub fn normalize_kind(code: &str) -> String {
    let code = code.trim();
    let code = code
        .strip_prefix('"')
        .and_then(|c| c.strip_suffix('"'))
        .unwrap_or(code);

    if code == "OBJ" {
        DEFAULT_MATERIAL_KIND.to_string()
    } else {
        code.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_material() {
        let material = Material::default();
        assert_eq!(material.kind, "OBJMaterial");
        assert_eq!(material.param("Kd").and_then(MaterialParam::as_float3), Some(Vec3::splat(0.7)));
        assert_eq!(material.param("Ks").and_then(MaterialParam::as_float3), Some(Vec3::splat(0.3)));
        assert_eq!(material.param("Ns").and_then(MaterialParam::as_float), Some(99.0));
        assert!(!material.has_textures());
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut material = Material::new("Metal");
        material.set("eta", MaterialParam::Float(1.0));
        material.set("k", MaterialParam::Float(2.0));
        material.set("eta", MaterialParam::Float(1.5));

        let names: Vec<_> = material.params.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["eta", "k"]);
        assert_eq!(material.param("eta").and_then(MaterialParam::as_float), Some(1.5));
    }

    #[test]
    fn test_normalize_kind() {
        assert_eq!(normalize_kind("\"OBJ\""), "OBJMaterial");
        assert_eq!(normalize_kind("OBJ"), "OBJMaterial");
        assert_eq!(normalize_kind(" \"Metal\" "), "Metal");
        assert_eq!(normalize_kind("Glass"), "Glass");
    }
}
