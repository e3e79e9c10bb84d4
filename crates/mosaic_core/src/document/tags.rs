//! Element kinds recognized by the scene loader.
//!
//! Tag names are matched once, when a node is visited, and the loader then
//! dispatches on these enums.

/// Children of the `<scene>` root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneTag {
    TriangleMesh,
    Group,
    Transform,
    TransformAnimation,
    Assign,
}

impl SceneTag {
    pub fn from_tag(name: &str) -> Option<Self> {
        match name {
            "TriangleMesh" => Some(Self::TriangleMesh),
            "Group" => Some(Self::Group),
            "Transform" => Some(Self::Transform),
            "TransformAnimation" => Some(Self::TransformAnimation),
            "assign" => Some(Self::Assign),
            _ => None,
        }
    }
}

/// Children of `<Transform>` and `<TransformAnimation>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformChild {
    AffineSpace,
    TriangleMesh,
    Group,
    Ref,
}

impl TransformChild {
    pub fn from_tag(name: &str) -> Option<Self> {
        match name {
            "AffineSpace" => Some(Self::AffineSpace),
            "TriangleMesh" => Some(Self::TriangleMesh),
            "Group" => Some(Self::Group),
            "ref" => Some(Self::Ref),
            _ => None,
        }
    }
}

/// Children of `<TriangleMesh>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshField {
    Triangles,
    Positions,
    Normals,
    Texcoords,
    AnimatedPositions,
    AnimatedNormals,
    Material,
}

impl MeshField {
    pub fn from_tag(name: &str) -> Option<Self> {
        match name {
            "triangles" => Some(Self::Triangles),
            "positions" => Some(Self::Positions),
            "normals" => Some(Self::Normals),
            "texcoords" => Some(Self::Texcoords),
            "animated_positions" => Some(Self::AnimatedPositions),
            "animated_normals" => Some(Self::AnimatedNormals),
            "material" => Some(Self::Material),
            _ => None,
        }
    }
}

/// Typed entries of a material `<parameters>` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Float,
    Float3,
    /// Image path in the element content
    Texture2d,
    /// Image path in the `src` attribute
    Texture3d,
}

impl ParamKind {
    pub fn from_tag(name: &str) -> Option<Self> {
        match name {
            "float" => Some(Self::Float),
            "float3" => Some(Self::Float3),
            "texture2d" => Some(Self::Texture2d),
            "texture3d" => Some(Self::Texture3d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_tags() {
        assert_eq!(SceneTag::from_tag("TriangleMesh"), Some(SceneTag::TriangleMesh));
        assert_eq!(SceneTag::from_tag("assign"), Some(SceneTag::Assign));
        assert_eq!(SceneTag::from_tag("Assign"), None);
        assert_eq!(SceneTag::from_tag("PerspectiveCamera"), None);
    }

    #[test]
    fn test_transform_children() {
        assert_eq!(TransformChild::from_tag("ref"), Some(TransformChild::Ref));
        assert_eq!(TransformChild::from_tag("AffineSpace"), Some(TransformChild::AffineSpace));
        assert_eq!(TransformChild::from_tag("positions"), None);
    }

    #[test]
    fn test_mesh_fields_and_params() {
        assert_eq!(MeshField::from_tag("animated_normals"), Some(MeshField::AnimatedNormals));
        assert_eq!(MeshField::from_tag("colors"), None);
        assert_eq!(ParamKind::from_tag("texture3d"), Some(ParamKind::Texture3d));
        assert_eq!(ParamKind::from_tag("int"), None);
    }
}
