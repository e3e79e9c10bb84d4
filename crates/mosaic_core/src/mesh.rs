//! Time-sampled triangle meshes as read from a scene document.
//!
//! Buffers are [`Data`] views into the binary attachment. A mesh carries one
//! position buffer per time step; the first entry doubles as the "current"
//! positions, so a static mesh is simply a mesh with one step.

use std::sync::Arc;

use mosaic_math::{Aabb, Vec3};

use crate::data::Data;
use crate::material::Material;

/// A triangle mesh with optional motion samples.
#[derive(Clone, Debug)]
pub struct TriangleMesh {
    /// Triangle indices (`Int3`)
    pub triangles: Option<Data>,

    /// Vertex positions (`Float3`), one buffer per time step
    pub positions: Vec<Data>,

    /// Vertex normals (`Float3`), one buffer per time step (may be empty)
    pub normals: Vec<Data>,

    /// Texture coordinates (`Float2`)
    pub texcoords: Option<Data>,

    /// Bound material (the default material if the document named none)
    pub material: Arc<Material>,
}

impl TriangleMesh {
    /// Create an empty mesh bound to `material`.
    pub fn new(material: Arc<Material>) -> Self {
        Self {
            triangles: None,
            positions: Vec::new(),
            normals: Vec::new(),
            texcoords: None,
            material,
        }
    }

    /// Number of position time steps.
    pub fn position_steps(&self) -> usize {
        self.positions.len()
    }

    /// Number of normal time steps.
    pub fn normal_steps(&self) -> usize {
        self.normals.len()
    }

    /// True if positions carry more than one time step.
    pub fn is_animated(&self) -> bool {
        self.positions.len() > 1
    }

    /// Vertex count of the first time step.
    pub fn vertex_count(&self) -> usize {
        self.positions.first().map_or(0, Data::len)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.as_ref().map_or(0, Data::len)
    }

    /// Positions of one time step.
    pub fn step_positions(&self, step: usize) -> Vec<Vec3> {
        self.positions
            .get(step)
            .map(|data| data.iter_vec3(3).collect())
            .unwrap_or_default()
    }

    /// Normals of one time step.
    pub fn step_normals(&self, step: usize) -> Vec<Vec3> {
        self.normals
            .get(step)
            .map(|data| data.iter_vec3(3).collect())
            .unwrap_or_default()
    }

    /// Bounds of the first time step.
    pub fn local_bounds(&self) -> Aabb {
        self.positions
            .first()
            .map_or(Aabb::EMPTY, |data| Aabb::from_iter_points(data.iter_vec3(3)))
    }

    /// Bounds over every time step.
    pub fn motion_bounds(&self) -> Aabb {
        Aabb::from_iter_points(self.positions.iter().flat_map(|data| data.iter_vec3(3)))
    }

    /// Material identifier, if the bound material was registered under one.
    pub fn material_id(&self) -> Option<&str> {
        self.material.id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_with_steps(steps: &[[Vec3; 3]]) -> TriangleMesh {
        let mut mesh = TriangleMesh::new(Arc::new(Material::default()));
        mesh.triangles = Some(Data::from_pod(crate::data::DataType::Int3, &[[0i32, 1, 2]]));
        mesh.positions = steps.iter().map(|s| Data::from_vec3s(s)).collect();
        mesh
    }

    #[test]
    fn test_static_mesh() {
        let mesh = mesh_with_steps(&[[Vec3::ZERO, Vec3::X, Vec3::Y]]);

        assert!(!mesh.is_animated());
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.local_bounds(), Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0)));
        assert_eq!(mesh.step_positions(0), vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        assert!(mesh.step_positions(1).is_empty());
    }

    #[test]
    fn test_local_bounds_use_first_step() {
        let moved = Vec3::new(0.0, 0.0, 10.0);
        let mesh = mesh_with_steps(&[
            [Vec3::ZERO, Vec3::X, Vec3::Y],
            [moved, Vec3::X + moved, Vec3::Y + moved],
        ]);

        assert!(mesh.is_animated());
        assert_eq!(mesh.local_bounds().z.max, 0.0);
        assert_eq!(mesh.motion_bounds().z.max, 10.0);
    }

    #[test]
    fn test_empty_mesh_bounds() {
        let mesh = TriangleMesh::new(Arc::new(Material::default()));
        assert!(mesh.local_bounds().is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.material_id(), None);
    }
}
