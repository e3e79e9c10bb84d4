//! Scene graph types.
//!
//! A scene is a flat, ordered list of objects. Each object groups meshes
//! with the placements they appear under; a document `ref` to an earlier
//! object adds a placement to that same object rather than copying it.

use std::sync::Arc;

use mosaic_math::{Aabb, Affine3A, AffineExt};

use crate::mesh::TriangleMesh;

/// Index of an object within its scene.
pub type ObjectId = usize;

/// One or more meshes sharing a set of placements.
#[derive(Clone, Debug, Default)]
pub struct Object {
    /// Identifier from the document, if any
    pub id: Option<String>,

    /// Meshes in object space
    pub meshes: Vec<Arc<TriangleMesh>>,

    /// Static placements, one per `Transform` node (its first `AffineSpace`)
    pub transforms: Vec<Affine3A>,

    /// Animated placements, one transform sequence per `TransformAnimation`
    /// node
    pub animated_transforms: Vec<Vec<Affine3A>>,
}

impl Object {
    pub fn new(id: Option<String>, meshes: Vec<Arc<TriangleMesh>>) -> Self {
        Self {
            id,
            meshes,
            ..Default::default()
        }
    }

    /// True if any placement was recorded.
    pub fn has_transforms(&self) -> bool {
        !self.transforms.is_empty() || !self.animated_transforms.is_empty()
    }

    /// Union of the meshes' local bounds (first time step).
    pub fn bounds(&self) -> Aabb {
        self.meshes
            .iter()
            .fold(Aabb::EMPTY, |acc, mesh| Aabb::surrounding(&acc, &mesh.local_bounds()))
    }

    /// Bounds of the object under every recorded placement.
    ///
    /// An object without placements sits at the identity.
    pub fn placed_bounds(&self) -> Aabb {
        let local = self.bounds();
        if !self.has_transforms() {
            return local;
        }

        self.transforms
            .iter()
            .chain(self.animated_transforms.iter().flatten())
            .fold(Aabb::EMPTY, |acc, xfm| {
                Aabb::surrounding(&acc, &xfm.transform_aabb(&local))
            })
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangle_count()).sum()
    }
}

/// A loaded scene.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub objects: Vec<Object>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object and return its ID.
    pub fn add_object(&mut self, object: Object) -> ObjectId {
        let id = self.objects.len();
        self.objects.push(object);
        id
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Total number of meshes across all objects.
    pub fn mesh_count(&self) -> usize {
        self.objects.iter().map(|o| o.meshes.len()).sum()
    }

    /// World-space bounds of every object under every placement.
    pub fn world_bounds(&self) -> Aabb {
        self.objects
            .iter()
            .fold(Aabb::EMPTY, |acc, object| Aabb::surrounding(&acc, &object.placed_bounds()))
    }
}
