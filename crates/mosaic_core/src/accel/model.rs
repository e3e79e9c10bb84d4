//! The target model: registered geometry records and their committed bounds.

use std::sync::OnceLock;

use mosaic_math::Aabb;

use super::instance::InstanceGeometry;
use super::triangles::TriangleGeometry;

/// Opaque handle of a geometry record within one [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeomId(usize);

impl GeomId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A registered geometry record.
#[derive(Clone, Debug)]
pub enum Geometry {
    Triangles(TriangleGeometry),
    Instance(InstanceGeometry),
}

impl Geometry {
    pub fn bounds(&self) -> Aabb {
        match self {
            Geometry::Triangles(g) => g.bounds,
            Geometry::Instance(g) => g.bounds,
        }
    }

    pub fn as_triangles(&self) -> Option<&TriangleGeometry> {
        match self {
            Geometry::Triangles(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&InstanceGeometry> {
        match self {
            Geometry::Instance(g) => Some(g),
            _ => None,
        }
    }
}

/// Target scene receiving geometry records.
///
/// Committing computes the model bounds once; adding geometry afterwards
/// invalidates them. A model shared by several instances is committed
/// through a shared reference.
#[derive(Clone, Debug, Default)]
pub struct Model {
    geometries: Vec<Geometry>,
    bounds: OnceLock<Aabb>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a geometry record and return its handle.
    pub fn add_geometry(&mut self, geometry: Geometry) -> GeomId {
        let id = GeomId(self.geometries.len());
        self.geometries.push(geometry);
        self.bounds = OnceLock::new();
        id
    }

    pub fn geometry(&self, id: GeomId) -> Option<&Geometry> {
        self.geometries.get(id.0)
    }

    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Drop every record from index `len` on. Handles of dropped records
    /// become dangling.
    pub fn truncate(&mut self, len: usize) {
        if len < self.geometries.len() {
            self.geometries.truncate(len);
            self.bounds = OnceLock::new();
        }
    }

    pub fn is_committed(&self) -> bool {
        self.bounds.get().is_some()
    }

    /// Compute (once) and return the union of all record bounds.
    pub fn commit(&self) -> Aabb {
        *self.bounds.get_or_init(|| {
            self.geometries
                .iter()
                .fold(Aabb::EMPTY, |acc, g| Aabb::surrounding(&acc, &g.bounds()))
        })
    }

    /// Bounds of a committed model.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds.get().copied()
    }

    pub fn triangle_geometry_count(&self) -> usize {
        self.geometries
            .iter()
            .filter(|g| matches!(g, Geometry::Triangles(_)))
            .count()
    }

    pub fn instance_count(&self) -> usize {
        self.geometries
            .iter()
            .filter(|g| matches!(g, Geometry::Instance(_)))
            .count()
    }
}
