//! Geometry submission into a target [`Model`].
//!
//! The builders here validate mesh buffers and instance transforms, compute
//! bounds, and register records in a model the way a ray-tracing engine
//! receives them: shared buffer views, one per time step, plus an opaque
//! handle for each registered geometry.

mod instance;
mod model;
mod triangles;

use thiserror::Error;

use crate::data::{DataError, DataType};

pub use instance::{build_instance, InstanceGeometry};
pub use model::{GeomId, Geometry, Model};
pub use triangles::{build_triangles, MaterialBinding, TriangleGeometry, TriangleParams};

/// Errors raised while building geometry records.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("triangle mesh must have a vertex array")]
    MissingVertexData,

    #[error("triangle mesh must have an index array")]
    MissingIndexData,

    #[error("vertex color must have data type vec4f or vec3fa, found {0}")]
    InvalidColorFormat(DataType),

    #[error("unsupported index data type {0}")]
    UnsupportedIndexType(DataType),

    #[error("unsupported vertex data type {0}")]
    UnsupportedVertexType(DataType),

    #[error("unsupported normal data type {0}")]
    UnsupportedNormalType(DataType),

    #[error("{buffer} buffer of {records} records does not split into {steps} time steps of {expected} records")]
    StepCountMismatch {
        buffer: &'static str,
        records: usize,
        steps: usize,
        expected: usize,
    },

    #[error("triangle {triangle} references vertex {index}, mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("invalid material binding: {0}")]
    InvalidMaterialBinding(String),

    #[error("instance needs at least one transform")]
    EmptyTransformList,

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Result type for geometry building.
pub type BuildResult<T> = Result<T, BuildError>;
