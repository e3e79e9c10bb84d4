//! Mosaic Core - scene documents to time-sampled ray-tracing geometry.
//!
//! This crate provides:
//!
//! - **Scene loading**: XML scene documents with a companion binary
//!   attachment, resolved into `Scene` / `Object` / `TriangleMesh`
//! - **Resolution**: per-object flatten-or-instance decision with world bounds
//! - **Geometry building**: time-stepped triangle meshes and instances
//!   registered into a target `Model`
//!
//! # Example
//!
//! ```ignore
//! use mosaic_core::{finalize, load_scene, FinalizeOptions, Model};
//!
//! let loaded = load_scene("scene.xml")?;
//! let mut model = Model::new();
//! let resolution = finalize(&loaded.scene, &FinalizeOptions::default(), &mut model)?;
//! println!("{} geometries, bounds {:?}", resolution.geometries.len(), resolution.bounds);
//! ```

pub mod accel;
pub mod attachment;
pub mod data;
pub mod document;
pub mod material;
pub mod mesh;
pub mod resolve;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use accel::{build_instance, build_triangles, BuildError, GeomId, Geometry, Model, TriangleParams};
pub use attachment::{AttachmentError, BinaryAttachment};
pub use data::{Data, DataType};
pub use document::{load_scene, load_scene_from_str, LoadError, LoadedScene};
pub use material::{Material, MaterialParam};
pub use mesh::TriangleMesh;
pub use resolve::{finalize, FinalizeOptions, PositionStepLimit, Resolution, ResolveError, ResolvedGeometry};
pub use scene::{Object, ObjectId, Scene};
