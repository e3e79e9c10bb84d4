//! Scene document support.
//!
//! Scene documents are XML trees with one `<scene>` root whose mesh nodes
//! point into a companion binary attachment by byte offset and item count.

pub mod loader;
pub mod tags;
pub mod xml;

pub use loader::{load_scene, load_scene_from_str, LoadError, LoadResult, LoadedScene};
pub use xml::{parse_xml, XmlError, XmlNode};
