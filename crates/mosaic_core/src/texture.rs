//! Texture loading for material parameters.
//!
//! Textures referenced by `texture2d` / `texture3d` material parameters are
//! decoded once per load session and shared between every material that
//! names the same file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error reading texture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image decoding error in {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A decoded texture.
///
/// Stores pixels in linear RGBA float format.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Pixel data, [R, G, B, A] per pixel, row-major order
    pub pixels: Vec<[f32; 4]>,

    /// Source file path
    pub path: PathBuf,
}

impl Texture {
    /// Create a new texture from pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<[f32; 4]>, path: impl Into<PathBuf>) -> Self {
        Self {
            width,
            height,
            pixels,
            path: path.into(),
        }
    }

    /// Decode an image file into a linear float texture.
    pub fn load(path: &Path) -> TextureResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| TextureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let img = image::load_from_memory(&bytes).map_err(|source| TextureError::Image {
            path: path.to_path_buf(),
            source,
        })?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixels: Vec<[f32; 4]> = rgba
            .pixels()
            .map(|p| {
                [
                    srgb_to_linear(p[0]),
                    srgb_to_linear(p[1]),
                    srgb_to_linear(p[2]),
                    p[3] as f32 / 255.0, // Alpha is linear
                ]
            })
            .collect();

        Ok(Self::new(width, height, pixels, path))
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<[f32; 4]>()
    }
}

/// Textures decoded during one load session, keyed by resolved path.
pub struct TextureCache {
    textures: HashMap<PathBuf, Arc<Texture>>,

    /// Base directory for resolving relative paths
    base_dir: PathBuf,
}

impl TextureCache {
    /// Create a cache that resolves relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: base_dir.into(),
        }
    }

    /// Load a texture from file, using the cache if available.
    pub fn load(&mut self, path: &str) -> TextureResult<Arc<Texture>> {
        let full_path = self.resolve_path(path);

        if let Some(texture) = self.textures.get(&full_path) {
            return Ok(Arc::clone(texture));
        }

        let texture = Arc::new(Texture::load(&full_path)?);
        self.textures.insert(full_path, Arc::clone(&texture));

        log::debug!(
            "Loaded texture: {} ({}x{}, {:.1} KB)",
            path,
            texture.width,
            texture.height,
            texture.size_bytes() as f32 / 1024.0
        );

        Ok(texture)
    }

    /// Get the number of cached textures.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Resolve a path relative to the base directory.
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_to_linear() {
        // Black stays black
        assert!((srgb_to_linear(0) - 0.0).abs() < 0.001);

        // White stays white
        assert!((srgb_to_linear(255) - 1.0).abs() < 0.001);

        // Mid-gray is darker in linear
        let mid = srgb_to_linear(128);
        assert!(mid < 0.5);
        assert!(mid > 0.1);
    }

    #[test]
    fn test_missing_texture_is_io_error() {
        let mut cache = TextureCache::with_base_dir("/nonexistent/mosaic");
        let err = cache.load("wood.png").unwrap_err();
        match err {
            TextureError::Io { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/mosaic/wood.png"))
            }
            other => panic!("Expected Io error, got {other:?}"),
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_shares_decoded_texture() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbaImage::from_pixel(2, 1, image::Rgba([255, 0, 0, 255]));
        img.save(dir.path().join("red.png")).unwrap();

        let mut cache = TextureCache::with_base_dir(dir.path());
        let a = cache.load("red.png").unwrap();
        let b = cache.load("red.png").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert_eq!((a.width, a.height), (2, 1));
        assert!((a.pixels[0][0] - 1.0).abs() < 0.001);
        assert!((a.pixels[0][1] - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_undecodable_texture() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.png"), b"not an image").unwrap();

        let mut cache = TextureCache::with_base_dir(dir.path());
        assert!(matches!(
            cache.load("bad.png").unwrap_err(),
            TextureError::Image { .. }
        ));
    }
}
