// Re-export glam for convenience
pub use glam::*;

// Mosaic math types
mod aabb;
mod affine;
mod interval;

pub use aabb::Aabb;
pub use affine::{transform_normal, AffineExt};
pub use interval::Interval;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_creation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.x, 1.0);
        assert_eq!(v.y, 2.0);
        assert_eq!(v.z, 3.0);
    }

    #[test]
    fn test_affine_reexport() {
        let a = Affine3A::from_translation(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(a.transform_point3(Vec3::ZERO), Vec3::X);
    }
}
