// Affine transform utilities
//
// Extends glam::Affine3A with the operations needed to place geometry:
// row-major 3x4 construction, normal mapping, and box transformation.
// Note: glam already provides transform_point3(), transform_vector3(),
// inverse() and to_cols_array() (column-major 3x4).

use glam::{Affine3A, Mat3, Vec3, Vec3A};

use crate::Aabb;

/// Extension trait for Affine3A.
pub trait AffineExt: Sized {
    /// Build from 12 numbers laid out row by row: each row holds the three
    /// linear entries followed by the translation entry.
    fn from_rows(rows: &[f32; 12]) -> Self;

    /// Inverse-transpose of the linear part, or `None` if it is singular.
    fn normal_matrix(&self) -> Option<Mat3>;

    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl AffineExt for Affine3A {
    fn from_rows(r: &[f32; 12]) -> Self {
        Affine3A::from_cols(
            Vec3A::new(r[0], r[4], r[8]),
            Vec3A::new(r[1], r[5], r[9]),
            Vec3A::new(r[2], r[6], r[10]),
            Vec3A::new(r[3], r[7], r[11]),
        )
    }

    fn normal_matrix(&self) -> Option<Mat3> {
        let linear = Mat3::from(self.matrix3);
        let det = linear.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(linear.inverse().transpose())
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }
        Aabb::from_iter_points(
            aabb.corners()
                .into_iter()
                .map(|corner| self.transform_point3(corner)),
        )
    }
}

/// Apply a normal matrix to a normal (not renormalized).
pub fn transform_normal(normal_matrix: &Mat3, n: Vec3) -> Vec3 {
    normal_matrix.mul_vec3(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_layout() {
        #[rustfmt::skip]
        let rows = [
            1.0, 0.0, 0.0, 10.0,
            0.0, 2.0, 0.0, 20.0,
            0.0, 0.0, 3.0, 30.0,
        ];
        let xfm = Affine3A::from_rows(&rows);

        assert_eq!(xfm.transform_point3(Vec3::ONE), Vec3::new(11.0, 22.0, 33.0));
        assert_eq!(xfm.transform_vector3(Vec3::ONE), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_from_rows_off_diagonal() {
        // Row 0 maps y into x: x' = y
        #[rustfmt::skip]
        let rows = [
            0.0, 1.0, 0.0, 0.0,
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
        ];
        let xfm = Affine3A::from_rows(&rows);
        assert_eq!(xfm.transform_point3(Vec3::new(1.0, 2.0, 3.0)), Vec3::new(2.0, 1.0, 3.0));
    }

    #[test]
    fn test_cols_array_is_column_major() {
        let xfm = Affine3A::from_translation(Vec3::new(4.0, 5.0, 6.0));
        let cols = xfm.to_cols_array();
        assert_eq!(&cols[9..12], &[4.0, 5.0, 6.0]);
        assert_eq!(&cols[0..3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normal_matrix_non_uniform_scale() {
        let xfm = Affine3A::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let nm = xfm.normal_matrix().unwrap();

        // A plane x = y has normal (1, -1, 0); after scaling x by 2 it
        // becomes x = 2y with normal direction (1, -2, 0).
        let n = transform_normal(&nm, Vec3::new(1.0, -1.0, 0.0));
        let expected = Vec3::new(1.0, -2.0, 0.0).normalize();
        assert!((n.normalize() - expected).length() < 1e-5);
    }

    #[test]
    fn test_normal_matrix_singular() {
        let xfm = Affine3A::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(xfm.normal_matrix().is_none());
    }

    #[test]
    fn test_transform_aabb_translation() {
        let mat = Affine3A::from_translation(Vec3::new(5.0, 5.0, 5.0));
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let transformed = mat.transform_aabb(&aabb);

        assert!((transformed.min() - Vec3::new(5.0, 5.0, 5.0)).length() < 0.001);
        assert!((transformed.max() - Vec3::new(6.0, 6.0, 6.0)).length() < 0.001);
    }

    #[test]
    fn test_transform_aabb_rotation_grows() {
        let mat = Affine3A::from_rotation_z(std::f32::consts::FRAC_PI_4);
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let transformed = mat.transform_aabb(&aabb);

        assert!(transformed.x.size() > 1.0);
        assert!(transformed.y.size() > 1.0);
    }

    #[test]
    fn test_transform_empty_aabb() {
        let mat = Affine3A::from_translation(Vec3::ONE);
        assert!(mat.transform_aabb(&Aabb::EMPTY).is_empty());
    }
}
