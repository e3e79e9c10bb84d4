//! Instances of a shared model under per-time-step transforms.

use std::sync::Arc;

use mosaic_math::{Aabb, Affine3A, AffineExt};

use super::{BuildError, BuildResult, GeomId, Geometry, Model};

/// A committed instance record.
#[derive(Clone, Debug)]
pub struct InstanceGeometry {
    /// The instanced model, committed
    pub model: Arc<Model>,

    /// Column-major 3x4 transform for each time step
    pub transforms: Vec<[f32; 12]>,

    /// Inverse of the first time step's transform, `None` when that
    /// transform is singular
    pub inverse: Option<Affine3A>,

    /// World bounds over every time step
    pub bounds: Aabb,
}

impl InstanceGeometry {
    pub fn time_steps(&self) -> usize {
        self.transforms.len()
    }

    /// Transform of one time step.
    pub fn transform(&self, step: usize) -> Option<Affine3A> {
        self.transforms.get(step).map(Affine3A::from_cols_array)
    }
}

/// Register an instance of `shared` in `parent`, one transform per time step.
///
/// The shared model is committed first if needed. Only the first time
/// step's transform is inverted; a singular first step (an object scaled
/// to nothing at that time) is accepted without an inverse.
pub fn build_instance(
    shared: Arc<Model>,
    transforms: &[Affine3A],
    parent: &mut Model,
) -> BuildResult<GeomId> {
    let first = transforms.first().ok_or(BuildError::EmptyTransformList)?;

    let det = first.matrix3.determinant();
    let inverse = if det != 0.0 && det.is_finite() {
        Some(first.inverse())
    } else {
        log::warn!("First instance transform is singular; the instance has no inverse");
        None
    };

    let local = shared.commit();
    if local.is_empty() {
        log::warn!(
            "Creating an instance of a model without valid bounds; ray offsets may be wrong"
        );
    }

    let bounds = transforms.iter().fold(Aabb::EMPTY, |acc, xfm| {
        Aabb::surrounding(&acc, &xfm.transform_aabb(&local))
    });

    log::debug!(
        "Created instance ({} geometries, {} time steps)",
        shared.len(),
        transforms.len()
    );

    let geometry = InstanceGeometry {
        model: shared,
        transforms: transforms.iter().map(Affine3A::to_cols_array).collect(),
        inverse,
        bounds,
    };

    Ok(parent.add_geometry(Geometry::Instance(geometry)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::{build_triangles, TriangleParams};
    use crate::data::{Data, DataType};
    use mosaic_math::Vec3;

    fn unit_cube_model() -> Model {
        let mut model = Model::new();
        let params = TriangleParams::new(
            Data::from_vec3s(&[Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 1.0)]),
            Data::from_pod(DataType::Int3, &[[0i32, 1, 2]]),
        );
        build_triangles(&params, &mut model).unwrap();
        model
    }

    fn instance(parent: &Model, id: GeomId) -> &InstanceGeometry {
        parent.geometry(id).and_then(Geometry::as_instance).unwrap()
    }

    #[test]
    fn test_commits_shared_model() {
        let shared = Arc::new(unit_cube_model());
        assert!(!shared.is_committed());

        let mut parent = Model::new();
        build_instance(Arc::clone(&shared), &[Affine3A::IDENTITY], &mut parent).unwrap();

        assert!(shared.is_committed());
        assert_eq!(parent.instance_count(), 1);
    }

    #[test]
    fn test_bounds_cover_every_time_step() {
        let shared = Arc::new(unit_cube_model());
        let transforms = [
            Affine3A::from_translation(Vec3::new(0.0, 0.0, 0.0)),
            Affine3A::from_translation(Vec3::new(3.0, 0.0, 0.0)),
            Affine3A::from_translation(Vec3::new(6.0, -2.0, 0.0)),
        ];

        let mut parent = Model::new();
        let id = build_instance(shared, &transforms, &mut parent).unwrap();
        let inst = instance(&parent, id);

        assert_eq!(inst.time_steps(), 3);
        assert_eq!(inst.bounds.min(), Vec3::new(0.0, -2.0, 0.0));
        assert_eq!(inst.bounds.max(), Vec3::new(7.0, 1.0, 1.0));
    }

    #[test]
    fn test_transforms_stored_column_major() {
        let xfm = Affine3A::from_scale_rotation_translation(
            Vec3::new(1.0, 2.0, 3.0),
            mosaic_math::Quat::from_rotation_y(0.5),
            Vec3::new(4.0, 5.0, 6.0),
        );

        let mut parent = Model::new();
        let id = build_instance(Arc::new(unit_cube_model()), &[xfm], &mut parent).unwrap();
        let inst = instance(&parent, id);

        assert_eq!(&inst.transforms[0][9..12], &[4.0, 5.0, 6.0]);
        assert_eq!(inst.transform(0), Some(xfm));
        assert_eq!(inst.transform(1), None);
    }

    #[test]
    fn test_only_first_step_is_inverted() {
        // Known limitation: later time steps have no inverse of their own.
        let transforms = [
            Affine3A::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0)),
        ];

        let mut parent = Model::new();
        let id = build_instance(Arc::new(unit_cube_model()), &transforms, &mut parent).unwrap();
        let inst = instance(&parent, id);

        let back = inst.inverse.unwrap().transform_point3(Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(back, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_empty_transform_list() {
        let mut parent = Model::new();
        assert!(matches!(
            build_instance(Arc::new(unit_cube_model()), &[], &mut parent),
            Err(BuildError::EmptyTransformList)
        ));
        assert!(parent.is_empty());
    }

    #[test]
    fn test_zero_scale_first_step() {
        // Object that appears after the first time step
        let transforms = [
            Affine3A::from_cols_array(&[0.0; 12]),
            Affine3A::from_translation(Vec3::new(2.0, 0.0, 0.0)),
        ];

        let mut parent = Model::new();
        let id = build_instance(Arc::new(unit_cube_model()), &transforms, &mut parent).unwrap();
        let inst = instance(&parent, id);

        assert_eq!(inst.time_steps(), 2);
        assert_eq!(inst.inverse, None);
        assert_eq!(inst.bounds.min(), Vec3::ZERO);
        assert_eq!(inst.bounds.max(), Vec3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn test_empty_shared_model() {
        let mut parent = Model::new();
        let id = build_instance(Arc::new(Model::new()), &[Affine3A::IDENTITY], &mut parent).unwrap();
        assert!(instance(&parent, id).bounds.is_empty());
    }
}
