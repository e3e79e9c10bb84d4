//! Flatten-or-instance resolution of a loaded scene.
//!
//! Objects without placements, or every object when flattening is
//! requested, are baked into world-space geometry. Everything else becomes
//! one shared model plus one instance per placement.

use std::sync::Arc;

use mosaic_math::{transform_normal, Aabb, Affine3A, AffineExt, Mat3, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accel::{build_instance, build_triangles, BuildError, GeomId, Model, TriangleParams};
use crate::data::Data;
use crate::mesh::TriangleMesh;
use crate::scene::{Object, ObjectId, Scene};

/// Errors that can occur while resolving a scene.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("object {0} has placements but no meshes")]
    UnsupportedGeometry(ObjectId),

    #[error(
        "mismatch in temporal resolution: geometry has {geometry_steps} time steps, transforms have {transform_steps}"
    )]
    TimeStepMismatch {
        geometry_steps: usize,
        transform_steps: usize,
    },

    #[error("geometry build failed: {0}")]
    Build(#[from] BuildError),
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Cap on the position time steps of animated meshes.
///
/// Meshes whose material id is listed in `exempt_materials` keep all of
/// their steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionStepLimit {
    pub max_steps: usize,

    #[serde(default)]
    pub exempt_materials: Vec<String>,
}

impl PositionStepLimit {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps,
            exempt_materials: Vec::new(),
        }
    }

    pub fn exempt(mut self, material_id: impl Into<String>) -> Self {
        self.exempt_materials.push(material_id.into());
        self
    }

    fn applies_to(&self, mesh: &TriangleMesh) -> bool {
        !mesh
            .material_id()
            .is_some_and(|id| self.exempt_materials.iter().any(|e| e == id))
    }

    /// Indices of the steps kept out of `steps`: evenly spaced, always
    /// including the first and last.
    pub fn select_steps(&self, steps: usize) -> Vec<usize> {
        let keep = self.max_steps.max(1);
        if steps <= keep {
            return (0..steps).collect();
        }
        if keep == 1 {
            return vec![0];
        }

        let last = steps - 1;
        let intervals = keep - 1;
        (0..keep)
            .map(|i| (i * last + intervals / 2) / intervals)
            .collect()
    }
}

/// Options controlling [`finalize`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizeOptions {
    /// Bake every placement into world-space geometry
    pub flatten: bool,

    /// Resample animated meshes to at most this many position steps
    pub position_step_limit: Option<PositionStepLimit>,
}

impl FinalizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    pub fn with_position_step_limit(mut self, limit: PositionStepLimit) -> Self {
        self.position_step_limit = Some(limit);
        self
    }
}

/// One object's contribution to the target model.
#[derive(Clone, Debug)]
pub enum ResolvedGeometry {
    /// A world-space mesh
    Flattened {
        object: ObjectId,
        geometry: GeomId,
        bounds: Aabb,
    },
    /// A shared model placed by one transform per time step
    Instanced {
        object: ObjectId,
        model: Arc<Model>,
        transforms: Vec<Affine3A>,
        geometry: GeomId,
        bounds: Aabb,
    },
}

impl ResolvedGeometry {
    pub fn object(&self) -> ObjectId {
        match self {
            ResolvedGeometry::Flattened { object, .. } | ResolvedGeometry::Instanced { object, .. } => {
                *object
            }
        }
    }

    pub fn geometry(&self) -> GeomId {
        match self {
            ResolvedGeometry::Flattened { geometry, .. }
            | ResolvedGeometry::Instanced { geometry, .. } => *geometry,
        }
    }

    pub fn bounds(&self) -> Aabb {
        match self {
            ResolvedGeometry::Flattened { bounds, .. } | ResolvedGeometry::Instanced { bounds, .. } => {
                *bounds
            }
        }
    }

    pub fn is_instance(&self) -> bool {
        matches!(self, ResolvedGeometry::Instanced { .. })
    }
}

/// Everything [`finalize`] registered, plus the world bounds.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    pub geometries: Vec<ResolvedGeometry>,
    pub bounds: Aabb,
}

impl Resolution {
    pub fn flattened_count(&self) -> usize {
        self.geometries.iter().filter(|g| !g.is_instance()).count()
    }

    pub fn instance_count(&self) -> usize {
        self.geometries.iter().filter(|g| g.is_instance()).count()
    }

    fn push(&mut self, geometry: ResolvedGeometry) {
        self.bounds = Aabb::surrounding(&self.bounds, &geometry.bounds());
        self.geometries.push(geometry);
    }
}

/// Register every object of `scene` in `target`.
///
/// Fails on the first object that cannot be resolved. On failure `target`
/// holds exactly the records it held before the call.
pub fn finalize(
    scene: &Scene,
    options: &FinalizeOptions,
    target: &mut Model,
) -> ResolveResult<Resolution> {
    let start = target.len();
    let result = resolve_objects(scene, options, target);
    if result.is_err() {
        target.truncate(start);
    }
    result
}

fn resolve_objects(
    scene: &Scene,
    options: &FinalizeOptions,
    target: &mut Model,
) -> ResolveResult<Resolution> {
    let resolver = Resolver { options };
    let mut resolution = Resolution::default();

    for (id, object) in scene.objects.iter().enumerate() {
        if object.meshes.is_empty() {
            if object.has_transforms() {
                return Err(ResolveError::UnsupportedGeometry(id));
            }
            log::warn!("Skipping object {} without meshes or placements", id);
            continue;
        }

        if options.flatten || !object.has_transforms() {
            resolver.flatten(id, object, target, &mut resolution)?;
        } else {
            resolver.instance(id, object, target, &mut resolution)?;
        }
    }

    log::info!(
        "Finalized {} objects: {} flattened geometries, {} instances",
        scene.object_count(),
        resolution.flattened_count(),
        resolution.instance_count()
    );

    Ok(resolution)
}

struct Resolver<'a> {
    options: &'a FinalizeOptions,
}

impl Resolver<'_> {
    fn flatten(
        &self,
        id: ObjectId,
        object: &Object,
        target: &mut Model,
        resolution: &mut Resolution,
    ) -> ResolveResult<()> {
        for mesh in &object.meshes {
            let mut baked: Vec<TriangleMesh> = object
                .transforms
                .iter()
                .map(|xfm| bake_static(mesh, xfm))
                .collect();
            for spaces in &object.animated_transforms {
                baked.push(bake_animated(mesh, spaces)?);
            }
            if !object.has_transforms() {
                baked.push(TriangleMesh::clone(mesh));
            }

            for world_mesh in &baked {
                let geometry = build_triangles(&self.mesh_params(world_mesh)?, target)?;
                let bounds = target
                    .geometry(geometry)
                    .map_or(Aabb::EMPTY, |g| g.bounds());
                resolution.push(ResolvedGeometry::Flattened {
                    object: id,
                    geometry,
                    bounds,
                });
            }
        }
        Ok(())
    }

    fn instance(
        &self,
        id: ObjectId,
        object: &Object,
        target: &mut Model,
        resolution: &mut Resolution,
    ) -> ResolveResult<()> {
        let mut shared = Model::new();
        for mesh in &object.meshes {
            build_triangles(&self.mesh_params(mesh)?, &mut shared)?;
        }
        shared.commit();
        let shared = Arc::new(shared);

        // Single-step instances for static placements, then one per sequence
        let placements = object
            .transforms
            .iter()
            .map(|xfm| vec![*xfm])
            .chain(object.animated_transforms.iter().cloned());

        for transforms in placements {
            let geometry = build_instance(Arc::clone(&shared), &transforms, target)?;
            let bounds = target
                .geometry(geometry)
                .map_or(Aabb::EMPTY, |g| g.bounds());
            resolution.push(ResolvedGeometry::Instanced {
                object: id,
                model: Arc::clone(&shared),
                transforms,
                geometry,
                bounds,
            });
        }
        Ok(())
    }

    /// Geometry parameters for a mesh, with position steps resampled when
    /// a step limit applies.
    fn mesh_params(&self, mesh: &TriangleMesh) -> ResolveResult<TriangleParams> {
        let mut params = TriangleParams {
            index: mesh.triangles.clone(),
            texcoord: mesh.texcoords.clone(),
            material: Some(Arc::clone(&mesh.material)),
            ..Default::default()
        };

        let positions: Vec<Data> = match &self.options.position_step_limit {
            Some(limit) if mesh.is_animated() && limit.applies_to(mesh) => limit
                .select_steps(mesh.position_steps())
                .into_iter()
                .map(|step| mesh.positions[step].clone())
                .collect(),
            _ => mesh.positions.clone(),
        };

        if !positions.is_empty() {
            params.vertex_time_steps = Some(positions.len());
            params.vertex = Some(Data::concat(&positions).map_err(BuildError::from)?);
        }
        if !mesh.normals.is_empty() {
            params.normal_time_steps = Some(mesh.normals.len());
            params.normal = Some(Data::concat(&mesh.normals).map_err(BuildError::from)?);
        }

        Ok(params)
    }
}

fn transform_points(data: &Data, xfm: &Affine3A) -> Data {
    let points: Vec<Vec3> = data.iter_vec3(3).map(|p| xfm.transform_point3(p)).collect();
    Data::from_vec3s(&points)
}

/// Map normals through `normal_matrix`; without one they are kept as is.
fn transform_normals(data: &Data, normal_matrix: Option<&Mat3>) -> Data {
    let Some(nm) = normal_matrix else {
        return data.clone();
    };
    let normals: Vec<Vec3> = data.iter_vec3(3).map(|n| transform_normal(nm, n)).collect();
    Data::from_vec3s(&normals)
}

fn normal_matrix(xfm: &Affine3A) -> Option<Mat3> {
    let nm = xfm.normal_matrix();
    if nm.is_none() {
        log::warn!("Singular transform; baked normals are left untransformed");
    }
    nm
}

/// Bake one transform into every time step of a mesh.
fn bake_static(mesh: &TriangleMesh, xfm: &Affine3A) -> TriangleMesh {
    let mut baked = mesh.clone();
    baked.positions = mesh.positions.iter().map(|p| transform_points(p, xfm)).collect();

    if !mesh.normals.is_empty() {
        let nm = normal_matrix(xfm);
        baked.normals = mesh
            .normals
            .iter()
            .map(|n| transform_normals(n, nm.as_ref()))
            .collect();
    }
    baked
}

/// Bake a transform sequence into a mesh, one transform per time step.
///
/// A static mesh is replicated across the sequence; an animated mesh must
/// have exactly one step per transform.
fn bake_animated(mesh: &TriangleMesh, spaces: &[Affine3A]) -> ResolveResult<TriangleMesh> {
    let steps = spaces.len();
    let mismatch = |geometry_steps: usize| ResolveError::TimeStepMismatch {
        geometry_steps,
        transform_steps: steps,
    };

    if steps == 0 || (mesh.position_steps() > 1 && mesh.position_steps() != steps) {
        return Err(mismatch(mesh.position_steps()));
    }
    if mesh.normal_steps() > 1 && mesh.normal_steps() != steps {
        return Err(mismatch(mesh.normal_steps()));
    }

    let mut baked = mesh.clone();
    baked.positions = Vec::with_capacity(steps);
    baked.normals = Vec::new();

    for (t, xfm) in spaces.iter().enumerate() {
        if let Some(p) = step_source(&mesh.positions, t) {
            baked.positions.push(transform_points(p, xfm));
        }
        if let Some(n) = step_source(&mesh.normals, t) {
            baked.normals.push(transform_normals(n, normal_matrix(xfm).as_ref()));
        }
    }
    Ok(baked)
}

/// Buffer of time step `t`, or the only buffer of a single-step attribute.
fn step_source(buffers: &[Data], t: usize) -> Option<&Data> {
    match buffers {
        [single] => Some(single),
        _ => buffers.get(t),
    }
}
