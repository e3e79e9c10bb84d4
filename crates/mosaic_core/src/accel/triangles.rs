//! Time-sampled triangle geometry.
//!
//! Accepts the buffer encodings a mesh may arrive in and normalizes them
//! into per-time-step views:
//!
//! | Buffer | Type                | Components per record |
//! |--------|---------------------|-----------------------|
//! | index  | `Int` / `UInt`      | 3 (packed scalars)    |
//! | index  | `Int3` / `UInt3`    | 3                     |
//! | index  | `Int4` / `UInt4`    | 4 (first 3 used)      |
//! | vertex | `Float`             | 4 (packed scalars)    |
//! | vertex | `Float3`            | 3                     |
//! | vertex | `Float3A`/`Float4`  | 4                     |
//! | normal | `Float3`            | 3                     |
//! | normal | `Float` / `Float3A` | 4                     |
//!
//! Time steps are stored back to back: step `t` of a buffer starts at
//! record `t * vertex_count`. Views are never copied.

use std::sync::Arc;

use mosaic_math::Aabb;

use super::{BuildError, BuildResult, GeomId, Geometry, Model};
use crate::data::{Data, DataType};
use crate::material::Material;

/// Input parameters of a triangle geometry.
#[derive(Clone, Debug, Default)]
pub struct TriangleParams {
    pub vertex: Option<Data>,
    pub index: Option<Data>,
    pub normal: Option<Data>,
    /// Per-vertex color (`Float4` or `Float3A`)
    pub color: Option<Data>,
    pub texcoord: Option<Data>,

    /// Position time steps stored in `vertex` (default 1)
    pub vertex_time_steps: Option<usize>,
    /// Normal time steps stored in `normal` (default 1)
    pub normal_time_steps: Option<usize>,

    /// Mesh material (the default material if unset)
    pub material: Option<Arc<Material>>,
    /// Single index into `material_list` for the whole mesh
    pub geom_material_id: Option<u32>,
    /// Per-triangle indices into `material_list` (`UInt` or `Int`)
    pub prim_material_id: Option<Data>,
    pub material_list: Vec<Arc<Material>>,
}

impl TriangleParams {
    pub fn new(vertex: Data, index: Data) -> Self {
        Self {
            vertex: Some(vertex),
            index: Some(index),
            ..Default::default()
        }
    }

    pub fn with_vertex_time_steps(mut self, steps: usize) -> Self {
        self.vertex_time_steps = Some(steps);
        self
    }

    pub fn with_normals(mut self, normal: Data, steps: usize) -> Self {
        self.normal = Some(normal);
        self.normal_time_steps = Some(steps);
        self
    }

    pub fn with_color(mut self, color: Data) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_texcoords(mut self, texcoord: Data) -> Self {
        self.texcoord = Some(texcoord);
        self
    }

    pub fn with_material(mut self, material: Arc<Material>) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_material_list(mut self, list: Vec<Arc<Material>>) -> Self {
        self.material_list = list;
        self
    }

    pub fn with_geom_material_id(mut self, id: u32) -> Self {
        self.geom_material_id = Some(id);
        self
    }

    pub fn with_prim_material_ids(mut self, ids: Data) -> Self {
        self.prim_material_id = Some(ids);
        self
    }
}

/// How materials are bound to a triangle geometry.
#[derive(Clone, Debug)]
pub enum MaterialBinding {
    /// One material for the whole mesh
    Single(Arc<Material>),
    /// One entry of a material list for the whole mesh
    Indexed {
        list: Vec<Arc<Material>>,
        id: u32,
    },
    /// One entry of a material list per triangle
    PerPrimitive {
        list: Vec<Arc<Material>>,
        ids: Vec<u32>,
    },
}

/// A committed triangle geometry record.
#[derive(Clone, Debug)]
pub struct TriangleGeometry {
    /// One vertex view per time step
    pub vertex_steps: Vec<Data>,
    pub vertex_components: usize,
    pub vertex_count: usize,

    pub index: Data,
    pub index_components: usize,
    pub triangle_count: usize,

    /// One normal view per normal time step (empty without normals)
    pub normal_steps: Vec<Data>,
    pub normal_components: usize,

    pub color: Option<Data>,
    /// True for `Float4` colors, false for `Float3A`
    pub color_has_alpha: bool,
    pub texcoord: Option<Data>,

    pub material: MaterialBinding,

    /// Some source buffer exceeds 32-bit byte addressing
    pub wide_addressing: bool,

    /// Local bounds over every time step
    pub bounds: Aabb,
}

impl TriangleGeometry {
    pub fn time_steps(&self) -> usize {
        self.vertex_steps.len()
    }
}

/// Items of `data` that make up one vertex/index/normal record.
fn items_per_record(ty: DataType) -> usize {
    match ty {
        // Packed scalars
        DataType::Int | DataType::UInt => 3,
        DataType::Float => 4,
        _ => 1,
    }
}

/// Split `data` into `steps` views of `per_step` records each.
fn step_views(data: &Data, steps: usize, per_step: usize) -> BuildResult<Vec<Data>> {
    let items = per_step * items_per_record(data.ty());
    (0..steps).map(|t| Ok(data.items(t * items, items)?)).collect()
}

fn record_count(data: &Data, buffer: &'static str) -> BuildResult<usize> {
    let per_record = items_per_record(data.ty());
    if data.len() % per_record != 0 {
        return Err(BuildError::StepCountMismatch {
            buffer,
            records: data.len() / per_record,
            steps: 1,
            expected: data.len().div_ceil(per_record),
        });
    }
    Ok(data.len() / per_record)
}

/// Validate a mesh and register it in `target`.
///
/// Fails fast on missing buffers, unsupported encodings, step counts that
/// do not divide the buffers, out-of-range vertex indices and material
/// bindings that do not match the triangle count.
pub fn build_triangles(params: &TriangleParams, target: &mut Model) -> BuildResult<GeomId> {
    let vertex = params.vertex.as_ref().ok_or(BuildError::MissingVertexData)?;
    let index = params.index.as_ref().ok_or(BuildError::MissingIndexData)?;

    let color_has_alpha = match params.color.as_ref().map(Data::ty) {
        None | Some(DataType::Float3A) => false,
        Some(DataType::Float4) => true,
        Some(other) => return Err(BuildError::InvalidColorFormat(other)),
    };

    let index_components = match index.ty() {
        DataType::Int | DataType::UInt | DataType::Int3 | DataType::UInt3 => 3,
        DataType::Int4 | DataType::UInt4 => 4,
        other => return Err(BuildError::UnsupportedIndexType(other)),
    };
    let vertex_components = match vertex.ty() {
        DataType::Float3 => 3,
        DataType::Float | DataType::Float3A | DataType::Float4 => 4,
        other => return Err(BuildError::UnsupportedVertexType(other)),
    };
    let normal_components = match params.normal.as_ref().map(Data::ty) {
        None => 0,
        Some(DataType::Float3) => 3,
        Some(DataType::Float | DataType::Float3A) => 4,
        Some(other) => return Err(BuildError::UnsupportedNormalType(other)),
    };

    let wide_addressing = [
        Some(index),
        Some(vertex),
        params.normal.as_ref(),
        params.color.as_ref(),
        params.texcoord.as_ref(),
    ]
    .into_iter()
    .flatten()
    .any(|data| data.num_bytes() > i32::MAX as usize);

    // Packed scalar indices: a trailing partial triangle is ignored.
    let triangle_count = index.len() / items_per_record(index.ty());
    if index.len() % items_per_record(index.ty()) != 0 {
        log::warn!(
            "Index buffer of {} items is not a multiple of 3; ignoring the remainder",
            index.len()
        );
    }

    let steps = params.vertex_time_steps.unwrap_or(1).max(1);
    let vertex_records = record_count(vertex, "vertex")?;
    if vertex_records % steps != 0 {
        return Err(BuildError::StepCountMismatch {
            buffer: "vertex",
            records: vertex_records,
            steps,
            expected: vertex_records.div_ceil(steps),
        });
    }
    let vertex_count = vertex_records / steps;
    let vertex_steps = step_views(vertex, steps, vertex_count)?;

    let normal_steps = match &params.normal {
        Some(normal) => {
            let normal_steps = params.normal_time_steps.unwrap_or(1).max(1);
            let records = record_count(normal, "normal")?;
            if records != normal_steps * vertex_count {
                return Err(BuildError::StepCountMismatch {
                    buffer: "normal",
                    records,
                    steps: normal_steps,
                    expected: vertex_count,
                });
            }
            step_views(normal, normal_steps, vertex_count)?
        }
        None => Vec::new(),
    };

    check_indices(index, index_components, triangle_count, vertex_count)?;
    let material = bind_material(params, triangle_count)?;

    let bounds = vertex_steps.iter().fold(Aabb::EMPTY, |acc, step| {
        step.iter_vec3(vertex_components)
            .fold(acc, |acc, p| acc.include_point(p))
    });

    log::debug!(
        "Created triangle mesh ({} tris, {} vertices, {} time steps), bounds {:?}..{:?}",
        triangle_count,
        vertex_count,
        steps,
        bounds.min(),
        bounds.max()
    );

    let geometry = TriangleGeometry {
        vertex_steps,
        vertex_components,
        vertex_count,
        index: index.clone(),
        index_components,
        triangle_count,
        normal_steps,
        normal_components,
        color: params.color.clone(),
        color_has_alpha,
        texcoord: params.texcoord.clone(),
        material,
        wide_addressing,
        bounds,
    };

    Ok(target.add_geometry(Geometry::Triangles(geometry)))
}

/// Every vertex index of every triangle must address a vertex of one step.
fn check_indices(
    index: &Data,
    components: usize,
    triangle_count: usize,
    vertex_count: usize,
) -> BuildResult<()> {
    let values: Vec<u32> = index.to_vec();
    for (triangle, record) in values.chunks_exact(components).take(triangle_count).enumerate() {
        if let Some(&bad) = record[..3].iter().find(|&&i| i as usize >= vertex_count) {
            return Err(BuildError::IndexOutOfRange {
                triangle,
                index: bad,
                vertex_count,
            });
        }
    }
    Ok(())
}

fn bind_material(params: &TriangleParams, triangle_count: usize) -> BuildResult<MaterialBinding> {
    let list = &params.material_list;

    if let Some(prim_ids) = &params.prim_material_id {
        if !matches!(prim_ids.ty(), DataType::UInt | DataType::Int) {
            return Err(BuildError::InvalidMaterialBinding(format!(
                "per-triangle material ids must be int or uint, found {}",
                prim_ids.ty()
            )));
        }
        if prim_ids.len() != triangle_count {
            return Err(BuildError::InvalidMaterialBinding(format!(
                "{} per-triangle material ids for {} triangles",
                prim_ids.len(),
                triangle_count
            )));
        }
        let ids: Vec<u32> = prim_ids.to_vec();
        if let Some(bad) = ids.iter().find(|&&id| id as usize >= list.len()) {
            return Err(BuildError::InvalidMaterialBinding(format!(
                "material id {} exceeds material list of {}",
                bad,
                list.len()
            )));
        }
        return Ok(MaterialBinding::PerPrimitive {
            list: list.clone(),
            ids,
        });
    }

    if let Some(id) = params.geom_material_id {
        if id as usize >= list.len() {
            return Err(BuildError::InvalidMaterialBinding(format!(
                "geometry material id {} exceeds material list of {}",
                id,
                list.len()
            )));
        }
        return Ok(MaterialBinding::Indexed {
            list: list.clone(),
            id,
        });
    }

    let material = params
        .material
        .clone()
        .unwrap_or_else(|| Arc::new(Material::default_material()));
    Ok(MaterialBinding::Single(material))
}
