//! Scene document loading.
//!
//! Walks the `<scene>` tree once, in document order, and builds a [`Scene`].
//! Named objects and materials live in lookup tables owned by the load
//! session, so `ref` and material lookups only see ids defined earlier in
//! the document.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mosaic_math::{Aabb, Affine3A, AffineExt, Vec3};
use thiserror::Error;

use crate::attachment::{AttachmentError, BinaryAttachment};
use crate::data::{Data, DataType};
use crate::document::tags::{MeshField, ParamKind, SceneTag, TransformChild};
use crate::document::xml::{parse_xml, XmlError, XmlNode};
use crate::material::{normalize_kind, Material, MaterialParam, DEFAULT_MATERIAL_KIND};
use crate::mesh::TriangleMesh;
use crate::scene::{Object, ObjectId, Scene};
use crate::texture::{TextureCache, TextureError};

/// Errors that can occur during scene loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document error: {0}")]
    Xml(#[from] XmlError),

    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    #[error("Invalid scene file: {0}")]
    SceneFormat(String),

    #[error("Unsupported node <{tag}> inside <{parent}> at line {line}")]
    UnsupportedNode {
        line: usize,
        tag: String,
        parent: String,
    },

    #[error("Unresolved reference to '{id}' at line {line}")]
    UnresolvedReference { line: usize, id: String },

    #[error("Unresolved material '{id}' at line {line}")]
    UnresolvedMaterial { line: usize, id: String },

    #[error("Invalid transform at line {line}: {reason}")]
    TransformParse { line: usize, reason: String },

    #[error("No AffineSpace in transform at line {line}")]
    EmptyTransform { line: usize },

    #[error("Unsupported geometry in transform at line {line}")]
    UnsupportedGeometry { line: usize },

    #[error("Invalid material parameter '{name}' at line {line}: {reason}")]
    InvalidMaterialParameter {
        line: usize,
        name: String,
        reason: String,
    },

    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// A loaded scene and its world-space bounds.
#[derive(Clone, Debug)]
pub struct LoadedScene {
    pub scene: Scene,

    /// Union of every object's bounds under every placement
    pub bounds: Aabb,
}

/// Load a scene document and its binary attachment.
///
/// The attachment is looked up as `<path>.bin`, then as the document path
/// with its extension replaced by `.bin`. Textures are resolved relative to
/// the document's directory.
///
/// # Example
///
/// ```ignore
/// use mosaic_core::document::load_scene;
///
/// let loaded = load_scene("scene.xml")?;
/// println!("Loaded {} objects", loaded.scene.object_count());
/// ```
pub fn load_scene<P: AsRef<Path>>(path: P) -> LoadResult<LoadedScene> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    let roots = parse_xml(&content)?;
    let root = scene_root(&roots)?;

    let attachment = BinaryAttachment::open(path)?;
    let base_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    log::info!("Loading scene {}", path.display());
    SceneLoader::new(attachment, base_dir).load(root)
}

/// Load a scene document held in memory (useful for testing).
pub fn load_scene_from_str(
    content: &str,
    base_dir: impl Into<PathBuf>,
    attachment: BinaryAttachment,
) -> LoadResult<LoadedScene> {
    let roots = parse_xml(content)?;
    let root = scene_root(&roots)?;
    SceneLoader::new(attachment, base_dir.into()).load(root)
}

fn scene_root(roots: &[XmlNode]) -> LoadResult<&XmlNode> {
    match roots {
        [root] if root.name == "scene" => Ok(root),
        [root] => Err(LoadError::SceneFormat(format!(
            "root element is <{}>, expected <scene>",
            root.name
        ))),
        _ => Err(LoadError::SceneFormat(format!(
            "expected exactly one root element, found {}",
            roots.len()
        ))),
    }
}

/// One load session: the attachment plus the id lookup tables.
struct SceneLoader {
    attachment: BinaryAttachment,
    textures: TextureCache,
    default_material: Arc<Material>,
    materials: HashMap<String, Arc<Material>>,
    objects: HashMap<String, ObjectId>,
    scene: Scene,
}

impl SceneLoader {
    fn new(attachment: BinaryAttachment, base_dir: PathBuf) -> Self {
        Self {
            attachment,
            textures: TextureCache::with_base_dir(base_dir),
            default_material: Arc::new(Material::default_material()),
            materials: HashMap::new(),
            objects: HashMap::new(),
            scene: Scene::new(),
        }
    }

    fn load(mut self, root: &XmlNode) -> LoadResult<LoadedScene> {
        for child in &root.children {
            match SceneTag::from_tag(&child.name) {
                Some(SceneTag::TriangleMesh) => {
                    let mesh = self.parse_triangle_mesh(child)?;
                    self.scene
                        .add_object(Object::new(None, vec![Arc::new(mesh)]));
                }
                Some(SceneTag::Group) => {
                    let meshes = self.parse_group(child)?;
                    self.scene.add_object(Object::new(None, meshes));
                }
                Some(SceneTag::Transform) => self.parse_transform(child, false)?,
                Some(SceneTag::TransformAnimation) => self.parse_transform(child, true)?,
                Some(SceneTag::Assign) => self.parse_assign(child)?,
                None => {
                    log::warn!("Skipping unsupported <{}> at line {}", child.name, child.line);
                }
            }
        }

        let bounds = self.scene.world_bounds();
        log::info!(
            "Loaded {} objects ({} meshes, {} named materials, {} textures)",
            self.scene.object_count(),
            self.scene.mesh_count(),
            self.materials.len(),
            self.textures.len()
        );

        Ok(LoadedScene {
            scene: self.scene,
            bounds,
        })
    }

    /// Add an object to the scene, making it referable if it carries an id.
    fn register_object(&mut self, id: Option<&str>, meshes: Vec<Arc<TriangleMesh>>) -> ObjectId {
        let object_id = self
            .scene
            .add_object(Object::new(id.map(str::to_string), meshes));

        if let Some(id) = id {
            if self.objects.insert(id.to_string(), object_id).is_some() {
                log::warn!("Object id '{}' redefined; later refs use the new definition", id);
            }
        }
        object_id
    }

    fn parse_transform(&mut self, node: &XmlNode, animated: bool) -> LoadResult<()> {
        let mut transforms = Vec::new();
        let mut target: Option<ObjectId> = None;

        for child in &node.children {
            let object_id = match TransformChild::from_tag(&child.name) {
                Some(TransformChild::AffineSpace) => {
                    transforms.push(parse_affine_space(child)?);
                    continue;
                }
                Some(TransformChild::TriangleMesh) => {
                    let mesh = self.parse_triangle_mesh(child)?;
                    self.register_object(child.attr("id"), vec![Arc::new(mesh)])
                }
                Some(TransformChild::Group) => {
                    let meshes = self.parse_group(child)?;
                    self.register_object(child.attr("id"), meshes)
                }
                Some(TransformChild::Ref) => {
                    let id = child.attr("id").unwrap_or_default();
                    *self
                        .objects
                        .get(id)
                        .ok_or_else(|| LoadError::UnresolvedReference {
                            line: child.line,
                            id: id.to_string(),
                        })?
                }
                None => return Err(unsupported_node(child, node)),
            };

            if target.replace(object_id).is_some() {
                return Err(LoadError::SceneFormat(format!(
                    "<{}> at line {} has more than one geometry child",
                    node.name, node.line
                )));
            }
        }

        let object_id = target.ok_or(LoadError::UnsupportedGeometry { line: node.line })?;
        let first = *transforms
            .first()
            .ok_or(LoadError::EmptyTransform { line: node.line })?;

        let object = self
            .scene
            .object_mut(object_id)
            .ok_or_else(|| LoadError::SceneFormat(format!("dangling object {object_id}")))?;
        if animated {
            object.animated_transforms.push(transforms);
        } else {
            object.transforms.push(first);
        }
        Ok(())
    }

    fn parse_group(&mut self, node: &XmlNode) -> LoadResult<Vec<Arc<TriangleMesh>>> {
        node.children
            .iter()
            .map(|child| match SceneTag::from_tag(&child.name) {
                Some(SceneTag::TriangleMesh) => Ok(Arc::new(self.parse_triangle_mesh(child)?)),
                _ => Err(unsupported_node(child, node)),
            })
            .collect()
    }

    fn parse_triangle_mesh(&mut self, node: &XmlNode) -> LoadResult<TriangleMesh> {
        let mut mesh = TriangleMesh::new(Arc::clone(&self.default_material));
        let mut positions = None;
        let mut normals = None;
        let mut animated_positions = Vec::new();
        let mut animated_normals = Vec::new();

        for child in &node.children {
            match MeshField::from_tag(&child.name) {
                Some(MeshField::Triangles) => {
                    mesh.triangles = Some(self.field(child, DataType::Int3)?);
                }
                Some(MeshField::Positions) => {
                    positions = Some(self.field(child, DataType::Float3)?);
                }
                Some(MeshField::Normals) => {
                    normals = Some(self.field(child, DataType::Float3)?);
                }
                Some(MeshField::Texcoords) => {
                    mesh.texcoords = Some(self.field(child, DataType::Float2)?);
                }
                Some(MeshField::AnimatedPositions) => {
                    animated_positions = self.animated_field(child, "positions")?;
                }
                Some(MeshField::AnimatedNormals) => {
                    animated_normals = self.animated_field(child, "normals")?;
                }
                Some(MeshField::Material) => {
                    mesh.material = self.mesh_material(child)?;
                }
                None => {
                    log::warn!(
                        "Skipping unsupported <{}> in TriangleMesh at line {}",
                        child.name,
                        child.line
                    );
                }
            }
        }

        // An animated block supersedes the single-step buffer; its first
        // step is the mesh's current data.
        mesh.positions = if animated_positions.is_empty() {
            positions.into_iter().collect()
        } else {
            animated_positions
        };
        mesh.normals = if animated_normals.is_empty() {
            normals.into_iter().collect()
        } else {
            animated_normals
        };

        Ok(mesh)
    }

    /// Resolve an `ofs`/`size` element into a view of the attachment.
    fn field(&self, node: &XmlNode, ty: DataType) -> LoadResult<Data> {
        let ofs = numeric_attr(node, "ofs")?;
        let size = numeric_attr(node, "size")?;
        Ok(self.attachment.view(ofs, size, ty)?)
    }

    fn animated_field(&self, node: &XmlNode, step_tag: &str) -> LoadResult<Vec<Data>> {
        let mut steps = Vec::new();
        for child in &node.children {
            if child.name == step_tag {
                steps.push(self.field(child, DataType::Float3)?);
            } else {
                log::warn!(
                    "Skipping <{}> in <{}> at line {}",
                    child.name,
                    node.name,
                    child.line
                );
            }
        }

        if steps.is_empty() {
            return Err(LoadError::SceneFormat(format!(
                "<{}> at line {} has no <{}> time steps",
                node.name, node.line, step_tag
            )));
        }
        Ok(steps)
    }

    /// A mesh `<material>` either defines a material or names an earlier one.
    fn mesh_material(&mut self, node: &XmlNode) -> LoadResult<Arc<Material>> {
        let id = node.attr("id");

        if node.children.is_empty() {
            let id = id.unwrap_or_default();
            return self
                .materials
                .get(id)
                .cloned()
                .ok_or_else(|| LoadError::UnresolvedMaterial {
                    line: node.line,
                    id: id.to_string(),
                });
        }

        let material = Arc::new(self.parse_material(node)?);
        if let Some(id) = id {
            self.materials.insert(id.to_string(), Arc::clone(&material));
        }
        Ok(material)
    }

    fn parse_material(&mut self, node: &XmlNode) -> LoadResult<Material> {
        let kind = node
            .children
            .iter()
            .rev()
            .find(|child| child.name == "code")
            .map_or_else(|| DEFAULT_MATERIAL_KIND.to_string(), |code| normalize_kind(&code.content));

        let mut material = Material::new(kind);
        if let Some(id) = node.attr("id") {
            material = material.with_id(id);
        }

        for block in node.children.iter().filter(|c| c.name == "parameters") {
            for param in &block.children {
                self.parse_parameter(param, &mut material)?;
            }
        }

        log::debug!(
            "Parsed material {} ({}, {} parameters)",
            material.id.as_deref().unwrap_or("<anonymous>"),
            material.kind,
            material.params.len()
        );
        Ok(material)
    }

    fn parse_parameter(&mut self, param: &XmlNode, material: &mut Material) -> LoadResult<()> {
        let Some(kind) = ParamKind::from_tag(&param.name) else {
            log::warn!(
                "Skipping unsupported material parameter <{}> at line {}",
                param.name,
                param.line
            );
            return Ok(());
        };

        let name = param.attr("name").ok_or_else(|| LoadError::InvalidMaterialParameter {
            line: param.line,
            name: String::new(),
            reason: "missing name attribute".to_string(),
        })?;
        let invalid = |reason: String| LoadError::InvalidMaterialParameter {
            line: param.line,
            name: name.to_string(),
            reason,
        };

        let value = match kind {
            ParamKind::Float => match parse_floats(&param.content).map_err(invalid)?[..] {
                [v] => MaterialParam::Float(v),
                ref other => return Err(invalid(format!("expected 1 number, found {}", other.len()))),
            },
            ParamKind::Float3 => match parse_floats(&param.content).map_err(invalid)?[..] {
                [x, y, z] => MaterialParam::Float3(Vec3::new(x, y, z)),
                ref other => return Err(invalid(format!("expected 3 numbers, found {}", other.len()))),
            },
            ParamKind::Texture2d => MaterialParam::Texture(self.textures.load(&param.content)?),
            ParamKind::Texture3d => {
                let src = param
                    .attr("src")
                    .ok_or_else(|| invalid("missing src attribute".to_string()))?;
                MaterialParam::Texture(self.textures.load(src)?)
            }
        };

        material.set(name, value);
        Ok(())
    }

    fn parse_assign(&mut self, node: &XmlNode) -> LoadResult<()> {
        if node.attr("type") != Some("material") {
            log::warn!(
                "Skipping <assign type=\"{}\"> at line {}",
                node.attr("type").unwrap_or_default(),
                node.line
            );
            return Ok(());
        }

        for child in node.children.iter().filter(|c| c.name == "material") {
            let id = child.attr("id").ok_or_else(|| {
                LoadError::SceneFormat(format!("material at line {} has no id", child.line))
            })?;
            let material = Arc::new(self.parse_material(child)?);
            self.materials.insert(id.to_string(), material);
        }
        Ok(())
    }
}

fn unsupported_node(child: &XmlNode, parent: &XmlNode) -> LoadError {
    LoadError::UnsupportedNode {
        line: child.line,
        tag: child.name.clone(),
        parent: parent.name.clone(),
    }
}

fn numeric_attr(node: &XmlNode, name: &str) -> LoadResult<usize> {
    let value = node.attr(name).ok_or_else(|| {
        LoadError::SceneFormat(format!(
            "<{}> at line {} is missing the '{}' attribute",
            node.name, node.line, name
        ))
    })?;

    value.trim().parse().map_err(|_| {
        LoadError::SceneFormat(format!(
            "<{}> at line {} has non-numeric {}=\"{}\"",
            node.name, node.line, name, value
        ))
    })
}

fn parse_floats(content: &str) -> Result<Vec<f32>, String> {
    content
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|_| format!("invalid number '{token}'"))
        })
        .collect()
}

/// Parse an `<AffineSpace>`: exactly 12 numbers, three rows of linear part
/// plus translation.
fn parse_affine_space(node: &XmlNode) -> LoadResult<Affine3A> {
    let values = parse_floats(&node.content).map_err(|reason| LoadError::TransformParse {
        line: node.line,
        reason,
    })?;

    let rows: [f32; 12] = values.as_slice().try_into().map_err(|_| LoadError::TransformParse {
        line: node.line,
        reason: format!("expected 12 numbers, found {}", values.len()),
    })?;

    Ok(Affine3A::from_rows(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Attachment holding one triangle: 36 bytes of positions, then 12 bytes of indices.
    fn triangle_attachment() -> BinaryAttachment {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0, 1.0];
        let indices: [i32; 3] = [0, 1, 2];

        let mut bytes = bytemuck::cast_slice::<f32, u8>(&positions).to_vec();
        bytes.extend_from_slice(bytemuck::cast_slice(&indices));
        BinaryAttachment::from_bytes("memory.bin", bytes)
    }

    const MESH: &str = r#"<TriangleMesh id="tri">
        <positions ofs="0" size="3"/>
        <triangles ofs="36" size="1"/>
    </TriangleMesh>"#;

    fn load(body: &str) -> LoadResult<LoadedScene> {
        let doc = format!("<scene>{body}</scene>");
        load_scene_from_str(&doc, ".", triangle_attachment())
    }

    fn identity_space() -> &'static str {
        "<AffineSpace>1 0 0 0\n0 1 0 0\n0 0 1 0</AffineSpace>"
    }

    #[test]
    fn test_top_level_mesh() {
        let loaded = load(MESH).unwrap();
        let scene = &loaded.scene;

        assert_eq!(scene.object_count(), 1);
        let mesh = &scene.objects[0].meshes[0];
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.material.kind, "OBJMaterial");
        assert!(!scene.objects[0].has_transforms());

        assert_eq!(loaded.bounds.min(), Vec3::ZERO);
        assert_eq!(loaded.bounds.max(), Vec3::new(2.0, 3.0, 1.0));
    }

    #[test]
    fn test_root_must_be_scene() {
        let err = load_scene_from_str("<world/>", ".", triangle_attachment()).unwrap_err();
        assert!(matches!(err, LoadError::SceneFormat(_)));

        let err = load_scene_from_str("<scene/><scene/>", ".", triangle_attachment()).unwrap_err();
        assert!(matches!(err, LoadError::SceneFormat(_)));
    }

    #[test]
    fn test_group_only_holds_meshes() {
        let loaded = load(&format!("<Group>{MESH}{MESH}</Group>")).unwrap();
        assert_eq!(loaded.scene.object_count(), 1);
        assert_eq!(loaded.scene.objects[0].meshes.len(), 2);

        let err = load(&format!("<Group>{MESH}<Group/></Group>")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedNode { ref tag, .. } if tag == "Group"));
    }

    #[test]
    fn test_unknown_root_tag_is_skipped() {
        let loaded = load(&format!("<PerspectiveCamera/>{MESH}")).unwrap();
        assert_eq!(loaded.scene.object_count(), 1);
    }

    #[test]
    fn test_transform_places_inline_mesh() {
        let body = format!(
            "<Transform><AffineSpace>1 0 0 10\n0 1 0 0\n0 0 1 0</AffineSpace>{MESH}</Transform>"
        );
        let loaded = load(&body).unwrap();
        let object = &loaded.scene.objects[0];

        assert_eq!(object.id.as_deref(), Some("tri"));
        assert_eq!(object.transforms.len(), 1);
        assert!(object.animated_transforms.is_empty());
        assert_eq!(loaded.bounds.min(), Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(loaded.bounds.max(), Vec3::new(12.0, 3.0, 1.0));
    }

    #[test]
    fn test_affine_space_needs_twelve_numbers() {
        let eleven = "<Transform><AffineSpace>1 0 0 0 0 1 0 0 0 0 1</AffineSpace><ref id=\"x\"/></Transform>";
        let err = load(eleven).unwrap_err();
        assert!(matches!(err, LoadError::TransformParse { .. }));

        let thirteen = "<Transform><AffineSpace>1 0 0 0 0 1 0 0 0 0 1 0 5</AffineSpace></Transform>";
        let err = load(thirteen).unwrap_err();
        assert!(matches!(err, LoadError::TransformParse { .. }));

        let garbage = "<Transform><AffineSpace>1 0 0 0 0 1 0 0 0 0 1 zero</AffineSpace></Transform>";
        let err = load(garbage).unwrap_err();
        assert!(matches!(err, LoadError::TransformParse { .. }));
    }

    #[test]
    fn test_backward_ref_shares_object() {
        let body = format!(
            "<Transform>{space}{MESH}</Transform>\
             <Transform><AffineSpace>1 0 0 5\n0 1 0 0\n0 0 1 0</AffineSpace><ref id=\"tri\"/></Transform>",
            space = identity_space()
        );
        let loaded = load(&body).unwrap();

        assert_eq!(loaded.scene.object_count(), 1);
        assert_eq!(loaded.scene.objects[0].transforms.len(), 2);
    }

    #[test]
    fn test_forward_ref_fails() {
        let body = format!(
            "<Transform>{space}<ref id=\"tri\"/></Transform><Transform>{space}{MESH}</Transform>",
            space = identity_space()
        );
        let err = load(&body).unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedReference { ref id, .. } if id == "tri"));
    }

    #[test]
    fn test_transform_without_geometry_or_space() {
        let err = load(&format!("<Transform>{}</Transform>", identity_space())).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedGeometry { .. }));

        let err = load(&format!("<Transform>{MESH}</Transform>")).unwrap_err();
        assert!(matches!(err, LoadError::EmptyTransform { .. }));

        let err = load(&format!("<Transform>{}<positions/></Transform>", identity_space())).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedNode { ref tag, .. } if tag == "positions"));
    }

    #[test]
    fn test_transform_with_two_geometries() {
        let body = format!(
            "<Transform>{space}{MESH}</Transform><Transform>{space}<ref id=\"tri\"/><ref id=\"tri\"/></Transform>",
            space = identity_space()
        );
        assert!(matches!(load(&body).unwrap_err(), LoadError::SceneFormat(_)));
    }

    #[test]
    fn test_transform_animation_records_sequence() {
        let body = format!(
            "<TransformAnimation>\
               <AffineSpace>1 0 0 0\n0 1 0 0\n0 0 1 0</AffineSpace>\
               <AffineSpace>1 0 0 1\n0 1 0 0\n0 0 1 0</AffineSpace>\
               <AffineSpace>1 0 0 2\n0 1 0 0\n0 0 1 0</AffineSpace>\
               {MESH}\
             </TransformAnimation>"
        );
        let loaded = load(&body).unwrap();
        let object = &loaded.scene.objects[0];

        assert!(object.transforms.is_empty());
        assert_eq!(object.animated_transforms.len(), 1);
        assert_eq!(object.animated_transforms[0].len(), 3);
        assert_eq!(loaded.bounds.max().x, 4.0);
    }

    #[test]
    fn test_static_and_animated_placements_of_one_object() {
        let body = format!(
            "<Transform><AffineSpace>1 0 0 100\n0 1 0 0\n0 0 1 0</AffineSpace>{MESH}</Transform>\
             <TransformAnimation>{space}{space}<ref id=\"tri\"/></TransformAnimation>",
            space = identity_space()
        );
        let loaded = load(&body).unwrap();
        let object = &loaded.scene.objects[0];

        assert_eq!(
            object.transforms,
            vec![Affine3A::from_translation(Vec3::new(100.0, 0.0, 0.0))]
        );
        assert_eq!(object.animated_transforms, vec![vec![Affine3A::IDENTITY; 2]]);
        assert_eq!(loaded.bounds.min().x, 0.0);
        assert_eq!(loaded.bounds.max().x, 102.0);
    }

    #[test]
    fn test_animated_positions() {
        let body = r#"<TriangleMesh>
            <animated_positions>
                <positions ofs="0" size="3"/>
                <positions ofs="12" size="2"/>
            </animated_positions>
            <triangles ofs="36" size="1"/>
        </TriangleMesh>"#;
        let loaded = load(body).unwrap();
        let mesh = &loaded.scene.objects[0].meshes[0];

        assert_eq!(mesh.position_steps(), 2);
        assert_eq!(mesh.positions[1].byte_offset(), 12);
    }

    #[test]
    fn test_empty_animated_block() {
        let body = "<TriangleMesh><animated_normals></animated_normals></TriangleMesh>";
        assert!(matches!(load(body).unwrap_err(), LoadError::SceneFormat(_)));
    }

    #[test]
    fn test_mesh_field_out_of_range() {
        let body = r#"<TriangleMesh><positions ofs="36" size="2"/></TriangleMesh>"#;
        assert!(matches!(load(body).unwrap_err(), LoadError::Attachment(_)));

        let body = r#"<TriangleMesh><positions ofs="zero" size="2"/></TriangleMesh>"#;
        assert!(matches!(load(body).unwrap_err(), LoadError::SceneFormat(_)));
    }

    #[test]
    fn test_inline_material_definition_and_lookup() {
        let body = r#"
            <TriangleMesh>
                <positions ofs="0" size="3"/>
                <triangles ofs="36" size="1"/>
                <material id="red">
                    <code>"Metal"</code>
                    <parameters>
                        <float name="roughness">0.25</float>
                        <float3 name="reflectance">1 0 0</float3>
                    </parameters>
                </material>
            </TriangleMesh>
            <TriangleMesh>
                <positions ofs="0" size="3"/>
                <triangles ofs="36" size="1"/>
                <material id="red"/>
            </TriangleMesh>"#;
        let loaded = load(body).unwrap();
        let a = &loaded.scene.objects[0].meshes[0].material;
        let b = &loaded.scene.objects[1].meshes[0].material;

        assert!(Arc::ptr_eq(a, b));
        assert_eq!(a.kind, "Metal");
        assert_eq!(a.id.as_deref(), Some("red"));
        assert_eq!(a.param("roughness").and_then(MaterialParam::as_float), Some(0.25));
        assert_eq!(
            a.param("reflectance").and_then(MaterialParam::as_float3),
            Some(Vec3::new(1.0, 0.0, 0.0))
        );
    }

    #[test]
    fn test_assigned_material_and_obj_code() {
        let body = r#"
            <assign type="material">
                <material id="plastic"><code>"OBJ"</code></material>
            </assign>
            <TriangleMesh>
                <positions ofs="0" size="3"/>
                <material id="plastic"/>
            </TriangleMesh>"#;
        let loaded = load(body).unwrap();
        let material = &loaded.scene.objects[0].meshes[0].material;
        assert_eq!(material.kind, "OBJMaterial");
        assert_eq!(material.id.as_deref(), Some("plastic"));
    }

    #[test]
    fn test_unresolved_material() {
        let body = r#"<TriangleMesh><material id="missing"/></TriangleMesh>"#;
        let err = load(body).unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedMaterial { ref id, .. } if id == "missing"));
    }

    #[test]
    fn test_invalid_material_parameter() {
        let body = r#"<assign type="material">
            <material id="m"><parameters><float3 name="Kd">1 0</float3></parameters></material>
        </assign>"#;
        let err = load(body).unwrap_err();
        assert!(matches!(err, LoadError::InvalidMaterialParameter { ref name, .. } if name == "Kd"));
    }

    #[test]
    fn test_missing_texture_fails_load() {
        let body = r#"<assign type="material">
            <material id="m"><parameters><texture3d name="map_Kd" src="missing.png"/></parameters></material>
        </assign>"#;
        let err = load_scene_from_str(
            &format!("<scene>{body}</scene>"),
            "/nonexistent/mosaic",
            triangle_attachment(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Texture(TextureError::Io { .. })));
    }
}
