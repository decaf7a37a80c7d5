//! Source document model
//!
//! Read-only object graph handed over by the document loader: scene nodes
//! with transform stacks, geometries with independently indexed attribute
//! streams, skin and morph controllers, materials and sampled animation
//! channels. The CLI reads it from a JSON dump.

mod animation;
mod transform;

pub use animation::AnimationChannel;
pub use transform::{
    axis_conversion, convert_matrix, convert_position, matrix_from_row_major, TransformKind,
    TransformOp,
};

use anyhow::{Context, Result};
use glam::{Mat4, Vec3};
use hashbrown::HashMap;
use serde::Deserialize;
use std::path::Path;

use crate::error::ConvertError;

/// Root of a parsed scene document
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDocument {
    /// Document up axis; Z-up documents are converted to Y-up
    #[serde(default = "default_y_up")]
    pub y_up: bool,
    /// Visual scene roots; `None` when the document has no scene
    #[serde(default)]
    pub scene: Option<Vec<SourceNode>>,
    #[serde(default)]
    pub library_nodes: Vec<SourceNode>,
    #[serde(default)]
    pub geometries: Vec<SourceGeometry>,
    #[serde(default)]
    pub skins: Vec<SourceSkin>,
    #[serde(default)]
    pub morphs: Vec<SourceMorph>,
    #[serde(default)]
    pub materials: Vec<SourceMaterial>,
    #[serde(default)]
    pub animations: Vec<AnimationChannel>,
}

fn default_y_up() -> bool {
    true
}

impl Default for SourceDocument {
    fn default() -> Self {
        Self {
            y_up: true,
            scene: None,
            library_nodes: Vec::new(),
            geometries: Vec::new(),
            skins: Vec::new(),
            morphs: Vec::new(),
            materials: Vec::new(),
            animations: Vec::new(),
        }
    }
}

impl SourceDocument {
    /// Load a document dump from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse document: {:?}", path))
    }

    /// Parse a document dump from a string
    pub fn parse(content: &str) -> Result<Self, ConvertError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn find_geometry(&self, id: &str) -> Option<&SourceGeometry> {
        self.geometries.iter().find(|g| g.id == id)
    }

    pub fn find_skin(&self, id: &str) -> Option<&SourceSkin> {
        self.skins.iter().find(|s| s.id == id)
    }

    pub fn find_morph(&self, id: &str) -> Option<&SourceMorph> {
        self.morphs.iter().find(|m| m.id == id)
    }

    pub fn find_material(&self, id: &str) -> Option<&SourceMaterial> {
        self.materials.iter().find(|m| m.id == id)
    }

    pub fn find_library_node(&self, id: &str) -> Option<&SourceNode> {
        self.library_nodes.iter().find(|n| n.id == id)
    }

    /// Axis conversion applied to every matrix and position of this document
    pub fn axis(&self) -> Option<Mat4> {
        axis_conversion(self.y_up)
    }
}

/// A node of the visual scene or the node library
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceNode {
    pub id: String,
    /// Scoped id used by skins to name joints; defaults to `id`
    #[serde(default)]
    pub sid: Option<String>,
    /// Display name; defaults to `id`
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub joint: bool,
    #[serde(default)]
    pub transforms: Vec<TransformOp>,
    #[serde(default)]
    pub instances: Vec<SourceInstance>,
    #[serde(default)]
    pub children: Vec<SceneChild>,
}

impl SourceNode {
    pub fn sid(&self) -> &str {
        self.sid.as_deref().unwrap_or(&self.id)
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Child slot of a node: an inline node or a reference into the node library
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneChild {
    Node(SourceNode),
    InstanceNode(String),
}

/// Geometry or controller instance with its material bindings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceInstance {
    /// Id of a geometry, skin or morph controller
    pub url: String,
    /// Material symbol → material id
    #[serde(default)]
    pub material_bindings: HashMap<String, String>,
}

/// Flat float array with a per-element stride
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FloatSource {
    #[serde(default = "default_stride")]
    pub stride: usize,
    pub data: Vec<f32>,
}

fn default_stride() -> usize {
    3
}

impl FloatSource {
    pub fn count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    /// Element as a 3-vector, missing components are zero
    pub fn get(&self, index: usize) -> Option<Vec3> {
        if index >= self.count() {
            return None;
        }
        let start = index * self.stride;
        let element = &self.data[start..start + self.stride];
        let component = |i: usize| element.get(i).copied().unwrap_or(0.0);
        Some(Vec3::new(component(0), component(1), component(2)))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceGeometry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub positions: FloatSource,
    #[serde(default)]
    pub triangles: Vec<SourceTriGroup>,
}

impl SourceGeometry {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn position(&self, index: u32) -> Option<Vec3> {
        self.positions.get(index as usize)
    }

    /// Whether at least one triangle group holds a full triangle
    pub fn has_triangles(&self) -> bool {
        self.triangles.iter().any(|g| g.indices.len() >= 3)
    }
}

/// Triangle list bound to one material symbol
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceTriGroup {
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub normals: Option<FloatSource>,
    /// Texture coordinate sets, at most 4 are used
    #[serde(default)]
    pub texcoords: Vec<FloatSource>,
    pub indices: Vec<IndexEntry>,
}

impl SourceTriGroup {
    pub fn normal(&self, entry: &IndexEntry) -> Vec3 {
        match (&self.normals, entry.normal) {
            (Some(source), Some(i)) => source.get(i as usize).unwrap_or(Vec3::ZERO),
            _ => Vec3::ZERO,
        }
    }

    pub fn texcoord(&self, entry: &IndexEntry, set: usize) -> Vec3 {
        match (self.texcoords.get(set), entry.texcoord(set)) {
            (Some(source), Some(i)) => source.get(i as usize).unwrap_or(Vec3::ZERO),
            _ => Vec3::ZERO,
        }
    }
}

/// One corner of a triangle with independent attribute indices
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexEntry {
    pub position: u32,
    #[serde(default)]
    pub normal: Option<u32>,
    /// Per texture coordinate set, missing sets read as zero
    #[serde(default)]
    pub texcoords: Vec<Option<u32>>,
}

impl IndexEntry {
    pub fn texcoord(&self, set: usize) -> Option<u32> {
        self.texcoords.get(set).copied().flatten()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceSkin {
    pub id: String,
    /// Geometry or morph controller this skin deforms
    pub owner: String,
    /// Row-major
    #[serde(default = "identity_row_major")]
    pub bind_shape_matrix: [f32; 16],
    #[serde(default)]
    pub joints: Option<Vec<String>>,
    #[serde(default)]
    pub weights: Option<Vec<f32>>,
    /// Row-major, 16 floats per joint
    #[serde(default)]
    pub inverse_bind_matrices: Option<Vec<f32>>,
    /// Influences per source position index
    #[serde(default)]
    pub vertex_weights: Vec<Vec<JointWeight>>,
}

fn identity_row_major() -> [f32; 16] {
    Mat4::IDENTITY.to_cols_array()
}

impl SourceSkin {
    /// Whether every array needed for skinning is present and consistent
    pub fn is_complete(&self) -> bool {
        match (&self.joints, &self.weights, &self.inverse_bind_matrices) {
            (Some(joints), Some(_), Some(bind)) => bind.len() >= joints.len() * 16,
            _ => false,
        }
    }

    pub fn joint_names(&self) -> &[String] {
        self.joints.as_deref().unwrap_or_default()
    }

    pub fn weight(&self, index: usize) -> Option<f32> {
        self.weights.as_ref()?.get(index).copied()
    }

    /// Row-major bind matrix of a skin joint
    pub fn bind_matrix(&self, joint: usize) -> Option<&[f32]> {
        self.inverse_bind_matrices
            .as_ref()?
            .get(joint * 16..joint * 16 + 16)
    }
}

/// Index pair into a skin's joint and weight arrays
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct JointWeight {
    /// Negative values bind to the bind shape and count as no joint
    pub joint: i32,
    pub weight: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceMorph {
    pub id: String,
    /// Base geometry or skin controller
    pub owner: String,
    #[serde(default)]
    pub targets: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceMaterial {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub effect: Option<SourceEffect>,
}

impl SourceMaterial {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceEffect {
    /// Image path of the diffuse texture
    #[serde(default)]
    pub diffuse_map: Option<String>,
    #[serde(default = "default_diffuse")]
    pub diffuse_color: [f32; 4],
    /// Absent when the effect has no specular term
    #[serde(default)]
    pub specular_color: Option<[f32; 4]>,
    #[serde(default = "default_shininess")]
    pub shininess: f32,
}

fn default_diffuse() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

fn default_shininess() -> f32 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_document() {
        let doc = SourceDocument::parse(r#"{ "scene": [] }"#).unwrap();
        assert!(doc.y_up);
        assert_eq!(doc.scene.map(|s| s.len()), Some(0));
    }

    #[test]
    fn test_parse_node_tree() {
        let json = r#"{
            "y_up": false,
            "scene": [{
                "id": "root",
                "transforms": [{ "sid": "loc", "kind": "translate", "values": [1, 2, 3] }],
                "children": [
                    { "node": { "id": "child", "joint": true } },
                    { "instance_node": "lib" }
                ]
            }]
        }"#;
        let doc = SourceDocument::parse(json).unwrap();
        assert!(!doc.y_up);
        let root = &doc.scene.as_ref().unwrap()[0];
        assert_eq!(root.name(), "root");
        assert_eq!(root.transforms[0].kind, TransformKind::Translate);
        assert!(matches!(&root.children[0], SceneChild::Node(n) if n.joint && n.sid() == "child"));
        assert!(matches!(&root.children[1], SceneChild::InstanceNode(id) if id == "lib"));
    }

    #[test]
    fn test_parse_error_is_typed() {
        let err = SourceDocument::parse("{ not json").unwrap_err();
        assert!(matches!(err, ConvertError::Document(_)));
    }

    #[test]
    fn test_effect_defaults() {
        let json = r#"{
            "materials": [
                { "id": "plain", "effect": {} },
                { "id": "shiny", "effect": { "specular_color": [0.2, 0.2, 0.2, 1] } }
            ]
        }"#;
        let doc = SourceDocument::parse(json).unwrap();
        let plain = doc.materials[0].effect.as_ref().unwrap();
        assert_eq!(plain.diffuse_color, [1.0; 4]);
        assert_eq!(plain.specular_color, None);
        assert_eq!(plain.shininess, 0.5);
        let shiny = doc.materials[1].effect.as_ref().unwrap();
        assert_eq!(shiny.specular_color, Some([0.2, 0.2, 0.2, 1.0]));
    }

    #[test]
    fn test_float_source_pads_missing_components() {
        let uv = FloatSource {
            stride: 2,
            data: vec![0.25, 0.5, 0.75, 1.0],
        };
        assert_eq!(uv.count(), 2);
        assert_eq!(uv.get(1), Some(Vec3::new(0.75, 1.0, 0.0)));
        assert_eq!(uv.get(2), None);
    }

    #[test]
    fn test_skin_completeness() {
        let mut skin = SourceSkin {
            joints: Some(vec!["a".into()]),
            weights: Some(vec![1.0]),
            inverse_bind_matrices: Some(Mat4::IDENTITY.to_cols_array().to_vec()),
            ..Default::default()
        };
        assert!(skin.is_complete());
        skin.inverse_bind_matrices = Some(vec![0.0; 8]);
        assert!(!skin.is_complete());
        skin.weights = None;
        assert!(!skin.is_complete());
    }
}
