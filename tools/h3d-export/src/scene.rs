//! Output node arena
//!
//! Flattened scene made of joints and meshes. Nodes live in one `Vec` and
//! refer to each other by [`NodeId`]; the joint and mesh lists keep discovery
//! order for flat iteration.

use glam::Mat4;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::mesh::TriGroup;
use crate::source::SourceInstance;

pub type NodeId = usize;

/// Longest node name the engine formats can store
pub const MAX_NAME_LEN: usize = 255;

/// Names are cut to this length before a collision suffix is appended
const RENAME_BASE_LEN: usize = 240;

/// Fields shared by joints and meshes
#[derive(Debug, Clone)]
pub struct NodeCommon {
    pub name: String,
    /// Scoped id of the source node, matched against skin joint names
    pub source_sid: String,
    pub relative: Mat4,
    pub absolute: Mat4,
    /// One matrix per sampled frame, relative to the parent
    pub frames: Vec<Mat4>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl NodeCommon {
    pub fn new(name: String, source_sid: String, relative: Mat4) -> Self {
        Self {
            name,
            source_sid,
            relative,
            absolute: relative,
            frames: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JointNode {
    pub common: NodeCommon,
    /// 1-based; 0 is the implicit identity joint
    pub index: u32,
    /// Inverse of the joint's absolute scene transform
    pub inverse_bind_matrix: Mat4,
    /// Skin bind matrix times bind shape, set while a skin references the joint
    pub skin_bind_matrix: Mat4,
    pub used: bool,
}

#[derive(Debug, Clone)]
pub struct MeshNode {
    pub common: NodeCommon,
    pub instance: SourceInstance,
    pub tri_groups: Vec<TriGroup>,
    /// 0 for the base mesh, 1..=4 for `_lodN` variants
    pub lod_level: u32,
}

#[derive(Debug, Clone)]
pub enum OutputNode {
    Joint(JointNode),
    Mesh(MeshNode),
}

impl OutputNode {
    pub fn common(&self) -> &NodeCommon {
        match self {
            OutputNode::Joint(joint) => &joint.common,
            OutputNode::Mesh(mesh) => &mesh.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut NodeCommon {
        match self {
            OutputNode::Joint(joint) => &mut joint.common,
            OutputNode::Mesh(mesh) => &mut mesh.common,
        }
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    pub fn as_joint(&self) -> Option<&JointNode> {
        match self {
            OutputNode::Joint(joint) => Some(joint),
            OutputNode::Mesh(_) => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshNode> {
        match self {
            OutputNode::Mesh(mesh) => Some(mesh),
            OutputNode::Joint(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<OutputNode>,
    pub joints: Vec<NodeId>,
    pub meshes: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &OutputNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut OutputNode {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn joint(&self, id: NodeId) -> Option<&JointNode> {
        self.nodes.get(id).and_then(OutputNode::as_joint)
    }

    pub fn joint_mut(&mut self, id: NodeId) -> Option<&mut JointNode> {
        match self.nodes.get_mut(id) {
            Some(OutputNode::Joint(joint)) => Some(joint),
            _ => None,
        }
    }

    pub fn mesh(&self, id: NodeId) -> Option<&MeshNode> {
        self.nodes.get(id).and_then(OutputNode::as_mesh)
    }

    pub fn mesh_mut(&mut self, id: NodeId) -> Option<&mut MeshNode> {
        match self.nodes.get_mut(id) {
            Some(OutputNode::Mesh(mesh)) => Some(mesh),
            _ => None,
        }
    }

    /// Add a node and register it in the joint or mesh list.
    ///
    /// The absolute transform is derived from the parent's.
    pub fn insert(&mut self, mut node: OutputNode, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        let parent_abs = parent.map(|p| self.nodes[p].common().absolute);
        {
            let common = node.common_mut();
            common.parent = parent;
            common.absolute = match parent_abs {
                Some(abs) => abs * common.relative,
                None => common.relative,
            };
        }
        match node {
            OutputNode::Joint(_) => self.joints.push(id),
            OutputNode::Mesh(_) => self.meshes.push(id),
        }
        self.nodes.push(node);
        id
    }

    /// Append `child` to the children of `parent`
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].common_mut().children.push(child);
    }

    /// Nodes without a parent, joints first
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.joints
            .iter()
            .chain(self.meshes.iter())
            .copied()
            .filter(|&id| self.nodes[id].common().parent.is_none())
    }

    /// Find a joint or mesh by name, skipping `ignore`
    pub fn find_by_name(&self, name: &str, ignore: NodeId) -> Option<NodeId> {
        self.joints
            .iter()
            .chain(self.meshes.iter())
            .copied()
            .find(|&id| id != ignore && self.nodes[id].name() == name)
    }

    /// Enforce the name length limit and uniqueness of node `id`.
    ///
    /// On collision the name is cut to 240 characters and the first free
    /// `_<n>` suffix starting at 2 is appended.
    pub fn ensure_unique_name(&mut self, id: NodeId, diagnostics: &mut Diagnostics) {
        let name = self.nodes[id].name().to_string();
        let name = if name.chars().count() > MAX_NAME_LEN {
            let cut = truncate_chars(&name, MAX_NAME_LEN);
            diagnostics.warn(
                DiagnosticKind::Naming,
                format!("Node name '{}' is too long and was truncated", cut),
            );
            cut
        } else {
            name
        };

        let final_name = if self.find_by_name(&name, id).is_some() {
            let base = truncate_chars(&name, RENAME_BASE_LEN);
            let mut suffix = 2;
            let renamed = loop {
                let candidate = format!("{}_{}", base, suffix);
                if self.find_by_name(&candidate, id).is_none() {
                    break candidate;
                }
                suffix += 1;
            };
            diagnostics.warn(
                DiagnosticKind::Naming,
                format!(
                    "Node with name '{}' already exists. Node was renamed to '{}'",
                    base, renamed
                ),
            );
            renamed
        } else {
            name
        };

        self.nodes[id].common_mut().name = final_name;
    }
}

fn truncate_chars(name: &str, max: usize) -> String {
    name.chars().take(max).collect()
}
