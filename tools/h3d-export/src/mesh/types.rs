//! Types shared by the mesh stages

use glam::Vec3;
use hashbrown::HashMap;
use std::ops::Range;

use crate::scene::NodeId;

/// Transient map from source position index to the welded vertices built from it
pub type WeldBuckets = HashMap<u32, Vec<u32>>;

/// Influence of a joint on a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointRef {
    /// Engine joint index (1-based)
    pub index: u32,
    pub node: NodeId,
}

/// Welded vertex
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Index into the source geometry's position array
    pub source_position_index: u32,
    /// Engine-space position before skinning, used as welding key
    pub rest_position: Vec3,
    /// Position after skinning
    pub position: Vec3,
    /// Normal as read from the source, used as welding key and for seams
    pub source_normal: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub texcoords: [Vec3; 4],
    pub joints: [Option<JointRef>; 4],
    pub weights: [f32; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            source_position_index: 0,
            rest_position: Vec3::ZERO,
            position: Vec3::ZERO,
            source_normal: Vec3::ZERO,
            normal: Vec3::ZERO,
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
            texcoords: [Vec3::ZERO; 4],
            joints: [None; 4],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

impl Vertex {
    pub fn is_skinned(&self) -> bool {
        self.joints.iter().any(Option::is_some)
    }

    /// Engine joint indices, 0 for empty slots
    pub fn joint_indices(&self) -> [u32; 4] {
        self.joints.map(|j| j.map_or(0, |j| j.index))
    }
}

/// Triangles of one mesh that share a material
#[derive(Debug, Clone, Default)]
pub struct TriGroup {
    pub material: String,
    /// First index in the shared index buffer
    pub first: u32,
    /// Number of indices
    pub count: u32,
    /// Vertices created for this group in the shared vertex buffer
    pub vertices: Range<u32>,
    /// Only present between welding and optimization
    pub weld_buckets: Option<WeldBuckets>,
}

impl TriGroup {
    pub fn index_range(&self) -> Range<usize> {
        self.first as usize..(self.first + self.count) as usize
    }

    pub fn triangle_count(&self) -> u32 {
        self.count / 3
    }

    /// Inclusive last vertex index, as stored in the scene graph
    pub fn last_vertex(&self) -> u32 {
        self.vertices.end.saturating_sub(1).max(self.vertices.start)
    }

    /// Drop the welding map, its ids are invalid once vertices are reordered
    pub fn release_weld_buckets(&mut self) {
        self.weld_buckets = None;
    }
}

/// Vertex and index storage shared by all meshes of a document
#[derive(Debug, Clone, Default)]
pub struct GeometryBuffer {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl GeometryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn has_joints(&self) -> bool {
        self.vertices.iter().any(Vertex::is_skinned)
    }
}

/// Sparse difference of one vertex between base and target shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphDiff {
    pub vertex_index: u32,
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

impl MorphDiff {
    pub fn new(vertex_index: u32, position: Vec3) -> Self {
        Self {
            vertex_index,
            position,
            normal: Vec3::ZERO,
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MorphTarget {
    pub name: String,
    /// Id of the target geometry
    pub source_id: String,
    pub diffs: Vec<MorphDiff>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vertex_is_unskinned() {
        let v = Vertex::default();
        assert!(!v.is_skinned());
        assert_eq!(v.weights, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(v.joint_indices(), [0; 4]);
    }

    #[test]
    fn test_tri_group_ranges() {
        let group = TriGroup {
            first: 6,
            count: 9,
            vertices: 4..10,
            ..Default::default()
        };
        assert_eq!(group.index_range(), 6..15);
        assert_eq!(group.triangle_count(), 3);
        assert_eq!(group.last_vertex(), 9);
    }
}
