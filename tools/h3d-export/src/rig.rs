//! Skin and morph controller resolution
//!
//! An instance may point at a geometry directly or at a controller stack:
//! skin over geometry, morph over geometry, skin over morph or morph over
//! skin. [`resolve_controller_stack`] walks one level each way down to the
//! base geometry. [`Rig`] then binds a skin's joint names to scene joints and
//! provides the per-vertex influences used by welding and morphing.

use glam::{Mat4, Vec3};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::mesh::JointRef;
use crate::scene::SceneGraph;
use crate::source::{
    convert_matrix, matrix_from_row_major, SourceDocument, SourceGeometry, SourceMorph,
    SourceSkin,
};

/// Weight sums at or below this fall back to `[1, 0, 0, 0]`
const WEIGHT_EPSILON: f32 = 1e-6;

/// Resolved controller stack of an instance
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerStack<'a> {
    pub skin: Option<&'a SourceSkin>,
    pub morph: Option<&'a SourceMorph>,
    pub geometry: Option<&'a SourceGeometry>,
}

/// Walk an instance url through its skin and morph controllers
pub fn resolve_controller_stack<'a>(doc: &'a SourceDocument, url: &str) -> ControllerStack<'a> {
    let mut skin = doc.find_skin(url);
    let mut morph = None;
    let geometry_id = match skin {
        Some(s) => {
            morph = doc.find_morph(&s.owner);
            morph.map_or(s.owner.as_str(), |m| m.owner.as_str())
        }
        None => match doc.find_morph(url) {
            Some(m) => {
                morph = Some(m);
                skin = doc.find_skin(&m.owner);
                skin.map_or(m.owner.as_str(), |s| s.owner.as_str())
            }
            None => url,
        },
    };

    ControllerStack {
        skin,
        morph,
        geometry: doc.find_geometry(geometry_id),
    }
}

/// An instance is valid when its base geometry holds at least one triangle
pub fn is_valid_instance(doc: &SourceDocument, url: &str) -> bool {
    resolve_controller_stack(doc, url)
        .geometry
        .is_some_and(SourceGeometry::has_triangles)
}

/// Skin bound to the scene's joints
#[derive(Debug, Clone, Default)]
pub struct Rig<'a> {
    pub skin: Option<&'a SourceSkin>,
    /// Scene joint for every skin joint, `None` when unmatched
    pub joints: Vec<Option<JointRef>>,
}

impl<'a> Rig<'a> {
    /// Rig of an unskinned mesh
    pub fn unskinned() -> Self {
        Self::default()
    }

    /// Bind `skin` to the scene joints.
    ///
    /// Skin joint names are matched against the scoped id of each scene
    /// joint. Matched joints are marked used and get the skin's bind matrix
    /// (times the bind shape matrix) for baking vertices.
    pub fn bind(
        skin: &'a SourceSkin,
        graph: &mut SceneGraph,
        axis: Option<Mat4>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let bind_shape = convert_matrix(matrix_from_row_major(&skin.bind_shape_matrix), axis);
        let joint_ids = graph.joints.clone();
        let mut joints = Vec::with_capacity(skin.joint_names().len());

        for (j, name) in skin.joint_names().iter().enumerate() {
            let found = joint_ids
                .iter()
                .copied()
                .find(|&id| graph.node(id).common().source_sid == *name);
            let bind = skin
                .bind_matrix(j)
                .map(|m| convert_matrix(matrix_from_row_major(m), axis));

            let Some((id, joint)) = found.and_then(|id| graph.joint_mut(id).map(|joint| (id, joint)))
            else {
                diagnostics.warn(
                    DiagnosticKind::Integrity,
                    format!("Joint '{}' used in skin controller not found", name),
                );
                joints.push(None);
                continue;
            };
            let Some(bind) = bind else {
                diagnostics.warn(
                    DiagnosticKind::Integrity,
                    format!(
                        "Joint '{}' has no inverse bind matrix in skin controller '{}'",
                        name, skin.id
                    ),
                );
                joints.push(None);
                continue;
            };
            joint.used = true;
            joint.skin_bind_matrix = bind * bind_shape;
            joints.push(Some(JointRef {
                index: joint.index,
                node: id,
            }));
        }

        Self {
            skin: Some(skin),
            joints,
        }
    }

    /// Top 4 influences of a source position, weights normalized.
    ///
    /// Entries referencing unknown joints keep their weight with an empty
    /// joint slot. A vertex without usable weight gets `[1, 0, 0, 0]`.
    pub fn influences(&self, position_index: u32) -> ([Option<JointRef>; 4], [f32; 4]) {
        let mut joints = [None; 4];
        let mut weights = [1.0, 0.0, 0.0, 0.0];

        let Some(skin) = self.skin else {
            return (joints, weights);
        };
        let Some(entries) = skin.vertex_weights.get(position_index as usize) else {
            return (joints, weights);
        };

        let mut resolved: Vec<(Option<JointRef>, f32)> = entries
            .iter()
            .filter_map(|entry| {
                let weight = skin.weight(entry.weight)?;
                let joint = usize::try_from(entry.joint)
                    .ok()
                    .and_then(|j| self.joints.get(j).copied().flatten());
                Some((joint, weight))
            })
            .collect();
        resolved.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (slot, (joint, weight)) in resolved.into_iter().take(4).enumerate() {
            joints[slot] = joint;
            weights[slot] = weight;
        }

        let sum: f32 = weights.iter().sum();
        if sum > WEIGHT_EPSILON {
            for w in &mut weights {
                *w /= sum;
            }
        } else {
            weights = [1.0, 0.0, 0.0, 0.0];
        }

        (joints, weights)
    }
}

/// Bake a rest position into the scene pose through its joint influences.
///
/// Positions without any bound joint are returned unchanged.
pub fn skin_position(
    graph: &SceneGraph,
    joints: &[Option<JointRef>; 4],
    weights: &[f32; 4],
    position: Vec3,
) -> Vec3 {
    if joints.iter().all(Option::is_none) {
        return position;
    }
    joints
        .iter()
        .zip(weights)
        .filter_map(|(joint, &weight)| {
            let joint = graph.joint((*joint)?.node)?;
            let skin = joint.common.absolute * joint.skin_bind_matrix;
            Some(skin.transform_point3(position) * weight)
        })
        .sum()
}
