//! Morph target deltas
//!
//! Position deltas are taken against the base mesh in source order, with the
//! target position skinned exactly like its base vertex. Shading deltas come
//! from a second tangent pass over a morphed copy of the vertex buffer.

use glam::Mat4;

use super::tangent::compute_tangent_basis;
use super::{MorphDiff, MorphTarget, TriGroup, Vertex};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::rig::skin_position;
use crate::scene::{SceneGraph, MAX_NAME_LEN};
use crate::source::{convert_position, SourceDocument, SourceGeometry, SourceMorph};

/// Collect position deltas of every target of `morph` for one mesh.
///
/// `first_vertex` is the buffer index of `mesh_vertices[0]`. Targets are
/// shared across meshes by geometry id; a target whose position array
/// length differs from the base is skipped with a warning.
#[allow(clippy::too_many_arguments)]
pub fn collect_position_deltas(
    doc: &SourceDocument,
    morph: &SourceMorph,
    base: &SourceGeometry,
    mesh_vertices: &[Vertex],
    first_vertex: u32,
    graph: &SceneGraph,
    axis: Option<Mat4>,
    targets: &mut Vec<MorphTarget>,
    diagnostics: &mut Diagnostics,
) {
    for target_id in morph.targets.iter().flatten() {
        let Some(target_geometry) = doc.find_geometry(target_id) else {
            diagnostics.warn(
                DiagnosticKind::Integrity,
                format!("Morph target geometry '{}' not found", target_id),
            );
            continue;
        };

        let slot = match targets.iter().position(|t| t.source_id == *target_id) {
            Some(slot) => slot,
            None => {
                targets.push(MorphTarget {
                    name: target_geometry.name().chars().take(MAX_NAME_LEN).collect(),
                    source_id: target_id.clone(),
                    diffs: Vec::new(),
                });
                targets.len() - 1
            }
        };

        if target_geometry.positions.data.len() != base.positions.data.len() {
            diagnostics.warn(
                DiagnosticKind::Integrity,
                format!(
                    "Morph target '{}' geometry differs from base geometry",
                    target_id
                ),
            );
            continue;
        }

        let target = &mut targets[slot];
        for (offset, vertex) in mesh_vertices.iter().enumerate() {
            let index = vertex.source_position_index;
            let (Some(base_pos), Some(target_pos)) =
                (base.position(index), target_geometry.position(index))
            else {
                continue;
            };
            if base_pos == target_pos {
                continue;
            }
            let morphed = skin_position(
                graph,
                &vertex.joints,
                &vertex.weights,
                convert_position(target_pos, axis),
            );
            target.diffs.push(MorphDiff::new(
                first_vertex + offset as u32,
                morphed - vertex.position,
            ));
        }
    }
}

/// Fill normal, tangent and bitangent deltas of every target.
///
/// `vertices` must already hold the base tangent basis. Returns the number
/// of zero-length basis vectors seen across all morphed shapes.
pub fn compute_basis_deltas(
    vertices: &[Vertex],
    indices: &[u32],
    groups: &[&TriGroup],
    targets: &mut [MorphTarget],
) -> usize {
    let mut morphed = vertices.to_vec();
    let mut invalid = 0;

    for target in targets.iter_mut() {
        for diff in &target.diffs {
            morphed[diff.vertex_index as usize].position += diff.position;
        }

        invalid += compute_tangent_basis(&mut morphed, indices, groups.iter().copied());

        for diff in &mut target.diffs {
            let i = diff.vertex_index as usize;
            diff.normal = morphed[i].normal - vertices[i].normal;
            diff.tangent = morphed[i].tangent - vertices[i].tangent;
            diff.bitangent = morphed[i].bitangent - vertices[i].bitangent;
            morphed[i].position = vertices[i].position;
        }
    }

    invalid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::WeldBuckets;
    use crate::source::FloatSource;
    use glam::Vec3;

    fn geometry(id: &str, data: Vec<f32>) -> SourceGeometry {
        SourceGeometry {
            id: id.into(),
            name: Some(format!("{}_name", id)),
            positions: FloatSource { stride: 3, data },
            triangles: Vec::new(),
        }
    }

    fn base_vertices() -> Vec<Vertex> {
        [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, p)| Vertex {
            source_position_index: i as u32,
            rest_position: p,
            position: p,
            texcoords: [Vec3::new(p.x, p.y, 0.0), Vec3::ZERO, Vec3::ZERO, Vec3::ZERO],
            ..Default::default()
        })
        .collect()
    }

    fn doc() -> SourceDocument {
        SourceDocument {
            geometries: vec![
                geometry("base", vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
                geometry("smile", vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0]),
                geometry("broken", vec![0.0; 6]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_only_moved_vertices_are_stored() {
        let doc = doc();
        let morph = SourceMorph {
            id: "morph".into(),
            owner: "base".into(),
            targets: Some(vec!["smile".into(), "broken".into(), "absent".into()]),
        };
        let mut targets = Vec::new();
        let mut diagnostics = Diagnostics::new();
        collect_position_deltas(
            &doc,
            &morph,
            &doc.geometries[0],
            &base_vertices(),
            10,
            &SceneGraph::new(),
            None,
            &mut targets,
            &mut diagnostics,
        );

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].name, "smile_name");
        assert_eq!(targets[0].diffs.len(), 1);
        assert_eq!(targets[0].diffs[0].vertex_index, 12);
        assert_eq!(targets[0].diffs[0].position, Vec3::new(0.0, 0.0, 1.0));
        assert!(targets[1].diffs.is_empty());
        assert!(diagnostics.has_warning("differs from base geometry"));
        assert!(diagnostics.has_warning("'absent' not found"));
    }

    #[test]
    fn test_basis_deltas_follow_morphed_shape() {
        let mut vertices = base_vertices();
        let buckets: WeldBuckets = (0..3).map(|i| (i, vec![i])).collect();
        let group = TriGroup {
            material: "m".into(),
            first: 0,
            count: 3,
            vertices: 0..3,
            weld_buckets: Some(buckets),
        };
        let indices = [0, 1, 2];
        compute_tangent_basis(&mut vertices, &indices, [&group]);

        let mut targets = vec![MorphTarget {
            name: "tilt".into(),
            source_id: "tilt".into(),
            diffs: vec![MorphDiff::new(2, Vec3::new(0.0, 0.0, 1.0))],
        }];
        let invalid = compute_basis_deltas(&vertices, &indices, &[&group], &mut targets);
        assert_eq!(invalid, 0);

        let diff = targets[0].diffs[0];
        let morphed_normal = vertices[2].normal + diff.normal;
        let expected = Vec3::new(0.0, -1.0, 1.0).normalize();
        assert!(morphed_normal.abs_diff_eq(expected, 1e-5));
        assert!(diff.normal.length() > 0.1);
    }
}
