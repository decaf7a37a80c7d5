//! Tangent space generation
//!
//! Per-vertex normal, tangent and bitangent after Lengyel: face normals and
//! UV-space directions are accumulated unnormalized, so larger triangles
//! weigh more, then orthonormalized per vertex. Contributions are shared with
//! vertices that were split from the same source position and normal only
//! because of texture seams.

use glam::Vec3;

use super::{TriGroup, Vertex};

/// Recompute the basis of every vertex referenced by `groups`.
///
/// Groups must still carry their welding map for seam sharing. Returns the
/// number of vertices whose accumulated normal, tangent or bitangent had zero
/// length; those end up with zero vectors instead of NaN.
pub fn compute_tangent_basis<'g>(
    vertices: &mut [Vertex],
    indices: &[u32],
    groups: impl IntoIterator<Item = &'g TriGroup>,
) -> usize {
    for v in vertices.iter_mut() {
        v.normal = Vec3::ZERO;
        v.tangent = Vec3::ZERO;
        v.bitangent = Vec3::ZERO;
    }

    let mut seam_targets = Vec::new();
    for group in groups {
        for triangle in indices[group.index_range()].chunks_exact(3) {
            let [i0, i1, i2] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let (v0, v1, v2) = (&vertices[i0], &vertices[i1], &vertices[i2]);

            let edge1 = v1.position - v0.position;
            let edge2 = v2.position - v0.position;
            let edge1_uv = v1.texcoords[0] - v0.texcoords[0];
            let edge2_uv = v2.texcoords[0] - v0.texcoords[0];

            let normal = edge1.cross(edge2);
            let det = edge1_uv.x * edge2_uv.y - edge2_uv.x * edge1_uv.y;
            let r = if det != 0.0 { 1.0 / det } else { 0.0 };
            let u_dir = (edge1 * edge2_uv.y - edge2 * edge1_uv.y) * r;
            let v_dir = (edge2 * edge1_uv.x - edge1 * edge2_uv.x) * r;

            for &corner in &[i0, i1, i2] {
                seam_targets.clear();
                seam_targets.push(corner);
                if let Some(bucket) = group
                    .weld_buckets
                    .as_ref()
                    .and_then(|b| b.get(&vertices[corner].source_position_index))
                {
                    let source_normal = vertices[corner].source_normal;
                    seam_targets.extend(bucket.iter().map(|&m| m as usize).filter(|&m| {
                        m != corner && vertices[m].source_normal == source_normal
                    }));
                }
                for &target in &seam_targets {
                    let v = &mut vertices[target];
                    v.normal += normal;
                    v.tangent += u_dir;
                    v.bitangent += v_dir;
                }
            }
        }
    }

    let mut invalid = 0;
    for v in vertices.iter_mut() {
        if v.normal.length() == 0.0 || v.tangent.length() == 0.0 || v.bitangent.length() == 0.0 {
            invalid += 1;
        }

        let n = v.normal.normalize_or_zero();
        let t = (v.tangent - n * n.dot(v.tangent)).normalize_or_zero();
        let handedness = if n.cross(t).dot(v.bitangent) < 0.0 {
            -1.0
        } else {
            1.0
        };
        v.normal = n;
        v.tangent = t;
        v.bitangent = n.cross(t) * handedness;
    }
    invalid
}
