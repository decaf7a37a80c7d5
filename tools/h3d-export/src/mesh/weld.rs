//! Vertex welding
//!
//! Source triangles index positions, normals and texture coordinates
//! independently. Welding turns every distinct attribute tuple into one
//! [`Vertex`] and rewrites the triangles against those vertices. Candidates
//! are only compared against vertices built from the same source position,
//! which the per-group [`WeldBuckets`] map keeps track of.

use glam::{Mat4, Vec3};

use super::{GeometryBuffer, TriGroup, Vertex, WeldBuckets};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::rig::{skin_position, Rig};
use crate::scene::SceneGraph;
use crate::source::{convert_position, IndexEntry, SourceGeometry, SourceTriGroup};

/// Attributes that decide whether two corners share a vertex
#[derive(Debug, Clone, Copy, PartialEq)]
struct WeldKey {
    position: Vec3,
    normal: Vec3,
    texcoords: [Vec3; 4],
}

impl WeldKey {
    fn of(vertex: &Vertex) -> Self {
        Self {
            position: vertex.rest_position,
            normal: vertex.source_normal,
            texcoords: vertex.texcoords,
        }
    }
}

/// Welds the triangle groups of one mesh instance
pub struct Welder<'a> {
    pub geometry: &'a SourceGeometry,
    pub rig: &'a Rig<'a>,
    pub graph: &'a SceneGraph,
    pub axis: Option<Mat4>,
}

impl Welder<'_> {
    /// Weld one source triangle group into `buffer`.
    ///
    /// New vertices and indices are appended; the returned group covers
    /// exactly what was appended and keeps its welding map for the tangent
    /// pass. Triangles referencing positions outside the source array are
    /// dropped with a warning.
    pub fn weld(
        &self,
        group: &SourceTriGroup,
        material: String,
        buffer: &mut GeometryBuffer,
        diagnostics: &mut Diagnostics,
    ) -> TriGroup {
        let first = buffer.index_count();
        let vert_start = buffer.vertex_count();
        let mut buckets = WeldBuckets::new();
        let mut skipped = 0usize;

        for triangle in group.indices.chunks_exact(3) {
            let positions: Option<Vec<Vec3>> = triangle
                .iter()
                .map(|entry| self.geometry.position(entry.position))
                .collect();
            let Some(positions) = positions else {
                skipped += 1;
                continue;
            };

            for (entry, position) in triangle.iter().zip(positions) {
                let index = self.weld_corner(group, entry, position, &mut buckets, buffer);
                buffer.indices.push(index);
            }
        }

        if skipped > 0 {
            diagnostics.warn(
                DiagnosticKind::Integrity,
                format!(
                    "Skipped {} triangles with invalid position indices in geometry '{}'",
                    skipped, self.geometry.id
                ),
            );
        }

        TriGroup {
            material,
            first,
            count: buffer.index_count() - first,
            vertices: vert_start..buffer.vertex_count(),
            weld_buckets: Some(buckets),
        }
    }

    fn weld_corner(
        &self,
        group: &SourceTriGroup,
        entry: &IndexEntry,
        source_position: Vec3,
        buckets: &mut WeldBuckets,
        buffer: &mut GeometryBuffer,
    ) -> u32 {
        let key = WeldKey {
            position: convert_position(source_position, self.axis),
            normal: group.normal(entry),
            texcoords: [0, 1, 2, 3].map(|set| group.texcoord(entry, set)),
        };

        let bucket = buckets.entry(entry.position).or_default();
        if let Some(&existing) = bucket
            .iter()
            .find(|&&v| WeldKey::of(&buffer.vertices[v as usize]) == key)
        {
            return existing;
        }

        let (joints, weights) = self.rig.influences(entry.position);
        let position = skin_position(self.graph, &joints, &weights, key.position);
        let index = buffer.vertex_count();
        buffer.vertices.push(Vertex {
            source_position_index: entry.position,
            rest_position: key.position,
            position,
            source_normal: key.normal,
            texcoords: key.texcoords,
            joints,
            weights,
            ..Default::default()
        });
        bucket.push(index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FloatSource;

    fn entry(position: u32, normal: u32, uv: u32) -> IndexEntry {
        IndexEntry {
            position,
            normal: Some(normal),
            texcoords: vec![Some(uv)],
        }
    }

    fn quad_geometry(entries: Vec<IndexEntry>, normals: Vec<f32>, uvs: Vec<f32>) -> SourceGeometry {
        SourceGeometry {
            id: "quad".into(),
            name: None,
            positions: FloatSource {
                stride: 3,
                data: vec![
                    0.0, 0.0, 0.0, //
                    1.0, 0.0, 0.0, //
                    1.0, 1.0, 0.0, //
                    0.0, 1.0, 0.0,
                ],
            },
            triangles: vec![SourceTriGroup {
                material: "mat".into(),
                normals: Some(FloatSource {
                    stride: 3,
                    data: normals,
                }),
                texcoords: vec![FloatSource {
                    stride: 2,
                    data: uvs,
                }],
                indices: entries,
            }],
        }
    }

    fn weld(geometry: &SourceGeometry, axis: Option<Mat4>) -> (GeometryBuffer, TriGroup) {
        let rig = Rig::unskinned();
        let graph = SceneGraph::new();
        let welder = Welder {
            geometry,
            rig: &rig,
            graph: &graph,
            axis,
        };
        let mut buffer = GeometryBuffer::new();
        let group = welder.weld(
            &geometry.triangles[0],
            "mat".into(),
            &mut buffer,
            &mut Diagnostics::new(),
        );
        (buffer, group)
    }

    #[test]
    fn test_single_triangle_is_not_welded() {
        let geometry = quad_geometry(
            vec![entry(0, 0, 0), entry(1, 1, 1), entry(2, 2, 2)],
            vec![0.0, 0.0, 1.0, 0.0, 0.1, 1.0, 0.1, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0],
        );
        let (buffer, group) = weld(&geometry, None);
        assert_eq!(buffer.vertices.len(), 3);
        assert_eq!(buffer.indices, vec![0, 1, 2]);
        assert_eq!(group.count, 3);
        assert_eq!(group.vertices, 0..3);
    }

    #[test]
    fn test_shared_edge_is_welded() {
        let geometry = quad_geometry(
            vec![
                entry(0, 0, 0),
                entry(1, 0, 1),
                entry(2, 0, 2),
                entry(0, 0, 0),
                entry(2, 0, 2),
                entry(3, 0, 3),
            ],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
        );
        let (buffer, group) = weld(&geometry, None);
        assert_eq!(buffer.vertices.len(), 4);
        assert_eq!(buffer.indices, vec![0, 1, 2, 0, 2, 3]);
        let buckets = group.weld_buckets.as_ref().unwrap();
        assert_eq!(buckets[&0], vec![0]);
    }

    #[test]
    fn test_uv_seam_splits_vertex() {
        let geometry = quad_geometry(
            vec![
                entry(0, 0, 0),
                entry(1, 0, 1),
                entry(2, 0, 2),
                entry(0, 0, 3),
                entry(2, 0, 2),
                entry(3, 0, 3),
            ],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
        );
        let (buffer, group) = weld(&geometry, None);
        assert_eq!(buffer.vertices.len(), 5);
        assert_eq!(group.weld_buckets.as_ref().unwrap()[&0].len(), 2);
    }

    #[test]
    fn test_z_up_positions_are_converted() {
        let geometry = quad_geometry(
            vec![entry(0, 0, 0), entry(1, 0, 0), entry(3, 0, 0)],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.0],
        );
        let axis = crate::source::axis_conversion(false);
        let (buffer, _) = weld(&geometry, axis);
        assert_eq!(buffer.vertices[2].position, Vec3::new(0.0, 0.0, -1.0));
        // Source normals stay in document space
        assert_eq!(buffer.vertices[2].source_normal, Vec3::Z);
    }

    #[test]
    fn test_invalid_position_index_drops_triangle() {
        let geometry = quad_geometry(
            vec![
                entry(0, 0, 0),
                entry(1, 0, 0),
                entry(9, 0, 0),
                entry(0, 0, 0),
                entry(1, 0, 0),
                entry(2, 0, 0),
            ],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.0],
        );
        let rig = Rig::unskinned();
        let graph = SceneGraph::new();
        let welder = Welder {
            geometry: &geometry,
            rig: &rig,
            graph: &graph,
            axis: None,
        };
        let mut buffer = GeometryBuffer::new();
        let mut diagnostics = Diagnostics::new();
        let group = welder.weld(&geometry.triangles[0], "mat".into(), &mut buffer, &mut diagnostics);
        assert_eq!(group.count, 3);
        assert!(diagnostics.has_warning("Skipped 1 triangles"));
    }

    #[test]
    fn test_welding_is_idempotent() {
        let geometry = quad_geometry(
            vec![
                entry(0, 0, 0),
                entry(1, 0, 1),
                entry(2, 0, 2),
                entry(0, 0, 3),
                entry(2, 0, 2),
                entry(3, 0, 3),
            ],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
        );
        let (first, _) = weld(&geometry, None);

        // Feed the welded output back in: one source element per vertex
        let rewelded = SourceGeometry {
            id: "welded".into(),
            name: None,
            positions: FloatSource {
                stride: 3,
                data: first.vertices.iter().flat_map(|v| v.rest_position.to_array()).collect(),
            },
            triangles: vec![SourceTriGroup {
                material: "mat".into(),
                normals: Some(FloatSource {
                    stride: 3,
                    data: first.vertices.iter().flat_map(|v| v.source_normal.to_array()).collect(),
                }),
                texcoords: vec![FloatSource {
                    stride: 3,
                    data: first.vertices.iter().flat_map(|v| v.texcoords[0].to_array()).collect(),
                }],
                indices: first.indices.iter().map(|&i| entry(i, i, i)).collect(),
            }],
        };
        let (second, _) = weld(&rewelded, None);
        assert_eq!(second.vertices.len(), first.vertices.len());
        assert_eq!(second.indices.len(), first.indices.len());
    }
}
