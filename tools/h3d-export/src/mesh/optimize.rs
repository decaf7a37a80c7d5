//! Degenerate triangle removal and post-transform cache optimization
//!
//! Index reordering follows Tom Forsyth's "Linear-Speed Vertex Cache
//! Optimisation": every vertex is scored from its position in a simulated
//! LRU cache and from how many triangles still use it, and the best scoring
//! triangle is emitted next. Candidates come from the triangles of cached
//! vertices first; only if the cache yields nothing are all remaining
//! triangles scanned. Vertices are then renumbered in first-use order.

use std::collections::{BTreeSet, VecDeque};

use super::{MorphTarget, TriGroup, Vertex};

/// Simulated post-transform cache size
pub const MAX_CACHE_SIZE: usize = 16;

/// Triangles with a smaller doubled area are degenerate
const ZERO_EPSILON: f32 = 32.0 * f32::MIN_POSITIVE;

/// Drop zero-area triangles of `group` from `indices`.
///
/// Indices of groups after this one move down accordingly, so this is meant
/// to run while `group` is the last group in the buffer. Returns the number
/// of removed triangles.
pub fn remove_degenerate_triangles(
    group: &mut TriGroup,
    vertices: &[Vertex],
    indices: &mut Vec<u32>,
) -> usize {
    let range = group.index_range();
    let kept: Vec<u32> = indices[range.clone()]
        .chunks_exact(3)
        .filter(|t| {
            let v0 = vertices[t[0] as usize].position;
            let v1 = vertices[t[1] as usize].position;
            let v2 = vertices[t[2] as usize].position;
            (v2 - v0).cross(v1 - v0).length() >= ZERO_EPSILON
        })
        .flatten()
        .copied()
        .collect();

    let removed = (range.len() - kept.len()) / 3;
    group.count = kept.len() as u32;
    indices.splice(range, kept);
    removed
}

/// Average transform to vertex ratio of an index list under a FIFO cache.
///
/// Computed as `(indices + misses) / indices`, lower is better. An empty
/// list reports 1.0.
pub fn cache_efficiency(indices: &[u32], cache_size: usize) -> f32 {
    if indices.is_empty() {
        return 1.0;
    }
    let mut cache = VecDeque::with_capacity(cache_size + 1);
    let mut misses = 0usize;
    for &index in indices {
        if !cache.contains(&index) {
            cache.push_back(index);
            if cache.len() > cache_size {
                cache.pop_front();
            }
            misses += 1;
        }
    }
    (indices.len() + misses) as f32 / indices.len() as f32
}

/// Old → new vertex ids produced by [`optimize_index_order`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexRemap {
    start: u32,
    new_ids: Vec<u32>,
}

impl VertexRemap {
    /// New id of `old`, `None` outside the optimized group's vertex range
    pub fn get(&self, old: u32) -> Option<u32> {
        let offset = old.checked_sub(self.start)?;
        self.new_ids.get(offset as usize).copied()
    }

    /// Rewrite morph diffs that reference the optimized vertex range
    pub fn apply_to_morph_targets(&self, targets: &mut [MorphTarget]) {
        for diff in targets.iter_mut().flat_map(|t| t.diffs.iter_mut()) {
            if let Some(new) = self.get(diff.vertex_index) {
                diff.vertex_index = new;
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct OptVertex {
    score: f32,
    /// Remaining faces using this vertex
    faces: BTreeSet<usize>,
}

impl OptVertex {
    fn update_score(&mut self, cache_index: Option<usize>) {
        if self.faces.is_empty() {
            self.score = 0.0;
            return;
        }
        let cache_score = match cache_index {
            None => 0.0,
            Some(i) if i < 3 => 0.75,
            Some(i) => (1.0 - (i - 3) as f32 / MAX_CACHE_SIZE as f32).powf(1.5),
        };
        self.score = cache_score + 2.0 * (self.faces.len() as f32).powf(-0.5);
    }
}

/// Reorder the triangles of `group` for cache locality and renumber its
/// vertices in first-use order.
///
/// `vertices` and `indices` are rewritten in place within the group's
/// ranges. Vertices of the range that no triangle uses keep their relative
/// order after all used ones. The returned remap must be applied to
/// anything else that stores vertex ids of this group.
pub fn optimize_index_order(
    group: &TriGroup,
    vertices: &mut [Vertex],
    indices: &mut [u32],
) -> VertexRemap {
    let start = group.vertices.start;
    let vertex_count = group.vertices.len();
    let range = group.index_range();

    let mut opt_vertices = vec![OptVertex::default(); vertex_count];
    let faces: Vec<[usize; 3]> = indices[range.clone()]
        .chunks_exact(3)
        .map(|t| [t[0], t[1], t[2]].map(|i| (i - start) as usize))
        .collect();
    for (face, verts) in faces.iter().enumerate() {
        for &v in verts {
            opt_vertices[v].faces.insert(face);
        }
    }
    for v in &mut opt_vertices {
        v.update_score(None);
    }

    let face_score = |opt: &[OptVertex], face: usize| -> f32 {
        faces[face].iter().map(|&v| opt[v].score).sum()
    };

    let mut remaining: BTreeSet<usize> = (0..faces.len()).collect();
    let mut cache: VecDeque<usize> = VecDeque::with_capacity(MAX_CACHE_SIZE + 3);
    let mut cursor = range.start;

    while !remaining.is_empty() {
        let mut best: Option<usize> = None;
        let mut best_score = -1.0f32;
        for &v in &cache {
            for &face in &opt_vertices[v].faces {
                let score = face_score(&opt_vertices, face);
                if score > best_score {
                    best = Some(face);
                    best_score = score;
                }
            }
        }
        if best.is_none() {
            for &face in &remaining {
                let score = face_score(&opt_vertices, face);
                if score > best_score {
                    best = Some(face);
                    best_score = score;
                }
            }
        }
        let Some(best) = best else {
            break;
        };

        for &v in &faces[best] {
            indices[cursor] = start + v as u32;
            cursor += 1;
            if let Some(pos) = cache.iter().position(|&c| c == v) {
                cache.remove(pos);
            }
            cache.push_front(v);
            opt_vertices[v].faces.remove(&best);
        }
        remaining.remove(&best);

        for (cache_index, &v) in cache.iter().enumerate() {
            opt_vertices[v].update_score(Some(cache_index));
        }
        cache.truncate(MAX_CACHE_SIZE);
    }

    // Renumber in first-use order
    let mut new_ids = vec![u32::MAX; vertex_count];
    let mut next = start;
    for index in &mut indices[range] {
        let slot = &mut new_ids[(*index - start) as usize];
        if *slot == u32::MAX {
            *slot = next;
            next += 1;
        }
        *index = *slot;
    }
    for slot in new_ids.iter_mut().filter(|s| **s == u32::MAX) {
        *slot = next;
        next += 1;
    }

    let group_vertices = &mut vertices[group.vertices.start as usize..group.vertices.end as usize];
    let old: Vec<Vertex> = group_vertices.to_vec();
    for (old_offset, vertex) in old.into_iter().enumerate() {
        group_vertices[(new_ids[old_offset] - start) as usize] = vertex;
    }

    VertexRemap { start, new_ids }
}
