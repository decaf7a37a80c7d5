//! Model and animation conversion pipeline
//!
//! Runs the stages in order over one document:
//!
//! 1. flatten the scene into joints and meshes
//! 2. number the joints and compute their inverse bind matrices
//! 3. per mesh: resolve controllers, bind the skin, weld every triangle
//!    group into the shared buffers, drop degenerate triangles and collect
//!    morph position deltas
//! 4. tangent basis over all groups, then morph basis deltas
//! 5. release welding maps and optimize every group for the vertex cache

use hashbrown::HashSet;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::ConvertError;
use crate::flatten::{flatten, FlattenedScene};
use crate::mesh::morph::{collect_position_deltas, compute_basis_deltas};
use crate::mesh::optimize::{
    cache_efficiency, optimize_index_order, remove_degenerate_triangles, MAX_CACHE_SIZE,
};
use crate::mesh::tangent::compute_tangent_basis;
use crate::mesh::weld::Welder;
use crate::mesh::{GeometryBuffer, MorphTarget, TriGroup};
use crate::rig::{resolve_controller_stack, Rig};
use crate::scene::{NodeId, SceneGraph};
use crate::source::SourceDocument;

/// Joint count (including the implicit root) the engine can address
pub const MAX_ENGINE_JOINTS: usize = h3d_common::formats::MAX_JOINT_COUNT;

/// Highest LOD level encoded in mesh names
pub const MAX_LOD_LEVEL: u32 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Reorder indices and vertices for the post-transform cache
    pub optimize: bool,
    /// Switch distances written for LOD levels 1 to 4
    pub lod_distances: [f32; 4],
    /// Replace material files that already exist
    pub overwrite_materials: bool,
    /// Prepended to material file names
    pub material_prefix: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            lod_distances: [10.0, 20.0, 40.0, 80.0],
            overwrite_materials: false,
            material_prefix: String::new(),
        }
    }
}

/// Cache efficiency of the optimized groups, averaged per group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheReport {
    pub groups: usize,
    pub atvr_before: f32,
    pub atvr_after: f32,
}

/// Everything the artifact writers need
#[derive(Debug, Clone, Default)]
pub struct ConvertedModel {
    pub graph: SceneGraph,
    pub geometry: GeometryBuffer,
    pub morph_targets: Vec<MorphTarget>,
    pub frame_count: usize,
    pub fully_sampled: bool,
    pub max_lod_level: u32,
    /// Ids of materials referenced by at least one triangle group, in
    /// document order
    pub used_materials: Vec<String>,
    pub cache_report: Option<CacheReport>,
    pub diagnostics: Diagnostics,
}

impl ConvertedModel {
    /// Triangle groups of all meshes, in mesh order
    pub fn tri_groups(&self) -> impl Iterator<Item = &TriGroup> {
        self.graph
            .meshes
            .iter()
            .filter_map(|&id| self.graph.mesh(id))
            .flat_map(|mesh| mesh.tri_groups.iter())
    }
}

/// Node transforms sampled per frame, without any geometry
#[derive(Debug, Clone, Default)]
pub struct ConvertedAnimation {
    pub graph: SceneGraph,
    pub frame_count: usize,
    pub fully_sampled: bool,
    pub diagnostics: Diagnostics,
}

/// Convert a document into a model.
///
/// Document problems are recorded in the returned diagnostics. The only
/// error is a mesh instance that passed validation but has no base
/// geometry.
pub fn convert_model(
    doc: &SourceDocument,
    options: &ConvertOptions,
) -> Result<ConvertedModel, ConvertError> {
    let mut diagnostics = Diagnostics::new();
    let FlattenedScene {
        mut graph,
        frame_count,
        fully_sampled,
    } = flatten(doc, &mut diagnostics);
    finalize_joints(&mut graph, &mut diagnostics);

    let mut geometry = GeometryBuffer::new();
    let mut morph_targets = Vec::new();
    let mut used = HashSet::new();
    let mut max_lod_level = 0;

    for id in graph.meshes.clone() {
        let lod_level = apply_lod_suffix(&mut graph, id);
        max_lod_level = max_lod_level.max(lod_level);
        process_mesh(
            doc,
            &mut graph,
            id,
            &mut geometry,
            &mut morph_targets,
            &mut used,
            &mut diagnostics,
        )?;
    }

    build_tangent_space(&graph, &mut geometry, &mut morph_targets, &mut diagnostics);

    for id in graph.meshes.clone() {
        if let Some(mesh) = graph.mesh_mut(id) {
            mesh.tri_groups
                .iter_mut()
                .for_each(TriGroup::release_weld_buckets);
        }
    }

    let cache_report = if options.optimize {
        let report = optimize_groups(&graph, &mut geometry, &mut morph_targets);
        if let Some(report) = report {
            diagnostics.info(format!(
                "Optimized geometry for vertex cache: from ATVR {:.3} to ATVR {:.3}",
                report.atvr_before, report.atvr_after
            ));
        }
        report
    } else {
        None
    };

    let used_materials = doc
        .materials
        .iter()
        .filter(|m| used.contains(m.id.as_str()))
        .map(|m| m.id.clone())
        .collect();

    Ok(ConvertedModel {
        graph,
        geometry,
        morph_targets,
        frame_count,
        fully_sampled,
        max_lod_level,
        used_materials,
        cache_report,
        diagnostics,
    })
}

/// Convert a document for its animation only.
///
/// Mesh names lose their LOD suffix as in [`convert_model`]. Returns `None`
/// when the document has no scene to sample.
pub fn convert_animation(doc: &SourceDocument) -> Option<ConvertedAnimation> {
    doc.scene.as_ref()?;
    let mut diagnostics = Diagnostics::new();
    let FlattenedScene {
        mut graph,
        frame_count,
        fully_sampled,
    } = flatten(doc, &mut diagnostics);
    finalize_joints(&mut graph, &mut diagnostics);
    // Tracks must carry the same mesh names as the scene graph
    for id in graph.meshes.clone() {
        apply_lod_suffix(&mut graph, id);
    }
    Some(ConvertedAnimation {
        graph,
        frame_count,
        fully_sampled,
        diagnostics,
    })
}

/// Number joints 1..=N in discovery order and invert their scene pose
fn finalize_joints(graph: &mut SceneGraph, diagnostics: &mut Diagnostics) {
    for (i, id) in graph.joints.clone().into_iter().enumerate() {
        if let Some(joint) = graph.joint_mut(id) {
            joint.index = i as u32 + 1;
            joint.inverse_bind_matrix = joint.common.absolute.inverse();
        }
    }
    if graph.joints.len() + 1 > MAX_ENGINE_JOINTS {
        diagnostics.warn(
            DiagnosticKind::DataQuality,
            format!("Model has more than {} joints", MAX_ENGINE_JOINTS),
        );
    }
}

/// Strip a `_lod1` .. `_lod4` name suffix and record the level
fn apply_lod_suffix(graph: &mut SceneGraph, id: NodeId) -> u32 {
    let Some(mesh) = graph.mesh_mut(id) else {
        return 0;
    };
    let name = &mesh.common.name;
    let level = (1..=MAX_LOD_LEVEL).find(|level| name.ends_with(&format!("_lod{}", level)));
    if let Some(level) = level {
        let stripped = name.len() - "_lodN".len();
        mesh.common.name.truncate(stripped);
        mesh.lod_level = level;
    }
    mesh.lod_level
}

fn process_mesh(
    doc: &SourceDocument,
    graph: &mut SceneGraph,
    id: NodeId,
    buffer: &mut GeometryBuffer,
    morph_targets: &mut Vec<MorphTarget>,
    used_materials: &mut HashSet<String>,
    diagnostics: &mut Diagnostics,
) -> Result<(), ConvertError> {
    let Some(mesh) = graph.mesh(id) else {
        return Ok(());
    };
    let name = mesh.common.name.clone();
    let instance = mesh.instance.clone();
    let axis = doc.axis();

    let stack = resolve_controller_stack(doc, &instance.url);
    let skin = stack.skin.filter(|skin| {
        if !skin.is_complete() {
            diagnostics.warn(
                DiagnosticKind::Integrity,
                format!(
                    "Skin controller '{}' is missing information and is ignored",
                    skin.id
                ),
            );
        }
        skin.is_complete()
    });
    let geometry = stack.geometry.ok_or_else(|| ConvertError::Resolution {
        node: name.clone(),
        url: instance.url.clone(),
    })?;

    let rig = match skin {
        Some(skin) => Rig::bind(skin, graph, axis, diagnostics),
        None => Rig::unskinned(),
    };

    let first_vertex = buffer.vertex_count();
    let mut groups = Vec::with_capacity(geometry.triangles.len());
    for source_group in &geometry.triangles {
        let material = match instance
            .material_bindings
            .get(&source_group.material)
            .and_then(|target| doc.find_material(target))
        {
            Some(material) => {
                used_materials.insert(material.id.clone());
                material.name().to_string()
            }
            None => {
                diagnostics.warn(
                    DiagnosticKind::Integrity,
                    format!("Material '{}' not found", source_group.material),
                );
                String::new()
            }
        };

        let welder = Welder {
            geometry,
            rig: &rig,
            graph,
            axis,
        };
        let mut group = welder.weld(source_group, material, buffer, diagnostics);

        let removed =
            remove_degenerate_triangles(&mut group, &buffer.vertices, &mut buffer.indices);
        if removed > 0 {
            diagnostics.info(format!(
                "Removed {} degenerated triangles from mesh {}",
                removed, name
            ));
        }
        groups.push(group);
    }

    if let Some(morph) = stack.morph {
        collect_position_deltas(
            doc,
            morph,
            geometry,
            &buffer.vertices[first_vertex as usize..],
            first_vertex,
            graph,
            axis,
            morph_targets,
            diagnostics,
        );
    }

    if let Some(mesh) = graph.mesh_mut(id) {
        mesh.tri_groups = groups;
    }
    Ok(())
}

fn build_tangent_space(
    graph: &SceneGraph,
    buffer: &mut GeometryBuffer,
    morph_targets: &mut [MorphTarget],
    diagnostics: &mut Diagnostics,
) {
    let groups: Vec<&TriGroup> = graph
        .meshes
        .iter()
        .filter_map(|&id| graph.mesh(id))
        .flat_map(|mesh| mesh.tri_groups.iter())
        .collect();

    let invalid = compute_tangent_basis(
        &mut buffer.vertices,
        &buffer.indices,
        groups.iter().copied(),
    );
    if invalid > 0 {
        diagnostics.warn(
            DiagnosticKind::DataQuality,
            format!("Geometry has zero-length basis vectors ({} vertices)", invalid),
        );
    }

    if morph_targets.is_empty() {
        return;
    }
    let invalid = compute_basis_deltas(&buffer.vertices, &buffer.indices, &groups, morph_targets);
    if invalid > 0 {
        diagnostics.warn(
            DiagnosticKind::DataQuality,
            format!(
                "Morphed geometry has zero-length basis vectors ({} vertices)",
                invalid
            ),
        );
    }
}

fn optimize_groups(
    graph: &SceneGraph,
    buffer: &mut GeometryBuffer,
    morph_targets: &mut [MorphTarget],
) -> Option<CacheReport> {
    let mut groups = 0;
    let mut before = 0.0;
    let mut after = 0.0;

    for mesh in graph.meshes.iter().filter_map(|&id| graph.mesh(id)) {
        for group in &mesh.tri_groups {
            let range = group.index_range();
            before += cache_efficiency(&buffer.indices[range.clone()], MAX_CACHE_SIZE);
            let remap = optimize_index_order(group, &mut buffer.vertices, &mut buffer.indices);
            after += cache_efficiency(&buffer.indices[range], MAX_CACHE_SIZE);
            remap.apply_to_morph_targets(morph_targets);
            groups += 1;
        }
    }

    (groups > 0).then(|| CacheReport {
        groups,
        atvr_before: before / groups as f32,
        atvr_after: after / groups as f32,
    })
}
