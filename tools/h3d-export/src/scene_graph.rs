//! `.scene.xml` sidecar
//!
//! A textual view of the output node tree: joint trees first, then mesh
//! trees. Each mesh writes its first triangle group as the element itself
//! and every further group as a nested `#`-prefixed mesh. Transforms are
//! written as translation, YXZ Euler rotation in degrees and scale, each
//! omitted when it is the identity.

use std::fmt::Write as _;
use std::io::{self, Write};

use glam::{EulerRot, Mat4, Vec3};

use crate::convert::{ConvertOptions, ConvertedModel};
use crate::mesh::TriGroup;
use crate::scene::{NodeId, OutputNode, SceneGraph};

/// Where the sidecar points its geometry and materials
#[derive(Debug, Clone, Copy)]
pub struct AssetNames<'a> {
    /// Directory prefix relative to the output root, empty or ending in `/`
    pub path: &'a str,
    pub name: &'a str,
}

/// Write the scene graph of `model`
pub fn write_scene_graph<W: Write>(
    w: &mut W,
    model: &ConvertedModel,
    asset: AssetNames<'_>,
    options: &ConvertOptions,
) -> io::Result<()> {
    let mut out = String::new();
    let _ = write!(
        out,
        "<Model name=\"{}\" geometry=\"{}{}.geo\"",
        escape(asset.name),
        escape(asset.path),
        escape(asset.name)
    );
    let lod_count = (model.max_lod_level as usize).min(options.lod_distances.len());
    for (level, distance) in options.lod_distances[..lod_count].iter().enumerate() {
        let _ = write!(out, " lodDist{}=\"{}\"", level + 1, distance);
    }
    out.push_str(">\n");

    if !model.morph_targets.is_empty() {
        out.push_str("\t<!-- Morph targets: ");
        for target in &model.morph_targets {
            let _ = write!(out, "\"{}\" ", target.name.replace("--", "- -"));
        }
        out.push_str("-->\n\n");
    }

    let writer = NodeWriter {
        graph: &model.graph,
        material_prefix: format!("{}{}", asset.path, options.material_prefix),
    };
    let graph = &model.graph;
    for &id in graph.joints.iter().filter(|&&id| is_root(graph, id)) {
        writer.write_node(&mut out, id, 0);
    }
    out.push('\n');
    for &id in graph.meshes.iter().filter(|&&id| is_root(graph, id)) {
        writer.write_node(&mut out, id, 0);
    }

    out.push_str("</Model>\n");
    w.write_all(out.as_bytes())
}

fn is_root(graph: &SceneGraph, id: NodeId) -> bool {
    graph.node(id).common().parent.is_none()
}

struct NodeWriter<'a> {
    graph: &'a SceneGraph,
    material_prefix: String,
}

impl NodeWriter<'_> {
    fn write_node(&self, out: &mut String, id: NodeId, depth: usize) {
        let node = self.graph.node(id);
        let common = node.common();
        let indent = "\t".repeat(depth + 1);
        let transform = transform_attributes(&common.relative);

        let (tag, nested): (&str, &[TriGroup]) = match node {
            OutputNode::Joint(joint) => {
                let _ = write!(
                    out,
                    "{}<Joint name=\"{}\" {}jointIndex=\"{}\"",
                    indent,
                    escape(&common.name),
                    transform,
                    joint.index
                );
                ("Joint", &[])
            }
            OutputNode::Mesh(mesh) => {
                let _ = write!(out, "{}<Mesh name=\"{}\" ", indent, escape(&common.name));
                if mesh.lod_level > 0 {
                    let _ = write!(out, "lodLevel=\"{}\" ", mesh.lod_level);
                }
                let (first, rest) = match mesh.tri_groups.split_first() {
                    Some((first, rest)) => (Some(first), rest),
                    None => (None, &[][..]),
                };
                if let Some(group) = first {
                    out.push_str(&self.material_attribute(group));
                }
                out.push_str(&transform);
                if let Some(group) = first {
                    out.push_str(&batch_attributes(group));
                }
                ("Mesh", rest)
            }
        };

        if nested.is_empty() && common.children.is_empty() {
            out.push_str(" />\n");
            return;
        }

        out.push_str(">\n");
        for group in nested {
            let _ = write!(
                out,
                "{}\t<Mesh name=\"#{}\" ",
                indent,
                escape(&common.name)
            );
            if let Some(mesh) = node.as_mesh().filter(|m| m.lod_level > 0) {
                let _ = write!(out, "lodLevel=\"{}\" ", mesh.lod_level);
            }
            let _ = writeln!(
                out,
                "{}{} />",
                self.material_attribute(group),
                batch_attributes(group)
            );
        }
        for &child in &common.children {
            self.write_node(out, child, depth + 1);
        }
        let _ = writeln!(out, "{}</{}>", indent, tag);
    }

    fn material_attribute(&self, group: &TriGroup) -> String {
        format!(
            "material=\"{}{}.material.xml\" ",
            escape(&self.material_prefix),
            escape(&group.material)
        )
    }
}

fn batch_attributes(group: &TriGroup) -> String {
    format!(
        "batchStart=\"{}\" batchCount=\"{}\" vertRStart=\"{}\" vertREnd=\"{}\"",
        group.first,
        group.count,
        group.vertices.start,
        group.last_vertex()
    )
}

/// Decompose into translation, YXZ Euler angles in degrees and scale
pub fn decompose(m: &Mat4) -> (Vec3, Vec3, Vec3) {
    let translation = m.w_axis.truncate();
    let scale = Vec3::new(
        m.x_axis.truncate().length(),
        m.y_axis.truncate().length(),
        m.z_axis.truncate().length(),
    );
    if scale.cmpeq(Vec3::ZERO).any() {
        return (translation, Vec3::ZERO, scale);
    }

    let (scale, rotation, _) = m.to_scale_rotation_translation();
    let (y, x, z) = rotation.to_euler(EulerRot::YXZ);
    let rotation = Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees());
    (translation, rotation, scale)
}

fn transform_attributes(m: &Mat4) -> String {
    let (t, r, s) = decompose(m);
    let mut out = String::new();
    if t != Vec3::ZERO {
        let _ = write!(out, "tx=\"{}\" ty=\"{}\" tz=\"{}\" ", t.x, t.y, t.z);
    }
    if r != Vec3::ZERO {
        let _ = write!(out, "rx=\"{}\" ry=\"{}\" rz=\"{}\" ", r.x, r.y, r.z);
    }
    if s != Vec3::ONE {
        let _ = write!(out, "sx=\"{}\" sy=\"{}\" sz=\"{}\" ", s.x, s.y, s.z);
    }
    out
}

pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
