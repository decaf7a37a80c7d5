//! Binary artifact writers
//!
//! Layouts and record types live in h3d-common; fixed-size records go out
//! through `BinarySerializable`, this module only streams a converted model or
//! animation into them.

pub use h3d_common::formats::*;

use std::io::{self, Write};

use glam::Mat4;
use h3d_common::packing::{pack_direction_snorm16, pack_weights_unorm8};

use crate::convert::{ConvertedAnimation, ConvertedModel};
use crate::mesh::{MorphDiff, Vertex};
use crate::scene::{NodeCommon, SceneGraph};

fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_f32s<W: Write>(w: &mut W, values: &[f32]) -> io::Result<()> {
    for value in values {
        w.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Write a complete `.geo` file.
///
/// The model has joint streams whenever the scene has at least one joint,
/// whether or not a skin references it.
pub fn write_geometry<W: Write>(w: &mut W, model: &ConvertedModel) -> io::Result<()> {
    let graph = &model.graph;
    let joint_count = graph.joints.len() as u32 + 1;
    GeometryHeader::new(joint_count).write_to(w)?;

    write_f32s(w, &Mat4::IDENTITY.to_cols_array())?;
    for joint in graph.joints.iter().filter_map(|&id| graph.joint(id)) {
        write_f32s(w, &joint.inverse_bind_matrix.to_cols_array())?;
    }

    let vertices = &model.geometry.vertices;
    let layout = VertexStream::layout(!graph.joints.is_empty());
    write_u32(w, layout.len() as u32)?;
    write_u32(w, vertices.len() as u32)?;
    for &stream in layout {
        StreamHeader::new(stream.id(), stream.element_size()).write_to(w)?;
        for vertex in vertices {
            write_vertex_element(w, stream, vertex)?;
        }
    }

    let indices = &model.geometry.indices;
    write_u32(w, indices.len() as u32)?;
    for &index in indices {
        write_u32(w, index)?;
    }

    write_u32(w, model.morph_targets.len() as u32)?;
    for target in &model.morph_targets {
        w.write_all(&encode_name(&target.name))?;
        write_u32(w, target.diffs.len() as u32)?;
        for diff in &target.diffs {
            write_u32(w, diff.vertex_index)?;
        }

        write_u32(w, MorphStream::ALL.len() as u32)?;
        for stream in MorphStream::ALL {
            StreamHeader::new(stream.id(), MorphStream::ELEMENT_SIZE).write_to(w)?;
            for diff in &target.diffs {
                write_f32s(w, &morph_element(stream, diff).to_array())?;
            }
        }
    }

    Ok(())
}

fn write_vertex_element<W: Write>(
    w: &mut W,
    stream: VertexStream,
    vertex: &Vertex,
) -> io::Result<()> {
    match stream {
        VertexStream::Position => write_f32s(w, &vertex.position.to_array()),
        VertexStream::Normal | VertexStream::Tangent | VertexStream::Bitangent => {
            let direction = match stream {
                VertexStream::Normal => vertex.normal,
                VertexStream::Tangent => vertex.tangent,
                _ => vertex.bitangent,
            };
            for component in pack_direction_snorm16(direction) {
                w.write_all(&component.to_le_bytes())?;
            }
            Ok(())
        }
        VertexStream::JointIndices => {
            // Indices past the byte range are caught by the joint count warning
            w.write_all(&vertex.joint_indices().map(|i| i as u8))
        }
        VertexStream::JointWeights => w.write_all(&pack_weights_unorm8(vertex.weights)),
        VertexStream::TexCoord0 => write_f32s(w, &vertex.texcoords[0].truncate().to_array()),
        VertexStream::TexCoord1 => write_f32s(w, &vertex.texcoords[1].truncate().to_array()),
    }
}

fn morph_element(stream: MorphStream, diff: &MorphDiff) -> glam::Vec3 {
    match stream {
        MorphStream::Position => diff.position,
        MorphStream::Normal => diff.normal,
        MorphStream::Tangent => diff.tangent,
        MorphStream::Bitangent => diff.bitangent,
    }
}

/// Write a complete `.anim` file.
///
/// Joints come first, then meshes; nodes without frames are left out. A
/// track whose frames are all bit-identical is stored as a single record.
pub fn write_animation<W: Write>(w: &mut W, animation: &ConvertedAnimation) -> io::Result<()> {
    let tracks: Vec<&NodeCommon> = animated_nodes(&animation.graph).collect();
    let header = AnimationHeader::new(tracks.len() as u32, animation.frame_count as u32);
    header.write_to(w)?;

    for node in tracks {
        w.write_all(&encode_name(&node.name))?;
        let compressed = is_constant(&node.frames);
        w.write_all(&[compressed as u8])?;
        let count = if compressed { 1 } else { node.frames.len() };
        for frame in &node.frames[..count] {
            FrameRecord::from_matrix(frame).write_to(w)?;
        }
    }

    Ok(())
}

fn animated_nodes(graph: &SceneGraph) -> impl Iterator<Item = &NodeCommon> {
    graph
        .joints
        .iter()
        .chain(graph.meshes.iter())
        .map(|&id| graph.node(id).common())
        .filter(|common| !common.frames.is_empty())
}

/// More than one frame and every frame bit-identical to the first
fn is_constant(frames: &[Mat4]) -> bool {
    let Some((first, rest)) = frames.split_first() else {
        return false;
    };
    let bits = |m: &Mat4| m.to_cols_array().map(f32::to_bits);
    !rest.is_empty() && rest.iter().all(|m| bits(m) == bits(first))
}
