//! H3D geometry format (.geo)
//!
//! # Layout
//! ```text
//! 0x00: magic "H3DG"
//! 0x04: version u32 (5)
//! 0x08: joint_count u32 (real joints + 1 identity entry)
//! 0x0C: joint_count * mat4 (16 f32, column-major), entry 0 = identity
//! var:  stream_count u32, vertex_count u32
//!       per stream: stream_id u32, element_size u32, vertex_count * element
//! var:  index_count u32, index_count * u32
//! var:  morph_target_count u32
//!       per target: name [u8; 256], diff_count u32, diff_count * u32 vertex ids,
//!                   stream_count u32 (4),
//!                   per stream: stream_id u32, element_size u32 (12),
//!                               diff_count * f32x3
//! ```

use super::serialization::{read_f32s, ByteReader};
use super::{decode_name, NAME_SIZE};

/// Geometry magic bytes
pub const GEOMETRY_MAGIC: [u8; 4] = *b"H3DG";

/// Current geometry format version
pub const GEOMETRY_VERSION: u32 = 5;

/// Engine-side ceiling on joint count (including the identity entry)
pub const MAX_JOINT_COUNT: usize = 75;

/// Geometry header (12 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct GeometryHeader {
    pub version: u32,
    pub joint_count: u32,
}

impl GeometryHeader {
    pub const SIZE: usize = 12;

    pub fn new(joint_count: u32) -> Self {
        Self {
            version: GEOMETRY_VERSION,
            joint_count,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&GEOMETRY_MAGIC);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.joint_count.to_le_bytes());
        bytes
    }

    /// Read header from bytes, rejecting foreign magic
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE || bytes[0..4] != GEOMETRY_MAGIC {
            return None;
        }
        Some(Self {
            version: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            joint_count: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }
}

/// Per-stream header (8 bytes), shared by vertex and morph streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct StreamHeader {
    pub stream_id: u32,
    pub element_size: u32,
}

impl StreamHeader {
    pub const SIZE: usize = 8;

    pub fn new(stream_id: u32, element_size: u32) -> Self {
        Self {
            stream_id,
            element_size,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.stream_id.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.element_size.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            stream_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            element_size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}

/// Vertex stream ids in write order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum VertexStream {
    /// f32x3
    Position = 0,
    /// i16x3, snorm
    Normal = 1,
    /// i16x3, snorm
    Tangent = 2,
    /// i16x3, snorm
    Bitangent = 3,
    /// u8x4, skinned models only
    JointIndices = 4,
    /// u8x4 unorm, skinned models only
    JointWeights = 5,
    /// f32x2
    TexCoord0 = 6,
    /// f32x2
    TexCoord1 = 7,
}

impl VertexStream {
    /// Streams written for an unskinned model
    pub const STATIC: [VertexStream; 6] = [
        Self::Position,
        Self::Normal,
        Self::Tangent,
        Self::Bitangent,
        Self::TexCoord0,
        Self::TexCoord1,
    ];

    /// Streams written for a skinned model
    pub const SKINNED: [VertexStream; 8] = [
        Self::Position,
        Self::Normal,
        Self::Tangent,
        Self::Bitangent,
        Self::JointIndices,
        Self::JointWeights,
        Self::TexCoord0,
        Self::TexCoord1,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    /// Bytes per vertex in this stream
    pub const fn element_size(self) -> u32 {
        match self {
            Self::Position => 12,
            Self::Normal | Self::Tangent | Self::Bitangent => 6,
            Self::JointIndices | Self::JointWeights => 4,
            Self::TexCoord0 | Self::TexCoord1 => 8,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::SKINNED.into_iter().find(|s| s.id() == id)
    }

    /// Stream set for a model with or without joints
    pub fn layout(skinned: bool) -> &'static [VertexStream] {
        if skinned {
            &Self::SKINNED
        } else {
            &Self::STATIC
        }
    }
}

/// Morph target stream ids, every element is f32x3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MorphStream {
    Position = 0,
    Normal = 1,
    Tangent = 2,
    Bitangent = 3,
}

impl MorphStream {
    pub const ALL: [MorphStream; 4] = [
        Self::Position,
        Self::Normal,
        Self::Tangent,
        Self::Bitangent,
    ];

    pub const ELEMENT_SIZE: u32 = 12;

    pub fn id(self) -> u32 {
        self as u32
    }
}

/// A vertex stream read back from a geometry file
#[derive(Debug, Clone, PartialEq)]
pub struct StreamData {
    pub header: StreamHeader,
    pub data: Vec<u8>,
}

/// A morph target read back from a geometry file
#[derive(Debug, Clone, PartialEq)]
pub struct MorphTargetData {
    pub name: String,
    pub vertex_indices: Vec<u32>,
    /// Indexed by [`MorphStream`] id
    pub streams: Vec<Vec<[f32; 3]>>,
}

/// Fully parsed geometry file
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryFile {
    pub header: GeometryHeader,
    /// Column-major joint matrices, entry 0 is identity
    pub joint_matrices: Vec<[f32; 16]>,
    pub vertex_count: u32,
    pub streams: Vec<StreamData>,
    pub indices: Vec<u32>,
    pub morph_targets: Vec<MorphTargetData>,
}

impl GeometryFile {
    /// Parse a complete `.geo` payload.
    ///
    /// Returns `None` on bad magic, truncated data or trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let mut reader = ByteReader::new(bytes);
        let header: GeometryHeader = reader.record()?;

        let mut joint_matrices = Vec::with_capacity(reader.capacity(header.joint_count, 64));
        for _ in 0..header.joint_count {
            let mut m = [0.0f32; 16];
            read_f32s(reader.take(64)?, &mut m);
            joint_matrices.push(m);
        }

        let stream_count = reader.u32()?;
        let vertex_count = reader.u32()?;
        let mut streams = Vec::with_capacity(reader.capacity(stream_count, StreamHeader::SIZE));
        for _ in 0..stream_count {
            let header: StreamHeader = reader.record()?;
            let len = (header.element_size as usize).checked_mul(vertex_count as usize)?;
            let data = reader.take(len)?.to_vec();
            streams.push(StreamData { header, data });
        }

        let index_count = reader.u32()?;
        let mut indices = Vec::with_capacity(reader.capacity(index_count, 4));
        for _ in 0..index_count {
            indices.push(reader.u32()?);
        }

        let target_count = reader.u32()?;
        // Name plus diff count is the smallest possible target
        let mut morph_targets = Vec::with_capacity(reader.capacity(target_count, NAME_SIZE + 4));
        for _ in 0..target_count {
            let name = decode_name(reader.take(NAME_SIZE)?);
            let diff_count = reader.u32()?;
            let mut vertex_indices = Vec::with_capacity(reader.capacity(diff_count, 4));
            for _ in 0..diff_count {
                vertex_indices.push(reader.u32()?);
            }
            let morph_stream_count = reader.u32()?;
            let mut streams = vec![Vec::new(); MorphStream::ALL.len()];
            for _ in 0..morph_stream_count {
                let header: StreamHeader = reader.record()?;
                if header.element_size != MorphStream::ELEMENT_SIZE {
                    return None;
                }
                let element_size = MorphStream::ELEMENT_SIZE as usize;
                let mut values = Vec::with_capacity(reader.capacity(diff_count, element_size));
                for _ in 0..diff_count {
                    values.push([reader.f32()?, reader.f32()?, reader.f32()?]);
                }
                let slot = streams.get_mut(header.stream_id as usize)?;
                *slot = values;
            }
            morph_targets.push(MorphTargetData {
                name,
                vertex_indices,
                streams,
            });
        }

        if !reader.is_empty() {
            return None;
        }

        Some(Self {
            header,
            joint_matrices,
            vertex_count,
            streams,
            indices,
            morph_targets,
        })
    }

    /// Look up a vertex stream by id
    pub fn stream(&self, stream: VertexStream) -> Option<&StreamData> {
        self.streams
            .iter()
            .find(|s| s.header.stream_id == stream.id())
    }

    /// Decoded position stream
    pub fn positions(&self) -> Vec<[f32; 3]> {
        self.stream(VertexStream::Position)
            .map(|s| {
                s.data
                    .chunks_exact(12)
                    .map(|c| {
                        let mut p = [0.0f32; 3];
                        read_f32s(c, &mut p);
                        p
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Decoded snorm16 stream (normal, tangent or bitangent) as raw i16 triples
    pub fn packed_directions(&self, stream: VertexStream) -> Vec<[i16; 3]> {
        self.stream(stream)
            .map(|s| {
                s.data
                    .chunks_exact(6)
                    .map(|c| {
                        [
                            i16::from_le_bytes([c[0], c[1]]),
                            i16::from_le_bytes([c[2], c[3]]),
                            i16::from_le_bytes([c[4], c[5]]),
                        ]
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
