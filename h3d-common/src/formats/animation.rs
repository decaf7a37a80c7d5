//! H3D animation format (.anim)
//!
//! # Layout
//! ```text
//! 0x00: magic "H3DA"
//! 0x04: version u32 (3)
//! 0x08: node_count u32
//! 0x0C: frame_count u32
//! 0x10: per node:
//!       name [u8; 256]
//!       compressed u8 (1 = a single record stands for every frame)
//!       (compressed ? 1 : frame_count) * FrameRecord
//! ```

use glam::{Mat4, Quat, Vec3};

use super::serialization::{read_f32s, ByteReader};
use super::{decode_name, NAME_SIZE};

/// Animation magic bytes
pub const ANIMATION_MAGIC: [u8; 4] = *b"H3DA";

/// Current animation format version
pub const ANIMATION_VERSION: u32 = 3;

/// Animation header (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct AnimationHeader {
    pub version: u32,
    pub node_count: u32,
    pub frame_count: u32,
}

impl AnimationHeader {
    pub const SIZE: usize = 16;

    pub fn new(node_count: u32, frame_count: u32) -> Self {
        Self {
            version: ANIMATION_VERSION,
            node_count,
            frame_count,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&ANIMATION_MAGIC);
        bytes[4..8].copy_from_slice(&self.version.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.node_count.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.frame_count.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE || bytes[0..4] != ANIMATION_MAGIC {
            return None;
        }
        Some(Self {
            version: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            node_count: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            frame_count: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        })
    }
}

/// One sampled frame of a node (40 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct FrameRecord {
    /// Quaternion xyzw
    pub rotation: [f32; 4],
    pub translation: [f32; 3],
    pub scale: [f32; 3],
}

impl FrameRecord {
    pub const SIZE: usize = 40;

    /// Decompose an affine frame matrix.
    ///
    /// A negative determinant flips the sign of the x scale. A matrix with a
    /// collapsed axis keeps its translation and scale with identity rotation.
    pub fn from_matrix(m: &Mat4) -> Self {
        let translation = m.w_axis.truncate();
        let lengths = Vec3::new(
            m.x_axis.truncate().length(),
            m.y_axis.truncate().length(),
            m.z_axis.truncate().length(),
        );
        if lengths.x == 0.0 || lengths.y == 0.0 || lengths.z == 0.0 {
            return Self {
                rotation: Quat::IDENTITY.to_array(),
                translation: translation.to_array(),
                scale: lengths.to_array(),
            };
        }
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Self {
            rotation: rotation.to_array(),
            translation: translation.to_array(),
            scale: scale.to_array(),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        let values = self
            .rotation
            .iter()
            .chain(self.translation.iter())
            .chain(self.scale.iter());
        for (chunk, value) in bytes.chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let mut values = [0.0f32; 10];
        read_f32s(&bytes[..Self::SIZE], &mut values);
        Some(Self {
            rotation: [values[0], values[1], values[2], values[3]],
            translation: [values[4], values[5], values[6]],
            scale: [values[7], values[8], values[9]],
        })
    }

    /// Rebuild the frame matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::from_array(self.scale),
            Quat::from_array(self.rotation),
            Vec3::from_array(self.translation),
        )
    }
}

/// A node track read back from an animation file
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTrack {
    pub name: String,
    pub compressed: bool,
    pub frames: Vec<FrameRecord>,
}

/// Fully parsed animation file
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFile {
    pub header: AnimationHeader,
    pub tracks: Vec<AnimationTrack>,
}

impl AnimationFile {
    /// Parse a complete `.anim` payload
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let mut reader = ByteReader::new(bytes);
        let header: AnimationHeader = reader.record()?;

        // Name plus compression flag is the smallest possible track
        let mut tracks = Vec::with_capacity(reader.capacity(header.node_count, NAME_SIZE + 1));
        for _ in 0..header.node_count {
            let name = decode_name(reader.take(NAME_SIZE)?);
            let compressed = match reader.u8()? {
                0 => false,
                1 => true,
                _ => return None,
            };
            let count = if compressed { 1 } else { header.frame_count };
            let mut frames = Vec::with_capacity(reader.capacity(count, FrameRecord::SIZE));
            for _ in 0..count {
                frames.push(reader.record::<FrameRecord>()?);
            }
            tracks.push(AnimationTrack {
                name,
                compressed,
                frames,
            });
        }

        if !reader.is_empty() {
            return None;
        }
        Some(Self { header, tracks })
    }
}
