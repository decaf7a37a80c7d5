//! H3D binary asset formats
//!
//! Little-endian layouts consumed by the engine's resource loaders:
//! - `.geo` (magic `H3DG`) - joints, vertex streams, indices and morph targets
//! - `.anim` (magic `H3DA`) - sampled per-node TRS tracks
//!
//! Fixed-size headers implement the [`BinarySerializable`] trait. The variable
//! sized sections are described in each module and can be read back with
//! [`GeometryFile::from_bytes`] and [`AnimationFile::from_bytes`].

pub mod animation;
pub mod geometry;
mod serialization;

pub use animation::*;
pub use geometry::*;
pub use serialization::BinarySerializable;

/// Fixed width of every node and morph target name field
pub const NAME_SIZE: usize = 256;

/// Encode a name into a zero-padded fixed-size field.
///
/// Names longer than 255 bytes are cut on a char boundary so the field always
/// keeps a terminating zero.
pub fn encode_name(name: &str) -> [u8; NAME_SIZE] {
    let mut field = [0u8; NAME_SIZE];
    let mut end = name.len().min(NAME_SIZE - 1);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    field[..end].copy_from_slice(&name.as_bytes()[..end]);
    field
}

/// Decode a zero-padded name field
pub fn decode_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
