//! Binary serialization trait for format headers.
//!
//! Every fixed-size H3D record implements `BinarySerializable`. Writers emit
//! records through [`BinarySerializable::write_to`] and the file readers pull
//! them with [`ByteReader::record`]. Each record still has its own
//! `to_bytes()` returning a fixed-size array.

use std::io::{self, Write};

use super::{AnimationHeader, FrameRecord, GeometryHeader, StreamHeader};

/// Trait for binary-serializable format headers.
///
/// Uses `Vec<u8>` for the return type because associated consts can't size
/// arrays in trait signatures on stable Rust.
pub trait BinarySerializable: Sized {
    /// Size of the serialized header in bytes.
    const SIZE: usize;

    /// Serialize to bytes.
    fn serialize(&self) -> Vec<u8>;

    /// Deserialize from bytes.
    ///
    /// Returns `None` if the byte slice is too short or contains invalid data.
    fn deserialize(bytes: &[u8]) -> Option<Self>;

    /// Append the serialized record to `w`
    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.serialize())
    }
}

macro_rules! impl_binary_serializable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BinarySerializable for $ty {
                const SIZE: usize = <$ty>::SIZE;

                fn serialize(&self) -> Vec<u8> {
                    self.to_bytes().to_vec()
                }

                fn deserialize(bytes: &[u8]) -> Option<Self> {
                    Self::from_bytes(bytes)
                }
            }
        )*
    };
}

impl_binary_serializable!(GeometryHeader, StreamHeader, AnimationHeader, FrameRecord);

/// Little-endian cursor over a format payload
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub(crate) fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(len)?;
        let slice = self.bytes.get(self.offset..end)?;
        self.offset = end;
        Some(slice)
    }

    /// Next fixed-size record
    pub(crate) fn record<T: BinarySerializable>(&mut self) -> Option<T> {
        T::deserialize(self.take(T::SIZE)?)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    /// Capacity for `count` elements of at least `element_size` bytes each.
    ///
    /// Bounded by the unread payload, so a corrupt count cannot reserve more
    /// than the file could hold.
    pub(crate) fn capacity(&self, count: u32, element_size: usize) -> usize {
        (count as usize).min(self.remaining() / element_size.max(1))
    }

    pub(crate) fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub(crate) fn u32(&mut self) -> Option<u32> {
        self.take(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn f32(&mut self) -> Option<f32> {
        self.u32().map(f32::from_bits)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.offset >= self.bytes.len()
    }
}

pub(crate) fn read_f32s(bytes: &[u8], out: &mut [f32]) {
    for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}
