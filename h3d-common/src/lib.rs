//! Shared format definitions for H3D engine assets
//!
//! This crate holds the binary layouts written by the asset tools and read back
//! by the engine loaders (and by tests):
//! - `formats` - H3DG geometry and H3DA animation headers, stream ids, records
//! - `packing` - quantization of normals and skin weights

pub mod formats;
pub mod packing;
