//! Mesh processing stages
//!
//! Welding, tangent basis generation, morph target deltas and vertex cache
//! optimization. All stages work on the document-wide [`GeometryBuffer`];
//! every [`TriGroup`] is a view into it.

pub mod morph;
pub mod optimize;
pub mod tangent;
mod types;
pub mod weld;

pub use types::{GeometryBuffer, JointRef, MorphDiff, MorphTarget, TriGroup, Vertex, WeldBuckets};
