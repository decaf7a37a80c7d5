//! Animation channels and transform stack evaluation

use glam::Mat4;
use serde::Deserialize;

use super::{SourceDocument, SourceNode};

/// Sampled curve driving one transform op (or one component of it)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimationChannel {
    /// Id of the animated node
    pub target: String,
    /// Scoped id of the animated transform op
    pub sid: String,
    /// Single animated component (X/Y/Z/ANGLE or matrix element)
    #[serde(default)]
    pub component: Option<usize>,
    /// Sample times
    #[serde(default)]
    pub input: Vec<f32>,
    /// Sample values
    #[serde(default)]
    pub output: Vec<f32>,
}

impl SourceDocument {
    /// Number of sampled frames; a static document has one default-pose frame
    pub fn frame_count(&self) -> usize {
        self.animations
            .iter()
            .map(|c| c.input.len())
            .max()
            .unwrap_or(0)
            .max(1)
    }

    pub fn find_channel(&self, target: &str, sid: &str) -> Option<&AnimationChannel> {
        if target.is_empty() || sid.is_empty() {
            return None;
        }
        self.animations
            .iter()
            .find(|c| c.target == target && c.sid == sid)
    }

    /// Local transform of `node` without animation, in document space
    pub fn static_transform(&self, node: &SourceNode) -> Mat4 {
        node.transforms
            .iter()
            .fold(Mat4::IDENTITY, |m, op| m * op.matrix(&op.static_values()))
    }

    /// Local transform of `node` at `frame`, in document space.
    ///
    /// `frame_count` is the document's [`frame_count`](Self::frame_count),
    /// computed once by the caller. Ops without a channel keep their static
    /// value. A channel whose sample count doesn't match the frame count, or a
    /// frame past the end, is ignored and reported through the returned flag.
    pub fn sample_transform(
        &self,
        node: &SourceNode,
        frame: usize,
        frame_count: usize,
    ) -> (Mat4, bool) {
        if frame >= frame_count {
            return (self.static_transform(node), false);
        }
        let mut fully_sampled = true;
        let mut m = Mat4::IDENTITY;

        for op in &node.transforms {
            let mut values = op.static_values();
            if let Some(channel) = self.find_channel(&node.id, &op.sid) {
                match channel.component {
                    Some(component) => {
                        if channel.output.len() == frame_count && component < values.len() {
                            values[component] = channel.output[frame];
                        } else {
                            fully_sampled = false;
                        }
                    }
                    None => {
                        let size = op.kind.component_count();
                        if channel.output.len() == frame_count * size {
                            let start = frame * size;
                            values[..size].copy_from_slice(&channel.output[start..start + size]);
                        } else {
                            fully_sampled = false;
                        }
                    }
                }
            }
            m *= op.matrix(&values);
        }

        (m, fully_sampled)
    }
}
