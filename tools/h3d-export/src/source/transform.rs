//! Transform stack ops and axis conversion

use glam::{Mat4, Vec3, Vec4};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// 16 floats, row-major
    Matrix,
    /// xyz
    Translate,
    /// axis xyz + angle in degrees
    Rotate,
    /// xyz
    Scale,
}

impl TransformKind {
    /// Number of values an animation channel must supply per frame
    pub fn component_count(self) -> usize {
        match self {
            Self::Matrix => 16,
            Self::Translate | Self::Scale => 3,
            Self::Rotate => 4,
        }
    }
}

/// One entry of a node's transform stack
#[derive(Debug, Clone, Deserialize)]
pub struct TransformOp {
    /// Scoped id targeted by animation channels
    #[serde(default)]
    pub sid: String,
    pub kind: TransformKind,
    pub values: Vec<f32>,
}

impl TransformOp {
    /// Static values padded to a full 16-entry buffer
    pub fn static_values(&self) -> [f32; 16] {
        let mut values = [0.0; 16];
        for (dst, src) in values.iter_mut().zip(&self.values) {
            *dst = *src;
        }
        values
    }

    /// Matrix of this op for the given values
    pub fn matrix(&self, values: &[f32; 16]) -> Mat4 {
        match self.kind {
            TransformKind::Matrix => matrix_from_row_major(values),
            TransformKind::Translate => {
                Mat4::from_translation(Vec3::new(values[0], values[1], values[2]))
            }
            TransformKind::Rotate => {
                let axis = Vec3::new(values[0], values[1], values[2]).normalize_or_zero();
                if axis == Vec3::ZERO {
                    Mat4::IDENTITY
                } else {
                    Mat4::from_axis_angle(axis, values[3].to_radians())
                }
            }
            TransformKind::Scale => Mat4::from_scale(Vec3::new(values[0], values[1], values[2])),
        }
    }
}

/// Build a matrix from 16 row-major floats; short input leaves zeros
pub fn matrix_from_row_major(values: &[f32]) -> Mat4 {
    let mut cols = [0.0; 16];
    for (dst, src) in cols.iter_mut().zip(values) {
        *dst = *src;
    }
    Mat4::from_cols_array(&cols).transpose()
}

/// Change of basis from a Z-up document to Y-up, `None` for Y-up documents.
///
/// Maps `(x, y, z)` to `(x, z, -y)`.
pub fn axis_conversion(y_up: bool) -> Option<Mat4> {
    if y_up {
        return None;
    }
    Some(Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, -1.0, 0.0),
        Vec4::new(0.0, 1.0, 0.0, 0.0),
        Vec4::W,
    ))
}

/// Express a document-space matrix in engine space
pub fn convert_matrix(m: Mat4, axis: Option<Mat4>) -> Mat4 {
    match axis {
        Some(p) => p * m * p.transpose(),
        None => m,
    }
}

/// Express a document-space position in engine space
pub fn convert_position(p: Vec3, axis: Option<Mat4>) -> Vec3 {
    match axis {
        Some(_) => Vec3::new(p.x, p.z, -p.y),
        None => p,
    }
}
