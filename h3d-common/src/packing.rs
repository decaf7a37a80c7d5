//! Vertex attribute quantization
//!
//! Conversions used by the geometry writer:
//! - f32 → snorm16 (normal, tangent and bitangent streams)
//! - f32 → unorm8 (joint weight stream)
//!
//! Both truncate toward zero after scaling, matching the engine loaders.

use glam::Vec3;

/// Convert f32 to signed normalized 16-bit integer (snorm16)
///
/// Maps f32 range [-1.0, 1.0] to i16 range [-32767, 32767].
#[inline]
pub fn f32_to_snorm16(value: f32) -> i16 {
    let clamped = value.clamp(-1.0, 1.0);
    (clamped * 32767.0) as i16
}

/// Convert f32 to unsigned normalized 8-bit integer (unorm8)
///
/// Maps f32 range [0.0, 1.0] to u8 range [0, 255].
#[inline]
pub fn f32_to_unorm8(value: f32) -> u8 {
    let clamped = value.clamp(0.0, 1.0);
    (clamped * 255.0) as u8
}

/// Pack a unit direction to 3 x snorm16
#[inline]
pub fn pack_direction_snorm16(dir: Vec3) -> [i16; 3] {
    [
        f32_to_snorm16(dir.x),
        f32_to_snorm16(dir.y),
        f32_to_snorm16(dir.z),
    ]
}

/// Pack joint weights to 4 x unorm8
#[inline]
pub fn pack_weights_unorm8(weights: [f32; 4]) -> [u8; 4] {
    weights.map(f32_to_unorm8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snorm16_range() {
        assert_eq!(f32_to_snorm16(1.0), 32767);
        assert_eq!(f32_to_snorm16(-1.0), -32767);
        assert_eq!(f32_to_snorm16(0.0), 0);
        assert_eq!(f32_to_snorm16(2.0), 32767);
        assert_eq!(f32_to_snorm16(f32::NAN), 0);
    }

    #[test]
    fn test_snorm16_truncates() {
        // 0.5 * 32767 = 16383.5
        assert_eq!(f32_to_snorm16(0.5), 16383);
        assert_eq!(f32_to_snorm16(-0.5), -16383);
    }

    #[test]
    fn test_unorm8_weights() {
        assert_eq!(pack_weights_unorm8([1.0, 0.0, 0.0, 0.0]), [255, 0, 0, 0]);
        assert_eq!(pack_weights_unorm8([0.5, 0.25, 0.25, 0.0]), [127, 63, 63, 0]);
        assert_eq!(f32_to_unorm8(-0.1), 0);
    }

    #[test]
    fn test_pack_direction() {
        assert_eq!(pack_direction_snorm16(Vec3::Y), [0, 32767, 0]);
        assert_eq!(pack_direction_snorm16(Vec3::NEG_Z), [0, 0, -32767]);
    }
}
