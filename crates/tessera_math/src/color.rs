//! Linear/sRGB conversion and colour helpers.
//!
//! All shading happens in linear space. These conversions are applied when
//! textures are ingested and when a finished framebuffer is prepared for export.

use glam::{DVec3, DVec4};

/// Linear RGB radiance.
pub type Color = DVec3;

/// Linear RGBA.
pub type ColorRgba = DVec4;

/// Placeholder returned when a texture cannot be sampled.
pub const UNDEFINED_COLOR: ColorRgba = DVec4::new(1.0, 0.0, 1.0, 1.0);

/// sRGB encoded value to linear.
pub fn convert_to_linear_space(value: f64) -> f64 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear value to sRGB encoding.
pub fn convert_to_srgb_space(value: f64) -> f64 {
    if value <= 0.003_130_8 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

/// Luma with the Rec.601 weights.
pub fn to_grayscale(color: Color) -> f64 {
    0.299 * color.x + 0.587 * color.y + 0.114 * color.z
}

/// Plain average of the three channels.
pub fn average(color: Color) -> f64 {
    (color.x + color.y + color.z) / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_round_trip() {
        for i in 0..=1000 {
            let c = i as f64 / 1000.0;
            let back = convert_to_srgb_space(convert_to_linear_space(c));
            assert!((back - c).abs() < 1e-6, "round trip failed for {c}: {back}");
        }
    }

    #[test]
    fn test_linear_segment() {
        assert_eq!(convert_to_linear_space(0.0), 0.0);
        assert!((convert_to_linear_space(0.04) - 0.04 / 12.92).abs() < 1e-15);
        assert!((convert_to_srgb_space(0.003) - 0.003 * 12.92).abs() < 1e-15);
    }

    #[test]
    fn test_known_values() {
        assert!((convert_to_linear_space(1.0) - 1.0).abs() < 1e-12);
        assert!((convert_to_srgb_space(1.0) - 1.0).abs() < 1e-12);
        assert!((convert_to_linear_space(0.5) - 0.214_041).abs() < 1e-5);
    }

    #[test]
    fn test_grayscale_weights_sum_to_one() {
        assert!((to_grayscale(Color::ONE) - 1.0).abs() < 1e-12);
        assert!((to_grayscale(Color::new(0.2, 0.4, 0.6)) - 0.363).abs() < 1e-12);
    }
}
