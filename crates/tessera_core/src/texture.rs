//! Textures sampled by materials and the skybox.
//!
//! Pixel data is stored as linear `f64` values, row-major, with row 0 at `v = 0`.
//! sRGB input is linearized once at construction; sampling never converts.

use tessera_math::color::{convert_to_linear_space, to_grayscale, UNDEFINED_COLOR};
use tessera_math::{Color, ColorRgba, DVec4, TextureUv};
use thiserror::Error;

/// Errors that can occur when building a texture.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextureError {
    #[error("Invalid texture dimensions: {width}x{height}x{channels}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        channels: usize,
    },

    #[error("Texture data has {actual} values, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// Sentinel returned by [`wrap_uv`] when a clamp-to-border lookup falls outside `[0, 1]`.
pub const BORDER_UV: TextureUv = TextureUv::new(-1.0, -1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilteringMode {
    Nearest,
    #[default]
    Bilinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrappingMode {
    Repeat,
    #[default]
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Encoding of the values handed to [`Texture::from_pixels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Linear,
    Srgb,
}

/// Fold one texture coordinate into `[0, 1]`. `None` means "outside the border".
pub fn wrap_coordinate(coord: f64, mode: WrappingMode) -> Option<f64> {
    match mode {
        WrappingMode::Repeat => Some(coord - coord.floor()),
        WrappingMode::MirroredRepeat => {
            let t = coord.abs() % 2.0;
            Some(if t <= 1.0 { t } else { 2.0 - t })
        }
        WrappingMode::ClampToEdge => Some(coord.clamp(0.0, 1.0)),
        WrappingMode::ClampToBorder => (0.0..=1.0).contains(&coord).then_some(coord),
    }
}

/// Wrap a UV pair, returning [`BORDER_UV`] when either coordinate leaves the border.
pub fn wrap_uv(uv: TextureUv, mode: WrappingMode) -> TextureUv {
    match (wrap_coordinate(uv.x, mode), wrap_coordinate(uv.y, mode)) {
        (Some(u), Some(v)) => TextureUv::new(u, v),
        _ => BORDER_UV,
    }
}

/// A 2D image sampled with a filtering and wrapping mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f64>,
    filtering: FilteringMode,
    wrapping: WrappingMode,
    border_color: ColorRgba,
}

impl Texture {
    /// Build a texture from interleaved pixel values.
    ///
    /// Channel counts other than 1, 3 and 4 are accepted but sample as magenta.
    pub fn from_pixels(
        width: usize,
        height: usize,
        channels: usize,
        mut data: Vec<f64>,
        color_space: ColorSpace,
    ) -> TextureResult<Self> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(TextureError::InvalidDimensions {
                width,
                height,
                channels,
            });
        }
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(TextureError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        if !matches!(channels, 1 | 3 | 4) {
            log::error!("Unsupported texture channel count: {channels}");
        }

        if color_space == ColorSpace::Srgb {
            for (i, value) in data.iter_mut().enumerate() {
                // alpha stays linear
                if channels == 4 && i % 4 == 3 {
                    continue;
                }
                *value = convert_to_linear_space(*value);
            }
        }

        Ok(Self {
            width,
            height,
            channels,
            data,
            filtering: FilteringMode::default(),
            wrapping: WrappingMode::default(),
            border_color: DVec4::new(0.0, 0.0, 0.0, 1.0),
        })
    }

    /// 1x1 RGB texture.
    pub fn solid_color(color: Color) -> Self {
        Self::constant(vec![color.x, color.y, color.z])
    }

    /// 1x1 single channel texture.
    pub fn solid_value(value: f64) -> Self {
        Self::constant(vec![value])
    }

    fn constant(data: Vec<f64>) -> Self {
        Self {
            width: 1,
            height: 1,
            channels: data.len(),
            data,
            filtering: FilteringMode::default(),
            wrapping: WrappingMode::default(),
            border_color: DVec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }

    pub fn with_filtering(mut self, filtering: FilteringMode) -> Self {
        self.filtering = filtering;
        self
    }

    pub fn with_wrapping(mut self, wrapping: WrappingMode) -> Self {
        self.wrapping = wrapping;
        self
    }

    pub fn with_border_color(mut self, border_color: ColorRgba) -> Self {
        self.border_color = border_color;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn filtering(&self) -> FilteringMode {
        self.filtering
    }

    pub fn wrapping(&self) -> WrappingMode {
        self.wrapping
    }

    /// First channel at `uv`.
    pub fn value_1d(&self, uv: TextureUv) -> f64 {
        self.value_4d(uv).x
    }

    /// RGB at `uv`.
    pub fn value_3d(&self, uv: TextureUv) -> Color {
        self.value_4d(uv).truncate()
    }

    /// RGBA at `uv`, after wrapping and filtering.
    pub fn value_4d(&self, uv: TextureUv) -> ColorRgba {
        if !matches!(self.channels, 1 | 3 | 4) {
            return UNDEFINED_COLOR;
        }

        let uv = wrap_uv(uv, self.wrapping);
        if uv == BORDER_UV {
            return self.border();
        }

        match self.filtering {
            FilteringMode::Nearest => self.nearest(uv),
            FilteringMode::Bilinear => self.bilinear(uv),
        }
    }

    fn border(&self) -> ColorRgba {
        if self.channels == 1 {
            let g = to_grayscale(self.border_color.truncate());
            DVec4::new(g, g, g, 1.0)
        } else {
            self.border_color
        }
    }

    fn nearest(&self, uv: TextureUv) -> ColorRgba {
        let x = ((uv.x * self.width as f64) as usize).min(self.width - 1);
        let y = ((uv.y * self.height as f64) as usize).min(self.height - 1);
        self.texel(x, y)
    }

    fn bilinear(&self, uv: TextureUv) -> ColorRgba {
        let (x0, x1, dx) = Self::filter_axis(uv.x, self.width);
        let (y0, y1, dy) = Self::filter_axis(uv.y, self.height);

        let top = lerp(self.texel(x0, y0), self.texel(x1, y0), dx);
        let bottom = lerp(self.texel(x0, y1), self.texel(x1, y1), dx);
        lerp(top, bottom, dy)
    }

    /// Neighbouring texel indices and blend factor along one axis, texel centres at `i + 0.5`.
    fn filter_axis(coord: f64, size: usize) -> (usize, usize, f64) {
        let max = size as i64 - 1;
        let x = coord * size as f64 - 0.5;
        let x0 = (x as i64).clamp(0, max);
        let x1 = ((x + 1.0) as i64).clamp(0, max);
        let dx = (x - x0 as f64).clamp(0.0, 1.0);
        (x0 as usize, x1 as usize, dx)
    }

    /// Texel expanded to RGBA: grey replicates, RGB gets alpha 1.
    fn texel(&self, x: usize, y: usize) -> ColorRgba {
        let i = (y * self.width + x) * self.channels;
        let d = &self.data[i..i + self.channels];
        match self.channels {
            1 => DVec4::new(d[0], d[0], d[0], 1.0),
            3 => DVec4::new(d[0], d[1], d[2], 1.0),
            _ => DVec4::new(d[0], d[1], d[2], d[3]),
        }
    }
}

/// `a + (b - a) * t`, exact when `a == b`.
fn lerp(a: ColorRgba, b: ColorRgba, t: f64) -> ColorRgba {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    /// 2x1 texture: black on the left, white on the right.
    fn gradient() -> Texture {
        Texture::from_pixels(2, 1, 1, vec![0.0, 1.0], ColorSpace::Linear).unwrap()
    }

    #[test]
    fn test_wrap_repeat() {
        assert!(approx_eq(wrap_coordinate(1.25, WrappingMode::Repeat).unwrap(), 0.25));
        assert!(approx_eq(wrap_coordinate(-0.25, WrappingMode::Repeat).unwrap(), 0.75));
    }

    #[test]
    fn test_wrap_mirrored_repeat() {
        let m = WrappingMode::MirroredRepeat;
        assert!(approx_eq(wrap_coordinate(0.3, m).unwrap(), 0.3));
        assert!(approx_eq(wrap_coordinate(1.25, m).unwrap(), 0.75));
        assert!(approx_eq(wrap_coordinate(-0.25, m).unwrap(), 0.25));
        assert!(approx_eq(wrap_coordinate(2.5, m).unwrap(), 0.5));
    }

    #[test]
    fn test_wrap_clamp_modes() {
        assert_eq!(wrap_coordinate(1.5, WrappingMode::ClampToEdge), Some(1.0));
        assert_eq!(wrap_coordinate(-3.0, WrappingMode::ClampToEdge), Some(0.0));
        assert_eq!(wrap_coordinate(1.5, WrappingMode::ClampToBorder), None);
        assert_eq!(wrap_uv(TextureUv::new(0.5, 1.5), WrappingMode::ClampToBorder), BORDER_UV);
        assert_eq!(
            wrap_uv(TextureUv::new(0.5, 0.5), WrappingMode::ClampToBorder),
            TextureUv::new(0.5, 0.5)
        );
    }

    #[test]
    fn test_border_color() {
        let border = DVec4::new(0.2, 0.4, 0.6, 1.0);
        let rgb = Texture::solid_color(Color::ONE)
            .with_wrapping(WrappingMode::ClampToBorder)
            .with_border_color(border);
        assert_eq!(rgb.value_4d(TextureUv::new(2.0, 0.5)), border);

        let grey = Texture::solid_value(1.0)
            .with_wrapping(WrappingMode::ClampToBorder)
            .with_border_color(border);
        let g = grey.value_4d(TextureUv::new(-1.0, 0.5));
        assert!(approx_eq(g.x, 0.363));
        assert_eq!(g.w, 1.0);
    }

    #[test]
    fn test_nearest_filtering() {
        let tex = gradient().with_filtering(FilteringMode::Nearest);
        assert_eq!(tex.value_1d(TextureUv::new(0.25, 0.5)), 0.0);
        assert_eq!(tex.value_1d(TextureUv::new(0.75, 0.5)), 1.0);
        assert_eq!(tex.value_1d(TextureUv::new(1.0, 0.5)), 1.0);
    }

    #[test]
    fn test_bilinear_filtering() {
        let tex = gradient().with_wrapping(WrappingMode::ClampToEdge);
        // texel centres at u = 0.25 and 0.75
        assert!(approx_eq(tex.value_1d(TextureUv::new(0.25, 0.5)), 0.0));
        assert!(approx_eq(tex.value_1d(TextureUv::new(0.5, 0.5)), 0.5));
        assert!(approx_eq(tex.value_1d(TextureUv::new(0.75, 0.5)), 1.0));
        // outside the centres the edge texel holds
        assert!(approx_eq(tex.value_1d(TextureUv::new(0.0, 0.5)), 0.0));
        assert!(approx_eq(tex.value_1d(TextureUv::new(1.0, 0.5)), 1.0));
    }

    #[test]
    fn test_solid_color_is_exact() {
        let sky = Color::new(0.65, 0.65, 0.9);
        let tex = Texture::solid_color(sky);
        for uv in [TextureUv::new(0.0, 0.0), TextureUv::new(0.37, 0.91), TextureUv::new(5.5, -3.2)] {
            assert_eq!(tex.value_3d(uv), sky);
        }
    }

    #[test]
    fn test_channel_expansion() {
        let grey = Texture::solid_value(0.3);
        assert_eq!(grey.value_4d(TextureUv::ZERO), DVec4::new(0.3, 0.3, 0.3, 1.0));

        let rgba = Texture::from_pixels(1, 1, 4, vec![0.1, 0.2, 0.3, 0.4], ColorSpace::Linear)
            .unwrap();
        assert_eq!(rgba.value_4d(TextureUv::ZERO), DVec4::new(0.1, 0.2, 0.3, 0.4));
    }

    #[test]
    fn test_unsupported_channels_sample_magenta() {
        let tex = Texture::from_pixels(1, 1, 2, vec![0.5, 0.5], ColorSpace::Linear).unwrap();
        assert_eq!(tex.value_4d(TextureUv::ZERO), UNDEFINED_COLOR);
    }

    #[test]
    fn test_srgb_ingestion_linearizes_color_but_not_alpha() {
        let tex = Texture::from_pixels(1, 1, 4, vec![0.5, 0.5, 0.5, 0.5], ColorSpace::Srgb).unwrap();
        let value = tex.value_4d(TextureUv::ZERO);
        assert!(approx_eq(value.x, convert_to_linear_space(0.5)));
        assert_eq!(value.w, 0.5);
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(
            Texture::from_pixels(0, 1, 3, vec![], ColorSpace::Linear),
            Err(TextureError::InvalidDimensions {
                width: 0,
                height: 1,
                channels: 3
            })
        );
        assert_eq!(
            Texture::from_pixels(2, 2, 3, vec![0.0; 5], ColorSpace::Linear),
            Err(TextureError::SizeMismatch {
                expected: 12,
                actual: 5
            })
        );
    }
}
