//! Punctual lights.
//!
//! One [`Light`] struct carries the shared colour and intensity; the variant data
//! lives in [`LightKind`] and the two shading queries dispatch with `match`.

use tessera_math::{Color, DVec3};

/// Largest accepted light intensity.
pub const MAX_LIGHT_INTENSITY: f64 = 10_000.0;

/// Default spot cone angles in degrees.
pub const DEFAULT_SPOT_INNER_ANGLE: f64 = 10.0;
pub const DEFAULT_SPOT_OUTER_ANGLE: f64 = 12.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Parallel light travelling along `direction`.
    Directional { direction: DVec3 },
    /// Omnidirectional light with inverse-square falloff.
    Point { position: DVec3 },
    /// Point light restricted to a cone around `direction`, angles in degrees.
    Spot {
        position: DVec3,
        direction: DVec3,
        inner_angle: f64,
        outer_angle: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: String,
    color: Color,
    intensity: f64,
    kind: LightKind,
}

impl Light {
    pub fn directional(name: impl Into<String>, direction: DVec3) -> Self {
        Self::with_kind(
            name,
            LightKind::Directional {
                direction: direction.normalize_or_zero(),
            },
        )
    }

    pub fn point(name: impl Into<String>, position: DVec3) -> Self {
        Self::with_kind(name, LightKind::Point { position })
    }

    pub fn spot(name: impl Into<String>, position: DVec3, direction: DVec3) -> Self {
        Self::with_kind(
            name,
            LightKind::Spot {
                position,
                direction: direction.normalize_or_zero(),
                inner_angle: DEFAULT_SPOT_INNER_ANGLE,
                outer_angle: DEFAULT_SPOT_OUTER_ANGLE,
            },
        )
    }

    fn with_kind(name: impl Into<String>, kind: LightKind) -> Self {
        Self {
            name: name.into(),
            color: Color::ONE,
            intensity: 1.0,
            kind,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.set_color(color);
        self
    }

    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.set_intensity(intensity);
        self
    }

    /// Set spot cone angles in degrees. Both are clamped to `[0, 90]` and the outer
    /// angle is kept at least as wide as the inner one. No-op for other kinds.
    pub fn with_cone(mut self, inner: f64, outer: f64) -> Self {
        self.set_cone(inner, outer);
        self
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn kind(&self) -> &LightKind {
        &self.kind
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color.clamp(Color::ZERO, Color::ONE);
    }

    pub fn set_intensity(&mut self, intensity: f64) {
        self.intensity = intensity.clamp(0.0, MAX_LIGHT_INTENSITY);
    }

    pub fn set_cone(&mut self, inner: f64, outer: f64) {
        if let LightKind::Spot {
            inner_angle,
            outer_angle,
            ..
        } = &mut self.kind
        {
            let inner = inner.clamp(0.0, 90.0);
            *inner_angle = inner;
            *outer_angle = outer.clamp(inner, 90.0);
        }
    }

    /// Unit vector from `point` toward the light.
    pub fn direction_from_point(&self, point: DVec3) -> DVec3 {
        match self.kind {
            LightKind::Directional { direction } => -direction,
            LightKind::Point { position } | LightKind::Spot { position, .. } => {
                (position - point).normalize_or_zero()
            }
        }
    }

    /// Distance a shadow ray from `point` must travel to reach the light.
    pub fn distance_from_point(&self, point: DVec3) -> f64 {
        match self.kind {
            LightKind::Directional { .. } => f64::INFINITY,
            LightKind::Point { position } | LightKind::Spot { position, .. } => {
                position.distance(point)
            }
        }
    }

    /// Irradiance reaching a surface at `point` with normal `normal`, cosine term included.
    pub fn light_factor(&self, point: DVec3, normal: DVec3) -> Color {
        let to_light = self.direction_from_point(point);
        let cos_theta = normal.dot(to_light).max(0.0);
        let radiant = self.color * self.intensity * cos_theta;

        match self.kind {
            LightKind::Directional { .. } => radiant,
            LightKind::Point { position } => radiant / position.distance_squared(point).max(1e-12),
            LightKind::Spot {
                position,
                direction,
                inner_angle,
                outer_angle,
            } => {
                let cos_inner = inner_angle.to_radians().cos();
                let cos_outer = outer_angle.to_radians().cos();
                let cos_angle = (-to_light).dot(direction);
                let cone = if cos_inner - cos_outer > 1e-12 {
                    ((cos_angle - cos_outer) / (cos_inner - cos_outer)).clamp(0.0, 1.0)
                } else if cos_angle >= cos_inner {
                    1.0
                } else {
                    0.0
                };
                radiant * cone / position.distance_squared(point).max(1e-12)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_directional_light() {
        let light = Light::directional("sun", DVec3::new(0.0, -2.0, 0.0)).with_intensity(3.0);
        assert_eq!(light.direction_from_point(DVec3::new(5.0, 1.0, 2.0)), DVec3::Y);
        assert_eq!(light.distance_from_point(DVec3::ZERO), f64::INFINITY);

        assert_eq!(light.light_factor(DVec3::ZERO, DVec3::Y), Color::splat(3.0));
        assert_eq!(light.light_factor(DVec3::ZERO, DVec3::NEG_Y), Color::ZERO);
        let tilted = DVec3::new(1.0, 1.0, 0.0).normalize();
        assert!(approx_eq(light.light_factor(DVec3::ZERO, tilted).x, 3.0 * tilted.y));
    }

    #[test]
    fn test_point_light_inverse_square() {
        let light = Light::point("bulb", DVec3::new(0.0, 2.0, 0.0)).with_intensity(8.0);
        assert!(approx_eq(light.light_factor(DVec3::ZERO, DVec3::Y).x, 2.0));
        assert!(approx_eq(light.distance_from_point(DVec3::ZERO), 2.0));
    }

    #[test]
    fn test_spot_light_cone() {
        let light = Light::spot("spot", DVec3::new(0.0, 1.0, 0.0), DVec3::NEG_Y)
            .with_cone(10.0, 20.0);

        // straight below: fully inside the inner cone
        assert!(approx_eq(light.light_factor(DVec3::ZERO, DVec3::Y).x, 1.0));

        // 15 degrees off axis: halfway-ish through the falloff band
        let off = DVec3::new(15f64.to_radians().tan(), 0.0, 0.0);
        let factor = light.light_factor(off, DVec3::Y).x;
        assert!(factor > 0.0 && factor < 1.0);

        // 30 degrees off axis: outside
        let outside = DVec3::new(30f64.to_radians().tan(), 0.0, 0.0);
        assert_eq!(light.light_factor(outside, DVec3::Y), Color::ZERO);
    }

    #[test]
    fn test_spot_cone_clamping() {
        let light = Light::spot("spot", DVec3::ZERO, DVec3::NEG_Y).with_cone(50.0, 30.0);
        match light.kind() {
            LightKind::Spot {
                inner_angle,
                outer_angle,
                ..
            } => {
                assert_eq!(*inner_angle, 50.0);
                assert_eq!(*outer_angle, 50.0);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_intensity_clamped() {
        let light = Light::point("p", DVec3::ZERO).with_intensity(1e9);
        assert_eq!(light.intensity(), MAX_LIGHT_INTENSITY);
        let light = light.with_intensity(-1.0);
        assert_eq!(light.intensity(), 0.0);
    }
}
