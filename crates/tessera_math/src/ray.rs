use crate::{DMat4, DVec3, Interval};

/// Smallest parametric distance accepted by default. Keeps secondary rays from
/// re-hitting the surface they start on.
pub const RAY_EPSILON: f64 = 1e-6;

/// A ray with an origin, a direction and a valid parametric range.
///
/// Rays built with [`Ray::new`] always carry a unit direction. Rays carried into
/// object space with [`Ray::transformed`] keep the scaled direction so that the
/// parameter `t` means the same point in both spaces.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
    pub range: Interval,
}

impl Ray {
    /// Create a ray with a normalized direction and the default range `[RAY_EPSILON, inf)`.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            range: Interval::new(RAY_EPSILON, f64::INFINITY),
        }
    }

    /// Ray from `from` aimed at `to`.
    pub fn between(from: DVec3, to: DVec3) -> Self {
        Self::new(from, to - from)
    }

    /// Replace the valid range.
    pub fn with_range(mut self, range: Interval) -> Self {
        self.range = range;
        self
    }

    /// Point along the ray at parameter `t`.
    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Carry the ray through an affine matrix. The direction is not renormalized.
    pub fn transformed(&self, matrix: &DMat4) -> Ray {
        Ray {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction),
            range: self.range,
        }
    }
}
