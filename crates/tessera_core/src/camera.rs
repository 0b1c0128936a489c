//! Physical camera description shared by the viewport and the path tracer.
//!
//! Lens values follow photographic conventions: focal length in millimetres,
//! aperture as an f-number. The camera looks down its local -Z axis.

use tessera_math::{DMat3, DVec3, Interval, MM_TO_M};

use crate::observer::Observer;
use crate::transform::euler_rotation;

pub const FOV_RANGE: Interval = Interval { min: 30.0, max: 120.0 };
pub const FOCAL_LENGTH_RANGE: Interval = Interval { min: 10.0, max: 800.0 };
pub const APERTURE_RANGE: Interval = Interval { min: 1.0, max: 22.0 };
pub const FOCUS_DISTANCE_RANGE: Interval = Interval { min: 0.3, max: 10_000.0 };
pub const MIN_NEAR_PLANE: f64 = 0.01;
pub const MAX_FAR_PLANE: f64 = 10_000.0;

#[derive(Debug)]
pub struct Camera {
    position: DVec3,
    rotation: DVec3,
    horizontal_fov: f64,
    focal_length: f64,
    aperture: f64,
    focus_distance: f64,
    near_plane: f64,
    far_plane: f64,
    depth_of_field: bool,
    changed: Observer<()>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DVec3::ZERO,
            horizontal_fov: 45.0,
            focal_length: 50.0,
            aperture: 2.8,
            focus_distance: 2.0,
            near_plane: 0.1,
            far_plane: 100.0,
            depth_of_field: true,
            changed: Observer::new(),
        }
    }
}

impl Camera {
    pub fn new(position: DVec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    /// Euler angles in degrees `(pitch, yaw, roll)`.
    pub fn rotation(&self) -> DVec3 {
        self.rotation
    }

    /// Horizontal field of view in degrees.
    pub fn horizontal_fov(&self) -> f64 {
        self.horizontal_fov
    }

    /// Focal length in millimetres.
    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn aperture(&self) -> f64 {
        self.aperture
    }

    pub fn focus_distance(&self) -> f64 {
        self.focus_distance
    }

    pub fn near_plane(&self) -> f64 {
        self.near_plane
    }

    pub fn far_plane(&self) -> f64 {
        self.far_plane
    }

    pub fn depth_of_field(&self) -> bool {
        self.depth_of_field
    }

    /// Sensor width in millimetres that gives the current field of view at the current
    /// focal length.
    pub fn sensor_width(&self) -> f64 {
        2.0 * self.focal_length * (self.horizontal_fov.to_radians() * 0.5).tan()
    }

    /// Thin-lens radius in metres, zero when depth of field is off.
    pub fn lens_radius(&self) -> f64 {
        if !self.depth_of_field {
            return 0.0;
        }
        self.focal_length / self.aperture * 0.5 * MM_TO_M
    }

    pub fn rotation_matrix(&self) -> DMat3 {
        DMat3::from_quat(euler_rotation(self.rotation))
    }

    /// Unit view direction in world space.
    pub fn forward(&self) -> DVec3 {
        self.rotation_matrix() * DVec3::NEG_Z
    }

    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
        self.changed.notify(&());
    }

    pub fn set_rotation(&mut self, rotation: DVec3) {
        self.rotation = rotation;
        self.changed.notify(&());
    }

    /// Aim the camera at `target` with zero roll.
    pub fn look_at(&mut self, target: DVec3) {
        let Some(d) = (target - self.position).try_normalize() else {
            return;
        };
        let pitch = d.y.clamp(-1.0, 1.0).asin();
        let yaw = (-d.x).atan2(-d.z);
        self.set_rotation(DVec3::new(pitch.to_degrees(), yaw.to_degrees(), 0.0));
    }

    pub fn set_horizontal_fov(&mut self, degrees: f64) {
        self.horizontal_fov = FOV_RANGE.clamp(degrees);
        self.changed.notify(&());
    }

    pub fn set_focal_length(&mut self, millimetres: f64) {
        self.focal_length = FOCAL_LENGTH_RANGE.clamp(millimetres);
        self.changed.notify(&());
    }

    pub fn set_aperture(&mut self, f_number: f64) {
        self.aperture = APERTURE_RANGE.clamp(f_number);
        self.changed.notify(&());
    }

    pub fn set_focus_distance(&mut self, distance: f64) {
        self.focus_distance = FOCUS_DISTANCE_RANGE.clamp(distance);
        self.changed.notify(&());
    }

    /// Set the clip planes used by the interactive viewport. Far is kept beyond near.
    pub fn set_clip_planes(&mut self, near: f64, far: f64) {
        self.near_plane = near.clamp(MIN_NEAR_PLANE, MAX_FAR_PLANE);
        self.far_plane = far.clamp(self.near_plane, MAX_FAR_PLANE);
        self.changed.notify(&());
    }

    pub fn set_depth_of_field(&mut self, enabled: bool) {
        self.depth_of_field = enabled;
        self.changed.notify(&());
    }

    pub fn on_changed(&mut self) -> &mut Observer<()> {
        &mut self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let camera = Camera::default();
        assert_eq!(camera.horizontal_fov(), 45.0);
        assert_eq!(camera.focal_length(), 50.0);
        assert!((camera.lens_radius() - 50.0 / 2.8 * 0.5 * 0.001).abs() < 1e-15);
        assert!((camera.forward() - DVec3::NEG_Z).length() < 1e-12);
    }

    #[test]
    fn test_setters_clamp() {
        let mut camera = Camera::default();
        camera.set_horizontal_fov(10.0);
        camera.set_focal_length(5000.0);
        camera.set_aperture(0.1);
        camera.set_focus_distance(0.0);
        camera.set_clip_planes(0.0, -5.0);

        assert_eq!(camera.horizontal_fov(), 30.0);
        assert_eq!(camera.focal_length(), 800.0);
        assert_eq!(camera.aperture(), 1.0);
        assert_eq!(camera.focus_distance(), 0.3);
        assert_eq!(camera.near_plane(), MIN_NEAR_PLANE);
        assert_eq!(camera.far_plane(), MIN_NEAR_PLANE);
    }

    #[test]
    fn test_sensor_width_matches_fov() {
        let mut camera = Camera::default();
        camera.set_horizontal_fov(90.0);
        camera.set_focal_length(20.0);
        assert!((camera.sensor_width() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_pinhole_has_no_lens() {
        let mut camera = Camera::default();
        camera.set_depth_of_field(false);
        assert_eq!(camera.lens_radius(), 0.0);
    }

    #[test]
    fn test_look_at() {
        let mut camera = Camera::new(DVec3::new(3.0, 4.0, 5.0));
        let target = DVec3::new(-1.0, 0.5, 2.0);
        camera.look_at(target);

        let expected = (target - camera.position()).normalize();
        assert!((camera.forward() - expected).length() < 1e-9);
    }
}
