//! Primary ray generation for a thin-lens camera.

use rand::RngCore;
use tessera_core::Camera;
use tessera_math::{DMat3, DVec3, Ray};

use crate::sampling::random_in_unit_disk;

/// Lens radii below this are treated as a pinhole.
const PINHOLE_THRESHOLD: f64 = 1e-12;

/// Snapshot of the camera values the emitter needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayEmitterParameters {
    /// Sensor width, in the same unit as `focal_length`.
    pub sensor_width: f64,
    pub image_aspect_ratio: f64,
    pub focus_distance: f64,
    pub focal_length: f64,
    pub lens_radius: f64,
    pub camera_position: DVec3,
    pub camera_rotation: DMat3,
}

impl RayEmitterParameters {
    pub fn from_camera(camera: &Camera, image_aspect_ratio: f64) -> Self {
        Self {
            sensor_width: camera.sensor_width(),
            image_aspect_ratio,
            focus_distance: camera.focus_distance(),
            focal_length: camera.focal_length(),
            lens_radius: camera.lens_radius(),
            camera_position: camera.position(),
            camera_rotation: camera.rotation_matrix(),
        }
    }
}

/// Maps normalized image coordinates to world rays.
///
/// The sensor is projected onto the plane of focus; `(0, 0)` is the top-left corner
/// and `(1, 1)` the bottom-right one.
#[derive(Debug, Clone)]
pub struct CameraRayEmitter {
    parameters: RayEmitterParameters,
    top_left: DVec3,
    horizontal: DVec3,
    vertical: DVec3,
}

impl CameraRayEmitter {
    pub fn new(parameters: RayEmitterParameters) -> Self {
        let mut emitter = Self {
            parameters,
            top_left: DVec3::ZERO,
            horizontal: DVec3::ZERO,
            vertical: DVec3::ZERO,
        };
        emitter.initialize_viewport();
        emitter
    }

    pub fn from_camera(camera: &Camera, image_aspect_ratio: f64) -> Self {
        Self::new(RayEmitterParameters::from_camera(camera, image_aspect_ratio))
    }

    pub fn parameters(&self) -> &RayEmitterParameters {
        &self.parameters
    }

    fn initialize_viewport(&mut self) {
        let half_width = self.parameters.sensor_width * 0.5;
        let half_height = self.parameters.sensor_width / self.parameters.image_aspect_ratio * 0.5;

        self.top_left = self.corner(-half_width, half_height);
        let top_right = self.corner(half_width, half_height);
        let bottom_left = self.corner(-half_width, -half_height);

        self.horizontal = top_right - self.top_left;
        self.vertical = bottom_left - self.top_left;
    }

    /// Sensor point `(x, y)` pushed out to the plane of focus, in world space.
    fn corner(&self, x: f64, y: f64) -> DVec3 {
        let p = &self.parameters;
        p.camera_rotation * DVec3::new(x, y, -p.focal_length) * p.focus_distance / p.focal_length
            + p.camera_position
    }

    /// World-space point on the plane of focus for image coordinates `(u, v)`.
    pub fn focus_point(&self, u: f64, v: f64) -> DVec3 {
        self.top_left + u * self.horizontal + v * self.vertical
    }

    /// Primary ray through `(u, v)`. With a non-zero lens radius the origin is jittered
    /// across the aperture and the ray still passes through the focus point.
    pub fn ray(&self, u: f64, v: f64, rng: &mut dyn RngCore) -> Ray {
        let p = &self.parameters;
        let origin = if p.lens_radius > PINHOLE_THRESHOLD {
            let offset = random_in_unit_disk(rng) * p.lens_radius;
            p.camera_position + p.camera_rotation * DVec3::new(offset.x, offset.y, 0.0)
        } else {
            p.camera_position
        };
        Ray::between(origin, self.focus_point(u, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn parameters() -> RayEmitterParameters {
        RayEmitterParameters {
            sensor_width: 36.0,
            image_aspect_ratio: 1.5,
            focus_distance: 1.0,
            focal_length: 0.05,
            lens_radius: 0.0,
            camera_position: DVec3::ZERO,
            camera_rotation: DMat3::IDENTITY,
        }
    }

    #[test]
    fn test_center_ray_looks_down_neg_z() {
        let emitter = CameraRayEmitter::new(parameters());
        let mut rng = StdRng::seed_from_u64(42);
        let ray = emitter.ray(0.5, 0.5, &mut rng);
        assert_eq!(ray.origin, DVec3::ZERO);
        assert!((ray.direction - DVec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_rotated_camera() {
        let mut params = parameters();
        // yaw of 90 degrees: -Z turns into -X
        params.camera_rotation = DMat3::from_cols(DVec3::NEG_Z, DVec3::Y, DVec3::X);
        let emitter = CameraRayEmitter::new(params);
        let mut rng = StdRng::seed_from_u64(42);
        let ray = emitter.ray(0.5, 0.5, &mut rng);
        assert!((ray.direction - DVec3::NEG_X).length() < 1e-6);
    }

    #[test]
    fn test_lens_moves_origin_but_keeps_focus() {
        let mut params = parameters();
        params.lens_radius = 0.1;
        let emitter = CameraRayEmitter::new(params);
        let mut rng = StdRng::seed_from_u64(42);

        let focus = emitter.focus_point(0.25, 0.75);
        let ray = emitter.ray(0.25, 0.75, &mut rng);
        assert_ne!(ray.origin, DVec3::ZERO);
        assert!(ray.origin.length() < 0.1);

        // The ray passes through the focus point.
        let t = (focus - ray.origin).dot(ray.direction);
        assert!((ray.at(t) - focus).length() < 1e-9);
    }

    #[test]
    fn test_corners_follow_aspect() {
        let emitter = CameraRayEmitter::new(parameters());
        let top_left = emitter.focus_point(0.0, 0.0);
        let bottom_right = emitter.focus_point(1.0, 1.0);
        let width = bottom_right.x - top_left.x;
        let height = top_left.y - bottom_right.y;
        assert!((width / height - 1.5).abs() < 1e-9);
        assert!(top_left.x < 0.0 && top_left.y > 0.0);
    }

    #[test]
    fn test_from_scene_camera() {
        let mut camera = Camera::new(DVec3::new(0.0, 1.0, 5.0));
        camera.set_depth_of_field(false);
        camera.look_at(DVec3::new(0.0, 1.0, 0.0));
        let emitter = CameraRayEmitter::from_camera(&camera, 4.0 / 3.0);
        let mut rng = StdRng::seed_from_u64(42);

        let ray = emitter.ray(0.5, 0.5, &mut rng);
        assert_eq!(ray.origin, camera.position());
        assert!((ray.direction - DVec3::NEG_Z).length() < 1e-9);
    }
}
