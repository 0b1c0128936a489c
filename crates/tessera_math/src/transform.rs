// Transform utilities for DMat4
//
// glam already provides transform_point3/transform_vector3 and inverse(); this adds the
// pieces the intersection code needs on top of those.

use glam::{DMat3, DMat4, DVec3};

use crate::Aabb;

/// Extension trait for affine `DMat4`s used as object transforms.
pub trait DMat4Ext {
    /// Bounding box of all 8 transformed corners of `aabb`.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Inverse-transpose of the upper 3x3, used to carry normals.
    fn normal_matrix(&self) -> DMat3;
}

impl DMat4Ext for DMat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }
        let lo = aabb.min();
        let hi = aabb.max();
        let corners = (0..8).map(|i| {
            DVec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            )
        });
        Aabb::from_point_cloud(corners.map(|corner| self.transform_point3(corner)))
    }

    fn normal_matrix(&self) -> DMat3 {
        DMat3::from_mat4(*self).inverse().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_aabb_translation() {
        let mat = DMat4::from_translation(DVec3::new(10.0, 0.0, 0.0));
        let aabb = Aabb::from_points(DVec3::ZERO, DVec3::ONE);
        let moved = mat.transform_aabb(&aabb);

        assert_eq!(moved.min(), DVec3::new(10.0, 0.0, 0.0));
        assert_eq!(moved.max(), DVec3::new(11.0, 1.0, 1.0));
    }

    #[test]
    fn test_transform_aabb_rotation_grows_box() {
        let mat = DMat4::from_rotation_y(std::f64::consts::FRAC_PI_4);
        let aabb = Aabb::from_points(DVec3::splat(-1.0), DVec3::splat(1.0));
        let rotated = mat.transform_aabb(&aabb);

        let half_diagonal = 2.0_f64.sqrt();
        assert!((rotated.x.max - half_diagonal).abs() < 1e-9);
        assert!((rotated.y.max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_transform_empty_stays_empty() {
        let mat = DMat4::from_scale(DVec3::splat(2.0));
        assert!(mat.transform_aabb(&Aabb::EMPTY).is_empty());
    }

    #[test]
    fn test_normal_matrix_keeps_normals_perpendicular() {
        let mat = DMat4::from_scale(DVec3::new(4.0, 1.0, 1.0));
        // plane x = y, normal (1,-1,0)
        let tangent = DVec3::new(1.0, 1.0, 0.0);
        let normal = DVec3::new(1.0, -1.0, 0.0);

        let t = mat.transform_vector3(tangent);
        let n = mat.normal_matrix() * normal;
        assert!(t.dot(n).abs() < 1e-12);
    }
}
