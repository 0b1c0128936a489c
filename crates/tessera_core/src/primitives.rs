//! Procedural meshes: UV sphere, plane and cube.

use std::f64::consts::PI;

use crate::mesh::{Face, Mesh, Vertex};
use tessera_math::{DVec3, TextureUv};

impl Mesh {
    /// UV sphere centred on the origin. `segments` runs around Y, `rings` pole to pole.
    pub fn sphere(radius: f64, segments: u32, rings: u32) -> Mesh {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);

        for ring in 0..=rings {
            let v = ring as f64 / rings as f64;
            let theta = v * PI;
            for segment in 0..=segments {
                let u = segment as f64 / segments as f64;
                let phi = u * 2.0 * PI;
                let normal = DVec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                vertices.push(Vertex::new(normal * radius, normal, TextureUv::new(u, v)));
            }
        }

        let mut faces = Vec::with_capacity((segments * rings * 2) as usize);
        for ring in 0..rings {
            for segment in 0..segments {
                let first = ring * (segments + 1) + segment;
                let second = first + segments + 1;
                faces.push(Face::new(first + 1, second, first));
                faces.push(Face::new(first + 1, second + 1, second));
            }
        }

        Mesh::new(vertices, faces)
    }

    /// Plane in XZ facing +Y, centred on the origin.
    pub fn plane(width: f64, depth: f64) -> Mesh {
        let (hw, hd) = (width * 0.5, depth * 0.5);
        let corner = |x: f64, z: f64, u: f64, v: f64| {
            Vertex::new(DVec3::new(x, 0.0, z), DVec3::Y, TextureUv::new(u, v))
        };
        let vertices = vec![
            corner(-hw, hd, 0.0, 0.0),
            corner(hw, hd, 1.0, 0.0),
            corner(hw, -hd, 1.0, 1.0),
            corner(-hw, -hd, 0.0, 1.0),
        ];
        Mesh::new(vertices, vec![Face::new(0, 1, 2), Face::new(0, 2, 3)])
    }

    /// Axis-aligned cube with flat-shaded faces.
    pub fn cube(size: f64) -> Mesh {
        let h = size * 0.5;
        // (normal, tangent-u, tangent-v) per side
        let sides = [
            (DVec3::X, DVec3::NEG_Z, DVec3::Y),
            (DVec3::NEG_X, DVec3::Z, DVec3::Y),
            (DVec3::Y, DVec3::X, DVec3::NEG_Z),
            (DVec3::NEG_Y, DVec3::X, DVec3::Z),
            (DVec3::Z, DVec3::X, DVec3::Y),
            (DVec3::NEG_Z, DVec3::NEG_X, DVec3::Y),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut faces = Vec::with_capacity(12);
        for (normal, du, dv) in sides {
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let position = (normal + du * su + dv * sv) * h;
                let uv = TextureUv::new((su + 1.0) * 0.5, (sv + 1.0) * 0.5);
                vertices.push(Vertex::new(position, normal, uv));
            }
            faces.push(Face::new(base, base + 1, base + 2));
            faces.push(Face::new(base, base + 2, base + 3));
        }

        Mesh::new(vertices, faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_counts_and_radius() {
        let mesh = Mesh::sphere(2.0, 16, 8);
        assert_eq!(mesh.vertex_count(), 17 * 9);
        assert_eq!(mesh.triangle_count(), 16 * 8 * 2);
        for v in mesh.vertices() {
            assert!((v.position.length() - 2.0).abs() < 1e-12);
            assert!((v.normal.length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sphere_clamps_resolution() {
        let mesh = Mesh::sphere(1.0, 0, 0);
        assert_eq!(mesh.triangle_count(), 3 * 2 * 2);
    }

    #[test]
    fn test_plane_faces_up() {
        let mesh = Mesh::plane(4.0, 2.0);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.bounds().max(), DVec3::new(2.0, 0.0, 1.0));
        assert!(mesh.vertices().iter().all(|v| v.normal == DVec3::Y));
    }

    #[test]
    fn test_cube_bounds_and_winding() {
        let mesh = Mesh::cube(2.0);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.bounds().min(), DVec3::splat(-1.0));
        assert_eq!(mesh.bounds().max(), DVec3::splat(1.0));

        for face in mesh.faces() {
            let [a, b, c] = mesh.triangle(face);
            let geometric = (b.position - a.position).cross(c.position - a.position);
            assert!(geometric.dot(a.normal) > 0.0, "face {:?} winds inward", face.indices);
        }
    }
}
