//! Triangle mesh geometry.
//!
//! A mesh is an indexed vertex list with per-vertex shading attributes and an
//! optional BVH. The BVH is built explicitly with [`Mesh::build_bvh`] and dropped
//! whenever the geometry is replaced, so it can never go stale.

use crate::bvh::Bvh;
use tessera_math::{Aabb, DVec3, TextureUv};

/// A mesh vertex with its full shading frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: DVec3,
    pub normal: DVec3,
    pub uv: TextureUv,
    pub tangent: DVec3,
    pub bitangent: DVec3,
}

impl Vertex {
    pub fn new(position: DVec3, normal: DVec3, uv: TextureUv) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent: DVec3::ZERO,
            bitangent: DVec3::ZERO,
        }
    }
}

/// A triangle as three vertex indices, counter-clockwise when seen from the front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub indices: [u32; 3],
}

impl Face {
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self { indices: [a, b, c] }
    }
}

/// Indexed triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    bounds: Aabb,
    bvh: Option<Bvh>,
}

impl Mesh {
    /// Create a mesh. Faces referencing missing vertices are dropped with a warning,
    /// and tangents/bitangents are derived from the UV layout.
    pub fn new(vertices: Vec<Vertex>, faces: Vec<Face>) -> Self {
        let mut mesh = Self::default();
        mesh.set_geometry(vertices, faces);
        mesh
    }

    /// Create a mesh from bare positions, generating smooth normals.
    pub fn from_positions(positions: Vec<DVec3>, faces: Vec<Face>) -> Self {
        let vertices = positions
            .into_iter()
            .map(|p| Vertex::new(p, DVec3::ZERO, TextureUv::ZERO))
            .collect();
        let mut mesh = Self::new(vertices, faces);
        mesh.compute_normals();
        mesh
    }

    /// Replace all geometry. Any previously built BVH is discarded.
    pub fn set_geometry(&mut self, vertices: Vec<Vertex>, faces: Vec<Face>) {
        let vertex_count = vertices.len();
        let faces: Vec<Face> = faces
            .into_iter()
            .filter(|face| {
                let valid = face.indices.iter().all(|&i| (i as usize) < vertex_count);
                if !valid {
                    log::warn!(
                        "Dropping face with invalid indices {:?}, vertex count: {}",
                        face.indices,
                        vertex_count
                    );
                }
                valid
            })
            .collect();

        self.bounds = Aabb::from_point_cloud(vertices.iter().map(|v| v.position));
        self.vertices = vertices;
        self.faces = faces;
        self.bvh = None;
        self.compute_tangents();
    }

    /// Smooth vertex normals from area-weighted face normals.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![DVec3::ZERO; self.vertices.len()];

        for face in &self.faces {
            let [a, b, c] = self.positions_of(face);
            let face_normal = (b - a).cross(c - a);
            for &i in &face.indices {
                normals[i as usize] += face_normal;
            }
        }

        for (vertex, normal) in self.vertices.iter_mut().zip(normals) {
            vertex.normal = normal.try_normalize().unwrap_or(DVec3::Y);
        }
    }

    /// Per-vertex tangent frame from UV deltas. Faces with degenerate UVs contribute nothing.
    fn compute_tangents(&mut self) {
        let mut tangents = vec![DVec3::ZERO; self.vertices.len()];
        let mut bitangents = vec![DVec3::ZERO; self.vertices.len()];

        for face in &self.faces {
            let [i0, i1, i2] = face.indices.map(|i| i as usize);
            let (v0, v1, v2) = (&self.vertices[i0], &self.vertices[i1], &self.vertices[i2]);

            let edge1 = v1.position - v0.position;
            let edge2 = v2.position - v0.position;
            let duv1 = v1.uv - v0.uv;
            let duv2 = v2.uv - v0.uv;

            let det = duv1.x * duv2.y - duv2.x * duv1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let f = 1.0 / det;
            let tangent = f * (duv2.y * edge1 - duv1.y * edge2);
            let bitangent = f * (duv1.x * edge2 - duv2.x * edge1);

            for i in [i0, i1, i2] {
                tangents[i] += tangent;
                bitangents[i] += bitangent;
            }
        }

        for (vertex, (t, b)) in self.vertices.iter_mut().zip(tangents.into_iter().zip(bitangents)) {
            vertex.tangent = t.normalize_or_zero();
            vertex.bitangent = b.normalize_or_zero();
        }
    }

    /// Build the BVH over the current faces, replacing any existing one.
    pub fn build_bvh(&mut self) {
        self.bvh = Some(Bvh::build(&self.vertices, &self.faces));
    }

    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    pub fn has_bvh(&self) -> bool {
        self.bvh.is_some()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Object-space bounds.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// The three vertices of a face.
    pub fn triangle(&self, face: &Face) -> [&Vertex; 3] {
        face.indices.map(|i| &self.vertices[i as usize])
    }

    fn positions_of(&self, face: &Face) -> [DVec3; 3] {
        face.indices.map(|i| self.vertices[i as usize].position)
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let vertices = vec![
            Vertex::new(DVec3::new(0.0, 0.0, 0.0), DVec3::Z, TextureUv::new(0.0, 0.0)),
            Vertex::new(DVec3::new(1.0, 0.0, 0.0), DVec3::Z, TextureUv::new(1.0, 0.0)),
            Vertex::new(DVec3::new(1.0, 1.0, 0.0), DVec3::Z, TextureUv::new(1.0, 1.0)),
            Vertex::new(DVec3::new(0.0, 1.0, 0.0), DVec3::Z, TextureUv::new(0.0, 1.0)),
        ];
        Mesh::new(vertices, vec![Face::new(0, 1, 2), Face::new(0, 2, 3)])
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(!mesh.has_bvh());
        assert_eq!(mesh.bounds().min(), DVec3::ZERO);
        assert_eq!(mesh.bounds().max(), DVec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_invalid_faces_are_dropped() {
        let _ = env_logger::builder().is_test(true).try_init();
        let positions = vec![DVec3::ZERO, DVec3::X, DVec3::Y];
        let faces = vec![Face::new(0, 1, 2), Face::new(0, 1, 3), Face::new(7, 8, 9)];
        let mesh = Mesh::from_positions(positions, faces);

        assert_eq!(mesh.faces(), &[Face::new(0, 1, 2)]);
    }

    #[test]
    fn test_tangents_follow_uv_axes() {
        let mesh = quad();
        for v in mesh.vertices() {
            assert!((v.tangent - DVec3::X).length() < 1e-12);
            assert!((v.bitangent - DVec3::Y).length() < 1e-12);
        }
    }

    #[test]
    fn test_degenerate_uvs_leave_zero_tangents() {
        let positions = vec![DVec3::ZERO, DVec3::X, DVec3::Y];
        let mesh = Mesh::from_positions(positions, vec![Face::new(0, 1, 2)]);
        assert!(mesh.vertices().iter().all(|v| v.tangent == DVec3::ZERO));
    }

    #[test]
    fn test_compute_normals_ccw() {
        let positions = vec![DVec3::ZERO, DVec3::X, DVec3::Y];
        let mesh = Mesh::from_positions(positions, vec![Face::new(0, 1, 2)]);
        for v in mesh.vertices() {
            assert!((v.normal - DVec3::Z).length() < 1e-12);
        }
    }

    #[test]
    fn test_set_geometry_drops_bvh() {
        let mut mesh = quad();
        mesh.build_bvh();
        assert!(mesh.has_bvh());

        let vertices = mesh.vertices().to_vec();
        mesh.set_geometry(vertices, vec![Face::new(0, 1, 2)]);
        assert!(!mesh.has_bvh());
        assert_eq!(mesh.triangle_count(), 1);
    }
}
