//! Ray queries against meshes, objects and whole scenes.
//!
//! Meshes are intersected in object space: the world ray is carried through the
//! object's inverse matrix without renormalizing its direction, so the hit distance
//! `t` is the same in both spaces and results from different objects compare directly.

use tessera_core::{Material, Mesh, Object3D, Scene, Vertex, BVH_CONSTRUCTION_EPSILON};
use tessera_math::{DVec3, Interval, Ray, TextureUv};

/// Determinant threshold below which a ray is treated as parallel to a triangle.
pub const TRIANGLE_TOLERANCE: f64 = 1e-6;

/// Everything shading needs to know about the nearest surface hit along a ray.
///
/// Normals are in world space and face against the incoming ray.
#[derive(Debug, Clone, Copy)]
pub struct HitRecord<'a> {
    pub t: f64,
    pub position: DVec3,
    /// Interpolated shading normal.
    pub normal: DVec3,
    /// Flat normal of the hit triangle.
    pub geometric_normal: DVec3,
    pub uv: TextureUv,
    pub tangent: DVec3,
    pub bitangent: DVec3,
    /// True when the ray arrived from the side the triangle winding faces.
    pub front_face: bool,
    pub material: &'a Material,
    /// Index of the hit object in [`Scene::objects`].
    pub object_index: usize,
}

/// Barycentric hit on a single triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f64,
    pub u: f64,
    pub v: f64,
}

/// Nearest triangle hit inside a mesh, in object space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    pub t: f64,
    pub face: u32,
    pub u: f64,
    pub v: f64,
}

/// Möller-Trumbore ray/triangle test. Only distances strictly inside `range` count.
pub fn intersect_triangle(ray: &Ray, triangle: [&Vertex; 3], range: Interval) -> Option<TriangleHit> {
    let [v0, v1, v2] = triangle;
    let edge1 = v1.position - v0.position;
    let edge2 = v2.position - v0.position;

    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < TRIANGLE_TOLERANCE {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin - v0.position;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if !range.surrounds(t) {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Nearest hit in `mesh`, using its BVH when one has been built.
pub fn intersect_mesh(mesh: &Mesh, ray: &Ray) -> Option<MeshHit> {
    let Some(bvh) = mesh.bvh() else {
        return intersect_mesh_brute_force(mesh, ray);
    };

    let faces = mesh.faces();
    let mut nearest = None;
    bvh.traverse(ray, |face, range| {
        let hit = intersect_triangle(ray, mesh.triangle(&faces[face as usize]), range)?;
        nearest = Some(MeshHit {
            t: hit.t,
            face,
            u: hit.u,
            v: hit.v,
        });
        Some(hit.t)
    });
    nearest
}

/// Nearest hit in `mesh` by testing every face.
pub fn intersect_mesh_brute_force(mesh: &Mesh, ray: &Ray) -> Option<MeshHit> {
    let mut range = ray.range;
    let mut nearest = None;
    for (index, face) in mesh.faces().iter().enumerate() {
        if let Some(hit) = intersect_triangle(ray, mesh.triangle(face), range) {
            range = range.with_max(hit.t);
            nearest = Some(MeshHit {
                t: hit.t,
                face: index as u32,
                u: hit.u,
                v: hit.v,
            });
        }
    }
    nearest
}

/// Nearest hit on one object for a world-space ray.
pub fn intersect_object<'a>(object: &'a Object3D, object_index: usize, ray: &Ray) -> Option<HitRecord<'a>> {
    let bounds = object.world_bounds().padded(BVH_CONSTRUCTION_EPSILON);
    if !bounds.hit(ray, ray.range) {
        return None;
    }

    let transform = object.transform();
    let local_ray = ray.transformed(transform.inverse_matrix());
    let mesh = object.mesh();
    let hit = intersect_mesh(mesh, &local_ray)?;

    let face = &mesh.faces()[hit.face as usize];
    let [a, b, c] = mesh.triangle(face);
    let w = 1.0 - hit.u - hit.v;
    let interpolate = |pa: DVec3, pb: DVec3, pc: DVec3| pa * w + pb * hit.u + pc * hit.v;

    let normal_matrix = transform.normal_matrix();
    let model = transform.matrix();

    let flat = (b.position - a.position).cross(c.position - a.position);
    let mut geometric_normal = (*normal_matrix * flat).normalize_or_zero();
    let mut normal = (*normal_matrix * interpolate(a.normal, b.normal, c.normal))
        .try_normalize()
        .unwrap_or(geometric_normal);
    let tangent = model
        .transform_vector3(interpolate(a.tangent, b.tangent, c.tangent))
        .normalize_or_zero();
    let bitangent = model
        .transform_vector3(interpolate(a.bitangent, b.bitangent, c.bitangent))
        .normalize_or_zero();

    let front_face = ray.direction.dot(geometric_normal) < 0.0;
    if !front_face {
        geometric_normal = -geometric_normal;
    }
    if normal.dot(geometric_normal) < 0.0 {
        normal = -normal;
    }

    Some(HitRecord {
        t: hit.t,
        position: ray.at(hit.t),
        normal,
        geometric_normal,
        uv: a.uv * w + b.uv * hit.u + c.uv * hit.v,
        tangent,
        bitangent,
        front_face,
        material: object.material().as_ref(),
        object_index,
    })
}

/// Nearest hit over every object in the scene.
pub fn intersect_scene<'a>(scene: &'a Scene, ray: &Ray) -> Option<HitRecord<'a>> {
    let mut search = *ray;
    let mut nearest = None;
    for (index, object) in scene.objects().iter().enumerate() {
        if let Some(hit) = intersect_object(object, index, &search) {
            search.range = search.range.with_max(hit.t);
            nearest = Some(hit);
        }
    }
    nearest
}

/// Whether anything blocks `ray` inside its range.
pub fn is_occluded(scene: &Scene, ray: &Ray) -> bool {
    scene
        .objects()
        .iter()
        .enumerate()
        .any(|(index, object)| intersect_object(object, index, ray).is_some())
}

/// Name of the nearest object hit by `ray`, or an empty string. Used for picking.
pub fn object_name_from_hit<'a>(scene: &'a Scene, ray: &Ray) -> &'a str {
    intersect_scene(scene, ray)
        .map(|hit| scene.objects()[hit.object_index].name())
        .unwrap_or("")
}
