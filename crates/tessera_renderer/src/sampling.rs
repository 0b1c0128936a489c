//! Random sampling and reflection helpers shared by the camera and the integrator.

use std::f64::consts::PI;

use rand::{Rng, RngCore};
use tessera_math::{DVec2, DVec3};

/// Uniform sample in `[0, 1)`.
#[inline]
pub fn gen_f64(rng: &mut dyn RngCore) -> f64 {
    rng.gen::<f64>()
}

/// Uniform point in the unit disk, by rejection.
pub fn random_in_unit_disk(rng: &mut dyn RngCore) -> DVec2 {
    loop {
        let p = DVec2::new(gen_f64(rng) * 2.0 - 1.0, gen_f64(rng) * 2.0 - 1.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Cosine-weighted direction in the hemisphere around `n`.
pub fn sample_cosine_hemisphere(n: DVec3, rng: &mut dyn RngCore) -> DVec3 {
    let u1 = gen_f64(rng);
    let u2 = gen_f64(rng);
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    let local = DVec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u1).max(0.0).sqrt());
    to_world(local, n)
}

/// GGX microfacet normal around `n` for roughness `alpha`.
pub fn sample_ggx_half_vector(n: DVec3, alpha: f64, rng: &mut dyn RngCore) -> DVec3 {
    let u1 = gen_f64(rng);
    let u2 = gen_f64(rng);
    let theta = (alpha * (u1 / (1.0 - u1).max(1e-12)).sqrt()).atan();
    let phi = 2.0 * PI * u2;
    let local = DVec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
    to_world(local, n)
}

/// Orthonormal tangent pair for a unit normal.
pub fn build_orthonormal_basis(n: DVec3) -> (DVec3, DVec3) {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    let tangent = DVec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = DVec3::new(b, sign + n.y * n.y * a, -n.y);

    (tangent, bitangent)
}

fn to_world(local: DVec3, n: DVec3) -> DVec3 {
    let (tangent, bitangent) = build_orthonormal_basis(n);
    (local.x * tangent + local.y * bitangent + local.z * n).normalize_or_zero()
}

/// Mirror `v` about `n`.
#[inline]
pub fn reflect(v: DVec3, n: DVec3) -> DVec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract unit `uv` through a surface with unit normal `n` facing against it.
/// Returns `None` on total internal reflection.
pub fn refract(uv: DVec3, n: DVec3, eta_ratio: f64) -> Option<DVec3> {
    let cos_theta = (-uv).dot(n).min(1.0);
    let sin2_theta = 1.0 - cos_theta * cos_theta;
    if eta_ratio * eta_ratio * sin2_theta > 1.0 {
        return None;
    }
    let r_out_perp = eta_ratio * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    Some(r_out_perp + r_out_parallel)
}

/// `(1 - cos)^5`, the Schlick Fresnel weight.
#[inline]
pub fn schlick_weight(cos_theta: f64) -> f64 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x
}

/// Schlick reflectance of a dielectric boundary.
#[inline]
pub fn dielectric_reflectance(cosine: f64, eta_ratio: f64) -> f64 {
    let r0 = ((1.0 - eta_ratio) / (1.0 + eta_ratio)).powi(2);
    r0 + (1.0 - r0) * schlick_weight(cosine)
}
