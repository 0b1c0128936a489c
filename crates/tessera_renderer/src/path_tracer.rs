//! Iterative path integrator.
//!
//! At every surface vertex the tracer adds emission plus direct light from each scene
//! light behind a binary shadow ray, then continues the path with one sampled
//! bounce. The number of bounces after the camera ray is capped by `max_bounces`.

use rand::RngCore;
use tessera_core::Scene;
use tessera_math::{Color, DVec3, Interval, Ray, RAY_EPSILON};

use crate::brdf::Brdf;
use crate::intersect::{intersect_scene, is_occluded, HitRecord};
use crate::sampling::{dielectric_reflectance, gen_f64, reflect, refract};

/// Distance secondary rays start away from the surface, along the geometric normal.
pub const SURFACE_OFFSET: f64 = 1e-4;

/// Paths whose throughput drops below this carry nothing visible.
const MIN_THROUGHPUT: f64 = 1e-8;

pub struct PathTracer<'a> {
    scene: &'a Scene,
    max_bounces: u32,
}

impl<'a> PathTracer<'a> {
    pub fn new(scene: &'a Scene, max_bounces: u32) -> Self {
        Self { scene, max_bounces }
    }

    /// Radiance arriving along `ray`.
    pub fn trace(&self, ray: Ray, rng: &mut dyn RngCore) -> Color {
        let mut radiance = Color::ZERO;
        let mut throughput = Color::ONE;
        let mut ray = ray;

        for bounce in 0..=self.max_bounces {
            let Some(hit) = intersect_scene(self.scene, &ray) else {
                radiance += throughput * self.scene.skybox().color(ray.direction);
                break;
            };

            let material = hit.material;
            let uv = hit.uv;
            let normal = shading_normal(&hit);
            let wo = -ray.direction;
            let brdf = Brdf::from_material(material, uv);
            let transmission = material.transmission(uv);

            radiance += throughput * material.emission(uv);
            if transmission < 1.0 {
                radiance += throughput * (1.0 - transmission) * self.direct_light(&hit, normal, wo, &brdf);
            }

            if bounce == self.max_bounces {
                break;
            }

            let next = if gen_f64(rng) < transmission {
                let (direction, origin) = self.dielectric_bounce(&hit, normal, ray.direction, material.ior(), rng);
                throughput *= brdf.base_color;
                Ray::new(origin, direction)
            } else {
                let Some(sample) = brdf.sample(normal, wo, rng) else {
                    break;
                };
                throughput *= sample.weight;
                Ray::new(hit.position + hit.geometric_normal * SURFACE_OFFSET, sample.direction)
            };

            if throughput.max_element() < MIN_THROUGHPUT {
                break;
            }
            ray = next;
        }

        radiance
    }

    /// Sum of every light's contribution at the hit, shadowed.
    fn direct_light(&self, hit: &HitRecord, normal: DVec3, wo: DVec3, brdf: &Brdf) -> Color {
        let origin = hit.position + hit.geometric_normal * SURFACE_OFFSET;
        let mut total = Color::ZERO;

        for light in self.scene.lights() {
            let wi = light.direction_from_point(hit.position);
            if normal.dot(wi) <= 0.0 || hit.geometric_normal.dot(wi) <= 0.0 {
                continue;
            }
            let distance = light.distance_from_point(origin);
            let shadow = Ray::new(origin, wi).with_range(Interval::new(RAY_EPSILON, distance));
            if is_occluded(self.scene, &shadow) {
                continue;
            }
            total += brdf.evaluate(normal, wo, wi) * light.light_factor(hit.position, normal);
        }

        total
    }

    /// Fresnel-weighted choice between mirror reflection and refraction.
    /// Returns the new direction and the offset origin on the matching side.
    fn dielectric_bounce(
        &self,
        hit: &HitRecord,
        normal: DVec3,
        direction: DVec3,
        ior: f64,
        rng: &mut dyn RngCore,
    ) -> (DVec3, DVec3) {
        let eta_ratio = if hit.front_face { 1.0 / ior } else { ior };
        let cos_theta = (-direction).dot(normal).min(1.0);

        match refract(direction, normal, eta_ratio) {
            Some(refracted) if dielectric_reflectance(cos_theta, eta_ratio) <= gen_f64(rng) => {
                (refracted, hit.position - hit.geometric_normal * SURFACE_OFFSET)
            }
            _ => (
                reflect(direction, normal),
                hit.position + hit.geometric_normal * SURFACE_OFFSET,
            ),
        }
    }
}

/// Interpolated normal with the material's normal map applied, kept on the side the
/// ray arrived from.
fn shading_normal(hit: &HitRecord) -> DVec3 {
    let material = hit.material;
    if !material.has_normal_map() || hit.tangent == DVec3::ZERO || hit.bitangent == DVec3::ZERO {
        return hit.normal;
    }
    let mapped = material.apply_normal_map(hit.normal, hit.tangent, hit.bitangent, hit.uv);
    if mapped.dot(hit.geometric_normal) > 0.0 {
        mapped
    } else {
        hit.normal
    }
}
