//! Metal/roughness surface model: Lambert diffuse plus a GGX microfacet lobe.
//!
//! The specular lobe uses the GGX distribution, the Smith shadowing term and Schlick
//! Fresnel. Diffuse energy is scaled by `(1 - F) * (1 - metallic)`.

use std::f64::consts::PI;

use rand::RngCore;
use tessera_core::Material;
use tessera_math::{color::average, Color, DVec3, TextureUv};

use crate::sampling::{gen_f64, reflect, sample_cosine_hemisphere, sample_ggx_half_vector, schlick_weight};

/// Fresnel reflectance of dielectrics at normal incidence.
const DIELECTRIC_F0: f64 = 0.04;

/// Lower bound on `alpha` so mirror-like surfaces keep a finite distribution.
const MIN_ALPHA: f64 = 1e-3;

const PDF_EPSILON: f64 = 1e-12;

/// Material parameters resolved at one surface point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brdf {
    pub base_color: Color,
    pub metallic: f64,
    pub roughness: f64,
    alpha: f64,
    f0: Color,
}

/// A sampled incident direction with its `f * cos / pdf` weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrdfSample {
    pub direction: DVec3,
    pub weight: Color,
}

impl Brdf {
    pub fn new(base_color: Color, metallic: f64, roughness: f64) -> Self {
        let metallic = metallic.clamp(0.0, 1.0);
        let roughness = roughness.clamp(0.0, 1.0);
        Self {
            base_color,
            metallic,
            roughness,
            alpha: (roughness * roughness).max(MIN_ALPHA),
            f0: Color::splat(DIELECTRIC_F0) * (1.0 - metallic) + base_color * metallic,
        }
    }

    /// Look the parameters up in `material` at `uv`.
    pub fn from_material(material: &Material, uv: TextureUv) -> Self {
        Self::new(material.diffuse(uv), material.metallic(uv), material.roughness(uv))
    }

    fn fresnel(&self, cos_theta: f64) -> Color {
        self.f0 + (Color::ONE - self.f0) * schlick_weight(cos_theta)
    }

    /// Probability of sampling the specular lobe rather than the diffuse one.
    fn specular_probability(&self) -> f64 {
        self.metallic + (1.0 - self.metallic) * average(self.f0)
    }

    /// BRDF value for outgoing `wo` and incident `wi` around normal `n`. No cosine term.
    pub fn evaluate(&self, n: DVec3, wo: DVec3, wi: DVec3) -> Color {
        let n_dot_l = n.dot(wi);
        let n_dot_v = n.dot(wo);
        if n_dot_l <= 0.0 || n_dot_v <= 0.0 {
            return Color::ZERO;
        }

        let Some(h) = (wo + wi).try_normalize() else {
            return Color::ZERO;
        };
        let n_dot_h = n.dot(h).max(0.0);
        let v_dot_h = wo.dot(h).max(0.0);

        let f = self.fresnel(v_dot_h);
        let d = ggx_d(n_dot_h, self.alpha);
        let g = smith_g_ggx(n_dot_l, n_dot_v, self.alpha);
        let specular = f * (d * g / (4.0 * n_dot_l * n_dot_v));

        let kd = (Color::ONE - f) * (1.0 - self.metallic);
        let diffuse = kd * self.base_color / PI;

        diffuse + specular
    }

    /// Density of [`Brdf::sample`] producing `wi`.
    pub fn pdf(&self, n: DVec3, wo: DVec3, wi: DVec3) -> f64 {
        let n_dot_l = n.dot(wi);
        if n_dot_l <= 0.0 {
            return 0.0;
        }
        let Some(h) = (wo + wi).try_normalize() else {
            return 0.0;
        };
        let n_dot_h = n.dot(h).max(0.0);
        let v_dot_h = wo.dot(h).abs().max(PDF_EPSILON);

        let p_spec = self.specular_probability();
        let specular_pdf = ggx_d(n_dot_h, self.alpha) * n_dot_h / (4.0 * v_dot_h);
        let diffuse_pdf = n_dot_l / PI;
        p_spec * specular_pdf + (1.0 - p_spec) * diffuse_pdf
    }

    /// Pick an incident direction, importance sampling the lobes. Returns `None` when
    /// the sample ends up below the surface.
    pub fn sample(&self, n: DVec3, wo: DVec3, rng: &mut dyn RngCore) -> Option<BrdfSample> {
        let wi = if gen_f64(rng) < self.specular_probability() {
            let h = sample_ggx_half_vector(n, self.alpha, rng);
            reflect(-wo, h)
        } else {
            sample_cosine_hemisphere(n, rng)
        };

        let n_dot_l = n.dot(wi);
        if n_dot_l <= 0.0 {
            return None;
        }
        let pdf = self.pdf(n, wo, wi);
        if pdf <= PDF_EPSILON {
            return None;
        }

        Some(BrdfSample {
            direction: wi,
            weight: self.evaluate(n, wo, wi) * n_dot_l / pdf,
        })
    }
}

/// GGX/Trowbridge-Reitz distribution.
#[inline]
fn ggx_d(n_dot_h: f64, alpha: f64) -> f64 {
    let a2 = alpha * alpha;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * denom * denom)
}

/// Smith G for GGX.
#[inline]
fn smith_g_ggx(n_dot_l: f64, n_dot_v: f64, alpha: f64) -> f64 {
    let a2 = alpha * alpha;
    let g1 = |c: f64| 2.0 * c / (c + (a2 + (1.0 - a2) * c * c).sqrt());
    g1(n_dot_l) * g1(n_dot_v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_f0_blend() {
        let dielectric = Brdf::new(Color::new(1.0, 0.0, 0.0), 0.0, 0.5);
        assert_eq!(dielectric.f0, Color::splat(DIELECTRIC_F0));
        let metal = Brdf::new(Color::new(1.0, 0.5, 0.0), 1.0, 0.5);
        assert_eq!(metal.f0, Color::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn test_reciprocity() {
        let brdf = Brdf::new(Color::splat(0.7), 0.3, 0.4);
        let n = DVec3::Y;
        let a = DVec3::new(0.3, 0.8, 0.1).normalize();
        let b = DVec3::new(-0.5, 0.6, 0.4).normalize();
        let ab = brdf.evaluate(n, a, b);
        let ba = brdf.evaluate(n, b, a);
        assert!((ab - ba).length() < 1e-12);
    }

    #[test]
    fn test_below_surface_is_black() {
        let brdf = Brdf::new(Color::ONE, 0.0, 0.5);
        assert_eq!(brdf.evaluate(DVec3::Y, DVec3::Y, DVec3::NEG_Y), Color::ZERO);
        assert_eq!(brdf.pdf(DVec3::Y, DVec3::Y, DVec3::NEG_Y), 0.0);
    }

    #[test]
    fn test_energy_is_bounded() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = DVec3::Y;
        let wo = DVec3::new(0.2, 1.0, 0.0).normalize();

        for (metallic, roughness) in [(0.0, 1.0), (0.0, 0.3), (1.0, 0.5)] {
            let brdf = Brdf::new(Color::ONE, metallic, roughness);
            let samples = 20_000;
            let mut total = 0.0;
            for _ in 0..samples {
                if let Some(s) = brdf.sample(n, wo, &mut rng) {
                    assert!(s.direction.dot(n) > 0.0);
                    total += s.weight.x;
                }
            }
            let albedo = total / samples as f64;
            assert!(albedo > 0.5 && albedo < 1.05, "albedo {albedo} for m={metallic} r={roughness}");
        }
    }

    #[test]
    fn test_smooth_metal_samples_mirror_direction() {
        let mut rng = StdRng::seed_from_u64(42);
        let brdf = Brdf::new(Color::ONE, 1.0, 0.0);
        let n = DVec3::Y;
        let wo = DVec3::new(1.0, 1.0, 0.0).normalize();
        let mirror = reflect(-wo, n);
        let s = brdf.sample(n, wo, &mut rng).unwrap();
        assert!(s.direction.dot(mirror) > 0.999);
    }
}
