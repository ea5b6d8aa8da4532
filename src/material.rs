//! Surface scattering models.
//!
//! Directions follow one convention throughout: `wo` points from the surface
//! towards the viewer, `wi` from the surface towards the light (or the
//! continuation of the path). Both are unit length, `n` is the shading normal.

use std::f32::consts::PI;

use glam::Vec3A;
use rand::Rng;

use crate::{
    rng::Pcg32,
    sampling::{reflect, uniform_hemisphere},
    EPSILON,
};

/// Directions closer than this (squared distance) count as the same.
const DIRECTION_EPSILON: f32 = 1e-5;

/// Scattering lobe of a material, dispatched with an explicit `match`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bsdf {
    Diffuse {
        albedo: Vec3A,
    },
    /// Perfect specular reflection.
    Mirror,
    /// Cook-Torrance specular lobe over a Fresnel weighted diffuse base.
    Microfacet {
        albedo: Vec3A,
        specular: Vec3A,
        roughness: f32,
        ior: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub bsdf: Bsdf,
    pub emission: Vec3A,
}

impl Material {
    pub fn diffuse(albedo: Vec3A) -> Self {
        Self {
            bsdf: Bsdf::Diffuse { albedo },
            emission: Vec3A::ZERO,
        }
    }

    pub fn mirror() -> Self {
        Self {
            bsdf: Bsdf::Mirror,
            emission: Vec3A::ZERO,
        }
    }

    /// Microfacet material with roughness 0.4 and an index of refraction of 1.85.
    pub fn microfacet(albedo: Vec3A, specular: Vec3A) -> Self {
        Self {
            bsdf: Bsdf::Microfacet {
                albedo,
                specular,
                roughness: 0.4,
                ior: 1.85,
            },
            emission: Vec3A::ZERO,
        }
    }

    /// Diffuse emitter.
    pub fn light(albedo: Vec3A, emission: Vec3A) -> Self {
        Self {
            bsdf: Bsdf::Diffuse { albedo },
            emission,
        }
    }

    #[must_use]
    pub fn with_emission(mut self, emission: Vec3A) -> Self {
        self.emission = emission;
        self
    }

    #[inline(always)]
    pub fn has_emission(&self) -> bool {
        self.emission.length() > EPSILON
    }

    /// Whether the lobe is a Dirac delta, so `pdf` and `eval` are only
    /// meaningful for the direction `sample` returns.
    #[inline(always)]
    pub fn is_delta(&self) -> bool {
        matches!(self.bsdf, Bsdf::Mirror)
    }

    /// Draws a continuation direction.
    #[inline(always)]
    pub fn sample(&self, wo: Vec3A, n: Vec3A, rng: &mut Pcg32) -> Vec3A {
        match self.bsdf {
            Bsdf::Mirror => reflect(wo, n),
            Bsdf::Diffuse { .. } | Bsdf::Microfacet { .. } => {
                uniform_hemisphere(n, rng.random(), rng.random())
            }
        }
    }

    /// Solid angle density of `sample` producing `wi`.
    #[inline(always)]
    pub fn pdf(&self, wi: Vec3A, wo: Vec3A, n: Vec3A) -> f32 {
        match self.bsdf {
            Bsdf::Mirror => {
                if is_reflection(wi, wo, n) {
                    1.0
                } else {
                    0.0
                }
            }
            Bsdf::Diffuse { .. } | Bsdf::Microfacet { .. } => {
                if wi.dot(n) > 0.0 {
                    0.5 / PI
                } else {
                    0.0
                }
            }
        }
    }

    /// BRDF value for light arriving from `wi` and leaving towards `wo`.
    #[inline(always)]
    pub fn eval(&self, wi: Vec3A, wo: Vec3A, n: Vec3A) -> Vec3A {
        match self.bsdf {
            Bsdf::Mirror => {
                if is_reflection(wi, wo, n) {
                    Vec3A::ONE
                } else {
                    Vec3A::ZERO
                }
            }
            Bsdf::Diffuse { albedo } => {
                if n.dot(wi) > 0.0 {
                    albedo / PI
                } else {
                    Vec3A::ZERO
                }
            }
            Bsdf::Microfacet {
                albedo,
                specular,
                roughness,
                ior,
            } => {
                let n_dot_l = n.dot(wi);
                if n_dot_l <= 0.0 {
                    return Vec3A::ZERO;
                }
                let n_dot_v = n.dot(wo).max(0.0);
                let h = (wo + wi).normalize_or_zero();

                let d = distribution_ggx(n, h, roughness);
                let g = geometry_smith(n_dot_v, n_dot_l, roughness);
                let f = fresnel(-wo, n, ior);

                let denominator = (4.0 * n_dot_v * n_dot_l).max(EPSILON);
                let cook_torrance = specular * (d * g * f / denominator);
                cook_torrance + (1.0 - f) * albedo / PI
            }
        }
    }
}

#[inline(always)]
fn is_reflection(wi: Vec3A, wo: Vec3A, n: Vec3A) -> bool {
    (reflect(wo, n) - wi).length_squared() < DIRECTION_EPSILON
}

/// Trowbridge-Reitz normal distribution.
#[inline(always)]
fn distribution_ggx(n: Vec3A, h: Vec3A, roughness: f32) -> f32 {
    let a = roughness * roughness;
    let a2 = a * a;
    let n_dot_h = n.dot(h).max(0.0);
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    // Roughness 0 with n == h would divide by zero.
    a2 / (PI * denom * denom).max(1e-7)
}

#[inline(always)]
fn geometry_schlick_ggx(n_dot_v: f32, k: f32) -> f32 {
    n_dot_v / (n_dot_v * (1.0 - k) + k)
}

/// Separable Smith masking-shadowing with the Schlick-GGX approximation.
#[inline(always)]
fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = r * r / 8.0;
    geometry_schlick_ggx(n_dot_v, k) * geometry_schlick_ggx(n_dot_l, k)
}

/// Unpolarised dielectric Fresnel reflectance for incident direction `i`.
#[inline(always)]
fn fresnel(i: Vec3A, n: Vec3A, ior: f32) -> f32 {
    let mut cos_i = i.dot(n).clamp(-1.0, 1.0);
    let (mut eta_i, mut eta_t) = (1.0, ior);
    if cos_i > 0.0 {
        std::mem::swap(&mut eta_i, &mut eta_t);
    }
    let sin_t = eta_i / eta_t * (1.0 - cos_i * cos_i).max(0.0).sqrt();
    if sin_t >= 1.0 {
        // Total internal reflection.
        return 1.0;
    }
    let cos_t = (1.0 - sin_t * sin_t).max(0.0).sqrt();
    cos_i = cos_i.abs();
    let rs = (eta_t * cos_i - eta_i * cos_t) / (eta_t * cos_i + eta_i * cos_t);
    let rp = (eta_i * cos_i - eta_t * cos_t) / (eta_i * cos_i + eta_t * cos_t);
    (rs * rs + rp * rp) / 2.0
}
