//! Warps from the unit square onto directions and surfaces.

use std::f32::consts::PI;

use glam::{vec3a, Vec3A};

/// Reflects `v` (pointing away from the surface) about `n`.
#[inline(always)]
pub fn reflect(v: Vec3A, n: Vec3A) -> Vec3A {
    2.0 * v.dot(n) * n - v
}

/// Maps `local` from the frame where `n` is +Z into world space.
#[inline(always)]
pub fn to_world(local: Vec3A, n: Vec3A) -> Vec3A {
    let c = if n.x.abs() > n.y.abs() {
        let inv_len = 1.0 / (n.x * n.x + n.z * n.z).sqrt();
        vec3a(n.z * inv_len, 0.0, -n.x * inv_len)
    } else {
        let inv_len = 1.0 / (n.y * n.y + n.z * n.z).sqrt();
        vec3a(0.0, n.z * inv_len, -n.y * inv_len)
    };
    let b = c.cross(n);
    local.x * b + local.y * c + local.z * n
}

/// Uniform direction on the hemisphere around `n`. Density is `1 / 2pi`.
#[inline(always)]
pub fn uniform_hemisphere(n: Vec3A, u1: f32, u2: f32) -> Vec3A {
    let z = (1.0 - 2.0 * u1).abs();
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u2;
    to_world(vec3a(r * phi.cos(), r * phi.sin(), z), n)
}

/// Uniform point on the unit sphere.
#[inline(always)]
pub fn uniform_sphere(u1: f32, u2: f32) -> Vec3A {
    let z = 1.0 - 2.0 * u1;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u2;
    vec3a(r * phi.cos(), r * phi.sin(), z)
}

/// Uniform point on the triangle `(v0, v1, v2)`.
#[inline(always)]
pub fn uniform_triangle(v0: Vec3A, v1: Vec3A, v2: Vec3A, u1: f32, u2: f32) -> Vec3A {
    let x = u1.sqrt();
    let y = u2;
    v0 * (1.0 - x) + v1 * (x * (1.0 - y)) + v2 * (x * y)
}
