//! A ray in 3D space.

use glam::{vec3a, Vec3A};

use crate::EPSILON;

/// Computes the inverse of `x` avoiding division by zero.
#[inline(always)]
pub fn safe_inverse(x: f32) -> f32 {
    if x.abs() <= f32::EPSILON {
        x.signum() / f32::EPSILON
    } else {
        1.0 / x
    }
}

/// A struct representing a ray in 3D space.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct Ray {
    /// The starting point of the ray.
    pub origin: Vec3A,
    /// The direction vector of the ray.
    pub direction: Vec3A,
    /// The inverse of the direction vector components.
    /// Used to avoid division in ray/aabb tests. Only ever derived from `direction`.
    pub inv_direction: Vec3A,
    /// The minimum `t` (distance) value for intersection tests.
    pub tmin: f32,
    /// The maximum `t` (distance) value for intersection tests.
    pub tmax: f32,
    /// Time the ray was emitted at.
    pub time: f32,
}

impl Ray {
    /// Creates a new `Ray` with the given origin, direction, and `t` (distance) range.
    #[inline(always)]
    pub fn new(origin: Vec3A, direction: Vec3A, min: f32, max: f32) -> Self {
        // No finiteness asserts: degenerate directions must come out as misses.
        Ray {
            origin,
            direction,
            inv_direction: vec3a(
                safe_inverse(direction.x),
                safe_inverse(direction.y),
                safe_inverse(direction.z),
            ),
            tmin: min,
            tmax: max,
            time: 0.0,
        }
    }

    /// Creates a new infinite `Ray` with the given origin, direction.
    #[inline(always)]
    pub fn new_inf(origin: Vec3A, direction: Vec3A) -> Self {
        Self::new(origin, direction, 0.0, f32::INFINITY)
    }

    /// Creates a secondary ray leaving a surface at `point`.
    ///
    /// The origin is pushed `EPSILON` along `normal`, towards the side `direction`
    /// leaves through, so the ray does not re-hit the surface it starts on.
    #[inline(always)]
    pub fn spawn(point: Vec3A, normal: Vec3A, direction: Vec3A) -> Self {
        let side = if normal.dot(direction) < 0.0 {
            -normal
        } else {
            normal
        };
        Self::new_inf(point + side * EPSILON, direction)
    }

    /// Point at distance `t` along the ray.
    #[inline(always)]
    pub fn at(&self, t: f32) -> Vec3A {
        self.origin + self.direction * t
    }

    /// Per axis, whether the ray travels towards negative coordinates.
    ///
    /// Read from `inv_direction`, so a `-0.0` component (inverted to a large
    /// negative value) swaps the slab bounds the same way a negative one does.
    #[inline(always)]
    pub fn dir_is_neg(&self) -> [bool; 3] {
        [
            self.inv_direction.x < 0.0,
            self.inv_direction.y < 0.0,
            self.inv_direction.z < 0.0,
        ]
    }
}
