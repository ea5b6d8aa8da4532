//! An Axis-Aligned Bounding Box (AABB) represented by its minimum and maximum points.

use bytemuck::{Pod, Zeroable};
use glam::Vec3A;

use crate::ray::Ray;

/// Coordinate axis, as returned by [`Aabb::max_extent_axis`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// An Axis-Aligned Bounding Box (AABB) represented by its minimum and maximum points.
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Aabb {
    pub min: Vec3A,
    pub max: Vec3A,
}

unsafe impl Pod for Aabb {}
unsafe impl Zeroable for Aabb {}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Creates a new AABB with both min and max set to the given point.
    #[inline(always)]
    pub fn from_point(point: Vec3A) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Smallest AABB containing all the given points.
    #[inline(always)]
    pub fn from_points(points: &[Vec3A]) -> Self {
        points
            .iter()
            .fold(Self::empty(), |aabb, p| aabb.union_point(*p))
    }

    /// Returns an empty AABB. Union with anything yields the other operand.
    #[inline(always)]
    pub fn empty() -> Self {
        Self {
            min: Vec3A::splat(f32::INFINITY),
            max: Vec3A::splat(f32::NEG_INFINITY),
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Extends the AABB to include the given point.
    #[inline(always)]
    pub fn extend(&mut self, point: Vec3A) -> &mut Self {
        *self = self.union_point(point);
        self
    }

    /// Returns the union of this AABB and another AABB.
    #[inline(always)]
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns the union of this AABB and a point.
    #[inline(always)]
    #[must_use]
    pub fn union_point(&self, point: Vec3A) -> Self {
        Aabb {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    /// Returns the diagonal vector of the AABB.
    #[inline(always)]
    pub fn diagonal(&self) -> Vec3A {
        self.max - self.min
    }

    /// Returns the center point of the AABB.
    #[inline(always)]
    pub fn centroid(&self) -> Vec3A {
        (self.max + self.min) * 0.5
    }

    /// Returns the center coordinate of the AABB along a specific axis.
    #[inline(always)]
    pub fn center_axis(&self, axis: usize) -> f32 {
        (self.max[axis] + self.min[axis]) * 0.5
    }

    /// Axis with the largest extent. Ties prefer Y over X and Z over both.
    #[inline(always)]
    pub fn max_extent_axis(&self) -> Axis {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            Axis::X
        } else if d.y > d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Returns the surface area of the AABB.
    #[inline(always)]
    pub fn surface_area(&self) -> f32 {
        let d = self.diagonal();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    #[inline(always)]
    pub fn contains(&self, point: Vec3A) -> bool {
        (point.cmplt(self.min) | point.cmpgt(self.max)).bitmask() == 0
    }

    /// Entry and exit distances of the ray through the three slabs.
    #[inline(always)]
    fn slab_interval(&self, ray: &Ray, inv_dir: Vec3A, dir_is_neg: [bool; 3]) -> (f32, f32) {
        let mut t_min = (self.min - ray.origin) * inv_dir;
        let mut t_max = (self.max - ray.origin) * inv_dir;
        for axis in 0..3 {
            if dir_is_neg[axis] {
                let t = t_min[axis];
                t_min[axis] = t_max[axis];
                t_max[axis] = t;
            }
        }
        let t_enter = t_min.x.max(t_min.y.max(t_min.z));
        let t_exit = t_max.x.min(t_max.y.min(t_max.z));
        (t_enter, t_exit)
    }

    /// Slab test. Accepts the box iff the per-axis intervals overlap and the
    /// overlap is not entirely behind the ray origin.
    #[inline(always)]
    pub fn intersect_p(&self, ray: &Ray, inv_dir: Vec3A, dir_is_neg: [bool; 3]) -> bool {
        let (t_enter, t_exit) = self.slab_interval(ray, inv_dir, dir_is_neg);
        t_enter <= t_exit && t_exit >= 0.0
    }

    /// Checks if this AABB intersects with a ray and returns the distance to the intersection point.
    /// Returns `f32::INFINITY` if there is no intersection.
    #[inline(always)]
    pub fn intersect_ray(&self, ray: &Ray, dir_is_neg: [bool; 3]) -> f32 {
        let (t_enter, t_exit) = self.slab_interval(ray, ray.inv_direction, dir_is_neg);
        if t_enter <= t_exit && t_exit >= 0.0 {
            t_enter
        } else {
            f32::INFINITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3a;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_box(rng: &mut StdRng) -> Aabb {
        let a = vec3a(
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
        );
        let b = vec3a(
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
            rng.random_range(-5.0..5.0),
        );
        Aabb::from_points(&[a, b])
    }

    #[test]
    fn union_laws() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let (a, b, c) = (
                random_box(&mut rng),
                random_box(&mut rng),
                random_box(&mut rng),
            );
            assert_eq!(a.union(&b), b.union(&a));
            assert_eq!(a.union(&b).union(&c), a.union(&b.union(&c)));
            assert_eq!(a.union(&Aabb::empty()), a);
            assert_eq!(Aabb::empty().union(&a), a);
        }
        assert!(Aabb::empty().is_empty());
        let p = vec3a(1.0, 2.0, 3.0);
        assert_eq!(Aabb::empty().union_point(p), Aabb::from_point(p));
    }

    #[test]
    fn extent_centroid_and_area() {
        let aabb = Aabb::from_points(&[Vec3A::ZERO, vec3a(1.0, 3.0, 2.0)]);
        assert_eq!(aabb.max_extent_axis(), Axis::Y);
        assert_eq!(aabb.centroid(), vec3a(0.5, 1.5, 1.0));
        assert_eq!(aabb.surface_area(), 2.0 * (3.0 + 2.0 + 6.0));
        let cube = Aabb::from_points(&[Vec3A::ZERO, Vec3A::ONE]);
        assert_eq!(cube.max_extent_axis(), Axis::Z);
        assert!(cube.contains(Vec3A::splat(0.5)));
        assert!(!cube.contains(Vec3A::splat(1.5)));
    }

    /// Reference slab test dividing per axis and handling zero components explicitly.
    fn brute_force(aabb: &Aabb, origin: Vec3A, dir: Vec3A) -> Option<(f32, f32)> {
        let mut enter = f32::NEG_INFINITY;
        let mut exit = f32::INFINITY;
        for axis in 0..3 {
            if dir[axis] == 0.0 {
                if origin[axis] < aabb.min[axis] || origin[axis] > aabb.max[axis] {
                    return None;
                }
                continue;
            }
            let t0 = (aabb.min[axis] - origin[axis]) / dir[axis];
            let t1 = (aabb.max[axis] - origin[axis]) / dir[axis];
            enter = enter.max(t0.min(t1));
            exit = exit.min(t0.max(t1));
        }
        Some((enter, exit))
    }

    #[test]
    fn slab_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut checked = 0;
        for i in 0..20_000 {
            let aabb = random_box(&mut rng);
            let origin = vec3a(
                rng.random_range(-8.0..8.0),
                rng.random_range(-8.0..8.0),
                rng.random_range(-8.0..8.0),
            );
            let mut dir = vec3a(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            // Every fourth ray is axis aligned, negated half the time so the
            // other components are -0.0. Another fourth has one signed zero.
            if i % 4 == 0 {
                let axis = [Vec3A::X, Vec3A::Y, Vec3A::Z][i / 4 % 3];
                dir = if rng.random::<bool>() { axis } else { -axis };
            } else if i % 4 == 1 {
                dir[rng.random_range(0..3)] = if rng.random::<bool>() { 0.0 } else { -0.0 };
            }
            let ray = Ray::new_inf(origin, dir);
            let expected = match brute_force(&aabb, origin, dir) {
                None => false,
                Some((enter, exit)) => {
                    // Skip grazing cases where rounding decides the outcome.
                    if (enter - exit).abs() < 1e-3 || exit.abs() < 1e-3 {
                        continue;
                    }
                    enter <= exit && exit >= 0.0
                }
            };
            let got = aabb.intersect_p(&ray, ray.inv_direction, ray.dir_is_neg());
            assert_eq!(got, expected, "ray {ray:?} box {aabb:?}");
            assert_eq!(
                aabb.intersect_ray(&ray, ray.dir_is_neg()) < f32::INFINITY,
                expected
            );
            checked += 1;
        }
        assert!(checked > 15_000);
    }

    #[test]
    fn box_behind_origin_is_rejected() {
        let aabb = Aabb::from_points(&[vec3a(-1.0, -1.0, -6.0), vec3a(1.0, 1.0, -4.0)]);
        let forward = Ray::new_inf(Vec3A::ZERO, vec3a(0.0, 0.0, 1.0));
        let backward = Ray::new_inf(Vec3A::ZERO, vec3a(0.0, 0.0, -1.0));
        assert!(!aabb.intersect_p(&forward, forward.inv_direction, forward.dir_is_neg()));
        assert!(aabb.intersect_p(&backward, backward.inv_direction, backward.dir_is_neg()));
        assert_eq!(aabb.intersect_ray(&backward, backward.dir_is_neg()), 4.0);
    }

    #[test]
    fn negated_axis_rays_hit_boxes_ahead() {
        let cube = Aabb::from_points(&[Vec3A::splat(-1.0), Vec3A::splat(1.0)]);
        for axis in [Vec3A::X, Vec3A::Y, Vec3A::Z] {
            for dir in [axis, -axis] {
                let ray = Ray::new_inf(-3.0 * dir, dir);
                assert!(cube.intersect_p(&ray, ray.inv_direction, ray.dir_is_neg()));
                assert_eq!(cube.intersect_ray(&ray, ray.dir_is_neg()), 2.0);
                let away = Ray::new_inf(-3.0 * dir, -dir);
                assert!(!cube.intersect_p(&away, away.inv_direction, away.dir_is_neg()));
            }
        }
    }

    #[test]
    fn origin_inside_box_hits() {
        let aabb = Aabb::from_points(&[Vec3A::splat(-1.0), Vec3A::splat(1.0)]);
        let ray = Ray::new_inf(Vec3A::ZERO, vec3a(0.3, -0.2, 0.9));
        assert!(aabb.intersect_p(&ray, ray.inv_direction, ray.dir_is_neg()));
        assert!(aabb.intersect_ray(&ray, ray.dir_is_neg()) < 0.0);
    }
}
