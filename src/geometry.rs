//! Geometric primitives and the intersection record they produce.
//!
//! The set of shapes is closed: [`Triangle`], [`Sphere`] and the composite
//! [`MeshTriangle`] (a nested BVH over triangles). [`Object`] wraps them in a
//! single tagged type so the top level BVH stays monomorphic.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::Vec3A;
use rand::Rng;

use crate::{
    aabb::Aabb,
    bvh::{AreaWarp, Bvh},
    error::{Error, Result},
    ray::Ray,
    rng::Pcg32,
    sampling::{uniform_sphere, uniform_triangle},
};

/// Rays closer to parallel than this (cosine against the plane normal) miss a triangle.
const PARALLEL_EPSILON: f32 = 1e-7;

/// Result of a ray query or a surface sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub happened: bool,
    pub point: Vec3A,
    /// Geometric normal, unit length, not flipped towards the ray.
    pub normal: Vec3A,
    /// Emitted radiance of the material at the hit. Filled in by the scene.
    pub emission: Vec3A,
    pub material: u32,
    /// Distance along the ray, `f32::INFINITY` when nothing was hit.
    pub distance: f32,
}

impl Default for Hit {
    fn default() -> Self {
        Self::none()
    }
}

impl Hit {
    #[inline(always)]
    pub fn none() -> Self {
        Self {
            happened: false,
            point: Vec3A::ZERO,
            normal: Vec3A::ZERO,
            emission: Vec3A::ZERO,
            material: 0,
            distance: f32::INFINITY,
        }
    }

    /// A point on a surface that was sampled rather than hit.
    #[inline(always)]
    pub fn on_surface(point: Vec3A, normal: Vec3A, material: u32) -> Self {
        Self {
            happened: true,
            point,
            normal,
            emission: Vec3A::ZERO,
            material,
            distance: 0.0,
        }
    }

    /// The nearer of two candidates. Misses lose against anything.
    #[inline(always)]
    pub fn nearest(self, other: Self) -> Self {
        if other.distance < self.distance {
            other
        } else {
            self
        }
    }
}

/// A shape that can be stored in a [`Bvh`].
pub trait Geometry {
    fn bounds(&self) -> Aabb;
    fn area(&self) -> f32;
    fn material(&self) -> u32;
    /// Nearest intersection within `[ray.tmin, ray.tmax]`.
    fn intersect(&self, ray: &Ray) -> Hit;
    /// Uniform point on the surface and its density with respect to area.
    fn sample(&self, rng: &mut Pcg32) -> Result<(Hit, f32)>;
}

#[derive(Clone, Copy, Default, Debug, PartialEq)]
#[repr(C)]
pub struct Triangle {
    pub v0: Vec3A,
    pub v1: Vec3A,
    pub v2: Vec3A,
    /// v1 - v0
    pub e1: Vec3A,
    /// v2 - v0
    pub e2: Vec3A,
    pub normal: Vec3A,
    pub area: f32,
    pub material: u32,
    _padding: [u32; 2],
}

unsafe impl Pod for Triangle {}
unsafe impl Zeroable for Triangle {}

impl Triangle {
    /// Counter-clockwise vertices, normal follows the right hand rule.
    pub fn new(v0: Vec3A, v1: Vec3A, v2: Vec3A, material: u32) -> Self {
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let cross = e1.cross(e2);
        Self {
            v0,
            v1,
            v2,
            e1,
            e2,
            normal: cross.normalize_or_zero(),
            area: cross.length() * 0.5,
            material,
            _padding: [0; 2],
        }
    }

    /// Compute the bounding box of the triangle.
    #[inline(always)]
    pub fn aabb(&self) -> Aabb {
        *Aabb::from_point(self.v0).extend(self.v1).extend(self.v2)
    }
}

impl Geometry for Triangle {
    #[inline(always)]
    fn bounds(&self) -> Aabb {
        self.aabb()
    }

    #[inline(always)]
    fn area(&self) -> f32 {
        self.area
    }

    #[inline(always)]
    fn material(&self) -> u32 {
        self.material
    }

    /// Two sided Möller–Trumbore.
    #[inline(always)]
    fn intersect(&self, ray: &Ray) -> Hit {
        let pvec = ray.direction.cross(self.e2);
        let det = self.e1.dot(pvec);
        // Negated so NaN also takes the early out.
        if !(det.abs() > PARALLEL_EPSILON * 2.0 * self.area) {
            return Hit::none();
        }
        let inv_det = 1.0 / det;

        let tvec = ray.origin - self.v0;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return Hit::none();
        }
        let qvec = tvec.cross(self.e1);
        let v = ray.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return Hit::none();
        }

        let t = self.e2.dot(qvec) * inv_det;
        if !(t >= ray.tmin && t <= ray.tmax) {
            return Hit::none();
        }

        Hit {
            happened: true,
            point: ray.at(t),
            normal: self.normal,
            emission: Vec3A::ZERO,
            material: self.material,
            distance: t,
        }
    }

    #[inline(always)]
    fn sample(&self, rng: &mut Pcg32) -> Result<(Hit, f32)> {
        let point = uniform_triangle(self.v0, self.v1, self.v2, rng.random(), rng.random());
        Ok((
            Hit::on_surface(point, self.normal, self.material),
            1.0 / self.area,
        ))
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq)]
#[repr(C)]
pub struct Sphere {
    pub center: Vec3A,
    pub radius: f32,
    pub radius2: f32,
    pub area: f32,
    pub material: u32,
}

unsafe impl Pod for Sphere {}
unsafe impl Zeroable for Sphere {}

impl Sphere {
    pub fn new(center: Vec3A, radius: f32, material: u32) -> Self {
        Self {
            center,
            radius,
            radius2: radius * radius,
            area: 4.0 * PI * radius * radius,
            material,
        }
    }
}

/// Real roots of `a x^2 + b x + c`, smallest first.
#[inline(always)]
fn solve_quadratic(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    let discr = b * b - 4.0 * a * c;
    if !(discr >= 0.0) {
        return None;
    }
    let (x0, x1) = if discr == 0.0 {
        let x = -0.5 * b / a;
        (x, x)
    } else {
        let q = if b > 0.0 {
            -0.5 * (b + discr.sqrt())
        } else {
            -0.5 * (b - discr.sqrt())
        };
        (q / a, c / q)
    };
    Some((x0.min(x1), x0.max(x1)))
}

impl Geometry for Sphere {
    #[inline(always)]
    fn bounds(&self) -> Aabb {
        Aabb {
            min: self.center - Vec3A::splat(self.radius),
            max: self.center + Vec3A::splat(self.radius),
        }
    }

    #[inline(always)]
    fn area(&self) -> f32 {
        self.area
    }

    #[inline(always)]
    fn material(&self) -> u32 {
        self.material
    }

    #[inline(always)]
    fn intersect(&self, ray: &Ray) -> Hit {
        let l = ray.origin - self.center;
        let a = ray.direction.dot(ray.direction);
        if !(a > 0.0) {
            return Hit::none();
        }
        let b = 2.0 * ray.direction.dot(l);
        let c = l.dot(l) - self.radius2;
        let Some((t0, t1)) = solve_quadratic(a, b, c) else {
            return Hit::none();
        };
        let t = if t0 >= ray.tmin { t0 } else { t1 };
        if !(t >= ray.tmin && t <= ray.tmax) {
            return Hit::none();
        }
        let point = ray.at(t);
        Hit {
            happened: true,
            point,
            normal: (point - self.center).normalize_or_zero(),
            emission: Vec3A::ZERO,
            material: self.material,
            distance: t,
        }
    }

    #[inline(always)]
    fn sample(&self, rng: &mut Pcg32) -> Result<(Hit, f32)> {
        let dir = uniform_sphere(rng.random(), rng.random());
        Ok((
            Hit::on_surface(self.center + self.radius * dir, dir, self.material),
            1.0 / self.area,
        ))
    }
}

/// A triangle mesh with a single material, accelerated by its own BVH.
#[derive(Clone, Debug)]
pub struct MeshTriangle {
    bvh: Bvh<Triangle>,
    material: u32,
}

impl MeshTriangle {
    /// Takes ownership of `triangles` and assigns them all `material`.
    pub fn new(mut triangles: Vec<Triangle>, material: u32) -> Result<Self> {
        if triangles.is_empty() {
            return Err(Error::EmptyMesh);
        }
        for triangle in &mut triangles {
            triangle.material = material;
        }
        Ok(Self {
            bvh: Bvh::build(triangles),
            material,
        })
    }

    /// Chooses how the nested BVH warps its area samples.
    #[must_use]
    pub fn with_sample_warp(mut self, warp: AreaWarp) -> Self {
        self.bvh = self.bvh.with_sample_warp(warp);
        self
    }

    pub fn bvh(&self) -> &Bvh<Triangle> {
        &self.bvh
    }

    pub fn triangles(&self) -> &[Triangle] {
        self.bvh.primitives()
    }
}

impl Geometry for MeshTriangle {
    #[inline(always)]
    fn bounds(&self) -> Aabb {
        self.bvh.bounds()
    }

    #[inline(always)]
    fn area(&self) -> f32 {
        self.bvh.area()
    }

    #[inline(always)]
    fn material(&self) -> u32 {
        self.material
    }

    #[inline(always)]
    fn intersect(&self, ray: &Ray) -> Hit {
        self.bvh.intersect(ray)
    }

    #[inline(always)]
    fn sample(&self, rng: &mut Pcg32) -> Result<(Hit, f32)> {
        self.bvh.sample(rng)
    }
}

/// Top level scene object.
#[derive(Clone, Debug)]
pub enum Object {
    Sphere(Sphere),
    Triangle(Triangle),
    Mesh(MeshTriangle),
}

impl From<Sphere> for Object {
    fn from(sphere: Sphere) -> Self {
        Object::Sphere(sphere)
    }
}

impl From<Triangle> for Object {
    fn from(triangle: Triangle) -> Self {
        Object::Triangle(triangle)
    }
}

impl From<MeshTriangle> for Object {
    fn from(mesh: MeshTriangle) -> Self {
        Object::Mesh(mesh)
    }
}

impl Geometry for Object {
    #[inline(always)]
    fn bounds(&self) -> Aabb {
        match self {
            Object::Sphere(s) => s.bounds(),
            Object::Triangle(t) => t.bounds(),
            Object::Mesh(m) => m.bounds(),
        }
    }

    #[inline(always)]
    fn area(&self) -> f32 {
        match self {
            Object::Sphere(s) => s.area(),
            Object::Triangle(t) => t.area(),
            Object::Mesh(m) => m.area(),
        }
    }

    #[inline(always)]
    fn material(&self) -> u32 {
        match self {
            Object::Sphere(s) => s.material(),
            Object::Triangle(t) => t.material(),
            Object::Mesh(m) => m.material(),
        }
    }

    #[inline(always)]
    fn intersect(&self, ray: &Ray) -> Hit {
        match self {
            Object::Sphere(s) => s.intersect(ray),
            Object::Triangle(t) => t.intersect(ray),
            Object::Mesh(m) => m.intersect(ray),
        }
    }

    #[inline(always)]
    fn sample(&self, rng: &mut Pcg32) -> Result<(Hit, f32)> {
        match self {
            Object::Sphere(s) => s.sample(rng),
            Object::Triangle(t) => t.sample(rng),
            Object::Mesh(m) => m.sample(rng),
        }
    }
}
