use glam::{vec3a, Vec3A};
use rand::Rng;

use crate::{
    error::Result,
    geometry::{MeshTriangle, Object, Triangle},
    material::Material,
    scene::Scene,
    settings::IntegratorSettings,
};

/// Two triangles covering the planar quad `a b c d`. Vertices wind counter
/// clockwise around the normal.
pub fn quad(a: Vec3A, b: Vec3A, c: Vec3A, d: Vec3A, material: u32) -> [Triangle; 2] {
    [
        Triangle::new(a, b, c, material),
        Triangle::new(a, c, d, material),
    ]
}

/// Axis aligned rectangle in the plane `y = height`, centered on `center`
/// (x, z), with half extents `half`. The normal points along `-Y` when
/// `facing_down`, otherwise along `+Y`.
pub fn horizontal_rect(
    center: (f32, f32),
    half: (f32, f32),
    height: f32,
    facing_down: bool,
    material: u32,
) -> [Triangle; 2] {
    let (cx, cz) = center;
    let (hx, hz) = half;
    let a = vec3a(cx - hx, height, cz - hz);
    let b = vec3a(cx + hx, height, cz - hz);
    let c = vec3a(cx + hx, height, cz + hz);
    let d = vec3a(cx - hx, height, cz + hz);
    if facing_down {
        quad(a, b, c, d, material)
    } else {
        quad(a, d, c, b, material)
    }
}

/// `count` triangles of random shape scattered through `[-extent, extent]^3`.
pub fn random_triangles(rng: &mut impl Rng, count: usize, extent: f32) -> Vec<Triangle> {
    let size = extent * 0.15;
    (0..count)
        .map(|_| {
            let center = random_point(rng, extent);
            let v0 = center + random_point(rng, size);
            let v1 = center + random_point(rng, size);
            let v2 = center + random_point(rng, size);
            Triangle::new(v0, v1, v2, 0)
        })
        .collect()
}

fn random_point(rng: &mut impl Rng, extent: f32) -> Vec3A {
    vec3a(
        rng.random_range(-extent..=extent),
        rng.random_range(-extent..=extent),
        rng.random_range(-extent..=extent),
    )
}

pub const CORNELL_RED: u32 = 0;
pub const CORNELL_GREEN: u32 = 1;
pub const CORNELL_WHITE: u32 = 2;
pub const CORNELL_LIGHT: u32 = 3;

/// Materials of the Cornell box, indexed by the `CORNELL_*` constants.
pub fn cornell_materials() -> Vec<Material> {
    vec![
        Material::diffuse(vec3a(0.63, 0.065, 0.05)),
        Material::diffuse(vec3a(0.14, 0.45, 0.091)),
        Material::diffuse(vec3a(0.725, 0.71, 0.68)),
        Material::light(
            Vec3A::splat(0.65),
            8.0 * vec3a(0.747 + 0.058, 0.747 + 0.258, 0.747)
                + 15.6 * vec3a(0.740 + 0.287, 0.740 + 0.160, 0.740)
                + 18.4 * vec3a(0.737 + 0.642, 0.737 + 0.159, 0.737),
        ),
    ]
}

/// The classic 550 unit Cornell box with two blocks and a ceiling light,
/// as triangle meshes. Walls face inwards, the light faces down.
pub fn cornell_box() -> Result<Vec<Object>> {
    let floor = [
        vec3a(552.8, 0.0, 0.0),
        vec3a(0.0, 0.0, 0.0),
        vec3a(0.0, 0.0, 559.2),
        vec3a(549.6, 0.0, 559.2),
    ];
    let ceiling = [
        vec3a(556.0, 548.8, 0.0),
        vec3a(556.0, 548.8, 559.2),
        vec3a(0.0, 548.8, 559.2),
        vec3a(0.0, 548.8, 0.0),
    ];
    let back = [
        vec3a(549.6, 0.0, 559.2),
        vec3a(0.0, 0.0, 559.2),
        vec3a(0.0, 548.8, 559.2),
        vec3a(556.0, 548.8, 559.2),
    ];
    let right = [
        vec3a(0.0, 0.0, 559.2),
        vec3a(0.0, 0.0, 0.0),
        vec3a(0.0, 548.8, 0.0),
        vec3a(0.0, 548.8, 559.2),
    ];
    let left = [
        vec3a(552.8, 0.0, 0.0),
        vec3a(549.6, 0.0, 559.2),
        vec3a(556.0, 548.8, 559.2),
        vec3a(556.0, 548.8, 0.0),
    ];
    let light = [
        vec3a(343.0, 548.7, 227.0),
        vec3a(343.0, 548.7, 332.0),
        vec3a(213.0, 548.7, 332.0),
        vec3a(213.0, 548.7, 227.0),
    ];

    let mut white = Vec::new();
    for face in [floor, ceiling, back] {
        white.extend(quad(face[0], face[1], face[2], face[3], CORNELL_WHITE));
    }
    white.extend(block(&[
        vec3a(130.0, 165.0, 65.0),
        vec3a(82.0, 165.0, 225.0),
        vec3a(240.0, 165.0, 272.0),
        vec3a(290.0, 165.0, 114.0),
    ]));
    white.extend(block(&[
        vec3a(423.0, 330.0, 247.0),
        vec3a(265.0, 330.0, 296.0),
        vec3a(314.0, 330.0, 456.0),
        vec3a(472.0, 330.0, 406.0),
    ]));

    let mesh = |tris: [Triangle; 2], material| MeshTriangle::new(tris.to_vec(), material);
    Ok(vec![
        MeshTriangle::new(white, CORNELL_WHITE)?.into(),
        mesh(quad(left[0], left[1], left[2], left[3], CORNELL_RED), CORNELL_RED)?.into(),
        mesh(quad(right[0], right[1], right[2], right[3], CORNELL_GREEN), CORNELL_GREEN)?.into(),
        mesh(quad(light[0], light[1], light[2], light[3], CORNELL_LIGHT), CORNELL_LIGHT)?.into(),
    ])
}

/// Top face plus four sides of a block standing on the floor. `top` holds the
/// four top corners, counter clockwise seen from above.
fn block(top: &[Vec3A; 4]) -> Vec<Triangle> {
    let mut tris = Vec::with_capacity(10);
    tris.extend(quad(top[0], top[3], top[2], top[1], CORNELL_WHITE));
    for i in 0..4 {
        let a = top[i];
        let b = top[(i + 1) % 4];
        let a_floor = vec3a(a.x, 0.0, a.z);
        let b_floor = vec3a(b.x, 0.0, b.z);
        tris.extend(quad(a_floor, b_floor, b, a, CORNELL_WHITE));
    }
    tris
}

/// Cornell box scene with its default camera placement.
pub fn cornell_scene(settings: IntegratorSettings) -> Result<Scene> {
    Scene::new(cornell_box()?, cornell_materials(), settings)
}

pub const FLOOR: u32 = 0;
pub const LAMP: u32 = 1;

/// A downward facing emissive rectangle of half extents `half` at `height`
/// above a large diffuse floor in the plane `y = 0`. Both are loose top level
/// triangles, so light selection is exactly area proportional.
pub fn lamp_over_floor(
    half: (f32, f32),
    height: f32,
    floor_albedo: f32,
    radiance: f32,
) -> (Vec<Object>, Vec<Material>) {
    let mut objects: Vec<Object> = Vec::new();
    objects.extend(
        horizontal_rect((0.0, 0.0), (50.0, 50.0), 0.0, false, FLOOR)
            .into_iter()
            .map(Object::from),
    );
    objects.extend(
        horizontal_rect((0.0, 0.0), half, height, true, LAMP)
            .into_iter()
            .map(Object::from),
    );
    let materials = vec![
        Material::diffuse(Vec3A::splat(floor_albedo)),
        Material::light(Vec3A::ZERO, Vec3A::splat(radiance)),
    ];
    (objects, materials)
}

/// Irradiance at the point below the center of a uniformly emitting
/// rectangle of radiance `radiance`, half extents `(a, b)`, at `height`.
pub fn rect_irradiance(radiance: f32, half: (f32, f32), height: f32) -> f32 {
    let x = half.0 / height;
    let y = half.1 / height;
    let sx = (1.0 + x * x).sqrt();
    let sy = (1.0 + y * y).sqrt();
    2.0 * radiance * (x / sx * (y / sx).atan() + y / sy * (x / sy).atan())
}
