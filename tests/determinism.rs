use glam::{vec3a, Vec3A};
use path_racing::{
    par::Scheduler,
    render::{render_lanes, render_rows, to_rgb8, Camera},
    settings::IntegratorSettings,
    test_util::geometry::cornell_scene,
};

fn camera(size: u32) -> Camera {
    Camera::look_at(
        vec3a(278.0, 273.0, -800.0),
        vec3a(278.0, 273.0, 0.0),
        Vec3A::Y,
        40.0,
        size,
        size,
    )
}

#[test]
fn same_seed_renders_are_bit_identical() {
    let scene = cornell_scene(IntegratorSettings::default()).unwrap();
    let camera = camera(16);
    let a = render_rows(&scene, &camera, 4, 42, Scheduler::Rayon, &|_: f32| {});
    let b = render_rows(&scene, &camera, 4, 42, Scheduler::Rayon, &|_: f32| {});
    assert_eq!(a, b);
    let c = render_lanes(&scene, &camera, 4, 42, Scheduler::Rayon, &|_: f32| {});
    let d = render_lanes(&scene, &camera, 4, 42, Scheduler::Rayon, &|_: f32| {});
    assert_eq!(c, d);
    assert_eq!(to_rgb8(&a, 0.6), to_rgb8(&b, 0.6));
}

#[test]
fn different_seeds_give_different_noise() {
    let scene = cornell_scene(IntegratorSettings::default()).unwrap();
    let camera = camera(16);
    let a = render_rows(&scene, &camera, 2, 1, Scheduler::Rayon, &|_: f32| {});
    let b = render_rows(&scene, &camera, 2, 2, Scheduler::Rayon, &|_: f32| {});
    assert_ne!(a, b);
}

#[test]
fn cornell_box_renders_finite_lit_image() {
    let settings = IntegratorSettings::default();
    let scene = cornell_scene(settings).unwrap();
    let camera = camera(24);
    let image = render_lanes(&scene, &camera, 4, 0, Scheduler::Rayon, &|_: f32| {});
    assert_eq!(image.len(), 24 * 24);
    assert!(image.iter().all(|p| p.is_finite() && p.min_element() >= 0.0));

    // Above the tall block the view reaches the back wall, which sees the lamp.
    let back_wall = image[7 * 24 + 12];
    assert!(back_wall.min_element() > 0.0, "{back_wall}");
    assert_ne!(back_wall, settings.background);

    // The red wall is on the image's left, the green wall on its right.
    let left = image[12 * 24 + 2];
    let right = image[12 * 24 + 21];
    assert!(left.x > left.y, "left {left}");
    assert!(right.y > right.x, "right {right}");
}
