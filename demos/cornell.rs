//! Renders the Cornell box and writes it as a PNG.
//!
//! `cargo run --release --example cornell -- --width 256 --height 256 --spp 64`

use std::sync::atomic::{AtomicU32, Ordering};

use glam::{vec3a, Vec3A};
use path_racing::{
    render::{render, to_rgb8, Camera},
    settings::RenderArgs,
    test_util::geometry::cornell_scene,
    PrettyDuration,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: RenderArgs = argh::from_env();
    args.validate()?;

    let scene = cornell_scene(args.integrator_settings())?;
    let camera = Camera::look_at(
        vec3a(278.0, 273.0, -800.0),
        vec3a(278.0, 273.0, 0.0),
        Vec3A::Y,
        40.0,
        args.width,
        args.height,
    );

    let last_percent = AtomicU32::new(0);
    let progress = |p: f32| {
        let percent = (p * 100.0) as u32;
        if percent / 10 > last_percent.fetch_max(percent, Ordering::Relaxed) / 10 {
            tracing::info!("{percent}%");
        }
    };

    let start = std::time::Instant::now();
    let framebuffer = render(&scene, &camera, &args, &progress);
    tracing::info!(
        "rendered {}x{} at {} spp in {}",
        args.width,
        args.height,
        args.spp,
        PrettyDuration(start.elapsed())
    );

    image::save_buffer(
        &args.output,
        &to_rgb8(&framebuffer, args.gamma),
        args.width,
        args.height,
        image::ColorType::Rgb8,
    )?;
    tracing::info!("wrote {}", args.output);
    Ok(())
}
