//! Camera and the two render drivers.
//!
//! [`render_rows`] hands whole image rows to the scheduler and draws every
//! sample of a row from one generator. [`render_lanes`] mirrors a compute
//! dispatch instead: every `(pixel, sub-sample)` pair of a row is its own lane
//! with its own generator, and lanes are reduced into pixels once the row is
//! done. Both are deterministic for a given seed regardless of scheduler.

use std::sync::atomic::{AtomicUsize, Ordering};

use glam::Vec3A;
use rand::Rng;

use crate::{
    par::Scheduler, ray::Ray, rng::Pcg32, scene::Scene, scope_print_major,
    settings::RenderArgs,
};

/// Pinhole camera. Pixel `(0, 0)` is the top left corner of the image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3A,
    forward: Vec3A,
    right: Vec3A,
    up: Vec3A,
    /// `tan(fov / 2)`
    scale: f32,
    aspect: f32,
    pub width: u32,
    pub height: u32,
}

impl Camera {
    /// `fov_deg` is the vertical field of view. `up` must not be parallel to
    /// `target - eye`.
    pub fn look_at(
        eye: Vec3A,
        target: Vec3A,
        up: Vec3A,
        fov_deg: f32,
        width: u32,
        height: u32,
    ) -> Self {
        let forward = (target - eye).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        Self {
            eye,
            forward,
            right,
            up,
            scale: (fov_deg.to_radians() * 0.5).tan(),
            aspect: width as f32 / height.max(1) as f32,
            width,
            height,
        }
    }

    /// Primary ray through the continuous pixel position `(x, y)`.
    #[inline(always)]
    pub fn ray(&self, x: f32, y: f32) -> Ray {
        let ndc_x = (2.0 * x / self.width as f32 - 1.0) * self.aspect * self.scale;
        let ndc_y = (1.0 - 2.0 * y / self.height as f32) * self.scale;
        let direction = (self.forward + ndc_x * self.right + ndc_y * self.up).normalize();
        Ray::new_inf(self.eye, direction)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Renders with [`render_lanes`] or [`render_rows`] as `args` selects.
pub fn render(
    scene: &Scene,
    camera: &Camera,
    args: &RenderArgs,
    progress: &(dyn Fn(f32) + Sync),
) -> Vec<Vec3A> {
    if args.lanes {
        render_lanes(scene, camera, args.spp, args.seed, args.scheduler, progress)
    } else {
        render_rows(scene, camera, args.spp, args.seed, args.scheduler, progress)
    }
}

/// One task per row, `spp` jittered samples per pixel. Row `r` draws from
/// `Pcg32::new(seed, r)`. Returns linear radiance, row major.
#[tracing::instrument(skip_all, fields(width = camera.width, height = camera.height, spp = spp))]
pub fn render_rows(
    scene: &Scene,
    camera: &Camera,
    spp: u32,
    seed: u64,
    scheduler: Scheduler,
    progress: &(dyn Fn(f32) + Sync),
) -> Vec<Vec3A> {
    scope_print_major!("render_rows");
    let width = camera.width as usize;
    let height = camera.height as usize;
    let spp = spp.max(1);
    let mut framebuffer = vec![Vec3A::ZERO; camera.pixel_count()];
    let rows_done = AtomicUsize::new(0);

    scheduler.par_chunks_mut(
        &mut framebuffer,
        &|row, pixels: &mut [Vec3A]| {
            crate::scope!("render_row");
            let mut rng = Pcg32::new(seed, row as u64);
            for (x, pixel) in pixels.iter_mut().enumerate() {
                let mut sum = Vec3A::ZERO;
                for _ in 0..spp {
                    let jitter_x: f32 = rng.random();
                    let jitter_y: f32 = rng.random();
                    let ray = camera.ray(x as f32 + jitter_x, row as f32 + jitter_y);
                    sum += scene.cast_ray(&ray, &mut rng);
                }
                *pixel = sum / spp as f32;
            }
            let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
            progress(done as f32 / height as f32);
        },
        width,
    );

    progress(1.0);
    tracing::debug!("render_rows finished");
    framebuffer
}

/// One lane per `(pixel, sub-sample)` on a stratified `ss x ss` grid, where
/// `ss = floor(sqrt(spp))`. Lane `l` of the whole image draws from
/// `Pcg32::new(seed, l)`.
#[tracing::instrument(skip_all, fields(width = camera.width, height = camera.height, spp = spp))]
pub fn render_lanes(
    scene: &Scene,
    camera: &Camera,
    spp: u32,
    seed: u64,
    scheduler: Scheduler,
    progress: &(dyn Fn(f32) + Sync),
) -> Vec<Vec3A> {
    scope_print_major!("render_lanes");
    let width = camera.width as usize;
    let height = camera.height as usize;
    let ss = ((spp.max(1) as f32).sqrt() as usize).max(1);
    let samples = ss * ss;
    let lanes_per_row = width * samples;
    let mut framebuffer = vec![Vec3A::ZERO; camera.pixel_count()];
    let mut lanes = vec![Vec3A::ZERO; lanes_per_row];

    for (row, pixels) in framebuffer.chunks_mut(width.max(1)).enumerate() {
        crate::scope!("dispatch_row");
        let first_lane = row * lanes_per_row;
        scheduler.par_map(&mut lanes, &|lane, out: &mut Vec3A| {
            let mut rng = Pcg32::new(seed, (first_lane + lane) as u64);
            let pixel = lane / samples;
            let sub = lane % samples;
            let x = pixel as f32 + ((sub % ss) as f32 + 0.5) / ss as f32;
            let y = row as f32 + ((sub / ss) as f32 + 0.5) / ss as f32;
            *out = scene.cast_ray(&camera.ray(x, y), &mut rng);
        });

        for (pixel, lane_block) in pixels.iter_mut().zip(lanes.chunks(samples)) {
            *pixel = lane_block.iter().copied().sum::<Vec3A>() / samples as f32;
        }
        progress((row + 1) as f32 / height as f32);
    }

    progress(1.0);
    tracing::debug!(samples_per_pixel = samples, "render_lanes finished");
    framebuffer
}

/// Packs linear radiance into RGB bytes: clamp to `[0, 1]`, raise to `gamma`,
/// scale by 255 and truncate.
pub fn to_rgb8(framebuffer: &[Vec3A], gamma: f32) -> Vec<u8> {
    framebuffer
        .iter()
        .flat_map(|pixel| {
            let c = pixel.clamp(Vec3A::ZERO, Vec3A::ONE);
            [c.x, c.y, c.z].map(|v| (255.0 * v.powf(gamma)) as u8)
        })
        .collect()
}
