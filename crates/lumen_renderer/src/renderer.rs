//! Image rendering driver.
//!
//! Splits the image into buckets, renders them in parallel with rayon
//! and stitches the results into an [`ImageBuffer`]. Pixels hold linear
//! radiance; gamma is applied only when converting to bytes.

use std::time::Instant;

use lumen_math::Interval;
use rand::RngCore;
use rayon::prelude::*;

use crate::bucket::{generate_buckets, render_bucket, BucketResult};
use crate::integrator::Integrator;
use crate::settings::RenderSettings;
use crate::tracer::RenderContext;
use crate::{Camera, Color};

/// Display gamma.
pub const GAMMA: f32 = 2.2;

/// Apply gamma correction.
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.powf(1.0 / GAMMA)
    } else {
        0.0
    }
}

const UNIT: Interval = Interval::new(0.0, 1.0);

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    UNIT.clamp(x)
}

/// Convert a linear color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * clamp_01(linear_to_gamma(color.x))).round() as u8;
    let g = (255.0 * clamp_01(linear_to_gamma(color.y))).round() as u8;
    let b = (255.0 * clamp_01(linear_to_gamma(color.z))).round() as u8;
    [r, g, b, 255]
}

/// Average `samples` radiance estimates through pixel (x, y).
pub fn render_pixel(
    camera: &Camera,
    ctx: &RenderContext,
    integrator: &dyn Integrator,
    x: u32,
    y: u32,
    samples: u32,
    rng: &mut dyn RngCore,
) -> Color {
    let mut pixel_color = Color::ZERO;
    for _ in 0..samples {
        let ray = camera.get_ray(x, y, rng);
        pixel_color += integrator.li(ctx, &ray, rng);
    }
    pixel_color / samples.max(1) as f32
}

/// Linear radiance image.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Copy a finished bucket into place.
    pub fn write_bucket(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for local_y in 0..bucket.height {
            for local_x in 0..bucket.width {
                let color = result.pixels[(local_y * bucket.width + local_x) as usize];
                self.set(bucket.x + local_x, bucket.y + local_y, color);
            }
        }
    }

    /// Convert to gamma corrected RGBA bytes.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width * self.height * 4) as usize);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }
}

/// Render the whole image.
///
/// The camera must be initialized and the tracer in `ctx` built.
pub fn render(
    ctx: &RenderContext,
    camera: &Camera,
    integrator: &dyn Integrator,
    settings: &RenderSettings,
) -> ImageBuffer {
    let buckets = generate_buckets(camera.image_width, camera.image_height, settings.bucket_size);
    log::info!(
        "Rendering {}x{} @ {} spp with {} on {}, {} buckets",
        camera.image_width,
        camera.image_height,
        settings.samples_per_pixel,
        integrator.name(),
        ctx.tracer.name(),
        buckets.len()
    );

    let start = Instant::now();
    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| {
            let pixels = render_bucket(bucket, camera, ctx, integrator, settings);
            BucketResult::new(*bucket, pixels)
        })
        .collect();

    let mut image = ImageBuffer::new(camera.image_width, camera.image_height);
    for result in &results {
        image.write_bucket(result);
    }
    log::info!("Rendered in {:.2?}", start.elapsed());
    image
}
