//! Scenes and estimators shared by the integrator tests.

use std::f64::consts::PI;

use lumen_core::{Material, Mesh, Scene};
use lumen_math::{Color, Ray, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::integrator::Integrator;
use crate::tracer::{commit, RenderContext, SeqTracer};

pub const LIGHT_EMISSION: f32 = 10.0;

fn floor(y: f32, half: f32) -> Mesh {
    Mesh::quad(
        Vec3::new(-half, y, -half),
        Vec3::new(-half, y, half),
        Vec3::new(half, y, half),
        Vec3::new(half, y, -half),
    )
}

fn ceiling(y: f32, half: f32) -> Mesh {
    Mesh::quad(
        Vec3::new(-half, y, -half),
        Vec3::new(half, y, -half),
        Vec3::new(half, y, half),
        Vec3::new(-half, y, half),
    )
}

/// Unit square light at y = 1 facing down over a 4x4 floor at y = 0.
pub fn quad_light_scene(floor_material: Material) -> (Scene, SeqTracer) {
    let mut scene = Scene::new("quad light");
    let f = scene.add_material(floor_material).expect("floor material");
    let lamp = scene
        .add_material(Material::emitter("lamp", Color::splat(LIGHT_EMISSION)))
        .expect("lamp material");
    scene.add_mesh(&floor(0.0, 2.0), f).expect("floor");
    scene.add_mesh(&ceiling(1.0, 0.5), lamp).expect("lamp");

    let mut tracer = SeqTracer::new();
    commit(&mut scene, &mut tracer);
    (scene, tracer)
}

/// The quad light scene closed by a grey ceiling above the lamp, so light bounces.
pub fn closed_quad_light_scene() -> (Scene, SeqTracer) {
    let mut scene = Scene::new("closed quad light");
    let grey = scene
        .add_material(Material::new("grey", Color::splat(0.6)))
        .expect("grey material");
    let lamp = scene
        .add_material(Material::emitter("lamp", Color::splat(LIGHT_EMISSION)))
        .expect("lamp material");
    scene.add_mesh(&floor(0.0, 2.0), grey).expect("floor");
    scene.add_mesh(&ceiling(1.5, 2.0), grey).expect("ceiling");
    scene.add_mesh(&ceiling(1.0, 0.5), lamp).expect("lamp");

    let mut tracer = SeqTracer::new();
    commit(&mut scene, &mut tracer);
    (scene, tracer)
}

/// Looks straight down at the floor point below the lamp's center.
pub fn floor_ray() -> Ray {
    Ray::new(Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Y)
}

/// Integral of `cos(theta)` over the lamp as seen from the origin.
///
/// Four copies of the differential area to parallel rectangle form factor
/// with the rectangle's corner straight above the point.
pub fn lamp_projected_solid_angle() -> f64 {
    let corner = |a: f64, b: f64, c: f64| {
        let (x, y) = (a / c, b / c);
        let (sx, sy) = ((1.0 + x * x).sqrt(), (1.0 + y * y).sqrt());
        (x / sx * (y / sx).atan() + y / sy * (x / sy).atan()) / (2.0 * PI)
    };
    4.0 * corner(0.5, 0.5, 1.0) * PI
}

/// Sample statistics of the red channel of an estimator.
#[derive(Debug)]
pub struct Estimate {
    pub mean: f64,
    pub variance: f64,
    pub std_err: f64,
}

impl Estimate {
    /// Within four standard errors (plus float slack) of `expected`.
    pub fn agrees_with(&self, expected: f64) -> bool {
        (self.mean - expected).abs() <= 4.0 * self.std_err + 1e-3 * expected.abs()
    }
}

pub fn estimate(
    integrator: &dyn Integrator,
    ctx: &RenderContext,
    ray: &Ray,
    n: usize,
    seed: u64,
) -> Estimate {
    let mut rng = StdRng::seed_from_u64(seed);
    let (mut sum, mut sum_sq) = (0.0f64, 0.0f64);
    for _ in 0..n {
        let x = integrator.li(ctx, ray, &mut rng).x as f64;
        sum += x;
        sum_sq += x * x;
    }
    let mean = sum / n as f64;
    let variance = (sum_sq / n as f64 - mean * mean).max(0.0);
    Estimate {
        mean,
        variance,
        std_err: (variance / n as f64).sqrt(),
    }
}
