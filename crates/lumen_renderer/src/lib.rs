//! Lumen Renderer - CPU Path Tracing
//!
//! A Monte Carlo path tracer over triangle scenes built with `lumen_core`:
//!
//! - **Tracers**: brute force and BVH closest-hit / any-hit queries
//! - **Integrators**: direct lighting and path tracing with next event
//!   estimation and multiple importance sampling
//! - **Driver**: bucket based parallel rendering configured by [`RenderSettings`]

mod brdf;
mod bucket;
mod bvh;
mod camera;
mod direct;
mod hit;
mod integrator;
mod intersect;
mod primary;
mod renderer;
mod settings;
mod tracer;

#[cfg(test)]
mod testing;

pub use brdf::{
    brdf_for, fresnel_dielectric, Brdf, BrdfSample, Gtr2, Lambertian, Layered, PhongSpecular,
};
pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::{Bvh, BvhNode, SplitPolicy, MAX_TREE_DEPTH};
pub use camera::Camera;
pub use direct::{DirectLight, DirectMode};
pub use hit::SurfaceHit;
pub use integrator::{BounceMode, Integrator, PathConfig, PathTracer};
pub use intersect::{intersect_triangle, TriangleIntersection};
pub use primary::PrimaryHit;
pub use renderer::{
    clamp_01, color_to_rgba, linear_to_gamma, render, render_pixel, ImageBuffer, GAMMA,
};
pub use settings::{Algorithm, RenderSettings, SettingsError, SettingsResult, TracerKind};
pub use tracer::{commit, RayTracer, RenderContext, SeqTracer};

/// Re-export common math types from lumen_math
pub use lumen_math::{Color, Ray, Vec2, Vec3};

use rand::{Rng, RngCore};

/// Uniform variate in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen()
}

/// Pair of uniform variates in [0, 1).
#[inline]
pub fn gen_vec2(rng: &mut dyn RngCore) -> Vec2 {
    Vec2::new(rng.gen(), rng.gen())
}
