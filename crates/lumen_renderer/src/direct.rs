//! Direct illumination with selectable sampling strategies.
//!
//! Each strategy estimates the same one-bounce integral, so comparing them
//! checks the light and BRDF sampling routines against each other.

use lumen_math::sampling::balance_heuristic;
use lumen_math::{Color, Ray, Vec3};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::brdf::{brdf_for, Brdf};
use crate::gen_vec2;
use crate::hit::SurfaceHit;
use crate::integrator::{emitter_pdf, sample_direct, sanitize, sky_pdf, BounceMode, Integrator};
use crate::tracer::RenderContext;

/// Which directions the direct light estimate samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectMode {
    /// Uniform hemisphere directions
    Uniform,
    /// Cosine weighted hemisphere directions
    Cosine,
    /// One sample on a light chosen by power
    Light,
    /// One BRDF sample
    Brdf,
    /// One light and one BRDF sample, balance heuristic weighted
    #[default]
    Mis,
}

/// One-bounce direct lighting.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectLight {
    pub mode: DirectMode,
}

impl DirectLight {
    pub fn new(mode: DirectMode) -> Self {
        Self { mode }
    }

    /// Emission reached by sampling a direction with `bounce`.
    fn gather(
        ctx: &RenderContext,
        hit: &SurfaceHit,
        wo: Vec3,
        brdf: &dyn Brdf,
        bounce: BounceMode,
        mis: bool,
        rng: &mut dyn RngCore,
    ) -> Color {
        let sample = bounce.sample(brdf, hit, wo, gen_vec2(rng));
        if !sample.is_valid() {
            return Color::ZERO;
        }

        let ray = hit.spawn(sample.wi);
        let is = ctx.closest_hit(&ray);
        let (le, light_pdf) = if is.valid() {
            let light = SurfaceHit::new(ctx.scene, &is, &ray);
            if !light.material.is_emissive() {
                return Color::ZERO;
            }
            (light.emission(), emitter_pdf(ctx.scene, hit.x, &light))
        } else {
            match ctx.scene.sky() {
                Some(sky) => (sky.le(sample.wi), sky_pdf(ctx.scene, sky, sample.wi)),
                None => return Color::ZERO,
            }
        };

        let weight = if mis {
            balance_heuristic(sample.pdf, light_pdf)
        } else {
            1.0
        };
        le * sample.f * hit.ns.dot(sample.wi).abs() / sample.pdf * weight
    }
}

impl Integrator for DirectLight {
    fn li(&self, ctx: &RenderContext, ray: &Ray, rng: &mut dyn RngCore) -> Color {
        let is = ctx.closest_hit(ray);
        if !is.valid() {
            return ctx
                .scene
                .sky()
                .map_or(Color::ZERO, |sky| sky.le(ray.direction));
        }

        let hit = SurfaceHit::new(ctx.scene, &is, ray);
        if hit.material.is_emissive() {
            return sanitize(hit.emission());
        }

        let wo = -ray.direction;
        let brdf = brdf_for(hit.material.brdf);
        let radiance = match self.mode {
            DirectMode::Uniform => {
                Self::gather(ctx, &hit, wo, brdf, BounceMode::Uniform, false, rng)
            }
            DirectMode::Cosine => Self::gather(ctx, &hit, wo, brdf, BounceMode::Cosine, false, rng),
            DirectMode::Brdf => Self::gather(ctx, &hit, wo, brdf, BounceMode::Brdf, false, rng),
            DirectMode::Light => sample_direct(ctx, &hit, wo, brdf, None, rng),
            DirectMode::Mis => {
                sample_direct(ctx, &hit, wo, brdf, Some(BounceMode::Brdf), rng)
                    + Self::gather(ctx, &hit, wo, brdf, BounceMode::Brdf, true, rng)
            }
        };
        sanitize(radiance)
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}
