//! Path tracing integrator.
//!
//! Radiance along a camera ray is estimated by a random walk. At every
//! vertex one light is sampled (next event estimation) and one continuation
//! direction is drawn. Emission found by the walk itself is combined with the
//! light samples using the balance heuristic, or skipped when light samples
//! already account for it.

use lumen_core::{Scene, SkyLight, TriangleLight};
use lumen_math::sampling::{
    align, balance_heuristic, cosine_hemisphere_pdf, cosine_sample_hemisphere, luminance,
    uniform_sample_hemisphere, UNIFORM_HEMISPHERE_PDF,
};
use lumen_math::{Color, Ray, Vec2, Vec3};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::brdf::{brdf_for, Brdf, BrdfSample};
use crate::hit::SurfaceHit;
use crate::tracer::RenderContext;
use crate::{gen_f32, gen_vec2};

/// Estimates incident radiance along a ray.
pub trait Integrator: Send + Sync {
    fn li(&self, ctx: &RenderContext, ray: &Ray, rng: &mut dyn RngCore) -> Color;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// How a path picks its next direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BounceMode {
    /// Uniform over the hemisphere of the shading normal
    Uniform,
    /// Cosine weighted around the shading normal
    Cosine,
    /// Importance sampled from the material's BRDF
    #[default]
    Brdf,
}

impl BounceMode {
    pub fn sample(self, brdf: &dyn Brdf, hit: &SurfaceHit, wo: Vec3, xi: Vec2) -> BrdfSample {
        let (wi, pdf) = match self {
            BounceMode::Brdf => return brdf.sample(hit, wo, xi),
            BounceMode::Uniform => (
                align(uniform_sample_hemisphere(xi), hit.ns),
                UNIFORM_HEMISPHERE_PDF,
            ),
            BounceMode::Cosine => {
                let wi = align(cosine_sample_hemisphere(xi), hit.ns);
                (wi, cosine_hemisphere_pdf(wi.dot(hit.ns)))
            }
        };
        if !hit.same_side(wi) || pdf <= 0.0 {
            return BrdfSample::invalid(wi);
        }
        BrdfSample {
            wi,
            f: brdf.f(hit, wo, wi),
            pdf,
        }
    }

    /// Density of [`BounceMode::sample`] producing `wi`.
    pub fn pdf(self, brdf: &dyn Brdf, hit: &SurfaceHit, wo: Vec3, wi: Vec3) -> f32 {
        match self {
            BounceMode::Brdf => brdf.pdf(hit, wo, wi),
            BounceMode::Uniform if wi.dot(hit.ns) > 0.0 => UNIFORM_HEMISPHERE_PDF,
            BounceMode::Uniform => 0.0,
            BounceMode::Cosine => cosine_hemisphere_pdf(wi.dot(hit.ns)),
        }
    }
}

/// Density with which light sampling would have produced the emitter point `hit` from `from`.
pub(crate) fn emitter_pdf(scene: &Scene, from: Vec3, hit: &SurfaceHit) -> f32 {
    let light = TriangleLight::from_triangle(scene, hit.tri as usize);
    scene.light_selection_pdf(light.power()) * light.pdf(from, hit.x, hit.ns)
}

/// Density with which light sampling would have produced the sky direction `dir`.
pub(crate) fn sky_pdf(scene: &Scene, sky: &SkyLight, dir: Vec3) -> f32 {
    scene.light_selection_pdf(sky.power()) * sky.pdf_li(dir)
}

/// One light sample at `hit`.
///
/// With `mis` set, the estimate is weighted against that continuation policy
/// by the balance heuristic, except for delta lights which only light sampling
/// can find.
pub(crate) fn sample_direct(
    ctx: &RenderContext,
    hit: &SurfaceHit,
    wo: Vec3,
    brdf: &dyn Brdf,
    mis: Option<BounceMode>,
    rng: &mut dyn RngCore,
) -> Color {
    let Some((light, pmf)) = ctx.scene.sample_light(gen_f32(rng)) else {
        return Color::ZERO;
    };
    let sample = light.sample_li(hit.x, gen_vec2(rng));
    if !sample.is_valid() || pmf <= 0.0 {
        return Color::ZERO;
    }

    let wi = sample.shadow_ray.direction;
    let cos_theta = hit.ns.dot(wi);
    if cos_theta <= 0.0 || !hit.same_side(wi) || !ctx.unoccluded(&sample.shadow_ray) {
        return Color::ZERO;
    }

    let light_pdf = sample.pdf * pmf;
    let pdf = match mis {
        Some(mode) if !light.is_delta() => light_pdf + mode.pdf(brdf, hit, wo, wi),
        _ => light_pdf,
    };
    sample.radiance * brdf.f(hit, wo, wi) * cos_theta / pdf
}

/// Drop radiance that is negative or not finite.
pub(crate) fn sanitize(radiance: Color) -> Color {
    debug_assert!(
        radiance.is_finite() && radiance.min_element() >= 0.0,
        "invalid radiance {:?}",
        radiance
    );
    if radiance.is_finite() {
        radiance.max(Color::ZERO)
    } else {
        Color::ZERO
    }
}

/// Path tracer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PathConfig {
    /// Maximum number of scattering events; emission is still gathered one vertex further
    pub max_path_len: u32,
    /// Bounce index from which Russian roulette may end paths
    pub rr_start: u32,
    pub bounce: BounceMode,
    /// Combine emission hits with light samples by the balance heuristic
    pub mis: bool,
    /// Sample a light at every vertex; off for the simple path tracer
    #[serde(skip)]
    pub next_event: bool,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_path_len: 10,
            rr_start: 2,
            bounce: BounceMode::Brdf,
            mis: true,
            next_event: true,
        }
    }
}

impl PathConfig {
    /// Set the path length bound.
    pub fn with_max_path_len(mut self, max_path_len: u32) -> Self {
        self.max_path_len = max_path_len;
        self
    }

    pub fn with_rr_start(mut self, rr_start: u32) -> Self {
        self.rr_start = rr_start;
        self
    }

    pub fn with_bounce(mut self, bounce: BounceMode) -> Self {
        self.bounce = bounce;
        self
    }

    pub fn with_mis(mut self, mis: bool) -> Self {
        self.mis = mis;
        self
    }

    pub fn with_next_event(mut self, next_event: bool) -> Self {
        self.next_event = next_event;
        self
    }
}

/// Unidirectional path tracer.
#[derive(Debug, Clone, Default)]
pub struct PathTracer {
    pub config: PathConfig,
}

impl PathTracer {
    pub fn new(config: PathConfig) -> Self {
        Self { config }
    }

    /// Weight of emission found by the walk itself at vertex `bounce`.
    ///
    /// `bounce_pdf` is the density of the direction that led there.
    fn emission_weight(
        &self,
        bounce: u32,
        bounce_pdf: f32,
        light_pdf: impl FnOnce() -> f32,
    ) -> f32 {
        if bounce == 0 || !self.config.next_event {
            1.0
        } else if self.config.mis {
            balance_heuristic(bounce_pdf, light_pdf())
        } else {
            0.0
        }
    }
}

impl Integrator for PathTracer {
    fn li(&self, ctx: &RenderContext, ray: &Ray, rng: &mut dyn RngCore) -> Color {
        let scene = ctx.scene;
        let config = &self.config;
        let mis = (config.next_event && config.mis).then_some(config.bounce);

        let mut radiance = Color::ZERO;
        let mut throughput = Color::ONE;
        let mut ray = *ray;
        let mut bounce_pdf = 0.0;

        for bounce in 0..=config.max_path_len {
            let is = ctx.closest_hit(&ray);
            if !is.valid() {
                if let Some(sky) = scene.sky() {
                    let dir = ray.direction;
                    let weight =
                        self.emission_weight(bounce, bounce_pdf, || sky_pdf(scene, sky, dir));
                    radiance += throughput * sky.le(dir) * weight;
                }
                break;
            }

            let hit = SurfaceHit::new(scene, &is, &ray);
            if hit.material.is_emissive() {
                let from = ray.origin;
                let weight =
                    self.emission_weight(bounce, bounce_pdf, || emitter_pdf(scene, from, &hit));
                radiance += throughput * hit.emission() * weight;
                break;
            }

            if bounce == config.max_path_len {
                break;
            }

            let wo = -ray.direction;
            let brdf = brdf_for(hit.material.brdf);
            if config.next_event {
                radiance += throughput * sample_direct(ctx, &hit, wo, brdf, mis, rng);
            }

            let sample = config.bounce.sample(brdf, &hit, wo, gen_vec2(rng));
            if !sample.is_valid() {
                break;
            }
            throughput *= sample.f * hit.ns.dot(sample.wi).abs() / sample.pdf;
            if !(luminance(throughput) > 0.0) {
                break;
            }
            bounce_pdf = sample.pdf;

            if bounce >= config.rr_start {
                let survive = luminance(throughput).min(1.0);
                if gen_f32(rng) >= survive {
                    break;
                }
                throughput /= survive;
            }
            ray = hit.spawn(sample.wi);
        }

        sanitize(radiance)
    }

    fn name(&self) -> &'static str {
        if self.config.next_event {
            "pt"
        } else {
            "simple-pt"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        closed_quad_light_scene, estimate, floor_ray, lamp_projected_solid_angle,
        quad_light_scene, LIGHT_EMISSION,
    };
    use lumen_core::{Material, Texture};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ALBEDO: f32 = 0.5;

    /// Radiance leaving the floor point below the lamp: albedo / pi * E * projected solid angle.
    fn expected_floor_radiance() -> f64 {
        (ALBEDO * LIGHT_EMISSION) as f64 / std::f64::consts::PI * lamp_projected_solid_angle()
    }

    fn grey() -> Material {
        Material::new("grey", Color::splat(ALBEDO))
    }

    #[test]
    fn test_sees_emitter_directly() {
        let (scene, tracer) = quad_light_scene(grey());
        let ctx = RenderContext::new(&scene, &tracer);
        let up = Ray::new(Vec3::new(0.1, 0.5, 0.1), Vec3::Y);
        let mut rng = StdRng::seed_from_u64(1);
        let pt = PathTracer::default();
        assert_eq!(pt.li(&ctx, &up, &mut rng), Color::splat(LIGHT_EMISSION));

        // The lamp's back is dark.
        let down = Ray::new(Vec3::new(0.1, 3.0, 0.1), Vec3::NEG_Y);
        assert_eq!(pt.li(&ctx, &down, &mut rng), Color::ZERO);
    }

    #[test]
    fn test_quad_light_matches_analytic() {
        let (scene, tracer) = quad_light_scene(grey());
        let ctx = RenderContext::new(&scene, &tracer);
        let expected = expected_floor_radiance();

        let configs = [
            PathConfig::default(),
            PathConfig::default().with_mis(false),
            PathConfig::default().with_bounce(BounceMode::Cosine),
            PathConfig::default().with_bounce(BounceMode::Uniform),
            PathConfig::default().with_next_event(false),
            PathConfig::default()
                .with_next_event(false)
                .with_bounce(BounceMode::Uniform),
        ];
        for (i, config) in configs.into_iter().enumerate() {
            let est = estimate(&PathTracer::new(config), &ctx, &floor_ray(), 50_000, i as u64);
            assert!(
                est.agrees_with(expected),
                "{:?}: {} vs analytic {}",
                config,
                est.mean,
                expected
            );
        }
    }

    #[test]
    fn test_russian_roulette_is_unbiased() {
        let (scene, tracer) = closed_quad_light_scene();
        let ctx = RenderContext::new(&scene, &tracer);
        let ray = floor_ray();

        let without = estimate(
            &PathTracer::new(PathConfig::default().with_rr_start(u32::MAX)),
            &ctx,
            &ray,
            20_000,
            11,
        );
        let with = estimate(
            &PathTracer::new(PathConfig::default().with_rr_start(0)),
            &ctx,
            &ray,
            20_000,
            12,
        );
        let margin = 4.0 * (without.std_err.powi(2) + with.std_err.powi(2)).sqrt();
        assert!(
            (without.mean - with.mean).abs() <= margin,
            "with RR {} vs without {} (margin {})",
            with.mean,
            without.mean,
            margin
        );
        // Interreflection adds light on top of the direct term.
        assert!(without.mean > expected_floor_radiance() * 0.6 / ALBEDO as f64);
    }

    #[test]
    fn test_path_length_bounds_bounces() {
        let (scene, tracer) = closed_quad_light_scene();
        let ctx = RenderContext::new(&scene, &tracer);
        let ray = floor_ray();
        let direct_only = PathConfig::default().with_max_path_len(1).with_rr_start(u32::MAX);
        let longer = PathConfig::default().with_max_path_len(4).with_rr_start(u32::MAX);
        let short = estimate(&PathTracer::new(direct_only), &ctx, &ray, 20_000, 3);
        let long = estimate(&PathTracer::new(longer), &ctx, &ray, 20_000, 3);
        assert!(long.mean > short.mean + 4.0 * (short.std_err + long.std_err));
    }

    #[test]
    fn test_sky_only_scene() {
        // A white floor under a uniform sky of radiance 1 reflects its albedo.
        let mut scene = Scene::new("sky");
        let white = scene
            .add_material(Material::new("white", Color::splat(0.8)))
            .expect("material");
        let floor = lumen_core::Mesh::quad(
            Vec3::new(-50.0, 0.0, -50.0),
            Vec3::new(-50.0, 0.0, 50.0),
            Vec3::new(50.0, 0.0, 50.0),
            Vec3::new(50.0, 0.0, -50.0),
        );
        scene.add_mesh(&floor, white).expect("floor");
        scene.set_sky(Texture::solid_color(Color::ONE), 1.0);
        let mut tracer = crate::tracer::SeqTracer::new();
        crate::tracer::commit(&mut scene, &mut tracer);
        let ctx = RenderContext::new(&scene, &tracer);

        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::NEG_Y);
        let est = estimate(
            &PathTracer::new(PathConfig::default().with_max_path_len(1)),
            &ctx,
            &ray,
            20_000,
            5,
        );
        assert!(est.agrees_with(0.8), "{} vs 0.8", est.mean);

        let up = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Y);
        let mut rng = StdRng::seed_from_u64(0);
        let sky = PathTracer::default().li(&ctx, &up, &mut rng);
        assert!((sky - Color::ONE).length() < 1e-5);
    }

    #[test]
    fn test_zero_length_sees_only_emission() {
        let (scene, tracer) = quad_light_scene(grey());
        let ctx = RenderContext::new(&scene, &tracer);
        let mut rng = StdRng::seed_from_u64(2);
        let pt = PathTracer::new(PathConfig::default().with_max_path_len(0));
        assert_eq!(pt.li(&ctx, &floor_ray(), &mut rng), Color::ZERO);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(Color::new(1.0, 0.0, 2.0)), Color::new(1.0, 0.0, 2.0));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic)]
    fn test_sanitize_rejects_non_finite() {
        // Debug builds stop at the assertion, release builds drop the sample.
        let clean = sanitize(Color::new(f32::NAN, -1.0, f32::INFINITY));
        assert_eq!(clean, Color::ZERO);
    }
}
