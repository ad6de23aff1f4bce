//! Reflectance models.
//!
//! Every model is stateless; per-surface parameters come from the hit's
//! material. Directions point away from the surface: `wo` towards the viewer,
//! `wi` towards the light. `f` does not include the cosine term.

use std::f32::consts::{FRAC_1_PI, PI, TAU};

use lumen_core::BrdfKind;
use lumen_math::sampling::{align, cosine_hemisphere_pdf, cosine_sample_hemisphere};
use lumen_math::{Color, Vec2, Vec3};

use crate::hit::SurfaceHit;

/// A sampled incident direction.
///
/// A zero `pdf` marks a direction that cannot contribute, e.g. one that points
/// into the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrdfSample {
    pub wi: Vec3,
    pub f: Color,
    pub pdf: f32,
}

impl BrdfSample {
    pub(crate) fn invalid(wi: Vec3) -> Self {
        Self {
            wi,
            f: Color::ZERO,
            pdf: 0.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.pdf > 0.0
    }
}

/// Bidirectional reflectance distribution function with importance sampling.
///
/// `pdf` is the solid angle density of `sample` for the same `wo`.
pub trait Brdf: Send + Sync {
    fn f(&self, hit: &SurfaceHit, wo: Vec3, wi: Vec3) -> Color;
    fn pdf(&self, hit: &SurfaceHit, wo: Vec3, wi: Vec3) -> f32;
    fn sample(&self, hit: &SurfaceHit, wo: Vec3, xi: Vec2) -> BrdfSample;
}

/// Fraction of light reflected at a smooth dielectric boundary.
pub fn fresnel_dielectric(cos_i: f32, eta_i: f32, eta_t: f32) -> f32 {
    let mut cos_i = cos_i.clamp(-1.0, 1.0);
    let (mut eta_i, mut eta_t) = (eta_i, eta_t);
    if cos_i < 0.0 {
        std::mem::swap(&mut eta_i, &mut eta_t);
        cos_i = -cos_i;
    }

    let sin_i = (1.0 - cos_i * cos_i).max(0.0).sqrt();
    let sin_t = eta_i / eta_t * sin_i;
    if sin_t >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin_t * sin_t).max(0.0).sqrt();

    let r_parl = (eta_t * cos_i - eta_i * cos_t) / (eta_t * cos_i + eta_i * cos_t);
    let r_perp = (eta_i * cos_i - eta_t * cos_t) / (eta_i * cos_i + eta_t * cos_t);
    0.5 * (r_parl * r_parl + r_perp * r_perp)
}

/// Mirror `w` about `n`.
#[inline]
fn reflect(w: Vec3, n: Vec3) -> Vec3 {
    2.0 * n * n.dot(w) - w
}

/// Ideal diffuse reflection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lambertian;

impl Brdf for Lambertian {
    fn f(&self, hit: &SurfaceHit, _wo: Vec3, wi: Vec3) -> Color {
        if wi.dot(hit.ns) <= 0.0 {
            return Color::ZERO;
        }
        hit.albedo * FRAC_1_PI
    }

    fn pdf(&self, hit: &SurfaceHit, _wo: Vec3, wi: Vec3) -> f32 {
        cosine_hemisphere_pdf(wi.dot(hit.ns))
    }

    fn sample(&self, hit: &SurfaceHit, wo: Vec3, xi: Vec2) -> BrdfSample {
        let wi = align(cosine_sample_hemisphere(xi), hit.ns);
        if !hit.same_side(wi) {
            return BrdfSample::invalid(wi);
        }
        BrdfSample {
            wi,
            f: self.f(hit, wo, wi),
            pdf: self.pdf(hit, wo, wi),
        }
    }
}

/// Phong exponent equivalent to a microfacet roughness.
#[inline]
pub fn exponent_from_roughness(roughness: f32) -> f32 {
    2.0 / (roughness * roughness) - 2.0
}

/// Energy normalized Phong lobe around the mirror direction.
///
/// As a coat it reflects white; otherwise it is tinted by the albedo.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhongSpecular {
    pub coat: bool,
}

impl PhongSpecular {
    fn lobe_pdf(exponent: f32, cos_alpha: f32) -> f32 {
        cos_alpha.max(0.0).powf(exponent) * (exponent + 1.0) / TAU
    }
}

impl Brdf for PhongSpecular {
    fn f(&self, hit: &SurfaceHit, wo: Vec3, wi: Vec3) -> Color {
        if !hit.same_side(wi) || wi.dot(hit.ns) <= 0.0 {
            return Color::ZERO;
        }
        let exponent = exponent_from_roughness(hit.material.roughness);
        let cos_alpha = wo.dot(reflect(wi, hit.ns)).max(0.0);
        let tint = if self.coat { Color::ONE } else { hit.albedo };
        tint * cos_alpha.powf(exponent) * (exponent + 2.0) / TAU
    }

    fn pdf(&self, hit: &SurfaceHit, wo: Vec3, wi: Vec3) -> f32 {
        let exponent = exponent_from_roughness(hit.material.roughness);
        Self::lobe_pdf(exponent, wi.dot(reflect(wo, hit.ns)))
    }

    fn sample(&self, hit: &SurfaceHit, wo: Vec3, xi: Vec2) -> BrdfSample {
        let exponent = exponent_from_roughness(hit.material.roughness);
        let z = xi.x.powf(1.0 / (exponent + 1.0));
        let r = (1.0 - z * z).max(0.0).sqrt();
        let phi = TAU * xi.y;
        let local = Vec3::new(r * phi.cos(), r * phi.sin(), z);

        let wi = align(local, reflect(wo, hit.ns));
        if !hit.same_side(wi) {
            return BrdfSample::invalid(wi);
        }
        BrdfSample {
            wi,
            f: self.f(hit, wo, wi),
            pdf: Self::lobe_pdf(exponent, z),
        }
    }
}

/// Gain of the bare microfacet lobe, which alone reflects only a few percent.
const UNCOATED_GAIN: f32 = 15.0;

/// GGX (GTR with gamma 2) microfacet reflection with dielectric Fresnel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gtr2 {
    pub coat: bool,
}

/// `tan^2` of the angle whose cosine is `cos`.
#[inline]
fn tan2(cos: f32) -> f32 {
    let cos2 = cos * cos;
    (1.0 - cos2).max(0.0) / cos2
}

fn ggx_d(n_dot_h: f32, alpha: f32) -> f32 {
    if n_dot_h <= 0.0 {
        return 0.0;
    }
    let tan2 = tan2(n_dot_h);
    if !tan2.is_finite() {
        return 0.0;
    }
    let a2 = alpha * alpha;
    let cos4 = n_dot_h * n_dot_h * n_dot_h * n_dot_h;
    a2 / (PI * cos4 * (a2 + tan2) * (a2 + tan2))
}

fn ggx_g1(n_dot_v: f32, alpha: f32) -> f32 {
    if n_dot_v <= 0.0 {
        return 0.0;
    }
    let tan2 = tan2(n_dot_v);
    if !tan2.is_finite() {
        return 0.0;
    }
    2.0 / (1.0 + (1.0 + alpha * alpha * tan2).sqrt())
}

/// Half vector distributed by `D(h) cos(theta_h)` in tangent space.
fn ggx_sample_half(xi: Vec2, alpha: f32) -> Vec3 {
    let theta = (alpha * xi.x.sqrt() / (1.0 - xi.x).sqrt()).atan();
    if !theta.is_finite() {
        return Vec3::Z;
    }
    let phi = TAU * xi.y;
    let sin_theta = theta.sin();
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), theta.cos())
}

impl Brdf for Gtr2 {
    fn f(&self, hit: &SurfaceHit, wo: Vec3, wi: Vec3) -> Color {
        if !hit.same_side(wi) {
            return Color::ZERO;
        }
        let n_dot_v = hit.ns.dot(wo);
        let n_dot_l = hit.ns.dot(wi);
        if n_dot_v <= 0.0 || n_dot_l <= 0.0 {
            return Color::ZERO;
        }
        let h = (wo + wi).normalize();
        let alpha = hit.material.roughness;
        let fresnel = fresnel_dielectric(h.dot(wi), 1.0, hit.material.ior);
        let d = ggx_d(hit.ns.dot(h), alpha);
        let g = ggx_g1(n_dot_v, alpha) * ggx_g1(n_dot_l, alpha);
        let microfacet = fresnel * d * g / (4.0 * n_dot_v * n_dot_l);

        if self.coat {
            Color::splat(microfacet)
        } else {
            UNCOATED_GAIN * hit.albedo * microfacet
        }
    }

    fn pdf(&self, hit: &SurfaceHit, wo: Vec3, wi: Vec3) -> f32 {
        let h = (wo + wi).normalize_or_zero();
        let h_dot_v = h.dot(wo).abs();
        if h_dot_v <= 0.0 {
            return 0.0;
        }
        let n_dot_h = hit.ns.dot(h);
        ggx_d(n_dot_h, hit.material.roughness) * n_dot_h.abs() / (4.0 * h_dot_v)
    }

    fn sample(&self, hit: &SurfaceHit, wo: Vec3, xi: Vec2) -> BrdfSample {
        let h = align(ggx_sample_half(xi, hit.material.roughness), hit.ns);
        let wi = reflect(wo, h);
        if !hit.same_side(wi) {
            return BrdfSample::invalid(wi);
        }
        BrdfSample {
            wi,
            f: self.f(hit, wo, wi),
            pdf: self.pdf(hit, wo, wi),
        }
    }
}

/// A specular coat over a base, mixed by the Fresnel reflectance towards `wo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Layered<C, B> {
    pub coat: C,
    pub base: B,
}

impl<C: Brdf, B: Brdf> Layered<C, B> {
    fn coat_weight(hit: &SurfaceHit, wo: Vec3) -> f32 {
        fresnel_dielectric(hit.ns.dot(wo).abs(), 1.0, hit.material.ior)
    }
}

impl<C: Brdf, B: Brdf> Brdf for Layered<C, B> {
    fn f(&self, hit: &SurfaceHit, wo: Vec3, wi: Vec3) -> Color {
        let fr = Self::coat_weight(hit, wo);
        (1.0 - fr) * self.base.f(hit, wo, wi) + fr * self.coat.f(hit, wo, wi)
    }

    fn pdf(&self, hit: &SurfaceHit, wo: Vec3, wi: Vec3) -> f32 {
        let fr = Self::coat_weight(hit, wo);
        (1.0 - fr) * self.base.pdf(hit, wo, wi) + fr * self.coat.pdf(hit, wo, wi)
    }

    fn sample(&self, hit: &SurfaceHit, wo: Vec3, xi: Vec2) -> BrdfSample {
        let fr = Self::coat_weight(hit, wo);
        let chosen = if xi.x < fr {
            self.coat.sample(hit, wo, Vec2::new(xi.x / fr, xi.y))
        } else {
            self.base.sample(hit, wo, Vec2::new((xi.x - fr) / (1.0 - fr), xi.y))
        };
        if !chosen.is_valid() {
            return chosen;
        }
        let wi = chosen.wi;
        BrdfSample {
            wi,
            f: self.f(hit, wo, wi),
            pdf: self.pdf(hit, wo, wi),
        }
    }
}

static LAMBERT: Lambertian = Lambertian;
static PHONG: PhongSpecular = PhongSpecular { coat: false };
static LAYERED_PHONG: Layered<PhongSpecular, Lambertian> = Layered {
    coat: PhongSpecular { coat: true },
    base: Lambertian,
};
static GTR2: Gtr2 = Gtr2 { coat: false };
static LAYERED_GTR2: Layered<Gtr2, Lambertian> = Layered {
    coat: Gtr2 { coat: true },
    base: Lambertian,
};

/// The shared instance implementing `kind`.
pub fn brdf_for(kind: BrdfKind) -> &'static dyn Brdf {
    match kind {
        BrdfKind::Lambert => &LAMBERT,
        BrdfKind::Phong => &PHONG,
        BrdfKind::LayeredPhong => &LAYERED_PHONG,
        BrdfKind::Gtr2 => &GTR2,
        BrdfKind::LayeredGtr2 => &LAYERED_GTR2,
    }
}
