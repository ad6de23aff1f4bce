//! Light sources and their sampling routines.
//!
//! All lights answer the same two questions: how much power they emit (used to
//! pick a light proportional to power) and, for a shading point, which direction
//! to sample together with the radiance arriving from there and the solid angle
//! density of having chosen it.

use std::f32::consts::{PI, TAU};
use std::sync::Arc;

use lumen_math::sampling::{from_spherical, luminance, to_spherical, uniform_sample_triangle};
use lumen_math::{Aabb, Color, Distribution2D, Ray, Vec2, Vec3};

use crate::scene::{Scene, Vertex};
use crate::texture::Texture;

/// Result of sampling a light from a shading point.
#[derive(Debug, Clone, Copy)]
pub struct LightSample {
    /// Ray from the shading point towards the light, ending just before it
    pub shadow_ray: Ray,
    /// Incident radiance carried along the shadow ray
    pub radiance: Color,
    /// Solid angle density of the sampled direction (1 for delta lights)
    pub pdf: f32,
}

impl LightSample {
    fn invalid(from: Vec3) -> Self {
        Self {
            shadow_ray: Ray::new(from, Vec3::ZERO),
            radiance: Color::ZERO,
            pdf: 0.0,
        }
    }

    /// A zero density or black sample contributes nothing and must be skipped.
    pub fn is_valid(&self) -> bool {
        self.pdf > 0.0 && self.radiance != Color::ZERO
    }
}

/// Isotropic point light.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// Radiant intensity
    pub color: Color,
}

impl PointLight {
    pub fn new(position: Vec3, color: Color) -> Self {
        Self { position, color }
    }

    pub fn power(&self) -> Color {
        4.0 * PI * self.color
    }

    pub fn sample_li(&self, from: Vec3) -> LightSample {
        let to_light = self.position - from;
        let dist = to_light.length();
        if dist <= 0.0 {
            return LightSample::invalid(from);
        }
        let mut shadow_ray = Ray::new(from, to_light / dist);
        shadow_ray.length_exclusive(dist);
        LightSample {
            shadow_ray,
            radiance: self.color / (dist * dist),
            pdf: 1.0,
        }
    }
}

/// An emissive triangle, copied out of the scene so geometry may be reordered.
///
/// Emission is one-sided: only the side the interpolated shading normal points
/// to is lit.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleLight {
    pub vertices: [Vertex; 3],
    pub emissive: Color,
    area: f32,
}

impl TriangleLight {
    pub fn new(vertices: [Vertex; 3], emissive: Color) -> Self {
        let [a, b, c] = &vertices;
        let area = 0.5 * (b.pos - a.pos).cross(c.pos - a.pos).length();
        Self {
            vertices,
            emissive,
            area,
        }
    }

    /// Build the light for triangle `index` of `scene`.
    ///
    /// Used both when collecting the scene's lights and when a path hits an
    /// emitter and needs the density light sampling would have produced.
    pub fn from_triangle(scene: &Scene, index: usize) -> Self {
        let tri = &scene.triangles[index];
        Self::new(scene.triangle_vertices(tri), scene.material_of(tri).emissive)
    }

    pub fn area(&self) -> f32 {
        self.area
    }

    pub fn power(&self) -> Color {
        self.emissive * self.area * PI
    }

    pub fn sample_li(&self, from: Vec3, xi: Vec2) -> LightSample {
        let [a, b, c] = &self.vertices;
        let bc = uniform_sample_triangle(xi);
        let alpha = 1.0 - bc.x - bc.y;
        let target = alpha * a.pos + bc.x * b.pos + bc.y * c.pos;
        let normal = (alpha * a.norm + bc.x * b.norm + bc.y * c.norm).normalize_or_zero();

        let to_light = target - from;
        let dist = to_light.length();
        if dist <= 0.0 || self.area <= 0.0 {
            return LightSample::invalid(from);
        }
        let w_i = to_light / dist;
        let mut shadow_ray = Ray::new(from, w_i);
        shadow_ray.length_exclusive(dist);

        let cos_theta_light = normal.dot(-w_i);
        if cos_theta_light <= 0.0 {
            return LightSample {
                shadow_ray,
                radiance: Color::ZERO,
                pdf: 0.0,
            };
        }
        LightSample {
            shadow_ray,
            radiance: self.emissive,
            pdf: dist * dist / (cos_theta_light * self.area),
        }
    }

    /// Solid angle density of [`TriangleLight::sample_li`] from `from` producing
    /// the point `on_light` whose shading normal is `light_normal`.
    pub fn pdf(&self, from: Vec3, on_light: Vec3, light_normal: Vec3) -> f32 {
        let to_light = on_light - from;
        let dist = to_light.length();
        if dist <= 0.0 || self.area <= 0.0 {
            return 0.0;
        }
        let cos_theta_light = light_normal.dot(-to_light / dist);
        if cos_theta_light <= 0.0 {
            return 0.0;
        }
        dist * dist / (cos_theta_light * self.area)
    }
}

/// Environment light from an equirectangular texture.
///
/// `u` maps to the azimuth around `+y`, `v` to the polar angle from `+y`
/// (row 0 is straight up). Directions are importance sampled by texel
/// luminance weighted with `sin(theta)`.
#[derive(Debug, Clone)]
pub struct SkyLight {
    texture: Texture,
    intensity: f32,
    distribution: Distribution2D,
    scene_radius: f32,
}

impl SkyLight {
    pub fn new(texture: Texture, intensity: f32) -> Self {
        let (w, h) = (texture.width, texture.height);
        let mut weights = Vec::with_capacity(w as usize * h as usize);
        for y in 0..h {
            let sin_theta = (PI * (y as f32 + 0.5) / h as f32).sin();
            for x in 0..w {
                weights.push(luminance(texture.texel(x, y)) * sin_theta);
            }
        }
        let distribution = Distribution2D::new(&weights, w as usize, h as usize);
        log::debug!(
            "Sky distribution {}x{} from '{}', unit integral {:.4}",
            w,
            h,
            texture.name,
            distribution.unit_integral()
        );

        Self {
            texture,
            intensity,
            distribution,
            scene_radius: 1.0,
        }
    }

    /// Use the diagonal of `bounds` as the radius of the sphere the sky illuminates.
    pub fn set_scene_bounds(&mut self, bounds: &Aabb) {
        if !bounds.is_empty() {
            self.scene_radius = bounds.extent().length();
        }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn power(&self) -> Color {
        Color::splat(
            PI * self.scene_radius * self.scene_radius
                * self.distribution.unit_integral()
                * self.intensity,
        )
    }

    /// Radiance arriving from direction `dir` (unit length).
    pub fn le(&self, dir: Vec3) -> Color {
        let (theta, phi) = to_spherical(dir);
        self.texture.sample(Vec2::new(phi / TAU, theta / PI)) * self.intensity
    }

    pub fn sample_li(&self, from: Vec3, xi: Vec2) -> LightSample {
        let (uv, pdf) = self.distribution.sample(xi);
        let phi = uv.x * TAU;
        let theta = uv.y * PI;
        let sin_theta = theta.sin();
        if pdf <= 0.0 || sin_theta <= 0.0 {
            return LightSample::invalid(from);
        }
        LightSample {
            shadow_ray: Ray::new(from, from_spherical(theta, phi)),
            radiance: self.texture.sample(uv) * self.intensity,
            pdf: pdf / (2.0 * PI * PI * sin_theta),
        }
    }

    /// Solid angle density of [`SkyLight::sample_li`] producing `dir`.
    pub fn pdf_li(&self, dir: Vec3) -> f32 {
        let (theta, phi) = to_spherical(dir);
        let sin_theta = theta.sin();
        if sin_theta <= 0.0 {
            return 0.0;
        }
        self.distribution.pdf(Vec2::new(phi / TAU, theta / PI)) / (2.0 * PI * PI * sin_theta)
    }
}

/// A light of the scene's light list.
#[derive(Debug, Clone)]
pub enum Light {
    Point(PointLight),
    Triangle(TriangleLight),
    Sky(Arc<SkyLight>),
}

impl Light {
    /// Total emitted power.
    pub fn power(&self) -> Color {
        match self {
            Light::Point(l) => l.power(),
            Light::Triangle(l) => l.power(),
            Light::Sky(l) => l.power(),
        }
    }

    /// Sample incident illumination at `from` using two uniform variates.
    pub fn sample_li(&self, from: Vec3, xi: Vec2) -> LightSample {
        match self {
            Light::Point(l) => l.sample_li(from),
            Light::Triangle(l) => l.sample_li(from, xi),
            Light::Sky(l) => l.sample_li(from, xi),
        }
    }

    /// True for lights that cannot be hit by a ray, so only light sampling finds them.
    pub fn is_delta(&self) -> bool {
        matches!(self, Light::Point(_))
    }
}
