//! Differential geometry at a ray hit.

use lumen_core::{Material, Scene};
use lumen_math::{Color, Ray, Vec2, Vec3};

use crate::intersect::TriangleIntersection;

/// Everything shading needs to know about a surface point.
///
/// Both normals point to the side the ray arrived from; `front_face` records
/// whether that is the side the shading normal originally pointed to.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit<'a> {
    /// Position
    pub x: Vec3,
    /// Geometric normal
    pub ng: Vec3,
    /// Interpolated shading normal
    pub ns: Vec3,
    /// Texture coordinate
    pub tc: Vec2,
    pub material: &'a Material,
    /// Albedo at `tc`, texture applied
    pub albedo: Color,
    pub front_face: bool,
    /// Triangle index in the scene
    pub tri: u32,
}

impl<'a> SurfaceHit<'a> {
    /// Reconstruct the hit from a valid intersection of `ray`.
    pub fn new(scene: &'a Scene, is: &TriangleIntersection, ray: &Ray) -> Self {
        let tri = &scene.triangles[is.tri as usize];
        let [a, b, c] = scene.triangle_vertices(tri);
        let alpha = is.alpha();

        let x = alpha * a.pos + is.beta * b.pos + is.gamma * c.pos;
        let tc = alpha * a.tc + is.beta * b.tc + is.gamma * c.tc;
        let mut ng = (b.pos - a.pos).cross(c.pos - a.pos).normalize_or_zero();
        let mut ns = (alpha * a.norm + is.beta * b.norm + is.gamma * c.norm).normalize_or(ng);
        if ng.dot(ns) < 0.0 {
            ng = -ng;
        }

        let front_face = ray.direction.dot(ns) < 0.0;
        if !front_face {
            ns = -ns;
            ng = -ng;
        }

        let material = scene.material_of(tri);
        Self {
            x,
            ng,
            ns,
            tc,
            material,
            albedo: scene.albedo(material, tc),
            front_face,
            tri: is.tri,
        }
    }

    /// Radiance emitted towards the incoming ray; emitters light their front side only.
    pub fn emission(&self) -> Color {
        if self.front_face {
            self.material.emissive
        } else {
            Color::ZERO
        }
    }

    /// True if `w` leaves on the side the ray came from.
    #[inline]
    pub fn same_side(&self, w: Vec3) -> bool {
        w.dot(self.ng) > 0.0
    }

    /// Continue from this point in direction `w`.
    #[inline]
    pub fn spawn(&self, w: Vec3) -> Ray {
        Ray::new(self.x, w)
    }
}
