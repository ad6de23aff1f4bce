//! Ray-triangle intersection.
//!
//! Solves `o + t d = a + beta (b - a) + gamma (c - a)` with Cramer's rule
//! (Shirley, Fundamentals of Computer Graphics, 2nd ed., p. 206). The ray-box
//! slab test lives with [`lumen_math::Aabb::hit`].

use lumen_math::{Ray, Vec3};

/// Closest hit found by a tracer.
///
/// `alpha = 1 - beta - gamma` weights vertex `a`. When valid, `t` lies in the
/// ray's `[t_min, t_max)` range and the barycentrics lie in the unit simplex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleIntersection {
    pub t: f32,
    pub beta: f32,
    pub gamma: f32,
    /// Index into `Scene::triangles`
    pub tri: u32,
}

impl TriangleIntersection {
    /// No hit.
    pub const NONE: TriangleIntersection = TriangleIntersection {
        t: f32::INFINITY,
        beta: 0.0,
        gamma: 0.0,
        tri: u32::MAX,
    };

    #[inline]
    pub fn valid(&self) -> bool {
        self.t != f32::INFINITY
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        1.0 - self.beta - self.gamma
    }
}

impl Default for TriangleIntersection {
    fn default() -> Self {
        Self::NONE
    }
}

/// Intersect a ray with the triangle `[a, b, c]`.
///
/// Returns `(t, beta, gamma)` for an accepted hit. Degenerate triangles and
/// rays parallel to the triangle's plane have a zero determinant and never hit.
#[inline]
pub fn intersect_triangle([pa, pb, pc]: [Vec3; 3], ray: &Ray) -> Option<(f32, f32, f32)> {
    let a = pa.x - pb.x;
    let b = pa.y - pb.y;
    let c = pa.z - pb.z;

    let d = pa.x - pc.x;
    let e = pa.y - pc.y;
    let f = pa.z - pc.z;

    let g = ray.direction.x;
    let h = ray.direction.y;
    let i = ray.direction.z;

    let j = pa.x - ray.origin.x;
    let k = pa.y - ray.origin.y;
    let l = pa.z - ray.origin.z;

    let ei_hf = e * i - h * f;
    let gf_di = g * f - d * i;
    let dh_eg = d * h - e * g;
    let m = a * ei_hf + b * gf_di + c * dh_eg;
    if m == 0.0 || !m.is_finite() {
        return None;
    }

    let ak_jb = a * k - j * b;
    let jc_al = j * c - a * l;
    let bl_kc = b * l - k * c;

    let inv_m = 1.0 / m;
    let t = -(f * ak_jb + e * jc_al + d * bl_kc) * inv_m;
    if !ray.accepts(t) {
        return None;
    }

    let beta = (j * ei_hf + k * gf_di + l * dh_eg) * inv_m;
    if !(beta >= 0.0) {
        return None;
    }
    let gamma = (i * ak_jb + h * jc_al + g * bl_kc) * inv_m;
    if !(gamma >= 0.0) || beta + gamma > 1.0 {
        return None;
    }

    Some((t, beta, gamma))
}
