//! Warps from the unit square to disks, hemispheres and triangles.
//!
//! Hemisphere samples are in tangent space with `z` as the normal axis; use
//! [`align`] to bring them into world space.

use std::f32::consts::{FRAC_1_PI, TAU};

use crate::{Color, Vec2, Vec3};

/// Density of [`uniform_sample_hemisphere`] with respect to solid angle.
pub const UNIFORM_HEMISPHERE_PDF: f32 = 1.0 / TAU;

/// Uniform point on the unit disk.
#[inline]
pub fn uniform_sample_disk(xi: Vec2) -> Vec2 {
    let r = xi.x.sqrt();
    let theta = TAU * xi.y;
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Uniformly distributed direction on the `z >= 0` hemisphere.
#[inline]
pub fn uniform_sample_hemisphere(xi: Vec2) -> Vec3 {
    let z = xi.x;
    let r = (1.0 - z * z).abs().sqrt();
    let phi = TAU * xi.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Cosine distributed direction on the `z >= 0` hemisphere (Malley's method).
#[inline]
pub fn cosine_sample_hemisphere(xi: Vec2) -> Vec3 {
    let d = uniform_sample_disk(xi);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

/// Density of [`cosine_sample_hemisphere`] for a direction with `cos_theta` to the normal.
#[inline]
pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta.max(0.0) * FRAC_1_PI
}

/// Area-uniform barycentric coordinates `(beta, gamma)` on a triangle.
///
/// The vertex weights are `(1 - beta - gamma, beta, gamma)`.
#[inline]
pub fn uniform_sample_triangle(xi: Vec2) -> Vec2 {
    let su0 = xi.x.sqrt();
    Vec2::new(1.0 - su0, xi.y * su0)
}

/// Build an orthonormal basis `(tangent, bitangent)` around a unit normal.
///
/// Branchless construction by Duff et al. (2017).
#[inline]
pub fn build_orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);

    (tangent, bitangent)
}

/// Rotate a tangent space vector (`z` up) into the frame around `n`.
#[inline]
pub fn align(v: Vec3, n: Vec3) -> Vec3 {
    let (t, b) = build_orthonormal_basis(n);
    t * v.x + b * v.y + n * v.z
}

/// Polar angle from `+y` and azimuth in the `xz` plane, as `(theta, phi)`.
///
/// `phi` is in `[0, 2π)`. This is the parameterization used by the sky light.
pub fn to_spherical(dir: Vec3) -> (f32, f32) {
    let theta = dir.y.clamp(-1.0, 1.0).acos();
    let mut phi = dir.z.atan2(dir.x);
    if phi < 0.0 {
        phi += TAU;
    }
    (theta, phi)
}

/// Inverse of [`to_spherical`].
pub fn from_spherical(theta: f32, phi: f32) -> Vec3 {
    let sin_theta = theta.sin();
    Vec3::new(sin_theta * phi.cos(), theta.cos(), sin_theta * phi.sin())
}

/// Luminance of a linear RGB color (Rec. 709 weights).
#[inline]
pub fn luminance(c: Color) -> f32 {
    0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
}

/// Balance heuristic weight of strategy `a` against strategy `b`.
#[inline]
pub fn balance_heuristic(pdf_a: f32, pdf_b: f32) -> f32 {
    let sum = pdf_a + pdf_b;
    if sum > 0.0 {
        pdf_a / sum
    } else {
        0.0
    }
}
