//! First-hit albedo display.

use lumen_math::{Color, Ray};
use rand::RngCore;

use crate::hit::SurfaceHit;
use crate::integrator::Integrator;
use crate::tracer::RenderContext;

/// Shows the (textured) albedo of the closest surface, black on a miss.
///
/// Useful for checking geometry, texture coordinates and the tracer without
/// any light transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryHit;

impl Integrator for PrimaryHit {
    fn li(&self, ctx: &RenderContext, ray: &Ray, _rng: &mut dyn RngCore) -> Color {
        let is = ctx.closest_hit(ray);
        if !is.valid() {
            return Color::ZERO;
        }
        SurfaceHit::new(ctx.scene, &is, ray).albedo
    }

    fn name(&self) -> &'static str {
        "primary"
    }
}
