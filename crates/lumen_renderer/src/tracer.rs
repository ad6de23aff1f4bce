//! Ray tracers: the query interface shared by all accelerators.
//!
//! A tracer is built once per committed scene and then shared read-only by
//! every render worker.

use lumen_core::Scene;
use lumen_math::Ray;

use crate::intersect::{intersect_triangle, TriangleIntersection};

/// Closest-hit and occlusion queries against a scene's triangles.
///
/// Queries take the scene explicitly because leaves and hits refer to
/// triangles by their index in [`Scene::triangles`].
pub trait RayTracer: Send + Sync {
    /// Prepare for queries. May reorder `scene.triangles`.
    fn build(&mut self, scene: &mut Scene);

    /// The nearest accepted hit, or [`TriangleIntersection::NONE`].
    fn closest_hit(&self, scene: &Scene, ray: &Ray) -> TriangleIntersection;

    /// True if any triangle is hit within the ray's range.
    fn any_hit(&self, scene: &Scene, ray: &Ray) -> bool;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Brute force tracer testing every triangle.
#[derive(Debug, Default)]
pub struct SeqTracer {
    built: bool,
}

impl SeqTracer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RayTracer for SeqTracer {
    fn build(&mut self, scene: &mut Scene) {
        log::info!(
            "Sequential tracer over {} triangles",
            scene.triangle_count()
        );
        self.built = true;
    }

    fn closest_hit(&self, scene: &Scene, ray: &Ray) -> TriangleIntersection {
        assert!(self.built, "SeqTracer queried before build()");
        let mut closest = TriangleIntersection::NONE;
        for (i, tri) in scene.triangles.iter().enumerate() {
            if let Some((t, beta, gamma)) = intersect_triangle(scene.triangle_positions(tri), ray) {
                if t < closest.t {
                    closest = TriangleIntersection {
                        t,
                        beta,
                        gamma,
                        tri: i as u32,
                    };
                }
            }
        }
        closest
    }

    fn any_hit(&self, scene: &Scene, ray: &Ray) -> bool {
        assert!(self.built, "SeqTracer queried before build()");
        scene
            .triangles
            .iter()
            .any(|tri| intersect_triangle(scene.triangle_positions(tri), ray).is_some())
    }

    fn name(&self) -> &'static str {
        "seq"
    }
}

/// One-shot build phase: collect lights, then build the accelerator.
///
/// Taking both by `&mut` keeps a rebuild from overlapping any traversal.
pub fn commit(scene: &mut Scene, tracer: &mut dyn RayTracer) {
    scene.compute_light_distribution();
    tracer.build(scene);
}

/// Read-only view of a committed scene shared by all render workers.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub scene: &'a Scene,
    pub tracer: &'a dyn RayTracer,
}

impl<'a> RenderContext<'a> {
    pub fn new(scene: &'a Scene, tracer: &'a dyn RayTracer) -> Self {
        Self { scene, tracer }
    }

    #[inline]
    pub fn closest_hit(&self, ray: &Ray) -> TriangleIntersection {
        self.tracer.closest_hit(self.scene, ray)
    }

    /// True if nothing blocks `shadow_ray` within its range.
    #[inline]
    pub fn unoccluded(&self, shadow_ray: &Ray) -> bool {
        !self.tracer.any_hit(self.scene, shadow_ray)
    }
}
