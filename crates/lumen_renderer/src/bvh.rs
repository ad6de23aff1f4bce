//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Nodes live in a flat arena and refer to each other by index. Inner nodes
//! store the boxes of both children so traversal tests them without touching
//! the child nodes. Leaves refer to contiguous ranges of the scene's triangle
//! array, which the build reorders.

use std::time::Instant;

use lumen_core::Scene;
use lumen_math::{Aabb, Ray, Vec3};
use serde::{Deserialize, Serialize};

use crate::intersect::{intersect_triangle, TriangleIntersection};
use crate::tracer::RayTracer;

/// Upper bound on the number of edges from the root to any leaf.
///
/// Object median splits halve the range, so they add at most 32 levels for
/// `u32` triangle counts. Spatial median splits are used only above
/// [`SPATIAL_DEPTH_LIMIT`].
pub const MAX_TREE_DEPTH: usize = 64;

/// Depth from which spatial median splits give way to object median splits.
const SPATIAL_DEPTH_LIMIT: usize = 32;

/// A depth-first traversal holds at most one pending node per level plus the current one.
const STACK_SIZE: usize = MAX_TREE_DEPTH + 1;

/// How an inner node divides its triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitPolicy {
    /// Sort by centroid along the longest axis and bisect the range
    #[default]
    ObjectMedian,
    /// Partition at the middle of the box's longest axis
    SpatialMedian,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BvhNode {
    Inner {
        box_l: Aabb,
        box_r: Aabb,
        left: u32,
        right: u32,
    },
    Leaf {
        offset: u32,
        count: u32,
    },
}

/// Per-triangle data gathered once before splitting.
struct BuildPrimitive {
    bounds: Aabb,
    centroid: Vec3,
}

/// BVH over a scene's triangles.
#[derive(Debug, Default)]
pub struct Bvh {
    split: SplitPolicy,
    nodes: Vec<BvhNode>,
    built: bool,
    depth: usize,
    leaves: usize,
}

impl Bvh {
    pub fn new(split: SplitPolicy) -> Self {
        Self {
            split,
            ..Default::default()
        }
    }

    pub fn split_policy(&self) -> SplitPolicy {
        self.split
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves
    }

    /// Longest root-to-leaf path in edges.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Recursively split `prims`, which starts at triangle `offset`, and return the node index.
    fn subdivide(
        &mut self,
        prims: &mut [u32],
        info: &[BuildPrimitive],
        bounds: Aabb,
        offset: usize,
        depth: usize,
    ) -> u32 {
        let node = self.nodes.len() as u32;
        self.depth = self.depth.max(depth);

        if prims.len() == 1 {
            self.nodes.push(BvhNode::Leaf {
                offset: offset as u32,
                count: 1,
            });
            self.leaves += 1;
            return node;
        }

        // Reserve the slot; the links are known only after both children exist.
        self.nodes.push(BvhNode::Leaf {
            offset: 0,
            count: 0,
        });

        let axis = bounds.longest_axis();
        let mid = match self.split {
            SplitPolicy::SpatialMedian if depth < SPATIAL_DEPTH_LIMIT => {
                spatial_median(prims, info, axis, bounds.centroid()[axis])
            }
            _ => object_median(prims, info, axis),
        };

        let (lo, hi) = prims.split_at_mut(mid);
        let box_l = range_bounds(lo, info);
        let box_r = range_bounds(hi, info);
        let left = self.subdivide(lo, info, box_l, offset, depth + 1);
        let right = self.subdivide(hi, info, box_r, offset + mid, depth + 1);

        self.nodes[node as usize] = BvhNode::Inner {
            box_l,
            box_r,
            left,
            right,
        };
        node
    }

    fn check_built(&self) {
        assert!(self.built, "BVH queried before build()");
    }
}

fn range_bounds(prims: &[u32], info: &[BuildPrimitive]) -> Aabb {
    prims.iter().fold(Aabb::EMPTY, |mut acc, &p| {
        acc.grow_box(&info[p as usize].bounds);
        acc
    })
}

/// Put the lower half (by centroid on `axis`) first and return the split index.
fn object_median(prims: &mut [u32], info: &[BuildPrimitive], axis: usize) -> usize {
    let mid = prims.len() / 2;
    prims.select_nth_unstable_by(mid, |&a, &b| {
        info[a as usize].centroid[axis].total_cmp(&info[b as usize].centroid[axis])
    });
    mid
}

/// Partition around `split` on `axis`, bisecting instead if one side would be empty.
fn spatial_median(prims: &mut [u32], info: &[BuildPrimitive], axis: usize, split: f32) -> usize {
    let mut mid = 0;
    for i in 0..prims.len() {
        if info[prims[i] as usize].centroid[axis] < split {
            prims.swap(i, mid);
            mid += 1;
        }
    }
    if mid == 0 || mid == prims.len() {
        return object_median(prims, info, axis);
    }
    mid
}

impl RayTracer for Bvh {
    fn build(&mut self, scene: &mut Scene) {
        let start = Instant::now();
        self.nodes.clear();
        self.depth = 0;
        self.leaves = 0;
        self.built = true;

        let count = scene.triangle_count();
        if count == 0 {
            log::warn!("Building BVH over an empty scene");
            return;
        }
        assert!(count < u32::MAX as usize, "too many triangles for a BVH");

        let info: Vec<BuildPrimitive> = scene
            .triangles
            .iter()
            .map(|tri| {
                let [a, b, c] = scene.triangle_positions(tri);
                let bounds = Aabb::from_triangle(a, b, c);
                BuildPrimitive {
                    bounds,
                    centroid: bounds.centroid(),
                }
            })
            .collect();

        let mut prims: Vec<u32> = (0..count as u32).collect();
        let bounds = range_bounds(&prims, &info);
        self.nodes.reserve(2 * count - 1);
        self.subdivide(&mut prims, &info, bounds, 0, 0);
        debug_assert!(self.depth <= MAX_TREE_DEPTH);

        let original = std::mem::take(&mut scene.triangles);
        scene.triangles = prims.iter().map(|&p| original[p as usize]).collect();

        log::info!(
            "Built BVH ({:?}) over {} triangles: {} nodes, {} leaves, depth {} in {:.2?}",
            self.split,
            count,
            self.nodes.len(),
            self.leaves,
            self.depth,
            start.elapsed()
        );
    }

    fn closest_hit(&self, scene: &Scene, ray: &Ray) -> TriangleIntersection {
        self.check_built();
        let mut closest = TriangleIntersection::NONE;
        if self.nodes.is_empty() {
            return closest;
        }

        let inv_dir = ray.direction.recip();
        let mut stack = [0u32; STACK_SIZE];
        let mut top = 1;

        while top > 0 {
            top -= 1;
            match self.nodes[stack[top] as usize] {
                BvhNode::Leaf { offset, count } => {
                    for i in offset..offset + count {
                        let tri = &scene.triangles[i as usize];
                        if let Some((t, beta, gamma)) =
                            intersect_triangle(scene.triangle_positions(tri), ray)
                        {
                            if t < closest.t {
                                closest = TriangleIntersection { t, beta, gamma, tri: i };
                            }
                        }
                    }
                }
                BvhNode::Inner {
                    box_l,
                    box_r,
                    left,
                    right,
                } => {
                    let near_l = box_l.hit(ray, inv_dir).filter(|&d| d < closest.t);
                    let near_r = box_r.hit(ray, inv_dir).filter(|&d| d < closest.t);
                    // Nearer child goes on top so it is visited first.
                    let order = match (near_l, near_r) {
                        (Some(dl), Some(dr)) if dl <= dr => [Some(right), Some(left)],
                        (Some(_), Some(_)) => [Some(left), Some(right)],
                        (Some(_), None) => [Some(left), None],
                        (None, Some(_)) => [Some(right), None],
                        (None, None) => [None, None],
                    };
                    for child in order.into_iter().flatten() {
                        debug_assert!(top < STACK_SIZE);
                        stack[top] = child;
                        top += 1;
                    }
                }
            }
        }
        closest
    }

    fn any_hit(&self, scene: &Scene, ray: &Ray) -> bool {
        self.check_built();
        if self.nodes.is_empty() {
            return false;
        }

        let inv_dir = ray.direction.recip();
        let mut stack = [0u32; STACK_SIZE];
        let mut top = 1;

        while top > 0 {
            top -= 1;
            match self.nodes[stack[top] as usize] {
                BvhNode::Leaf { offset, count } => {
                    let range = offset as usize..(offset + count) as usize;
                    if scene.triangles[range]
                        .iter()
                        .any(|tri| intersect_triangle(scene.triangle_positions(tri), ray).is_some())
                    {
                        return true;
                    }
                }
                BvhNode::Inner {
                    box_l,
                    box_r,
                    left,
                    right,
                } => {
                    if box_l.hit(ray, inv_dir).is_some() {
                        debug_assert!(top < STACK_SIZE);
                        stack[top] = left;
                        top += 1;
                    }
                    if box_r.hit(ray, inv_dir).is_some() {
                        debug_assert!(top < STACK_SIZE);
                        stack[top] = right;
                        top += 1;
                    }
                }
            }
        }
        false
    }

    fn name(&self) -> &'static str {
        "bvh"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::SeqTracer;
    use lumen_core::{Material, Mesh};
    use lumen_math::Color;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Random triangle soup; each triangle's material id records its original index.
    fn soup(n: usize, seed: u64) -> Scene {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scene = Scene::new("soup");
        for i in 0..n {
            scene
                .add_material(Material::new(format!("m{}", i), Color::splat(0.5)))
                .expect("material");
        }
        for i in 0..n {
            let center = Vec3::new(rng.gen(), rng.gen(), rng.gen()) * 10.0 - 5.0;
            let mut corner = || center + Vec3::new(rng.gen(), rng.gen(), rng.gen()) - 0.5;
            let positions = vec![corner(), corner(), corner()];
            let mesh = Mesh::new(positions, vec![0, 1, 2], None);
            scene.add_mesh(&mesh, i as u32).expect("triangle");
        }
        scene
    }

    fn random_ray(rng: &mut StdRng) -> Ray {
        let origin = Vec3::new(rng.gen(), rng.gen(), rng.gen()) * 16.0 - 8.0;
        let target = Vec3::new(rng.gen(), rng.gen(), rng.gen()) * 8.0 - 4.0;
        Ray::new(origin, (target - origin).normalize())
    }

    fn check_against_brute_force(split: SplitPolicy) {
        let mut scene = soup(300, 7);
        let mut bvh = Bvh::new(split);
        bvh.build(&mut scene);
        let mut seq = SeqTracer::new();
        seq.build(&mut scene);

        let mut rng = StdRng::seed_from_u64(42);
        let mut hits = 0;
        for _ in 0..2000 {
            let ray = random_ray(&mut rng);
            let expected = seq.closest_hit(&scene, &ray);
            let actual = bvh.closest_hit(&scene, &ray);
            assert_eq!(expected.valid(), actual.valid());
            assert_eq!(seq.any_hit(&scene, &ray), bvh.any_hit(&scene, &ray));
            if expected.valid() {
                hits += 1;
                assert!((expected.t - actual.t).abs() < 1e-4);
            }
        }
        assert!(hits > 100, "only {} rays hit", hits);
    }

    #[test]
    fn test_object_median_matches_brute_force() {
        check_against_brute_force(SplitPolicy::ObjectMedian);
    }

    #[test]
    fn test_spatial_median_matches_brute_force() {
        check_against_brute_force(SplitPolicy::SpatialMedian);
    }

    /// Unit floor tiles on an integer grid plus a wall in the x = 0 plane.
    fn grid_scene() -> Scene {
        let mut scene = Scene::new("grid");
        let m = scene
            .add_material(Material::default())
            .expect("material");
        for i in -3..3 {
            for k in -3..3 {
                let (x, z) = (i as f32, k as f32);
                let tile = Mesh::quad(
                    Vec3::new(x, 0.0, z),
                    Vec3::new(x, 0.0, z + 1.0),
                    Vec3::new(x + 1.0, 0.0, z + 1.0),
                    Vec3::new(x + 1.0, 0.0, z),
                );
                scene.add_mesh(&tile, m).expect("tile");
            }
        }
        let wall = Mesh::quad(
            Vec3::new(0.0, 0.0, -3.0),
            Vec3::new(0.0, 2.0, -3.0),
            Vec3::new(0.0, 2.0, 3.0),
            Vec3::new(0.0, 0.0, 3.0),
        );
        scene.add_mesh(&wall, m).expect("wall");
        scene
    }

    #[test]
    fn test_axis_aligned_rays_on_grid_match_brute_force() {
        let coords = [-2.0, -1.0, -0.3, 0.0, 0.3, 1.0, 2.0];
        let mut rays = Vec::new();
        for &x in &coords {
            for &z in &coords {
                rays.push(Ray::new(Vec3::new(x, 3.0, z), Vec3::NEG_Y));
            }
        }
        for &y in &[0.5, 1.0, 1.5] {
            for &z in &coords {
                rays.push(Ray::new(Vec3::new(-2.5, y, z), Vec3::X));
                rays.push(Ray::new(Vec3::new(2.5, y, z), Vec3::NEG_X));
            }
        }

        for split in [SplitPolicy::ObjectMedian, SplitPolicy::SpatialMedian] {
            let mut scene = grid_scene();
            let mut bvh = Bvh::new(split);
            bvh.build(&mut scene);
            let mut seq = SeqTracer::new();
            seq.build(&mut scene);

            let mut hits = 0;
            for ray in &rays {
                let expected = seq.closest_hit(&scene, ray);
                let actual = bvh.closest_hit(&scene, ray);
                assert_eq!(expected.valid(), actual.valid(), "{:?} {:?}", split, ray);
                assert_eq!(seq.any_hit(&scene, ray), bvh.any_hit(&scene, ray));
                if expected.valid() {
                    hits += 1;
                    assert!((expected.t - actual.t).abs() < 1e-5);
                }
            }
            assert!(hits > 10, "only {} rays hit", hits);
        }
    }

    #[test]
    fn test_parallel_ray_on_box_plane_finds_triangle() {
        // The ray runs inside the x = 0 plane of the triangle's box.
        let mut scene = Scene::new("edge");
        let m = scene
            .add_material(Material::default())
            .expect("material");
        let near = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2], None);
        let far = Mesh::new(
            vec![Vec3::splat(50.0), Vec3::new(51.0, 50.0, 50.0), Vec3::new(50.0, 51.0, 50.0)],
            vec![0, 1, 2],
            None,
        );
        scene.add_mesh(&near, m).expect("near");
        scene.add_mesh(&far, m).expect("far");

        let mut bvh = Bvh::new(SplitPolicy::ObjectMedian);
        bvh.build(&mut scene);
        assert_eq!(bvh.node_count(), 3);

        let ray = Ray::new(Vec3::new(0.0, 0.25, 1.0), Vec3::NEG_Z);
        let hit = bvh.closest_hit(&scene, &ray);
        assert!(hit.valid());
        assert!((hit.t - 1.0).abs() < 1e-6);
        assert!(bvh.any_hit(&scene, &ray));
    }

    #[test]
    fn test_leaves_partition_triangles() {
        for split in [SplitPolicy::ObjectMedian, SplitPolicy::SpatialMedian] {
            let mut scene = soup(97, 3);
            let mut bvh = Bvh::new(split);
            bvh.build(&mut scene);

            let mut seen = vec![false; 97];
            for node in bvh.nodes() {
                if let BvhNode::Leaf { offset, count } = *node {
                    for i in offset..offset + count {
                        let original = scene.triangles[i as usize].material_id as usize;
                        assert!(!seen[original], "triangle {} in two leaves", original);
                        seen[original] = true;
                    }
                }
            }
            assert!(seen.iter().all(|&s| s));
            assert_eq!(bvh.leaf_count(), 97);
            assert_eq!(bvh.node_count(), 2 * 97 - 1);
            assert!(bvh.depth() <= MAX_TREE_DEPTH);
        }
    }

    #[test]
    fn test_child_boxes_enclose_subtrees() {
        let mut scene = soup(64, 11);
        let mut bvh = Bvh::new(SplitPolicy::SpatialMedian);
        bvh.build(&mut scene);

        fn subtree_bounds(bvh: &Bvh, scene: &Scene, node: u32) -> Aabb {
            match bvh.nodes()[node as usize] {
                BvhNode::Leaf { offset, count } => {
                    let mut bounds = Aabb::EMPTY;
                    for i in offset..offset + count {
                        let [a, b, c] = scene.triangle_positions(&scene.triangles[i as usize]);
                        bounds.grow_box(&Aabb::from_triangle(a, b, c));
                    }
                    bounds
                }
                BvhNode::Inner {
                    box_l,
                    box_r,
                    left,
                    right,
                } => {
                    assert_eq!(box_l, subtree_bounds(bvh, scene, left));
                    assert_eq!(box_r, subtree_bounds(bvh, scene, right));
                    Aabb::surrounding(&box_l, &box_r)
                }
            }
        }
        let root = subtree_bounds(&bvh, &scene, 0);
        assert!(root.contains_box(&scene.bounds()) && scene.bounds().contains_box(&root));
    }

    #[test]
    fn test_object_median_is_balanced() {
        let mut scene = soup(1024, 5);
        let mut bvh = Bvh::new(SplitPolicy::ObjectMedian);
        bvh.build(&mut scene);
        assert_eq!(bvh.depth(), 10);
    }

    #[test]
    fn test_spatial_median_handles_coincident_centroids() {
        // Identical triangles cannot be separated spatially.
        let mut scene = Scene::new("stack");
        let m = scene
            .add_material(Material::default())
            .expect("material");
        for _ in 0..40 {
            let mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2], None);
            scene.add_mesh(&mesh, m).expect("triangle");
        }
        let mut bvh = Bvh::new(SplitPolicy::SpatialMedian);
        bvh.build(&mut scene);
        assert_eq!(bvh.leaf_count(), 40);
        assert!(bvh.depth() <= 6);
        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::NEG_Z);
        assert!(bvh.closest_hit(&scene, &ray).valid());
    }

    #[test]
    fn test_empty_scene() {
        let mut scene = Scene::new("empty");
        let mut bvh = Bvh::new(SplitPolicy::ObjectMedian);
        bvh.build(&mut scene);
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(!bvh.closest_hit(&scene, &ray).valid());
        assert!(!bvh.any_hit(&scene, &ray));
    }

    #[test]
    #[should_panic(expected = "before build")]
    fn test_query_before_build_panics() {
        let scene = soup(4, 1);
        let bvh = Bvh::new(SplitPolicy::ObjectMedian);
        bvh.any_hit(&scene, &Ray::new(Vec3::ZERO, Vec3::Z));
    }
}
