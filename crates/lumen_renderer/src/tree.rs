//! k-d tree acceleration structure.
//!
//! A binary space partition over an immutable primitive slice, built once
//! and then queried concurrently. Nodes live in a flat arena addressed by
//! index; leaves refer to runs of primitive indices. No per-node boxes are
//! stored: the valid `t` range for each node is derived during traversal
//! from the root box and the split planes.

use std::time::Instant;

use lumen_math::{Aabb, Axis, Ray};
use serde::{Deserialize, Serialize};

use crate::error::{require_count, require_unit, ConfigError};
use crate::hit::{Hit, Primitive};

/// Tuning for tree construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Sets with fewer primitives than this become leaves
    pub leaf_size: usize,
    /// A split is accepted only if its larger side holds fewer than
    /// `split_ratio * count` primitives
    pub split_ratio: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            leaf_size: 8,
            split_ratio: 0.85,
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_count("leaf_size", self.leaf_size as u64)?;
        require_unit("split_ratio", self.split_ratio)
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf {
        start: usize,
        len: usize,
    },
    Split {
        axis: Axis,
        point: f64,
        left: usize,
        right: usize,
    },
}

/// The spatial index. Holds primitive indices only, so the same slice
/// that was passed to [`Tree::build`] must be passed to the queries.
#[derive(Debug, Clone)]
pub struct Tree {
    bounds: Aabb,
    nodes: Vec<Node>,
    indices: Vec<usize>,
    depth: usize,
}

struct Builder<'b> {
    boxes: &'b [Aabb],
    config: TreeConfig,
    nodes: Vec<Node>,
    indices: Vec<usize>,
    depth: usize,
}

impl Tree {
    /// Build a tree over `primitives`.
    pub fn build<P: Primitive>(primitives: &[P], config: TreeConfig) -> Tree {
        let start = Instant::now();
        let boxes: Vec<Aabb> = primitives.iter().map(|p| p.bounding_box()).collect();
        let bounds = Aabb::for_boxes(boxes.iter().copied());

        let mut builder = Builder {
            boxes: &boxes,
            config,
            nodes: Vec::new(),
            indices: Vec::new(),
            depth: 0,
        };
        builder.build_node((0..primitives.len()).collect(), 0);

        let tree = Tree {
            bounds,
            nodes: builder.nodes,
            indices: builder.indices,
            depth: builder.depth,
        };
        log::debug!(
            "Built tree over {} primitives: {} nodes, {} leaf refs, depth {} in {:.2?}",
            primitives.len(),
            tree.nodes.len(),
            tree.indices.len(),
            tree.depth,
            start.elapsed()
        );
        tree
    }

    /// Bounding box of every primitive in the tree.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Nearest hit along `ray`.
    pub fn intersect<'a, P: Primitive>(&self, primitives: &'a [P], ray: &Ray) -> Option<Hit<'a>> {
        self.intersect_indexed(primitives, ray).map(|(_, hit)| hit)
    }

    /// Nearest hit along `ray`, together with the index of the primitive
    /// that produced it.
    pub fn intersect_indexed<'a, P: Primitive>(
        &self,
        primitives: &'a [P],
        ray: &Ray,
    ) -> Option<(usize, Hit<'a>)> {
        if self.nodes.is_empty() {
            return None;
        }
        let range = self.bounds.intersect(ray);
        if range.max < range.min || range.max <= 0.0 {
            return None;
        }
        self.intersect_node(0, primitives, ray, range.min, range.max)
    }

    fn intersect_node<'a, P: Primitive>(
        &self,
        node: usize,
        primitives: &'a [P],
        ray: &Ray,
        tmin: f64,
        tmax: f64,
    ) -> Option<(usize, Hit<'a>)> {
        let (axis, point, left, right) = match self.nodes[node] {
            Node::Leaf { start, len } => {
                return intersect_all(primitives, ray, &self.indices[start..start + len]);
            }
            Node::Split {
                axis,
                point,
                left,
                right,
            } => (axis, point, left, right),
        };

        let i = axis.index();
        let origin = ray.origin[i];
        let direction = ray.direction[i];
        let tsplit = (point - origin) / direction;
        let left_first = origin < point || (origin == point && direction <= 0.0);
        let (first, second) = if left_first { (left, right) } else { (right, left) };

        if tsplit > tmax || tsplit <= 0.0 {
            self.intersect_node(first, primitives, ray, tmin, tmax)
        } else if tsplit < tmin {
            self.intersect_node(second, primitives, ray, tmin, tmax)
        } else {
            let h1 = self.intersect_node(first, primitives, ray, tmin, tsplit);
            let h1_t = h1.as_ref().map_or(f64::INFINITY, |(_, h)| h.t);
            if h1_t <= tsplit {
                return h1;
            }
            let h2 = self.intersect_node(second, primitives, ray, tsplit, tmax.min(h1_t));
            match (h1, h2) {
                (Some(a), Some(b)) => Some(if a.1.t <= b.1.t { a } else { b }),
                (a, b) => a.or(b),
            }
        }
    }

    /// Every leaf with the region of space it covers.
    pub fn leaf_regions(&self) -> Vec<(Aabb, &[usize])> {
        let mut out = Vec::new();
        if !self.nodes.is_empty() {
            self.collect_leaves(0, self.bounds, &mut out);
        }
        out
    }

    fn collect_leaves<'t>(&'t self, node: usize, region: Aabb, out: &mut Vec<(Aabb, &'t [usize])>) {
        match self.nodes[node] {
            Node::Leaf { start, len } => out.push((region, &self.indices[start..start + len])),
            Node::Split {
                axis,
                point,
                left,
                right,
            } => {
                let i = axis.index();
                let mut left_region = region;
                left_region.max[i] = point;
                let mut right_region = region;
                right_region.min[i] = point;
                self.collect_leaves(left, left_region, out);
                self.collect_leaves(right, right_region, out);
            }
        }
    }
}

/// Linear scan over `candidates`, keeping the minimal `t`.
pub(crate) fn intersect_all<'a, P: Primitive>(
    primitives: &'a [P],
    ray: &Ray,
    candidates: &[usize],
) -> Option<(usize, Hit<'a>)> {
    let mut best: Option<(usize, Hit<'a>)> = None;
    for &index in candidates {
        if let Some(hit) = primitives[index].intersect(ray) {
            if best.as_ref().map_or(true, |(_, b)| hit.t < b.t) {
                best = Some((index, hit));
            }
        }
    }
    best
}

/// Linear scan over the whole slice.
pub fn intersect_linear<'a, P: Primitive>(primitives: &'a [P], ray: &Ray) -> Option<(usize, Hit<'a>)> {
    let mut best: Option<(usize, Hit<'a>)> = None;
    for (index, primitive) in primitives.iter().enumerate() {
        if let Some(hit) = primitive.intersect(ray) {
            if best.as_ref().map_or(true, |(_, b)| hit.t < b.t) {
                best = Some((index, hit));
            }
        }
    }
    best
}

impl Builder<'_> {
    fn build_node(&mut self, items: Vec<usize>, depth: usize) -> usize {
        self.depth = self.depth.max(depth);
        let Some((axis, point)) = self.choose_split(&items) else {
            return self.push_leaf(items);
        };

        let mut left = Vec::new();
        let mut right = Vec::new();
        for &index in &items {
            let (l, r) = self.boxes[index].partition(axis, point);
            if l {
                left.push(index);
            }
            if r {
                right.push(index);
            }
        }
        drop(items);

        // Reserve the slot so children land after their parent.
        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf { start: 0, len: 0 });
        let left = self.build_node(left, depth + 1);
        let right = self.build_node(right, depth + 1);
        self.nodes[slot] = Node::Split {
            axis,
            point,
            left,
            right,
        };
        slot
    }

    fn push_leaf(&mut self, items: Vec<usize>) -> usize {
        let start = self.indices.len();
        let len = items.len();
        self.indices.extend(items);
        self.nodes.push(Node::Leaf { start, len });
        self.nodes.len() - 1
    }

    /// Median split on the axis whose larger side is smallest, if any axis
    /// is good enough.
    fn choose_split(&self, items: &[usize]) -> Option<(Axis, f64)> {
        if items.len() < self.config.leaf_size {
            return None;
        }
        let limit = self.config.split_ratio * items.len() as f64;
        let mut best: Option<(usize, Axis, f64)> = None;
        for axis in Axis::ALL {
            let point = self.median(items, axis);
            let score = self.partition_score(items, axis, point);
            let current = best.map_or(limit, |(s, _, _)| s as f64);
            if (score as f64) < current {
                best = Some((score, axis, point));
            }
        }
        best.map(|(_, axis, point)| (axis, point))
    }

    /// Median of all min and max coordinates on `axis`.
    fn median(&self, items: &[usize], axis: Axis) -> f64 {
        let i = axis.index();
        let mut values: Vec<f64> = items
            .iter()
            .flat_map(|&index| [self.boxes[index].min[i], self.boxes[index].max[i]])
            .collect();
        values.sort_unstable_by(f64::total_cmp);
        let n = values.len();
        match n {
            0 => 0.0,
            _ if n % 2 == 1 => values[n / 2],
            _ => (values[n / 2 - 1] + values[n / 2]) / 2.0,
        }
    }

    /// `max(left, right)` when splitting at `point`; straddlers count twice.
    fn partition_score(&self, items: &[usize], axis: Axis, point: f64) -> usize {
        let (mut left, mut right) = (0, 0);
        for &index in items {
            let (l, r) = self.boxes[index].partition(axis, point);
            left += l as usize;
            right += r as usize;
        }
        left.max(right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Shape, Sphere, Triangle};
    use lumen_core::Material;
    use lumen_math::{random_unit_vector, Color, DVec3};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::sync::Arc;

    fn random_spheres(rng: &mut StdRng, n: usize) -> Vec<Shape> {
        (0..n)
            .map(|_| {
                let center = DVec3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                Sphere::new(center, rng.gen_range(0.1..1.5), Material::diffuse(Color::ONE)).into()
            })
            .collect()
    }

    fn random_triangles(rng: &mut StdRng, n: usize) -> Vec<Triangle> {
        let material = Arc::new(Material::diffuse(Color::ONE));
        (0..n)
            .map(|_| {
                let base = DVec3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                );
                let mut jitter = || {
                    base + DVec3::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    )
                };
                let (a, b, c) = (jitter(), jitter(), jitter());
                Triangle::new(a, b, c, material.clone())
            })
            .collect()
    }

    fn random_ray(rng: &mut StdRng) -> Ray {
        let origin = random_unit_vector(rng) * rng.gen_range(0.0..20.0);
        Ray::new(origin, random_unit_vector(rng))
    }

    fn assert_matches_linear<P: Primitive>(
        primitives: &[P],
        config: TreeConfig,
        rng: &mut StdRng,
        rays: usize,
    ) {
        let tree = Tree::build(primitives, config);
        for _ in 0..rays {
            let ray = random_ray(rng);
            let expected = intersect_linear(primitives, &ray).map(|(_, h)| h.t);
            let actual = tree.intersect(primitives, &ray).map(|h| h.t);
            match (expected, actual) {
                (None, None) => {}
                (Some(e), Some(a)) => assert!((e - a).abs() < 1e-9, "linear {e} vs tree {a}"),
                (e, a) => panic!("linear {e:?} vs tree {a:?} for {ray:?}"),
            }
        }
    }

    #[test]
    fn test_empty_tree() {
        let shapes: Vec<Shape> = Vec::new();
        let tree = Tree::build(&shapes, TreeConfig::default());
        let ray = Ray::new(DVec3::ZERO, DVec3::X);
        assert!(tree.intersect(&shapes, &ray).is_none());
    }

    #[test]
    fn test_small_set_is_single_leaf() {
        let mut rng = StdRng::seed_from_u64(42);
        let shapes = random_spheres(&mut rng, 7);
        let tree = Tree::build(&shapes, TreeConfig::default());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.leaf_regions()[0].1.len(), 7);
    }

    #[test]
    fn test_tree_matches_linear_scan_spheres() {
        let mut rng = StdRng::seed_from_u64(42);
        for n in [1, 8, 50, 300] {
            let shapes = random_spheres(&mut rng, n);
            assert_matches_linear(&shapes, TreeConfig::default(), &mut rng, 500);
        }
    }

    #[test]
    fn test_tree_matches_linear_scan_triangles() {
        let mut rng = StdRng::seed_from_u64(7);
        let triangles = random_triangles(&mut rng, 1000);
        assert_matches_linear(&triangles, TreeConfig::default(), &mut rng, 1000);
    }

    #[test]
    fn test_rays_starting_on_split_planes() {
        // Axis-aligned rays from grid points exercise the tie-break.
        let mut shapes = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                let center = DVec3::new(i as f64 * 2.0, j as f64 * 2.0, 0.0);
                shapes.push(Shape::from(Sphere::new(center, 0.5, Material::diffuse(Color::ONE))));
            }
        }
        let tree = Tree::build(&shapes, TreeConfig::default());
        for i in 0..12 {
            for dir in [DVec3::X, -DVec3::X, DVec3::Y, -DVec3::Y] {
                let ray = Ray::new(DVec3::new(i as f64, 4.0, 0.0), dir);
                let expected = intersect_linear(&shapes, &ray).map(|(_, h)| h.t);
                let actual = tree.intersect(&shapes, &ray).map(|h| h.t);
                assert_eq!(expected, actual);
            }
        }
    }

    #[test]
    fn test_partition_completeness() {
        let mut rng = StdRng::seed_from_u64(3);
        let shapes = random_spheres(&mut rng, 400);
        let tree = Tree::build(&shapes, TreeConfig::default());
        let leaves = tree.leaf_regions();
        assert!(leaves.len() > 1);

        let mut seen = vec![false; shapes.len()];
        for (region, items) in &leaves {
            for (index, shape) in shapes.iter().enumerate() {
                let overlaps = shape.bounding_box().intersects(region);
                assert_eq!(items.contains(&index), overlaps, "shape {index} vs leaf {region:?}");
            }
            for &index in *items {
                seen[index] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_split_ratio_one_still_terminates() {
        let mut rng = StdRng::seed_from_u64(11);
        let shapes = random_spheres(&mut rng, 100);
        let config = TreeConfig {
            leaf_size: 2,
            split_ratio: 1.0,
        };
        let tree = Tree::build(&shapes, config);
        assert!(tree.depth() < 100);
        assert_matches_linear(&shapes, config, &mut rng, 200);
    }

    #[test]
    fn test_clustered_shapes_stay_in_leaf() {
        // Identical boxes straddle every median, so no split is accepted.
        let shapes: Vec<Shape> = (0..20)
            .map(|_| Sphere::new(DVec3::ZERO, 1.0, Material::diffuse(Color::ONE)).into())
            .collect();
        let tree = Tree::build(&shapes, TreeConfig::default());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_config_validation() {
        assert!(TreeConfig::default().validate().is_ok());
        let bad = TreeConfig {
            leaf_size: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = TreeConfig {
            split_ratio: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
