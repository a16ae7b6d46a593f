use glam::Vec3;
use smallvec::SmallVec;

use crate::geom::{ray_sphere_intersect, Frustum};

/// Capability interface for anything the octree can index: a fixed position
/// and a bounding-sphere radius.
pub trait SpatialItem {
    fn position(&self) -> Vec3;
    fn radius(&self) -> f32;
}

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: u32 = 8;
/// Containment and intersection tests inflate node extents by this factor,
/// so an item assigned by center comparison alone is still found by every
/// query that could reach it.
const LOOSE_FACTOR: f32 = 1.5;
/// Items are never harder to hit than a sphere of this radius; keeps the
/// smallest sub-topics hoverable and clickable.
const MIN_HIT_RADIUS: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Index into the item slice the octree was built from.
    pub item: usize,
    pub dist: f32,
}

#[derive(Debug)]
struct OctNode {
    center: Vec3,
    half: f32,
    items: SmallVec<[u32; LEAF_CAPACITY]>,
    children: Option<[u32; 8]>,
}

/// Loose octree over static point+radius items. Built once after layout;
/// never rebalanced — a re-layout means discarding and rebuilding.
#[derive(Debug)]
pub struct Octree<T> {
    items: Vec<T>,
    nodes: Vec<OctNode>,
    hit_pool: Vec<RayHit>,
}

impl<T: SpatialItem> Octree<T> {
    pub fn build(items: Vec<T>) -> Self {
        let mut tree = Self {
            items,
            nodes: Vec::new(),
            hit_pool: Vec::new(),
        };
        if tree.items.is_empty() {
            return tree;
        }

        // Tight AABB over all item bounding spheres, padded to a cube.
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for item in &tree.items {
            let p = item.position();
            let r = item.radius();
            min = min.min(p - Vec3::splat(r));
            max = max.max(p + Vec3::splat(r));
        }
        let center = (min + max) * 0.5;
        let extent = max - min;
        let half = extent.x.max(extent.y).max(extent.z) / 2.0 + 1.0;

        tree.nodes.push(OctNode {
            center,
            half,
            items: SmallVec::new(),
            children: None,
        });
        for i in 0..tree.items.len() {
            tree.insert(0, i as u32, 0);
        }
        tree
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    fn insert(&mut self, node_idx: usize, item_idx: u32, depth: u32) {
        let pos = self.items[item_idx as usize].position();
        if self.nodes[node_idx].children.is_none() {
            if self.nodes[node_idx].items.len() < LEAF_CAPACITY || depth >= MAX_DEPTH {
                self.nodes[node_idx].items.push(item_idx);
                return;
            }
            self.subdivide(node_idx, depth);
        }
        let octant = octant_for(self.nodes[node_idx].center, pos);
        let child = self.nodes[node_idx].children.expect("subdivided")[octant];
        self.insert(child as usize, item_idx, depth + 1);
    }

    fn subdivide(&mut self, node_idx: usize, depth: u32) {
        let center = self.nodes[node_idx].center;
        let h2 = self.nodes[node_idx].half / 2.0;
        let mut children = [0u32; 8];
        for (i, slot) in children.iter_mut().enumerate() {
            let offset = Vec3::new(
                if i & 1 != 0 { h2 } else { -h2 },
                if i & 2 != 0 { h2 } else { -h2 },
                if i & 4 != 0 { h2 } else { -h2 },
            );
            *slot = self.nodes.len() as u32;
            self.nodes.push(OctNode {
                center: center + offset,
                half: h2,
                items: SmallVec::new(),
                children: None,
            });
        }
        self.nodes[node_idx].children = Some(children);

        let existing = std::mem::take(&mut self.nodes[node_idx].items);
        for item_idx in existing {
            self.insert(node_idx, item_idx, depth);
        }
    }

    /// All items whose (effective) bounding sphere intersects the ray, within
    /// `max_dist`, sorted ascending by distance. The result buffer is pooled
    /// across calls and cleared on entry — clone it if it must outlive the
    /// next raycast.
    pub fn raycast(&mut self, origin: Vec3, dir: Vec3, max_dist: f32) -> &[RayHit] {
        self.hit_pool.clear();
        if self.nodes.is_empty() {
            return &self.hit_pool;
        }
        let inv = Vec3::new(
            if dir.x != 0.0 { 1.0 / dir.x } else { 1e12 },
            if dir.y != 0.0 { 1.0 / dir.y } else { 1e12 },
            if dir.z != 0.0 { 1.0 / dir.z } else { 1e12 },
        );
        // Manual stack instead of recursion: traversal order does not matter
        // because results are distance-sorted at the end.
        let mut stack: SmallVec<[u32; 32]> = SmallVec::new();
        stack.push(0);
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx as usize];
            if !slab_test(node.center, node.half * LOOSE_FACTOR, origin, inv, max_dist) {
                continue;
            }
            for &item_idx in &node.items {
                let item = &self.items[item_idx as usize];
                let hit_r = item.radius().max(MIN_HIT_RADIUS);
                if let Some(d) = ray_sphere_intersect(origin, dir, item.position(), hit_r) {
                    if d <= max_dist {
                        self.hit_pool.push(RayHit {
                            item: item_idx as usize,
                            dist: d,
                        });
                    }
                }
            }
            if let Some(children) = node.children {
                stack.extend_from_slice(&children);
            }
        }
        self.hit_pool.sort_by(|a, b| a.dist.total_cmp(&b.dist));
        &self.hit_pool
    }

    /// Items whose inflated bounding sphere touches the frustum. Conservative:
    /// may include items just outside, never misses one inside.
    pub fn query_frustum(&self, frustum: &Frustum) -> Vec<usize> {
        let mut out = Vec::new();
        if self.nodes.is_empty() {
            return out;
        }
        let mut stack: SmallVec<[u32; 32]> = SmallVec::new();
        stack.push(0);
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx as usize];
            let loose = Vec3::splat(node.half * LOOSE_FACTOR);
            if !frustum.intersects_aabb(node.center, loose) {
                continue;
            }
            for &item_idx in &node.items {
                let item = &self.items[item_idx as usize];
                if frustum.intersects_sphere(item.position(), item.radius() * 2.0) {
                    out.push(item_idx as usize);
                }
            }
            if let Some(children) = node.children {
                stack.extend_from_slice(&children);
            }
        }
        out
    }

    /// Items whose bounding sphere overlaps the query sphere.
    pub fn query_sphere(&self, center: Vec3, r: f32) -> Vec<usize> {
        let mut out = Vec::new();
        if self.nodes.is_empty() {
            return out;
        }
        let r2 = r * r;
        let mut stack: SmallVec<[u32; 32]> = SmallVec::new();
        stack.push(0);
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx as usize];
            let loose = node.half * LOOSE_FACTOR;
            let d = (center - node.center).abs() - Vec3::splat(loose);
            let d = d.max(Vec3::ZERO);
            if d.length_squared() > r2 {
                continue;
            }
            for &item_idx in &node.items {
                let item = &self.items[item_idx as usize];
                let reach = r + item.radius();
                if center.distance_squared(item.position()) <= reach * reach {
                    out.push(item_idx as usize);
                }
            }
            if let Some(children) = node.children {
                stack.extend_from_slice(&children);
            }
        }
        out
    }

    #[cfg(test)]
    fn max_depth(&self) -> u32 {
        fn walk(nodes: &[OctNode], idx: usize, depth: u32) -> u32 {
            match nodes[idx].children {
                None => depth,
                Some(children) => children
                    .iter()
                    .map(|&c| walk(nodes, c as usize, depth + 1))
                    .max()
                    .unwrap_or(depth),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0, 0)
        }
    }
}

fn octant_for(center: Vec3, pos: Vec3) -> usize {
    (if pos.x > center.x { 1 } else { 0 })
        | (if pos.y > center.y { 2 } else { 0 })
        | (if pos.z > center.z { 4 } else { 0 })
}

/// Ray vs axis-aligned cube (slab method). True when the ray enters the box
/// before `max_dist`.
fn slab_test(center: Vec3, half: f32, origin: Vec3, inv_dir: Vec3, max_dist: f32) -> bool {
    let lo = center - Vec3::splat(half);
    let hi = center + Vec3::splat(half);
    let t1 = (lo - origin) * inv_dir;
    let t2 = (hi - origin) * inv_dir;
    let tmin = t1.min(t2).max_element();
    let tmax = t1.max(t2).min_element();
    tmax >= 0.0 && tmin <= tmax && tmin <= max_dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[derive(Debug, Clone, Copy)]
    struct Ball {
        pos: Vec3,
        r: f32,
    }

    impl SpatialItem for Ball {
        fn position(&self) -> Vec3 {
            self.pos
        }
        fn radius(&self) -> f32 {
            self.r
        }
    }

    // Deterministic scatter without a rand dependency.
    fn scatter(n: usize, spread: f32) -> Vec<Ball> {
        let mut state = 0x2545_f491u64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 10_000) as f32 / 10_000.0
        };
        (0..n)
            .map(|_| Ball {
                pos: Vec3::new(
                    (next() - 0.5) * spread,
                    (next() - 0.5) * spread,
                    (next() - 0.5) * spread,
                ),
                r: 0.3 + next() * 2.0,
            })
            .collect()
    }

    fn brute_force_raycast(items: &[Ball], origin: Vec3, dir: Vec3, max_dist: f32) -> Vec<RayHit> {
        let mut hits: Vec<RayHit> = items
            .iter()
            .enumerate()
            .filter_map(|(i, b)| {
                ray_sphere_intersect(origin, dir, b.pos, b.r.max(MIN_HIT_RADIUS))
                    .filter(|&d| d <= max_dist)
                    .map(|d| RayHit { item: i, dist: d })
            })
            .collect();
        hits.sort_by(|a, b| a.dist.total_cmp(&b.dist));
        hits
    }

    #[test]
    fn raycast_matches_brute_force_exactly() {
        let items = scatter(300, 60.0);
        let mut tree = Octree::build(items.clone());

        let rays = [
            (Vec3::new(0.0, 0.0, 80.0), Vec3::NEG_Z),
            (Vec3::new(-70.0, 10.0, 5.0), Vec3::X),
            (Vec3::new(40.0, 50.0, 40.0), Vec3::new(-1.0, -1.0, -1.0).normalize()),
            (Vec3::new(3.0, 2.0, 1.0), Vec3::Y),
        ];
        for (origin, dir) in rays {
            let expected = brute_force_raycast(&items, origin, dir, 500.0);
            let got = tree.raycast(origin, dir, 500.0).to_vec();
            assert_eq!(got.len(), expected.len(), "hit count for ray {origin:?}");
            for (g, e) in got.iter().zip(expected.iter()) {
                assert_eq!(g.item, e.item);
                assert!((g.dist - e.dist).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn raycast_respects_max_distance() {
        let items = vec![
            Ball { pos: Vec3::new(0.0, 0.0, -10.0), r: 1.0 },
            Ball { pos: Vec3::new(0.0, 0.0, -50.0), r: 1.0 },
        ];
        let mut tree = Octree::build(items);
        let hits = tree.raycast(Vec3::ZERO, Vec3::NEG_Z, 20.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item, 0);
    }

    #[test]
    fn pooled_buffer_clears_between_calls() {
        let items = scatter(50, 30.0);
        let mut tree = Octree::build(items);
        let first = tree.raycast(Vec3::new(0.0, 0.0, 60.0), Vec3::NEG_Z, 500.0).len();
        // A ray pointing away from everything must not retain earlier hits.
        let empty = tree.raycast(Vec3::new(0.0, 0.0, 60.0), Vec3::Z, 500.0);
        assert!(empty.is_empty());
        let again = tree.raycast(Vec3::new(0.0, 0.0, 60.0), Vec3::NEG_Z, 500.0).len();
        assert_eq!(first, again);
    }

    #[test]
    fn clustered_input_caps_depth_and_stays_queryable() {
        // All items in one tiny cluster: every split lands them in the same
        // octant until the depth cap forces fat leaves.
        let items: Vec<Ball> = (0..200)
            .map(|i| Ball {
                pos: Vec3::new(10.0 + i as f32 * 1e-4, 10.0, 10.0),
                r: 0.5,
            })
            .collect();
        let tree = Octree::build(items.clone());
        assert!(tree.max_depth() <= MAX_DEPTH);
        for (i, b) in items.iter().enumerate() {
            let found = tree.query_sphere(b.pos, b.r);
            assert!(found.contains(&i), "item {i} retrievable by self-query");
        }
    }

    #[test]
    fn sphere_query_matches_brute_force() {
        let items = scatter(250, 80.0);
        let tree = Octree::build(items.clone());
        let center = Vec3::new(5.0, -3.0, 12.0);
        let r = 15.0;
        let mut got = tree.query_sphere(center, r);
        got.sort_unstable();
        let expected: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, b)| center.distance(b.pos) <= r + b.r)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn frustum_query_never_misses_contained_items() {
        let items = scatter(250, 80.0);
        let tree = Octree::build(items.clone());
        let proj = Mat4::perspective_rh(50f32.to_radians(), 16.0 / 9.0, 0.1, 500.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 90.0), Vec3::ZERO, Vec3::Y);
        let frustum = Frustum::from_view_projection(&(proj * view));

        let got: std::collections::HashSet<usize> =
            tree.query_frustum(&frustum).into_iter().collect();
        for (i, b) in items.iter().enumerate() {
            if frustum.contains_point(b.pos) {
                assert!(got.contains(&i), "item {i} inside frustum but culled");
            }
        }
    }

    #[test]
    fn empty_tree_answers_empty() {
        let mut tree: Octree<Ball> = Octree::build(Vec::new());
        assert!(tree.raycast(Vec3::ZERO, Vec3::Z, 100.0).is_empty());
        assert!(tree.query_sphere(Vec3::ZERO, 10.0).is_empty());
    }
}
