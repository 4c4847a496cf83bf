// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Octree backend: every internal node splits its cell into eight equal octants.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::backend::{Backend, IndexConfig, TreeStats};
use crate::types::{Aabb3D, Point3, Scalar, le};
use crate::volume::Volume;
use core::fmt::Debug;

/// A static octree over points.
///
/// Cells are cut at their center. A point on a cutting plane goes to the upper
/// octant, so each point lands in exactly one leaf. Node bounds are the tight
/// bounds of the points below them, which is never larger than the cell.
pub struct Octree<T: Scalar> {
    config: IndexConfig,
    root: Option<NodeIdx>,
    arena: Vec<Node<T>>,
    len: usize,
}

enum Kind<T: Scalar> {
    Leaf(Vec<(usize, Point3<T>)>),
    Internal { children: [Option<NodeIdx>; 8] },
}

struct Node<T: Scalar> {
    bbox: Aabb3D<T>,
    kind: Kind<T>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct NodeIdx(usize);

impl NodeIdx {
    const fn new(i: usize) -> Self {
        Self(i)
    }

    const fn get(self) -> usize {
        self.0
    }
}

type OctItems<TS> = Vec<(usize, Point3<TS>)>;

impl<T: Scalar> Default for Octree<T> {
    fn default() -> Self {
        Self::with_config(IndexConfig::default())
    }
}

impl<T: Scalar> Octree<T> {
    /// Create an empty tree with explicit leaf size and depth cap.
    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            config,
            root: None,
            arena: Vec::new(),
            len: 0,
        }
    }

    fn octant_of(center: &Point3<T>, p: &Point3<T>) -> usize {
        let mut i = 0;
        for axis in 0..3 {
            if le(center[axis], p[axis]) {
                i |= 1 << axis;
            }
        }
        i
    }

    fn build_node(
        arena: &mut Vec<Node<T>>,
        cell: Aabb3D<T>,
        items: OctItems<T>,
        depth: usize,
        config: &IndexConfig,
    ) -> NodeIdx {
        let bbox = Aabb3D::from_points(items.iter().map(|(_, p)| p))
            .unwrap_or_else(|| Aabb3D::from_point(cell.center()));
        let idx = NodeIdx::new(arena.len());
        let degenerate = (0..3).all(|axis| bbox.extent(axis) == T::zero());
        if items.len() <= config.max_leaf.max(1) || depth >= config.max_depth || degenerate {
            arena.push(Node {
                bbox,
                kind: Kind::Leaf(items),
            });
            return idx;
        }
        arena.push(Node {
            bbox,
            kind: Kind::Leaf(Vec::new()),
        });
        let center = cell.center();
        let mut buckets: [OctItems<T>; 8] = Default::default();
        for item in items {
            buckets[Self::octant_of(&center, &item.1)].push(item);
        }
        let mut children = [None; 8];
        for (i, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            children[i] = Some(Self::build_node(
                arena,
                cell.octant(i),
                bucket,
                depth + 1,
                config,
            ));
        }
        arena[idx.get()].kind = Kind::Internal { children };
        idx
    }

    /// Cubic root cell enclosing `bounds`, so octants stay cubes.
    fn root_cell(bounds: &Aabb3D<T>) -> Aabb3D<T> {
        let mut side = bounds.extent(0);
        for axis in 1..3 {
            let e = bounds.extent(axis);
            if side < e {
                side = e;
            }
        }
        Aabb3D::from_center_size(bounds.center(), [side; 3])
    }
}

impl<T: Scalar> Backend<T> for Octree<T> {
    fn build(&mut self, points: &[Point3<T>]) {
        self.clear();
        self.len = points.len();
        let Some(bounds) = Aabb3D::from_points(points) else {
            return;
        };
        let items: OctItems<T> = points.iter().copied().enumerate().collect();
        let cell = Self::root_cell(&bounds);
        self.root = Some(Self::build_node(&mut self.arena, cell, items, 0, &self.config));
    }

    fn clear(&mut self) {
        self.root = None;
        self.arena.clear();
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }

    fn bounds(&self) -> Option<Aabb3D<T>> {
        self.root.map(|r| self.arena[r.get()].bbox)
    }

    fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let Some(root) = self.root else {
            return stats;
        };
        let mut stack = vec![(root, 0_usize)];
        while let Some((i, depth)) = stack.pop() {
            stats.nodes += 1;
            match &self.arena[i.get()].kind {
                Kind::Leaf(_) => {
                    stats.leaves += 1;
                    stats.max_depth = stats.max_depth.max(depth);
                }
                Kind::Internal { children } => {
                    stack.extend(children.iter().flatten().map(|c| (*c, depth + 1)));
                }
            }
        }
        stats
    }

    fn query_volume<'a>(&'a self, volume: &Volume<T>) -> Box<dyn Iterator<Item = usize> + 'a> {
        let mut out = Vec::new();
        let Some(root_idx) = self.root else {
            return Box::new(out.into_iter());
        };
        let mut stack = vec![root_idx];
        while let Some(i) = stack.pop() {
            let n = &self.arena[i.get()];
            if !volume.intersects_aabb(&n.bbox) {
                continue;
            }
            match &n.kind {
                Kind::Leaf(items) => {
                    for (s, p) in items {
                        if volume.contains_point(*p) {
                            out.push(*s);
                        }
                    }
                }
                Kind::Internal { children } => {
                    stack.extend(children.iter().flatten().copied());
                }
            }
        }
        Box::new(out.into_iter())
    }
}

impl<T: Scalar> Debug for Octree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Octree")
            .field("max_leaf", &self.config.max_leaf)
            .field("max_depth", &self.config.max_depth)
            .field("arena_nodes", &self.arena.len())
            .field("points", &self.len)
            .finish_non_exhaustive()
    }
}

/// Octree with f32 coordinates.
pub type OctreeF32 = Octree<f32>;

/// Octree with f64 coordinates.
pub type OctreeF64 = Octree<f64>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::flatvec::FlatVec;
    use crate::backends::test_support::{scatter, sorted};

    #[test]
    fn matches_linear_scan_on_scatter() {
        let pts = scatter(3_000, 11);
        let mut tree = Octree::<f32>::default();
        tree.build(&pts);
        let mut flat = FlatVec::<f32>::default();
        flat.build(&pts);

        let queries = [
            Volume::Box(Aabb3D::new(0.0, 0.0, 0.0, 50.0, 50.0, 50.0)),
            Volume::Box(Aabb3D::new(49.0, 20.0, 70.0, 51.0, 80.0, 99.0)),
            Volume::Ellipsoid {
                center: [25.0, 75.0, 40.0],
                radii: [10.0, 10.0, 40.0],
            },
        ];
        for q in &queries {
            assert_eq!(
                sorted(tree.query_volume(q)),
                sorted(flat.query_volume(q)),
                "octree must return exactly the scanned set for {q:?}"
            );
        }
    }

    #[test]
    fn every_point_lands_in_exactly_one_leaf() {
        let pts = scatter(1_000, 3);
        let mut tree = Octree::<f32>::with_config(IndexConfig {
            max_leaf: 4,
            max_depth: 12,
        });
        tree.build(&pts);
        let mut seen = vec![0_u32; pts.len()];
        for node in &tree.arena {
            if let Kind::Leaf(items) = &node.kind {
                for (s, _) in items {
                    seen[*s] += 1;
                }
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn collinear_fiber_terminates() {
        let mut pts: Vec<[f32; 3]> = (0..2_000).map(|i| [0.0, 0.0, i as f32 * 0.01]).collect();
        pts.extend(core::iter::repeat_n([5.0, 5.0, 5.0], 500));
        let mut tree = Octree::<f32>::default();
        tree.build(&pts);
        assert!(tree.stats().max_depth <= IndexConfig::default().max_depth);
        let q = Volume::Box(Aabb3D::new(4.0, 4.0, 4.0, 6.0, 6.0, 6.0));
        assert_eq!(tree.query_volume(&q).count(), 500);
    }
}
