// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Kd-tree backend: median splits along the axis of greatest extent.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::backend::{Backend, IndexConfig, TreeStats};
use crate::types::{Aabb3D, Point3, Scalar, cmp_t};
use crate::volume::Volume;
use core::fmt::Debug;

/// A static kd-tree over points.
pub struct KdTree<T: Scalar> {
    config: IndexConfig,
    root: Option<NodeIdx>,
    arena: Vec<Node<T>>,
    len: usize,
}

enum Kind<T: Scalar> {
    Leaf(Vec<(usize, Point3<T>)>),
    Internal { left: NodeIdx, right: NodeIdx },
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

type KdItems<TS> = Vec<(usize, Point3<TS>)>;

impl<T: Scalar> Default for KdTree<T> {
    fn default() -> Self {
        Self::with_config(IndexConfig::default())
    }
}

impl<T: Scalar> KdTree<T> {
    /// Create an empty tree with explicit leaf size and depth cap.
    pub fn with_config(config: IndexConfig) -> Self {
        Self {
            config,
            root: None,
            arena: Vec::new(),
            len: 0,
        }
    }

    fn bbox_items(items: &[(usize, Point3<T>)]) -> Aabb3D<T> {
        let mut it = items.iter();
        let Some((_, first)) = it.next() else {
            return Aabb3D::from_point([T::zero(); 3]);
        };
        it.fold(Aabb3D::from_point(*first), |acc, (_, p)| acc.union_point(*p))
    }

    fn build_node(
        arena: &mut Vec<Node<T>>,
        mut items: KdItems<T>,
        depth: usize,
        config: &IndexConfig,
    ) -> NodeIdx {
        let bbox = Self::bbox_items(&items);
        let axis = bbox.largest_axis();
        let idx = NodeIdx::new(arena.len());
        // Coincident points have no extent to split; keep them together.
        if items.len() <= config.max_leaf.max(1)
            || depth >= config.max_depth
            || bbox.extent(axis) == T::zero()
        {
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
        let mid = items.len() / 2;
        items.select_nth_unstable_by(mid, |a, b| cmp_t(&a.1[axis], &b.1[axis]));
        let upper = items.split_off(mid);
        let left = Self::build_node(arena, items, depth + 1, config);
        let right = Self::build_node(arena, upper, depth + 1, config);
        arena[idx.get()].kind = Kind::Internal { left, right };
        idx
    }
}

impl<T: Scalar> Backend<T> for KdTree<T> {
    fn build(&mut self, points: &[Point3<T>]) {
        self.clear();
        self.len = points.len();
        if points.is_empty() {
            return;
        }
        let items: KdItems<T> = points.iter().copied().enumerate().collect();
        self.arena.reserve(2 * points.len() / self.config.max_leaf.max(1) + 1);
        self.root = Some(Self::build_node(&mut self.arena, items, 0, &self.config));
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
                Kind::Internal { left, right } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
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
                Kind::Internal { left, right } => {
                    stack.push(*left);
                    stack.push(*right);
                }
            }
        }
        Box::new(out.into_iter())
    }
}

impl<T: Scalar> Debug for KdTree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KdTree")
            .field("max_leaf", &self.config.max_leaf)
            .field("max_depth", &self.config.max_depth)
            .field("arena_nodes", &self.arena.len())
            .field("points", &self.len)
            .finish_non_exhaustive()
    }
}

/// Kd-tree with f32 coordinates.
pub type KdTreeF32 = KdTree<f32>;

/// Kd-tree with f64 coordinates.
pub type KdTreeF64 = KdTree<f64>;
