// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for different spatial strategies.
//!
//! - `flatvec`: flat vector with linear scans (small, simple, exact reference).
//! - `kdtree`: median split along the axis of greatest extent.
//! - `octree`: eight equal octants per internal node.
//! - [`HybridBackend`]: one of the above, chosen at runtime through [`IndexKind`].
//!
//! Termination note
//! ----------------
//! Both trees stop splitting when a node holds at most `max_leaf` points, when
//! its points have zero extent, or when `max_depth` is reached. The depth cap is
//! what bounds recursion on degenerate input (coincident or collinear points).

pub mod flatvec;
pub mod kdtree;
pub mod octree;

use alloc::boxed::Box;

use crate::backend::{Backend, IndexConfig, TreeStats};
use crate::types::{Aabb3D, Point3, Scalar};
use crate::volume::Volume;

pub use kdtree::{KdTreeF32, KdTreeF64};
pub use octree::{OctreeF32, OctreeF64};

/// Which spatial structure a [`HybridBackend`] uses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Binary kd-tree.
    #[default]
    KdTree,
    /// Eight-way octree.
    Octree,
    /// Linear scan.
    FlatVec,
}

/// Backend selected at runtime.
#[derive(Debug)]
pub enum HybridBackend<T: Scalar> {
    /// Kd-tree variant.
    KdTree(kdtree::KdTree<T>),
    /// Octree variant.
    Octree(octree::Octree<T>),
    /// Linear scan variant.
    FlatVec(flatvec::FlatVec<T>),
}

impl<T: Scalar> HybridBackend<T> {
    /// Create an empty backend of the given kind.
    pub fn new(kind: IndexKind, config: IndexConfig) -> Self {
        match kind {
            IndexKind::KdTree => Self::KdTree(kdtree::KdTree::with_config(config)),
            IndexKind::Octree => Self::Octree(octree::Octree::with_config(config)),
            IndexKind::FlatVec => Self::FlatVec(flatvec::FlatVec::default()),
        }
    }

    /// The kind of structure in use.
    pub fn kind(&self) -> IndexKind {
        match self {
            Self::KdTree(_) => IndexKind::KdTree,
            Self::Octree(_) => IndexKind::Octree,
            Self::FlatVec(_) => IndexKind::FlatVec,
        }
    }

    fn inner(&self) -> &dyn Backend<T> {
        match self {
            Self::KdTree(b) => b,
            Self::Octree(b) => b,
            Self::FlatVec(b) => b,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Backend<T> {
        match self {
            Self::KdTree(b) => b,
            Self::Octree(b) => b,
            Self::FlatVec(b) => b,
        }
    }
}

impl<T: Scalar> Default for HybridBackend<T> {
    fn default() -> Self {
        Self::new(IndexKind::default(), IndexConfig::default())
    }
}

impl<T: Scalar> Backend<T> for HybridBackend<T> {
    fn build(&mut self, points: &[Point3<T>]) {
        self.inner_mut().build(points);
    }

    fn clear(&mut self) {
        self.inner_mut().clear();
    }

    fn len(&self) -> usize {
        self.inner().len()
    }

    fn bounds(&self) -> Option<Aabb3D<T>> {
        self.inner().bounds()
    }

    fn stats(&self) -> TreeStats {
        self.inner().stats()
    }

    fn query_volume<'a>(&'a self, volume: &Volume<T>) -> Box<dyn Iterator<Item = usize> + 'a> {
        self.inner().query_volume(volume)
    }
}
