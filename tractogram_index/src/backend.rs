// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend trait for spatial indexing implementations.

use alloc::boxed::Box;

use crate::types::{Aabb3D, Point3, Scalar};
use crate::volume::Volume;
use core::fmt::Debug;

/// Build-time tuning shared by the tree backends.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IndexConfig {
    /// A node holding at most this many points becomes a leaf.
    pub max_leaf: usize,
    /// Hard cap on tree depth; nodes at this depth are always leaves.
    pub max_depth: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_leaf: 16,
            max_depth: 32,
        }
    }
}

/// Shape summary of a built structure.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Total number of nodes.
    pub nodes: usize,
    /// Number of leaf nodes.
    pub leaves: usize,
    /// Deepest leaf (root is depth 0).
    pub max_depth: usize,
}

/// Spatial backend abstraction used by `IndexGeneric`.
///
/// Backends are bulk-built from a point slice and immutable afterwards; any
/// change to the points requires a fresh [`Backend::build`].
pub trait Backend<T: Scalar>: Debug {
    /// Replace the content with `points`; point `i` is reported as slot `i`.
    fn build(&mut self, points: &[Point3<T>]);

    /// Clear all spatial structures.
    fn clear(&mut self);

    /// Number of indexed points.
    fn len(&self) -> usize;

    /// Whether no point is indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounds of all indexed points.
    fn bounds(&self) -> Option<Aabb3D<T>>;

    /// Shape summary of the structure.
    fn stats(&self) -> TreeStats;

    /// Query slots whose point lies strictly inside the volume.
    fn query_volume<'a>(&'a self, volume: &Volume<T>) -> Box<dyn Iterator<Item = usize> + 'a>;
}
