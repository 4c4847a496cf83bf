// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `Index` API and generic implementation over a pluggable backend.

use alloc::vec::Vec;

use crate::backend::{Backend, IndexConfig, TreeStats};
use crate::backends::flatvec::FlatVec;
use crate::backends::kdtree::KdTree;
use crate::backends::octree::Octree;
use crate::backends::{HybridBackend, IndexKind};
use crate::types::{Aabb3D, Point3, Scalar};
use crate::volume::Volume;

/// A static point index parameterized by a spatial backend.
///
/// The index is built once from a point slice. It has no update operations:
/// when the points move, build a new index.
#[derive(Debug)]
pub struct IndexGeneric<T: Scalar, B: Backend<T>> {
    backend: B,
    _t: core::marker::PhantomData<T>,
}

impl<T, B> IndexGeneric<T, B>
where
    T: Scalar,
    B: Backend<T> + Default,
{
    /// Create an empty index using the backend's default constructor.
    pub fn new() -> Self {
        Self::with_backend(B::default())
    }
}

impl<T, B> IndexGeneric<T, B>
where
    T: Scalar,
    B: Backend<T>,
{
    /// Wrap an (empty or built) backend.
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            _t: core::marker::PhantomData,
        }
    }

    /// Rebuild from `points`; point `i` is reported as index `i`.
    pub fn build(&mut self, points: &[Point3<T>]) {
        self.backend.build(points);
    }

    /// Builder-style [`IndexGeneric::build`].
    #[must_use]
    pub fn built(mut self, points: &[Point3<T>]) -> Self {
        self.build(points);
        self
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        self.backend.clear();
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// Whether no point is indexed.
    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    /// Bounds of all indexed points.
    pub fn bounds(&self) -> Option<Aabb3D<T>> {
        self.backend.bounds()
    }

    /// Shape summary of the underlying structure.
    pub fn stats(&self) -> TreeStats {
        self.backend.stats()
    }

    /// Access the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Indices of points strictly inside `volume`, in no particular order.
    pub fn query_volume(&self, volume: &Volume<T>) -> impl Iterator<Item = usize> + '_ {
        self.backend.query_volume(volume)
    }

    /// Indices of points strictly inside `volume`, ascending.
    pub fn query_volume_sorted(&self, volume: &Volume<T>) -> Vec<usize> {
        let mut out: Vec<usize> = self.backend.query_volume(volume).collect();
        out.sort_unstable();
        out
    }
}

impl<T: Scalar, B: Backend<T> + Default> Default for IndexGeneric<T, B> {
    fn default() -> Self {
        Self::new()
    }
}

/// Default index using the runtime-selectable backend (kd-tree unless told otherwise).
pub type Index<T> = IndexGeneric<T, HybridBackend<T>>;

impl<T: Scalar> Index<T> {
    /// Create an index of the given kind and tuning.
    pub fn with_kind(kind: IndexKind, config: IndexConfig) -> Self {
        Self::with_backend(HybridBackend::new(kind, config))
    }

    /// Create a kd-tree-backed index.
    pub fn with_kdtree() -> IndexGeneric<T, KdTree<T>> {
        IndexGeneric::new()
    }

    /// Create an octree-backed index.
    pub fn with_octree() -> IndexGeneric<T, Octree<T>> {
        IndexGeneric::new()
    }

    /// Create a linear-scan index.
    pub fn with_flatvec() -> IndexGeneric<T, FlatVec<T>> {
        IndexGeneric::new()
    }

    /// Which structure this index uses.
    pub fn kind(&self) -> IndexKind {
        self.backend.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_support::scatter;

    #[test]
    fn every_kind_agrees() {
        let pts = scatter(1_500, 42);
        let q = Volume::Box(Aabb3D::new(20.0, 30.0, 0.0, 60.0, 70.0, 45.0));
        let reference = Index::<f32>::with_flatvec().built(&pts).query_volume_sorted(&q);
        assert!(!reference.is_empty());
        for kind in [IndexKind::KdTree, IndexKind::Octree, IndexKind::FlatVec] {
            let idx = Index::<f32>::with_kind(kind, IndexConfig::default()).built(&pts);
            assert_eq!(idx.kind(), kind);
            assert_eq!(idx.len(), pts.len());
            assert_eq!(idx.query_volume_sorted(&q), reference, "{kind:?} disagrees");
        }
    }

    #[test]
    fn rebuild_replaces_content() {
        let mut idx: Index<f64> = Index::default();
        idx.build(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
        let q = Volume::Box(Aabb3D::new(0.5, 0.5, 0.5, 2.0, 2.0, 2.0));
        assert_eq!(idx.query_volume_sorted(&q), [1]);
        idx.build(&[[-1.0, -1.0, -1.0]]);
        assert!(idx.query_volume_sorted(&q).is_empty());
        assert_eq!(idx.len(), 1);
        idx.clear();
        assert!(idx.is_empty());
    }
}
