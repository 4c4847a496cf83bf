// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tractogram Index: a static 3D point index for streamline datasets.
//!
//! Tractogram Index answers "which points lie inside this volume" over the
//! shared point sequence of a fiber dataset.
//!
//! - Bulk-build a kd-tree or an octree from a point slice.
//! - Query with a box or an axis-aligned ellipsoid ([`Volume`]); results are the exact
//!   set of point indices strictly inside, never an approximation.
//! - Cast rays against boxes ([`ray_aabb`]) for picking.
//!
//! The index is immutable once built. Callers that move points (for example by
//! flipping an axis) must build a new index; there is no incremental update.
//!
//! It is generic over the scalar type `T` (`f32` or `f64`) and does not depend on any
//! geometry crate. Higher layers convert their vectors into `[T; 3]` arrays.
//!
//! # Example
//!
//! ```rust
//! use tractogram_index::{Aabb3D, Index, Volume};
//!
//! let points = [[0.0_f32, 0.0, 0.0], [1.0, 1.0, 1.0], [5.0, 5.0, 5.0]];
//! let idx = Index::<f32>::default().built(&points);
//!
//! let query = Volume::Box(Aabb3D::new(0.5, 0.5, 0.5, 6.0, 6.0, 6.0));
//! assert_eq!(idx.query_volume_sorted(&query), [1, 2]);
//! ```
//!
//! ## Choosing a backend
//!
//! - `KdTree` (default): median split on the widest axis; balanced regardless
//!   of how points cluster, which suits dense fiber bundles.
//! - `Octree`: regular cells; cheap to reason about and good when points fill
//!   the volume evenly.
//! - `FlatVec`: linear scan; the reference used to check the trees.
//!
//! Pick at runtime with [`Index::with_kind`] and [`IndexKind`].
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for coordinates.

#![no_std]

extern crate alloc;

pub mod backend;
pub mod backends;
pub mod index;
pub mod ray;
pub mod types;
pub mod volume;

pub use backend::{Backend, IndexConfig, TreeStats};
pub use backends::flatvec::FlatVec;
pub use backends::kdtree::{KdTree, KdTreeF32, KdTreeF64};
pub use backends::octree::{Octree, OctreeF32, OctreeF64};
pub use backends::{HybridBackend, IndexKind};
pub use index::{Index, IndexGeneric};
pub use ray::{Ray3D, RayHit, ray_aabb};
pub use types::{Aabb3D, Point3, Scalar};
pub use volume::Volume;
