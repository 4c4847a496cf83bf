// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tractogram Selection: selection volumes over a fiber dataset.
//!
//! Users place boxes and ellipsoids in the scene; each one selects the fibers
//! with at least one point strictly inside it. This crate keeps those volumes
//! and composes them into the per-line visibility of a
//! [`Fibers`](tractogram_fibers::Fibers) store.
//!
//! - [`SelectionSet`]: volumes behind generational [`VolumeId`] handles, in
//!   creation order, with ray picking and dragging.
//! - [`SelectionPipeline`]: composes active volumes with their
//!   [`CompositionMode`] and installs the result in the store.
//! - [`RayCaster`]: the screen-to-ray mapping the host viewer supplies.
//!
//! ## Composition
//!
//! Volumes compose in creation order. `Add` unions, `Subtract` removes and
//! `AndNot` removes and vetoes any later `Add`. When no `Add` volume is active
//! every line starts included. Scalar filters from the store apply on top.
//!
//! # Example
//!
//! ```rust
//! use glam::Vec3;
//! use tractogram_fibers::Fibers;
//! use tractogram_selection::{CompositionMode, SelectionPipeline, SelectionSet, SelectionVolume};
//!
//! let mut fibers = Fibers::from_lines(vec![
//!     vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)],
//!     vec![Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 5.0, 0.0)],
//! ]);
//!
//! let mut set = SelectionSet::new();
//! set.insert(SelectionVolume::cuboid(Vec3::new(0.5, 2.5, 0.0), Vec3::new(2.0, 8.0, 2.0)))
//!     .unwrap();
//! let veto = SelectionVolume::ellipsoid(Vec3::new(0.5, 5.0, 0.0), Vec3::splat(3.0))
//!     .with_mode(CompositionMode::Subtract);
//! set.insert(veto).unwrap();
//!
//! let mut pipeline = SelectionPipeline::new();
//! assert!(pipeline.refresh(&mut fibers, &set).is_some());
//! assert_eq!(fibers.visible_lines(), [0]);
//!
//! // Nothing changed, nothing to do.
//! assert!(pipeline.refresh(&mut fibers, &set).is_none());
//! ```

pub mod pipeline;
pub mod raycast;
pub mod set;
pub mod types;

pub use pipeline::{RefreshSummary, SelectionPipeline, SelectionState};
pub use raycast::{OrthoCaster, RayCaster};
pub use set::{SelectionSet, VolumeHit};
pub use types::{
    CompositionMode, SelectionVolume, VolumeFlags, VolumeId, VolumeShape, ray_ellipsoid,
};
