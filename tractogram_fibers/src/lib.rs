// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tractogram Fibers: an in-memory tractography dataset.
//!
//! A [`Fibers`] store owns one shared point sequence and a line table of
//! cumulative offsets; every line is a contiguous range of points. On top of
//! that it keeps per-line length and flags, one color per point, and a lazily
//! built spatial index ([`PointIndex`]) for volume queries.
//!
//! - Load and save TrackVis, VTK (ASCII and binary), Camino, MRtrix, PTK,
//!   dMRI and plain-text fibers through one strategy table ([`formats`]).
//! - Color by direction, local direction, curvature, torsion, distance to
//!   anchors, a uniform color or the file's own colors ([`ColorationMode`]).
//! - Filter by length and subsampling bucket ([`FilterParams`]).
//! - Find the parts of lines crossing the slice planes ([`SlicePlanes`]).
//!
//! Loading never leaves a half-parsed dataset behind: parse errors are
//! returned and the previous dataset stays installed.
//!
//! # Example
//!
//! ```rust
//! use glam::Vec3;
//! use tractogram_fibers::{Fibers, FilterParams};
//! use tractogram_index::{Aabb3D, Volume};
//!
//! let mut fibers = Fibers::from_lines(vec![
//!     vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(4.0, 0.0, 0.0)],
//!     vec![Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 5.0, 0.0)],
//! ]);
//! assert_eq!(fibers.length(0), 4.0);
//!
//! let hits = fibers.lines_in_volume(&Volume::Box(Aabb3D::new(-1.0, -1.0, -1.0, 1.0, 1.0, 1.0)));
//! assert_eq!(hits, [true, false]);
//!
//! fibers.set_filter(FilterParams::length(2.0, 10.0)).unwrap();
//! assert_eq!(fibers.visible_lines(), [0]);
//! ```

pub mod coloring;
pub mod crossing;
pub mod error;
pub mod filter;
pub mod formats;
pub mod index_state;
pub mod store;
pub mod types;

pub use coloring::{ColorationMode, ramp};
pub use crossing::{CrossingFibers, CrossingRun, SlicePlanes, find_crossing_fibers};
pub use error::{FiberError, FormatError, IndexStateError, ParameterError};
pub use filter::FilterParams;
pub use formats::{ExportData, FiberFormat, ParsedFibers, PointScalars, detect_format};
pub use index_state::{IndexState, IndexStatus, PendingIndex, PointIndex};
pub use store::{Fibers, FibersConfig, SaveScope};
pub use types::{Axis, LineFlags, LineState, Rgb, VolumeGeometry};
