// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy for loading, saving, querying and parameter changes.

use std::io;
use std::path::PathBuf;

use crate::formats::FiberFormat;

/// A file could not be interpreted as fiber data.
///
/// Parsers return this as soon as a check fails; nothing from a failed parse is
/// ever installed in a [`Fibers`](crate::Fibers) store.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Neither the header bytes nor the extension identify a known format.
    #[error("unrecognized fiber file format: {0}")]
    UnknownFormat(String),

    /// Magic bytes, version or a header field is wrong.
    #[error("{format}: bad header: {reason}")]
    BadHeader {
        /// Format being parsed.
        format: FiberFormat,
        /// What was wrong.
        reason: String,
    },

    /// The data ends before the declared content does.
    #[error("{format}: truncated: {detail}")]
    Truncated {
        /// Format being parsed.
        format: FiberFormat,
        /// What was expected when the data ran out.
        detail: String,
    },

    /// Declared counts disagree with each other or with the data.
    #[error("{format}: inconsistent counts: {reason}")]
    InconsistentCounts {
        /// Format being parsed.
        format: FiberFormat,
        /// Which counts disagree.
        reason: String,
    },

    /// A value could not be decoded.
    #[error("{format}: malformed data: {reason}")]
    Malformed {
        /// Format being parsed.
        format: FiberFormat,
        /// What could not be decoded.
        reason: String,
    },

    /// Valid file using a feature this crate does not read.
    #[error("{format}: unsupported: {reason}")]
    Unsupported {
        /// Format being parsed.
        format: FiberFormat,
        /// The unsupported feature.
        reason: String,
    },
}

/// A spatial index query was attempted while no valid index exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IndexStateError {
    /// The points changed since the last build.
    #[error("spatial index is stale and must be rebuilt")]
    Stale,
    /// A background build has not reported completion yet.
    #[error("spatial index build is still in progress")]
    Building,
}

/// A parameter was rejected before touching any state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    /// `min` is greater than `max`.
    #[error("{name}: min {min} exceeds max {max}")]
    InvertedRange {
        /// Parameter pair name.
        name: &'static str,
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },

    /// A size, extent or count that must be positive was not.
    #[error("{name} must be positive, got {value}")]
    NonPositive {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f32,
    },

    /// A value outside its allowed range.
    #[error("{name} out of range: {value}")]
    OutOfRange {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f32,
    },

    /// A line pointer table that does not describe the point sequence.
    #[error("invalid line table: {0}")]
    LineTable(String),
}

/// Any failure surfaced by the fiber store.
#[derive(Debug, thiserror::Error)]
pub enum FiberError {
    /// The file content is not valid fiber data.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The path could not be read or written.
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A query met an index that is not ready.
    #[error(transparent)]
    IndexState(#[from] IndexStateError),

    /// A parameter was rejected.
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}
