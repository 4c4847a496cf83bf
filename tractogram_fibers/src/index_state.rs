// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spatial index lifecycle: stale, building on a worker thread, or ready.
//!
//! A worker sends its finished index through a single-slot channel. The owner
//! observes completion only at explicit synchronization points ([`IndexState::poll`]
//! once per frame, or [`IndexState::wait`] before a structural change), so no
//! partially built index is ever visible.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use glam::Vec3;
use tractogram_index::{Index, IndexConfig, IndexKind};

use crate::error::IndexStateError;

/// The point index type used by the store.
pub type PointIndex = Index<f32>;

/// How to build an index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct BuildParams {
    pub(crate) kind: IndexKind,
    pub(crate) config: IndexConfig,
}

/// Externally visible phase of the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexStatus {
    /// Points changed since the last build; the next query rebuilds.
    Stale,
    /// A worker is building; queries block or fail until it is observed.
    Building,
    /// Queries run against an index of the current points.
    Ready,
}

fn build_now(points: &[[f32; 3]], params: BuildParams) -> PointIndex {
    let started = Instant::now();
    let index = Index::<f32>::with_kind(params.kind, params.config).built(points);
    let stats = index.stats();
    tracing::debug!(
        kind = ?params.kind,
        points = points.len(),
        nodes = stats.nodes,
        leaves = stats.leaves,
        depth = stats.max_depth,
        elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
        "spatial index built"
    );
    index
}

fn as_arrays(points: &[Vec3]) -> Vec<[f32; 3]> {
    points.iter().map(|p| p.to_array()).collect()
}

/// A build running on a worker thread.
#[derive(Debug)]
pub struct PendingIndex {
    rx: Receiver<PointIndex>,
    handle: Option<JoinHandle<()>>,
}

enum Poll {
    Pending,
    Done(PointIndex),
    Failed,
}

impl PendingIndex {
    fn spawn(points: Vec<[f32; 3]>, params: BuildParams) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::sync_channel(1);
        let handle = thread::Builder::new()
            .name("fiber-index".into())
            .spawn(move || {
                // The receiver may be gone if the store was dropped mid-build.
                let _ = tx.send(build_now(&points, params));
            })?;
        Ok(Self {
            rx,
            handle: Some(handle),
        })
    }

    fn join(&mut self) {
        if let Some(h) = self.handle.take()
            && h.join().is_err()
        {
            tracing::warn!("index worker panicked");
        }
    }

    fn try_finish(&mut self) -> Poll {
        match self.rx.try_recv() {
            Ok(index) => {
                self.join();
                Poll::Done(index)
            }
            Err(TryRecvError::Empty) => Poll::Pending,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Poll::Failed
            }
        }
    }

    fn wait(mut self) -> Option<PointIndex> {
        let out = self.rx.recv().ok();
        self.join();
        out
    }
}

/// Where the store's spatial index is in its lifecycle.
#[derive(Debug, Default)]
pub enum IndexState {
    /// No index of the current points exists.
    #[default]
    Stale,
    /// A worker is building one.
    Building(PendingIndex),
    /// An index of the current points.
    Ready(Arc<PointIndex>),
}

impl IndexState {
    /// Phase without the payload.
    pub fn status(&self) -> IndexStatus {
        match self {
            Self::Stale => IndexStatus::Stale,
            Self::Building(_) => IndexStatus::Building,
            Self::Ready(_) => IndexStatus::Ready,
        }
    }

    /// Start a background build when stale. Falls back to building inline if
    /// the worker cannot be spawned.
    pub(crate) fn start(&mut self, points: &[Vec3], params: BuildParams) {
        if !matches!(self, Self::Stale) {
            return;
        }
        match PendingIndex::spawn(as_arrays(points), params) {
            Ok(pending) => {
                tracing::debug!(points = points.len(), "background index build started");
                *self = Self::Building(pending);
            }
            Err(e) => {
                tracing::warn!("cannot spawn index worker ({e}); building inline");
                *self = Self::Ready(Arc::new(build_now(&as_arrays(points), params)));
            }
        }
    }

    /// Observe a finished background build, without blocking.
    pub(crate) fn poll(&mut self, points: &[Vec3], params: BuildParams) -> IndexStatus {
        if let Self::Building(pending) = self {
            match pending.try_finish() {
                Poll::Pending => {}
                Poll::Done(index) => *self = Self::Ready(Arc::new(index)),
                Poll::Failed => {
                    tracing::warn!("index worker exited without a result; building inline");
                    *self = Self::Ready(Arc::new(build_now(&as_arrays(points), params)));
                }
            }
        }
        self.status()
    }

    /// Block until no build is in flight.
    pub(crate) fn wait(&mut self, points: &[Vec3], params: BuildParams) {
        if matches!(self, Self::Building(_)) {
            let Self::Building(pending) = std::mem::take(self) else {
                return;
            };
            *self = match pending.wait() {
                Some(index) => Self::Ready(Arc::new(index)),
                None => {
                    tracing::warn!("index worker exited without a result; building inline");
                    Self::Ready(Arc::new(build_now(&as_arrays(points), params)))
                }
            };
        }
    }

    /// A ready index, waiting for or running a build as needed.
    pub(crate) fn ensure_ready(&mut self, points: &[Vec3], params: BuildParams) -> Arc<PointIndex> {
        self.wait(points, params);
        if let Self::Ready(index) = self {
            return Arc::clone(index);
        }
        let index = Arc::new(build_now(&as_arrays(points), params));
        *self = Self::Ready(Arc::clone(&index));
        index
    }

    /// The ready index, or why there is none.
    pub(crate) fn try_ready(&self) -> Result<Arc<PointIndex>, IndexStateError> {
        match self {
            Self::Ready(index) => Ok(Arc::clone(index)),
            Self::Building(_) => Err(IndexStateError::Building),
            Self::Stale => Err(IndexStateError::Stale),
        }
    }

    /// Drop the index after the points changed. Waits out an in-flight build
    /// first so its worker never outlives the points it was given; its result,
    /// or its failure, is discarded.
    pub(crate) fn invalidate(&mut self) {
        if let Self::Building(pending) = std::mem::take(self) {
            let _ = pending.wait();
        }
    }
}
