// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Volume composition: turns the selection set into per-line inclusion and
//! hands it to the fiber store.

use std::time::Instant;

use glam::Vec3;
use tractogram_fibers::Fibers;

use crate::set::SelectionSet;
use crate::types::CompositionMode;

/// Selection state of one line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SelectionState {
    /// Not evaluated since the last load or invalidation.
    #[default]
    Unknown,
    /// The composed volumes keep the line.
    Included,
    /// The composed volumes drop the line.
    Excluded,
}

/// Outcome of one evaluation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Active volumes that were composed.
    pub volumes: usize,
    /// Lines kept by composition alone.
    pub included: usize,
    /// Lines visible after scalar filters and inversion.
    pub visible: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Revisions {
    selection: u64,
    structure: u64,
    filter: u64,
}

impl Revisions {
    fn of(fibers: &Fibers, set: &SelectionSet) -> Self {
        Self {
            selection: set.revision(),
            structure: fibers.structure_revision(),
            filter: fibers.filter_revision(),
        }
    }
}

/// Composes selection volumes in creation order.
///
/// - With no active `Add` volume every line starts included; otherwise the
///   running set starts empty.
/// - `Add` unions its lines, except those an earlier `AndNot` vetoed.
/// - `Subtract` removes its lines.
/// - `AndNot` removes its lines and vetoes them for the rest of the pass.
///
/// The result is written to the store in one call together with the anchors
/// for distance coloring (the centers of active `Add` volumes), so the store
/// never shows a half-applied selection.
#[derive(Clone, Debug, Default)]
pub struct SelectionPipeline {
    states: Vec<SelectionState>,
    seen: Option<Revisions>,
}

impl SelectionPipeline {
    /// Create a pipeline that has not evaluated anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the set or the store changed since the last evaluation.
    pub fn is_dirty(&self, fibers: &Fibers, set: &SelectionSet) -> bool {
        self.seen != Some(Revisions::of(fibers, set))
    }

    /// Evaluate if anything changed since the last evaluation.
    ///
    /// Returns `None` when the cached result is still current.
    pub fn refresh(&mut self, fibers: &mut Fibers, set: &SelectionSet) -> Option<RefreshSummary> {
        if !self.is_dirty(fibers, set) {
            return None;
        }
        Some(self.evaluate(fibers, set))
    }

    /// Compose every active volume and install the result.
    ///
    /// Builds (or waits for) the store's spatial index when it is not ready.
    pub fn evaluate(&mut self, fibers: &mut Fibers, set: &SelectionSet) -> RefreshSummary {
        let started = Instant::now();
        let n = fibers.line_count();
        let mut included = vec![!set.has_active_add(); n];
        let mut vetoed = vec![false; n];
        let mut anchors: Vec<Vec3> = Vec::new();
        let mut volumes = 0;

        for (_, volume) in set.active() {
            volumes += 1;
            let hits = fibers.lines_in_volume(&volume.to_query());
            let lines = hits.iter().enumerate().filter(|(_, hit)| **hit).map(|(l, _)| l);
            match volume.mode {
                CompositionMode::Add => {
                    anchors.push(volume.center);
                    for line in lines {
                        if !vetoed[line] {
                            included[line] = true;
                        }
                    }
                }
                CompositionMode::Subtract => {
                    for line in lines {
                        included[line] = false;
                    }
                }
                CompositionMode::AndNot => {
                    for line in lines {
                        included[line] = false;
                        vetoed[line] = true;
                    }
                }
            }
        }

        self.states = included
            .iter()
            .map(|&inc| {
                if inc {
                    SelectionState::Included
                } else {
                    SelectionState::Excluded
                }
            })
            .collect();
        let kept = included.iter().filter(|&&inc| inc).count();

        self.commit(fibers, set, included, anchors);

        let summary = RefreshSummary {
            volumes,
            included: kept,
            visible: fibers.visible_lines().len(),
        };
        tracing::debug!(
            volumes = summary.volumes,
            included = summary.included,
            visible = summary.visible,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "selection evaluated"
        );
        summary
    }

    /// Hand the composed lines to the store. The result is only remembered
    /// once the store accepted it, so a rejected selection is retried on the
    /// next [`refresh`](Self::refresh).
    fn commit(
        &mut self,
        fibers: &mut Fibers,
        set: &SelectionSet,
        included: Vec<bool>,
        anchors: Vec<Vec3>,
    ) -> bool {
        match fibers.apply_selection(included, anchors) {
            Ok(()) => {
                self.seen = Some(Revisions::of(fibers, set));
                true
            }
            Err(err) => {
                tracing::warn!(%err, "selection not applied");
                self.seen = None;
                false
            }
        }
    }

    /// Forget the last result; the next [`refresh`](Self::refresh) evaluates.
    pub fn invalidate(&mut self) {
        self.states.clear();
        self.seen = None;
    }

    /// State of `line` after the last evaluation.
    pub fn line_state(&self, line: usize) -> SelectionState {
        self.states.get(line).copied().unwrap_or_default()
    }

    /// States of every line after the last evaluation.
    pub fn line_states(&self) -> &[SelectionState] {
        &self.states
    }
}
