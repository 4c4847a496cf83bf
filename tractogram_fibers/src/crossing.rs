// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Crossing-fiber query: the parts of each line that pass through the
//! displayed slice planes.

use glam::Vec3;

use crate::error::ParameterError;
use crate::types::Axis;

/// The three orthogonal slice planes and which of them are shown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlicePlanes {
    /// Intersection point of the planes (x = sagittal, y = coronal, z = axial).
    pub position: Vec3,
    /// Plane of constant z.
    pub axial: bool,
    /// Plane of constant y.
    pub coronal: bool,
    /// Plane of constant x.
    pub sagittal: bool,
    /// Half-width of the slab around each plane.
    pub thickness: f32,
}

impl Default for SlicePlanes {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            axial: true,
            coronal: true,
            sagittal: true,
            thickness: 1.0,
        }
    }
}

impl SlicePlanes {
    /// Shown planes as axes.
    pub fn shown(&self) -> impl Iterator<Item = Axis> + '_ {
        Axis::ALL.into_iter().filter(|a| match a {
            Axis::X => self.sagittal,
            Axis::Y => self.coronal,
            Axis::Z => self.axial,
        })
    }

    /// Reject a negative or NaN thickness.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.thickness.is_nan() || self.thickness < 0.0 {
            return Err(ParameterError::OutOfRange {
                name: "thickness",
                value: self.thickness,
            });
        }
        Ok(())
    }
}

/// A run of consecutive points of one line around one plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrossingRun {
    /// Owning line.
    pub line: usize,
    /// Plane normal.
    pub axis: Axis,
    /// First point (global index).
    pub start: usize,
    /// Number of points.
    pub count: usize,
}

/// Result of [`find_crossing_fibers`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CrossingFibers {
    /// Runs ordered by axis, then line, then start.
    pub runs: Vec<CrossingRun>,
}

impl CrossingFibers {
    /// Distinct lines with at least one run, ascending.
    pub fn lines(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self.runs.iter().map(|r| r.line).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// `(start, count)` draw ranges, one per run.
    pub fn draw_ranges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.runs.iter().map(|r| (r.start, r.count))
    }
}

/// Find maximal runs of points near a shown plane that include a segment
/// crossing (or touching) it.
///
/// A point belongs to a run when it lies within `thickness` of the plane or
/// is an endpoint of a crossing segment, so a long segment that jumps over
/// the slab is still reported.
pub fn find_crossing_fibers(
    points: &[Vec3],
    line_pointers: &[usize],
    planes: &SlicePlanes,
) -> CrossingFibers {
    let mut runs = Vec::new();
    for axis in planes.shown() {
        let k = axis.index();
        let c = planes.position[k];
        for (line, w) in line_pointers.windows(2).enumerate() {
            let pts = &points[w[0]..w[1]];
            let side = |i: usize| pts[i][k] - c;
            let crosses = |i: usize| side(i) * side(i + 1) <= 0.0;
            let n = pts.len();
            let marked = |i: usize| {
                side(i).abs() <= planes.thickness
                    || (i > 0 && crosses(i - 1))
                    || (i + 1 < n && crosses(i))
            };
            let mut i = 0;
            while i < n {
                if !marked(i) {
                    i += 1;
                    continue;
                }
                let start = i;
                while i < n && marked(i) {
                    i += 1;
                }
                if (start..i - 1).any(&crosses) {
                    runs.push(CrossingRun {
                        line,
                        axis,
                        start: w[0] + start,
                        count: i - start,
                    });
                }
            }
        }
    }
    CrossingFibers { runs }
}
