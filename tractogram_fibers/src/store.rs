// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The fiber store: shared point sequence, line table, derived per-line state
//! and per-point colors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use tractogram_index::{Aabb3D, IndexConfig, IndexKind, Volume};

use crate::coloring::{self, ColorInputs, ColorationMode};
use crate::crossing::{self, CrossingFibers, SlicePlanes};
use crate::error::{FiberError, FormatError, IndexStateError, ParameterError};
use crate::filter::FilterParams;
use crate::formats::{self, ExportData, FiberFormat, ParsedFibers, PointScalars};
use crate::index_state::{BuildParams, IndexState, IndexStatus, PointIndex};
use crate::types::{Axis, LineFlags, LineState, Rgb, VolumeGeometry};

/// Bytes handed to format detection.
const DETECT_BYTES: usize = 512;

/// Tuning for a [`Fibers`] store.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FibersConfig {
    /// Spatial structure used for volume queries.
    pub index_kind: IndexKind,
    /// Leaf size and depth cap of the spatial structure.
    pub index: IndexConfig,
    /// Loads with more points than this start a background index build.
    pub background_build_points: usize,
    /// Distance at which the distance coloring modes saturate.
    pub distance_threshold: f32,
    /// Color of [`ColorationMode::Uniform`].
    pub uniform_color: Rgb,
}

impl Default for FibersConfig {
    fn default() -> Self {
        Self {
            index_kind: IndexKind::default(),
            index: IndexConfig::default(),
            background_build_points: 500_000,
            distance_threshold: 10.0,
            uniform_color: [1.0, 1.0, 1.0],
        }
    }
}

/// Which lines an export covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaveScope {
    /// Every line.
    #[default]
    All,
    /// Only lines currently visible.
    Visible,
}

/// A fiber dataset.
///
/// Lines are contiguous ranges of one shared point sequence, delimited by a
/// table of `line_count + 1` cumulative offsets. Every buffer indexed by point
/// (colors, localized alpha, scalars) always has one entry per point.
///
/// A failed [`Fibers::load`] leaves the store exactly as it was.
#[derive(Debug)]
pub struct Fibers {
    config: FibersConfig,
    points: Vec<Vec3>,
    line_pointers: Vec<usize>,
    lines: Vec<LineState>,
    colors: Vec<Rgb>,
    localized_alpha: Vec<f32>,
    file_colors: Option<Vec<Rgb>>,
    scalars: Option<PointScalars>,
    min_length: f32,
    max_length: f32,
    geometry: VolumeGeometry,
    coloration: ColorationMode,
    anchors: Vec<Vec3>,
    filter: FilterParams,
    included: Vec<bool>,
    inverted: bool,
    normals_positive: bool,
    index: IndexState,
    source: Option<PathBuf>,
    format: Option<FiberFormat>,
    structure_revision: u64,
    filter_revision: u64,
    visibility_revision: u64,
}

impl Default for Fibers {
    fn default() -> Self {
        Self::new(FibersConfig::default())
    }
}

impl Fibers {
    /// An empty store.
    pub fn new(config: FibersConfig) -> Self {
        Self {
            config,
            points: Vec::new(),
            line_pointers: vec![0],
            lines: Vec::new(),
            colors: Vec::new(),
            localized_alpha: Vec::new(),
            file_colors: None,
            scalars: None,
            min_length: 0.0,
            max_length: 0.0,
            geometry: VolumeGeometry::default(),
            coloration: ColorationMode::default(),
            anchors: Vec::new(),
            filter: FilterParams::default(),
            included: Vec::new(),
            inverted: false,
            normals_positive: true,
            index: IndexState::Stale,
            source: None,
            format: None,
            structure_revision: 0,
            filter_revision: 0,
            visibility_revision: 0,
        }
    }

    /// A store holding one line per point list.
    pub fn from_lines(lines: Vec<Vec<Vec3>>) -> Self {
        let counts: Vec<usize> = lines.iter().map(Vec::len).collect();
        let points = lines.into_iter().flatten().collect();
        let mut fibers = Self::default();
        fibers.install(ParsedFibers::from_counts(points, &counts));
        fibers
    }

    /// A store from a point sequence and its line table.
    pub fn from_parts(points: Vec<Vec3>, line_pointers: Vec<usize>) -> Result<Self, ParameterError> {
        let parsed = ParsedFibers {
            points,
            line_pointers,
            ..ParsedFibers::default()
        };
        parsed
            .validate(FiberFormat::AsciiFibers)
            .map_err(|e| ParameterError::LineTable(e.to_string()))?;
        let mut fibers = Self::default();
        fibers.install(parsed);
        Ok(fibers)
    }

    /// Replace the configuration. The spatial index is rebuilt on next use.
    #[must_use]
    pub fn with_config(mut self, config: FibersConfig) -> Self {
        self.index.invalidate();
        self.config = config;
        self.update_fibers_colors();
        self
    }

    /// Open a fiber file with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FiberError> {
        let mut fibers = Self::default();
        fibers.load(path)?;
        Ok(fibers)
    }

    /// Replace the dataset with the content of `path`.
    ///
    /// The format is detected from the header bytes, then the extension. On
    /// any error the current dataset stays installed.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), FiberError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| FiberError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let header = &bytes[..bytes.len().min(DETECT_BYTES)];
        let format = formats::detect_format(path, header)
            .ok_or_else(|| FormatError::UnknownFormat(path.display().to_string()))?;
        self.load_bytes(format, &bytes)?;
        self.source = Some(path.to_path_buf());
        tracing::info!(
            "Loaded {} fibers ({} points) from {} as {format}",
            self.line_count(),
            self.point_count(),
            path.display()
        );
        Ok(())
    }

    /// Replace the dataset with `bytes` parsed as `format`.
    pub fn load_bytes(&mut self, format: FiberFormat, bytes: &[u8]) -> Result<(), FormatError> {
        let parsed = formats::parse(format, bytes)?;
        self.install(parsed);
        self.format = Some(format);
        self.source = None;
        Ok(())
    }

    fn install(&mut self, parsed: ParsedFibers) {
        // A worker must not outlive the points it indexes.
        self.index.invalidate();
        let ParsedFibers {
            points,
            line_pointers,
            colors,
            scalars,
            geometry,
        } = parsed;
        self.points = points;
        self.line_pointers = line_pointers;
        self.lines = vec![LineState::default(); self.line_count()];
        self.file_colors = colors;
        self.scalars = scalars;
        if let Some(g) = geometry {
            self.geometry = g;
        }
        self.included = vec![true; self.line_count()];
        self.anchors.clear();
        self.recompute_lengths();
        self.switch_normals(self.normals_positive);
        self.reset_color_array();
        self.refresh_visibility();
        self.bump_structure();
        if self.points.len() > self.config.background_build_points {
            self.start_index_build();
        }
    }

    fn build_params(&self) -> BuildParams {
        BuildParams {
            kind: self.config.index_kind,
            config: self.config.index,
        }
    }

    fn bump_structure(&mut self) {
        self.structure_revision = self.structure_revision.wrapping_add(1);
    }

    // --- accessors ---

    /// Active configuration.
    pub fn config(&self) -> &FibersConfig {
        &self.config
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.line_pointers.len() - 1
    }

    /// Number of points across all lines.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// The shared point sequence.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// The `line_count + 1` cumulative offsets.
    pub fn line_pointers(&self) -> &[usize] {
        &self.line_pointers
    }

    /// Number of points of `line`.
    ///
    /// # Panics
    ///
    /// If `line >= line_count()`.
    pub fn points_per_line(&self, line: usize) -> usize {
        self.line_pointers[line + 1] - self.line_pointers[line]
    }

    /// Index of the first point of `line`.
    ///
    /// # Panics
    ///
    /// If `line >= line_count()`.
    pub fn start_index_for_line(&self, line: usize) -> usize {
        assert!(line < self.line_count(), "line {line} out of range");
        self.line_pointers[line]
    }

    /// Line owning `point`, by binary search over the offsets.
    pub fn line_for_point(&self, point: usize) -> Option<usize> {
        if point >= self.points.len() {
            return None;
        }
        Some(self.line_pointers.partition_point(|&s| s <= point) - 1)
    }

    /// Points of `line`.
    ///
    /// # Panics
    ///
    /// If `line >= line_count()`.
    pub fn line_points(&self, line: usize) -> &[Vec3] {
        &self.points[self.line_pointers[line]..self.line_pointers[line + 1]]
    }

    /// One color per point.
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Opacity of `point` from the distance coloring modes; 1 otherwise.
    pub fn localized_alpha(&self, point: usize) -> f32 {
        self.localized_alpha.get(point).copied().unwrap_or(1.0)
    }

    /// Length of `line`.
    pub fn length(&self, line: usize) -> f32 {
        self.lines[line].length
    }

    /// Shortest line length.
    pub fn min_length(&self) -> f32 {
        self.min_length
    }

    /// Longest line length.
    pub fn max_length(&self) -> f32 {
        self.max_length
    }

    /// Whether `line` is visible.
    pub fn is_selected(&self, line: usize) -> bool {
        self.lines[line].flags.contains(LineFlags::SELECTED)
    }

    /// Whether `line` is excluded by the scalar filter.
    pub fn is_filtered(&self, line: usize) -> bool {
        self.lines[line].flags.contains(LineFlags::FILTERED)
    }

    /// Whether `line` runs against the preferred orientation.
    pub fn is_reversed(&self, line: usize) -> bool {
        self.lines[line].flags.contains(LineFlags::REVERSED)
    }

    /// Per-line state.
    pub fn line_state(&self, line: usize) -> LineState {
        self.lines[line]
    }

    /// Per-point scalars loaded from the file.
    pub fn point_scalars(&self) -> Option<&PointScalars> {
        self.scalars.as_ref()
    }

    /// Voxel grid of the companion anatomy.
    pub fn volume_geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// Set the voxel grid of the companion anatomy.
    pub fn set_volume_geometry(&mut self, geometry: VolumeGeometry) -> Result<(), ParameterError> {
        geometry.validate()?;
        self.geometry = geometry;
        Ok(())
    }

    /// File the dataset came from.
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Format the dataset was parsed from.
    pub fn source_format(&self) -> Option<FiberFormat> {
        self.format
    }

    /// Bumped whenever points or lines change.
    pub fn structure_revision(&self) -> u64 {
        self.structure_revision
    }

    /// Bumped whenever the scalar filter or the inversion changes.
    pub fn filter_revision(&self) -> u64 {
        self.filter_revision
    }

    /// Bumped whenever visibility flags or colors are rewritten.
    pub fn visibility_revision(&self) -> u64 {
        self.visibility_revision
    }

    // --- structural edits ---

    /// Recompute every line length and the global extremes.
    pub fn recompute_lengths(&mut self) {
        let mut min = f32::INFINITY;
        let mut max = 0.0_f32;
        for (line, w) in self.line_pointers.windows(2).enumerate() {
            let len: f32 = self.points[w[0]..w[1]]
                .windows(2)
                .map(|s| s[0].distance(s[1]))
                .sum();
            self.lines[line].length = len;
            min = min.min(len);
            max = max.max(len);
        }
        self.min_length = if self.lines.is_empty() { 0.0 } else { min };
        self.max_length = max;
    }

    /// Negate one coordinate of every point.
    ///
    /// Waits for any in-flight index build, then marks the index stale.
    pub fn flip_axis(&mut self, axis: Axis) {
        self.index.invalidate();
        let k = axis.index();
        for p in &mut self.points {
            p[k] = -p[k];
        }
        self.bump_structure();
        self.switch_normals(self.normals_positive);
        self.update_fibers_colors();
        tracing::debug!(?axis, "flipped axis");
    }

    /// Recompute the reversed flag of each line.
    ///
    /// A line is reversed when the dominant component of `last - first` is
    /// negative (`positive == true`) or non-negative (`positive == false`).
    pub fn switch_normals(&mut self, positive: bool) {
        self.normals_positive = positive;
        for (line, w) in self.line_pointers.windows(2).enumerate() {
            let d = match (self.points[w[0]..w[1]].first(), self.points[w[0]..w[1]].last()) {
                (Some(&a), Some(&b)) => b - a,
                _ => Vec3::ZERO,
            };
            let a = d.abs();
            let dominant = if a.x >= a.y && a.x >= a.z {
                d.x
            } else if a.y >= a.z {
                d.y
            } else {
                d.z
            };
            let reversed = if positive { dominant < 0.0 } else { dominant >= 0.0 };
            self.lines[line].flags.set(LineFlags::REVERSED, reversed);
        }
    }

    /// Toggle inverted visibility: visible lines become those the selection excludes.
    pub fn invert_fibers(&mut self) {
        self.inverted = !self.inverted;
        self.filter_revision = self.filter_revision.wrapping_add(1);
        self.refresh_visibility();
    }

    /// Whether visibility is inverted.
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    // --- coloring ---

    /// Active coloration mode.
    pub fn coloration_mode(&self) -> ColorationMode {
        self.coloration
    }

    /// Switch coloration mode and recompute colors.
    pub fn set_coloration_mode(&mut self, mode: ColorationMode) {
        self.coloration = mode;
        self.update_fibers_colors();
    }

    /// Change the uniform color; recolors when the uniform mode is active.
    pub fn set_uniform_color(&mut self, color: Rgb) {
        self.config.uniform_color = color;
        if self.coloration == ColorationMode::Uniform {
            self.update_fibers_colors();
        }
    }

    /// Anchors of the distance coloring modes.
    pub fn anchors(&self) -> &[Vec3] {
        &self.anchors
    }

    /// Replace the anchors; recolors when a distance mode is active.
    pub fn set_anchors(&mut self, anchors: Vec<Vec3>) {
        if anchors == self.anchors {
            return;
        }
        self.anchors = anchors;
        if matches!(
            self.coloration,
            ColorationMode::Distance | ColorationMode::MinDistance
        ) {
            self.update_fibers_colors();
        }
    }

    /// Back to the default mode: file colors when the file had them, else direction.
    pub fn reset_color_array(&mut self) {
        self.coloration = if self.file_colors.is_some() {
            ColorationMode::FromFile
        } else {
            ColorationMode::Direction
        };
        self.update_fibers_colors();
    }

    /// Recompute colors with the active mode. The new buffers replace the old
    /// ones in one step.
    pub fn update_fibers_colors(&mut self) {
        let inputs = ColorInputs {
            points: &self.points,
            line_pointers: &self.line_pointers,
            file_colors: self.file_colors.as_deref(),
            anchors: &self.anchors,
            uniform: self.config.uniform_color,
            distance_threshold: self.config.distance_threshold,
        };
        let (applied, coloring) = coloring::compute(self.coloration, &inputs);
        self.coloration = applied;
        self.colors = coloring.colors;
        self.localized_alpha = coloring.alpha;
        self.visibility_revision = self.visibility_revision.wrapping_add(1);
    }

    // --- filtering and selection ---

    /// Active scalar filter.
    pub fn filter(&self) -> &FilterParams {
        &self.filter
    }

    /// Validate and apply a scalar filter.
    pub fn set_filter(&mut self, params: FilterParams) -> Result<(), ParameterError> {
        params.validate()?;
        if params != self.filter {
            self.filter = params;
            self.filter_revision = self.filter_revision.wrapping_add(1);
        }
        self.refresh_visibility();
        Ok(())
    }

    /// Per-line mask of lines the scalar filter excludes.
    pub fn filtered_fibers(&self) -> Vec<bool> {
        self.lines
            .iter()
            .map(|l| l.flags.contains(LineFlags::FILTERED))
            .collect()
    }

    /// Install the result of volume composition.
    ///
    /// `included` has one entry per line. Anchors feed the distance coloring
    /// modes. Flags and colors are rewritten together.
    pub fn apply_selection(
        &mut self,
        included: Vec<bool>,
        anchors: Vec<Vec3>,
    ) -> Result<(), ParameterError> {
        if included.len() != self.line_count() {
            return Err(ParameterError::LineTable(format!(
                "selection covers {} lines, dataset has {}",
                included.len(),
                self.line_count()
            )));
        }
        self.included = included;
        self.set_anchors(anchors);
        self.refresh_visibility();
        Ok(())
    }

    fn refresh_visibility(&mut self) {
        for (line, state) in self.lines.iter_mut().enumerate() {
            let filtered = !self.filter.accepts(line, state.length);
            let inc = self.included.get(line).copied().unwrap_or(true);
            let visible = (inc != self.inverted) && !filtered;
            state.flags.set(LineFlags::FILTERED, filtered);
            state.flags.set(LineFlags::SELECTED, visible);
        }
        self.visibility_revision = self.visibility_revision.wrapping_add(1);
    }

    /// Visible lines, ascending.
    pub fn visible_lines(&self) -> Vec<usize> {
        (0..self.line_count())
            .filter(|&l| self.is_selected(l))
            .collect()
    }

    /// `(start, count)` of every visible line.
    pub fn draw_ranges(&self) -> Vec<(usize, usize)> {
        self.visible_lines()
            .into_iter()
            .map(|l| (self.line_pointers[l], self.points_per_line(l)))
            .collect()
    }

    // --- spatial index ---

    /// Phase of the spatial index.
    pub fn index_status(&self) -> IndexStatus {
        self.index.status()
    }

    /// Start building the index on a worker thread if it is stale.
    pub fn start_index_build(&mut self) {
        let params = self.build_params();
        self.index.start(&self.points, params);
    }

    /// Frame-tick synchronization point: observe a finished build.
    pub fn poll_index(&mut self) -> IndexStatus {
        let params = self.build_params();
        self.index.poll(&self.points, params)
    }

    /// Spatial index of the current points, building or waiting as needed.
    pub fn index(&mut self) -> Arc<PointIndex> {
        let params = self.build_params();
        self.index.ensure_ready(&self.points, params)
    }

    /// Spatial index if it is ready, without blocking.
    pub fn try_index(&self) -> Result<Arc<PointIndex>, IndexStateError> {
        self.index.try_ready()
    }

    fn lines_of(&self, index: &PointIndex, volume: &Volume<f32>) -> Vec<bool> {
        let mut mask = vec![false; self.line_count()];
        for p in index.query_volume(volume) {
            if let Some(line) = self.line_for_point(p) {
                mask[line] = true;
            }
        }
        mask
    }

    /// Per-line mask of lines with at least one point strictly inside `volume`.
    pub fn lines_in_volume(&mut self, volume: &Volume<f32>) -> Vec<bool> {
        let index = self.index();
        self.lines_of(&index, volume)
    }

    /// [`Fibers::lines_in_volume`] without building or waiting.
    pub fn try_lines_in_volume(&self, volume: &Volume<f32>) -> Result<Vec<bool>, IndexStateError> {
        let index = self.try_index()?;
        Ok(self.lines_of(&index, volume))
    }

    /// Runs of each line around the shown slice planes.
    pub fn crossing_fibers(&self, planes: &SlicePlanes) -> Result<CrossingFibers, ParameterError> {
        planes.validate()?;
        Ok(crossing::find_crossing_fibers(
            &self.points,
            &self.line_pointers,
            planes,
        ))
    }

    // --- export ---

    /// Snapshot of all or only the visible lines.
    pub fn export(&self, scope: SaveScope) -> ExportData {
        let lines: Vec<usize> = match scope {
            SaveScope::All => (0..self.line_count()).collect(),
            SaveScope::Visible => self.visible_lines(),
        };
        let mut data = ExportData {
            scalars: self.scalars.as_ref().map(|s| PointScalars {
                names: s.names.clone(),
                per_point: s.per_point,
                values: Vec::new(),
            }),
            ..ExportData::default()
        };
        for line in lines {
            let (a, b) = (self.line_pointers[line], self.line_pointers[line + 1]);
            data.points.extend_from_slice(&self.points[a..b]);
            data.colors.extend_from_slice(&self.colors[a..b]);
            data.counts.push(b - a);
            if let (Some(out), Some(src)) = (&mut data.scalars, &self.scalars) {
                out.values
                    .extend_from_slice(&src.values[a * src.per_point..b * src.per_point]);
            }
        }
        data
    }

    /// Write all or only the visible lines to `path` as `format`.
    pub fn save(
        &self,
        path: impl AsRef<Path>,
        format: FiberFormat,
        scope: SaveScope,
    ) -> Result<(), FiberError> {
        let path = path.as_ref();
        let data = self.export(scope);
        let bytes = formats::write(format, &data, &self.geometry)?;
        std::fs::write(path, &bytes).map_err(|source| FiberError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            "Saved {} fibers ({} bytes) to {} as {format}",
            data.counts.len(),
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    // --- statistics ---

    /// Mean of all points.
    pub fn barycenter(&self) -> Option<Vec3> {
        if self.points.is_empty() {
            return None;
        }
        #[allow(
            clippy::cast_precision_loss,
            reason = "An average; exactness is not required."
        )]
        let n = self.points.len() as f32;
        Some(self.points.iter().copied().sum::<Vec3>() / n)
    }

    /// Bounding box of all points.
    pub fn bounds(&self) -> Option<Aabb3D<f32>> {
        let arrays: Vec<[f32; 3]> = self.points.iter().map(|p| p.to_array()).collect();
        Aabb3D::from_points(arrays.iter())
    }

    /// Visible points per voxel of `geometry`, normalized so the densest voxel is 1.
    pub fn volume_density(&self, geometry: &VolumeGeometry) -> Result<Vec<f32>, ParameterError> {
        geometry.validate()?;
        let mut grid = vec![0.0_f32; geometry.voxel_count()];
        for line in self.visible_lines() {
            for &p in self.line_points(line) {
                if let Some(v) = geometry.voxel_of(p) {
                    grid[v] += 1.0;
                }
            }
        }
        let max = grid.iter().copied().fold(0.0, f32::max);
        if max > 0.0 {
            for v in &mut grid {
                *v /= max;
            }
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straight lines along x at distinct heights; line `i` has `i + 2` points.
    fn ladder(n: usize) -> Fibers {
        Fibers::from_lines(
            (0..n)
                .map(|i| {
                    (0..i + 2)
                        .map(|k| Vec3::new(k as f32, i as f32 * 2.0, 0.0))
                        .collect()
                })
                .collect(),
        )
    }

    #[test]
    fn offset_table_round_trips() {
        let f = ladder(7);
        let total: usize = (0..f.line_count()).map(|l| f.points_per_line(l)).sum();
        assert_eq!(total, f.point_count());
        for l in 0..f.line_count() {
            let next = f.line_pointers()[l + 1];
            assert_eq!(next - f.start_index_for_line(l), f.points_per_line(l));
            assert_eq!(f.line_for_point(f.start_index_for_line(l)), Some(l));
            assert_eq!(f.line_for_point(next - 1), Some(l));
        }
        assert_eq!(f.line_for_point(f.point_count()), None);
    }

    #[test]
    fn empty_lines_do_not_own_points() {
        let f = Fibers::from_parts(vec![Vec3::ZERO, Vec3::ONE], vec![0, 0, 2, 2]).unwrap();
        assert_eq!(f.line_count(), 3);
        assert_eq!(f.points_per_line(0), 0);
        assert_eq!(f.line_for_point(0), Some(1));
        assert_eq!(f.line_for_point(1), Some(1));
    }

    #[test]
    fn from_parts_rejects_bad_tables() {
        assert!(matches!(
            Fibers::from_parts(vec![Vec3::ZERO; 3], vec![0, 2]),
            Err(ParameterError::LineTable(_))
        ));
        assert!(Fibers::from_parts(vec![Vec3::ZERO; 3], vec![0, 2, 1, 3]).is_err());
        assert!(Fibers::from_parts(vec![], vec![]).is_err());
    }

    #[test]
    fn lengths_and_extremes() {
        let f = ladder(4);
        assert_eq!(f.length(0), 1.0);
        assert_eq!(f.length(3), 4.0);
        assert_eq!((f.min_length(), f.max_length()), (1.0, 4.0));
        assert_eq!(f.colors().len(), f.point_count());
    }

    #[test]
    fn length_filter_is_idempotent() {
        let mut f = ladder(10);
        let params = FilterParams::length(2.5, 6.0);
        f.set_filter(params).unwrap();
        let once = f.visible_lines();
        let rev = f.filter_revision();
        f.set_filter(params).unwrap();
        assert_eq!(f.visible_lines(), once);
        assert_eq!(f.filter_revision(), rev);
        assert_eq!(once, [2, 3, 4, 5]);
        assert_eq!(f.filtered_fibers().iter().filter(|&&x| x).count(), 6);
        assert!(f.set_filter(FilterParams::length(3.0, 1.0)).is_err());
        assert_eq!(f.filter(), &params);
    }

    #[test]
    fn selection_inversion_and_filter_combine() {
        let mut f = ladder(4);
        f.apply_selection(vec![true, false, true, false], vec![])
            .unwrap();
        assert_eq!(f.visible_lines(), [0, 2]);
        f.invert_fibers();
        assert_eq!(f.visible_lines(), [1, 3]);
        f.set_filter(FilterParams::length(0.0, 2.5)).unwrap();
        assert_eq!(f.visible_lines(), [1]);
        assert_eq!(f.draw_ranges(), [(2, 3)]);
        assert!(f.apply_selection(vec![true], vec![]).is_err());
    }

    #[test]
    fn volume_query_matches_brute_force() {
        let mut f = ladder(12);
        let q = Volume::Box(Aabb3D::new(2.5, 3.0, -1.0, 8.0, 15.0, 1.0));
        let mask = f.lines_in_volume(&q);
        for l in 0..f.line_count() {
            let brute = f
                .line_points(l)
                .iter()
                .any(|p| q.contains_point(p.to_array()));
            assert_eq!(mask[l], brute, "line {l}");
        }
        assert!(mask.iter().any(|&m| m));
    }

    #[test]
    fn flip_axis_invalidates_the_index() {
        let mut f = ladder(3);
        let q = Volume::Box(Aabb3D::new(-0.5, 1.5, -1.0, 0.5, 2.5, 1.0));
        assert_eq!(f.lines_in_volume(&q), [false, true, false]);
        assert_eq!(f.index_status(), IndexStatus::Ready);
        let rev = f.structure_revision();
        f.flip_axis(Axis::Y);
        assert_eq!(f.index_status(), IndexStatus::Stale);
        assert_eq!(f.try_index().unwrap_err(), IndexStateError::Stale);
        assert!(f.try_lines_in_volume(&q).is_err());
        assert!(f.structure_revision() > rev);
        assert_eq!(f.lines_in_volume(&q), [false; 3]);
        let flipped = Volume::Box(Aabb3D::new(-0.5, -2.5, -1.0, 0.5, -1.5, 1.0));
        assert_eq!(f.lines_in_volume(&flipped), [false, true, false]);
    }

    #[test]
    fn normals_follow_the_dominant_direction() {
        let mut f = Fibers::from_lines(vec![
            vec![Vec3::ZERO, Vec3::new(5.0, 1.0, 0.0)],
            vec![Vec3::ZERO, Vec3::new(-5.0, 1.0, 0.0)],
        ]);
        assert!(!f.is_reversed(0));
        assert!(f.is_reversed(1));
        f.switch_normals(false);
        assert!(f.is_reversed(0));
        assert!(!f.is_reversed(1));
    }

    #[test]
    fn distance_coloring_uses_anchors() {
        let mut f = ladder(2);
        f.set_coloration_mode(ColorationMode::Distance);
        assert_eq!(f.localized_alpha(0), 1.0);
        f.apply_selection(vec![true, true], vec![Vec3::ZERO]).unwrap();
        assert_eq!(f.localized_alpha(0), 1.0);
        assert!(f.localized_alpha(1) < 1.0);
        f.reset_color_array();
        assert_eq!(f.coloration_mode(), ColorationMode::Direction);
        assert_eq!(f.localized_alpha(1), 1.0);
    }

    #[test]
    fn export_visible_subset() {
        let mut f = ladder(3);
        f.apply_selection(vec![false, true, false], vec![]).unwrap();
        let all = f.export(SaveScope::All);
        assert_eq!(all.counts, [2, 3, 4]);
        let vis = f.export(SaveScope::Visible);
        assert_eq!(vis.counts, [3]);
        assert_eq!(vis.points, f.line_points(1));
        assert_eq!(vis.colors.len(), 3);
    }

    #[test]
    fn trackvis_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.trk");
        let mut f = Fibers::from_lines(vec![
            vec![Vec3::new(0.1, 0.2, 0.3), Vec3::new(1.7, -2.9, 3.3)],
            vec![Vec3::new(9.99, 8.88, 7.77); 4],
        ]);
        f.set_volume_geometry(VolumeGeometry {
            columns: 10,
            rows: 12,
            frames: 14,
            voxel_size: [1.5, 1.5, 2.0],
        })
        .unwrap();
        f.save(&path, FiberFormat::TrackVis, SaveScope::All).unwrap();

        let g = Fibers::open(&path).unwrap();
        assert_eq!(g.source_format(), Some(FiberFormat::TrackVis));
        assert_eq!(g.source_path(), Some(path.as_path()));
        assert_eq!(g.points(), f.points());
        assert_eq!(g.line_pointers(), f.line_pointers());
        assert_eq!(g.volume_geometry(), f.volume_geometry());

        let again = dir.path().join("again.trk");
        g.save(&again, FiberFormat::TrackVis, SaveScope::All).unwrap();
        assert_eq!(
            std::fs::read(&path).unwrap(),
            std::fs::read(&again).unwrap()
        );
    }

    #[test]
    fn failed_load_keeps_the_previous_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("broken.vtk");
        std::fs::write(
            &bad,
            "# vtk DataFile Version 3.0\nbroken\nASCII\nDATASET POLYDATA\n\
             POINTS 3 float\n0 0 0 1 1 1 2 2 2\nLINES 1 6\n5 0 1 2 3 4\n",
        )
        .unwrap();
        let mut f = ladder(3);
        let before = (f.points().to_vec(), f.line_pointers().to_vec(), f.structure_revision());
        let err = f.load(&bad).unwrap_err();
        assert!(matches!(err, FiberError::Format(_)), "{err}");
        assert_eq!(
            before,
            (f.points().to_vec(), f.line_pointers().to_vec(), f.structure_revision())
        );

        let missing = f.load(dir.path().join("nope.trk")).unwrap_err();
        assert!(matches!(missing, FiberError::Io { .. }));
        std::fs::write(dir.path().join("x.unknown"), b"hello").unwrap();
        let unknown = f.load(dir.path().join("x.unknown")).unwrap_err();
        assert!(matches!(
            unknown,
            FiberError::Format(FormatError::UnknownFormat(_))
        ));
    }

    #[test]
    fn large_loads_build_in_the_background() {
        let config = FibersConfig {
            background_build_points: 0,
            ..FibersConfig::default()
        };
        let mut f = Fibers::new(config);
        let bytes = formats::write(
            FiberFormat::Ptk,
            &ladder(5).export(SaveScope::All),
            &VolumeGeometry::default(),
        )
        .unwrap();
        f.load_bytes(FiberFormat::Ptk, &bytes).unwrap();
        assert_ne!(f.index_status(), IndexStatus::Stale);
        assert_eq!(f.index().len(), f.point_count());
        assert_eq!(f.poll_index(), IndexStatus::Ready);
    }

    #[test]
    fn crossing_fibers_through_store() {
        let f = ladder(3);
        let planes = SlicePlanes {
            position: Vec3::new(0.5, 0.0, 0.0),
            axial: false,
            coronal: false,
            sagittal: true,
            thickness: 0.1,
        };
        assert_eq!(f.crossing_fibers(&planes).unwrap().lines(), [0, 1, 2]);
        let bad = SlicePlanes {
            thickness: -1.0,
            ..planes
        };
        assert!(f.crossing_fibers(&bad).is_err());
    }

    #[test]
    fn density_and_statistics() {
        let mut f = ladder(2);
        let g = VolumeGeometry {
            columns: 4,
            rows: 4,
            frames: 1,
            voxel_size: [1.0, 1.0, 1.0],
        };
        let d = f.volume_density(&g).unwrap();
        assert_eq!(d.len(), 16);
        assert_eq!(d.iter().copied().fold(0.0, f32::max), 1.0);
        f.apply_selection(vec![false, false], vec![]).unwrap();
        assert!(f.volume_density(&g).unwrap().iter().all(|&v| v == 0.0));
        assert!(f.volume_density(&VolumeGeometry { rows: 0, ..g }).is_err());
        assert_eq!(f.barycenter(), Some(Vec3::new(0.8, 1.2, 0.0)));
        let b = f.bounds().unwrap();
        assert_eq!((b.max_x, b.max_y), (2.0, 2.0));
        assert_eq!(Fibers::default().barycenter(), None);
    }
}
