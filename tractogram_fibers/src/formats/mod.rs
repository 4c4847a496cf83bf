// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! File formats: detection, the parser/writer strategy tables and the shared
//! parse result.
//!
//! Every parser has the same signature, [`ParseFn`], and returns a
//! [`ParsedFibers`] that the store installs only after it validates. Writers
//! take an [`ExportData`] snapshot and produce the whole file in memory.

use std::fmt;
use std::path::Path;

use glam::Vec3;

use crate::error::FormatError;
use crate::types::{Rgb, VolumeGeometry};

mod ascii;
mod camino;
mod dmri;
mod mrtrix;
mod ptk;
pub(crate) mod reader;
mod trk;
mod vtk;

/// A supported fiber file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FiberFormat {
    /// Plain text: line count, then per line a point count and coordinates.
    AsciiFibers,
    /// Legacy VTK polydata, ASCII payload.
    VtkAscii,
    /// Legacy VTK polydata, big-endian binary payload.
    VtkBinary,
    /// TrackVis `.trk`.
    TrackVis,
    /// Camino `.Bfloat`.
    Camino,
    /// MRtrix `.tck`.
    Mrtrix,
    /// Connectomist / PTK `.bundlesdata`.
    Ptk,
    /// dMRI text export.
    Dmri,
}

impl FiberFormat {
    /// Every format, in detection priority order.
    pub const ALL: [Self; 8] = [
        Self::TrackVis,
        Self::VtkBinary,
        Self::VtkAscii,
        Self::Mrtrix,
        Self::Camino,
        Self::Ptk,
        Self::Dmri,
        Self::AsciiFibers,
    ];

    /// Conventional file extension, without the dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::AsciiFibers => "fib",
            Self::VtkAscii | Self::VtkBinary => "vtk",
            Self::TrackVis => "trk",
            Self::Camino => "Bfloat",
            Self::Mrtrix => "tck",
            Self::Ptk => "bundlesdata",
            Self::Dmri => "dmri",
        }
    }
}

impl fmt::Display for FiberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AsciiFibers => "ASCII fibers",
            Self::VtkAscii => "VTK (ASCII)",
            Self::VtkBinary => "VTK (binary)",
            Self::TrackVis => "TrackVis",
            Self::Camino => "Camino",
            Self::Mrtrix => "MRtrix",
            Self::Ptk => "PTK",
            Self::Dmri => "dMRI",
        })
    }
}

const VTK_MAGIC: &[u8] = b"# vtk DataFile";

/// Identify the format from the first bytes of a file and its path.
///
/// Magic bytes win over the extension; `.fib` is VTK when it carries the VTK
/// header and ASCII fibers otherwise.
pub fn detect_format(path: &Path, header: &[u8]) -> Option<FiberFormat> {
    if header.starts_with(b"TRACK\0") {
        return Some(FiberFormat::TrackVis);
    }
    if header.starts_with(VTK_MAGIC) {
        return Some(vtk_variant(header));
    }
    if header.starts_with(b"mrtrix tracks") {
        return Some(FiberFormat::Mrtrix);
    }
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "trk" => Some(FiberFormat::TrackVis),
        "vtk" => Some(vtk_variant(header)),
        "tck" => Some(FiberFormat::Mrtrix),
        "bfloat" => Some(FiberFormat::Camino),
        "bundlesdata" => Some(FiberFormat::Ptk),
        "dmri" => Some(FiberFormat::Dmri),
        "fib" | "txt" => Some(FiberFormat::AsciiFibers),
        _ => None,
    }
}

/// The third header line of a VTK file names the payload encoding.
fn vtk_variant(header: &[u8]) -> FiberFormat {
    let is_binary = header
        .split(|&b| b == b'\n')
        .nth(2)
        .is_some_and(|l| l.trim_ascii().eq_ignore_ascii_case(b"BINARY"));
    if is_binary {
        FiberFormat::VtkBinary
    } else {
        FiberFormat::VtkAscii
    }
}

/// Named per-point scalar channels carried by a file (TrackVis only).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointScalars {
    /// Channel names, possibly empty strings.
    pub names: Vec<String>,
    /// Values per point.
    pub per_point: usize,
    /// `point_count * per_point` values, point-major.
    pub values: Vec<f32>,
}

impl PointScalars {
    /// Values of one point.
    pub fn point(&self, i: usize) -> &[f32] {
        &self.values[i * self.per_point..(i + 1) * self.per_point]
    }
}

/// Uniform output of every parser.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedFibers {
    /// Shared point sequence.
    pub points: Vec<Vec3>,
    /// `line_count + 1` cumulative offsets, starting at 0 and ending at `points.len()`.
    pub line_pointers: Vec<usize>,
    /// One color per point, if the file has them.
    pub colors: Option<Vec<Rgb>>,
    /// Per-point scalars, if the file has them.
    pub scalars: Option<PointScalars>,
    /// Voxel grid declared by the file, if any.
    pub geometry: Option<VolumeGeometry>,
}

impl ParsedFibers {
    /// Assemble from one point list per line.
    pub(crate) fn from_counts(points: Vec<Vec3>, counts: &[usize]) -> Self {
        let mut line_pointers = Vec::with_capacity(counts.len() + 1);
        line_pointers.push(0);
        let mut acc = 0;
        for &c in counts {
            acc += c;
            line_pointers.push(acc);
        }
        Self {
            points,
            line_pointers,
            ..Self::default()
        }
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.line_pointers.len().saturating_sub(1)
    }

    /// Check the parse result against the store invariants.
    pub fn validate(&self, format: FiberFormat) -> Result<(), FormatError> {
        let inconsistent = |reason: String| FormatError::InconsistentCounts { format, reason };
        if self.line_pointers.first() != Some(&0) {
            return Err(inconsistent("line table does not start at 0".into()));
        }
        if self.line_pointers.windows(2).any(|w| w[0] > w[1]) {
            return Err(inconsistent("line table is not monotonic".into()));
        }
        let last = self.line_pointers.last().copied().unwrap_or(0);
        if last != self.points.len() {
            return Err(inconsistent(format!(
                "lines cover {last} points, file has {}",
                self.points.len()
            )));
        }
        if let Some(colors) = &self.colors
            && colors.len() != self.points.len()
        {
            return Err(inconsistent(format!(
                "{} colors for {} points",
                colors.len(),
                self.points.len()
            )));
        }
        if let Some(s) = &self.scalars
            && s.values.len() != s.per_point * self.points.len()
        {
            return Err(inconsistent(format!(
                "{} scalar values for {} points",
                s.values.len(),
                self.points.len()
            )));
        }
        if self.points.iter().any(|p| !p.is_finite()) {
            return Err(FormatError::Malformed {
                format,
                reason: "non-finite coordinate".into(),
            });
        }
        Ok(())
    }
}

/// Snapshot of the lines to write.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportData {
    /// Points of the exported lines, concatenated in line order.
    pub points: Vec<Vec3>,
    /// Point count of each exported line.
    pub counts: Vec<usize>,
    /// One color per exported point.
    pub colors: Vec<Rgb>,
    /// Per-point scalars of the exported points, if the dataset has them.
    pub scalars: Option<PointScalars>,
}

impl ExportData {
    /// Iterate the exported lines as point slices.
    pub fn lines(&self) -> impl Iterator<Item = &[Vec3]> + '_ {
        let mut start = 0;
        self.counts.iter().map(move |&c| {
            let s = &self.points[start..start + c];
            start += c;
            s
        })
    }
}

/// Parser strategy: whole file bytes in, validated-shape parse out.
pub type ParseFn = fn(&[u8]) -> Result<ParsedFibers, FormatError>;

/// Writer strategy: export snapshot and voxel grid in, file bytes out.
pub type WriteFn = fn(&ExportData, &VolumeGeometry) -> Vec<u8>;

/// Parser for each readable format.
pub const PARSERS: &[(FiberFormat, ParseFn)] = &[
    (FiberFormat::AsciiFibers, ascii::parse),
    (FiberFormat::VtkAscii, vtk::parse),
    (FiberFormat::VtkBinary, vtk::parse),
    (FiberFormat::TrackVis, trk::parse),
    (FiberFormat::Camino, camino::parse),
    (FiberFormat::Mrtrix, mrtrix::parse),
    (FiberFormat::Ptk, ptk::parse),
    (FiberFormat::Dmri, dmri::parse),
];

/// Writer for each writable format.
pub const WRITERS: &[(FiberFormat, WriteFn)] = &[
    (FiberFormat::AsciiFibers, ascii::write),
    (FiberFormat::VtkAscii, vtk::write_ascii),
    (FiberFormat::VtkBinary, vtk::write_binary),
    (FiberFormat::TrackVis, trk::write),
    (FiberFormat::Camino, camino::write),
    (FiberFormat::Mrtrix, mrtrix::write),
    (FiberFormat::Ptk, ptk::write),
    (FiberFormat::Dmri, dmri::write),
];

/// Parse `bytes` as `format` and validate the result.
pub fn parse(format: FiberFormat, bytes: &[u8]) -> Result<ParsedFibers, FormatError> {
    let parser = PARSERS
        .iter()
        .find(|(f, _)| *f == format)
        .map(|(_, p)| *p)
        .ok_or_else(|| FormatError::Unsupported {
            format,
            reason: "no parser registered".into(),
        })?;
    let parsed = parser(bytes)?;
    parsed.validate(format)?;
    Ok(parsed)
}

/// Serialize `data` as `format`.
pub fn write(
    format: FiberFormat,
    data: &ExportData,
    geometry: &VolumeGeometry,
) -> Result<Vec<u8>, FormatError> {
    let writer = WRITERS
        .iter()
        .find(|(f, _)| *f == format)
        .map(|(_, w)| *w)
        .ok_or_else(|| FormatError::Unsupported {
            format,
            reason: "no writer registered".into(),
        })?;
    Ok(writer(data, geometry))
}

/// Convert an `i32` count field, rejecting negatives.
pub(crate) fn count_from_i32(
    format: FiberFormat,
    what: &str,
    v: i32,
) -> Result<usize, FormatError> {
    usize::try_from(v).map_err(|_| FormatError::Malformed {
        format,
        reason: format!("{what} is negative ({v})"),
    })
}

/// Clamp a `usize` into an `i32` count field.
pub(crate) fn count_to_i32(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Two short lines with awkward (non-round) coordinates.
    pub(crate) fn sample_export() -> ExportData {
        let points = vec![
            Vec3::new(1.25, -3.5, 7.0),
            Vec3::new(2.0, 0.1, 6.75),
            Vec3::new(2.5, 0.3, 6.5),
            Vec3::new(10.0, 20.0, 30.0),
            Vec3::new(10.5, 20.25, 30.125),
        ];
        ExportData {
            colors: vec![[0.5, 0.25, 1.0]; points.len()],
            points,
            counts: vec![3, 2],
            scalars: None,
        }
    }

    /// Write `data` as `format`, parse it back and check points and counts.
    pub(crate) fn assert_round_trip(format: FiberFormat, data: &ExportData) -> ParsedFibers {
        let bytes = write(format, data, &VolumeGeometry::default()).unwrap();
        let parsed = parse(format, &bytes).unwrap();
        assert_eq!(parsed.points, data.points, "{format} points");
        let counts: Vec<usize> = parsed.line_pointers.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(counts, data.counts, "{format} counts");
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_wins_over_extension() {
        let p = Path::new("tracts.fib");
        assert_eq!(
            detect_format(p, b"# vtk DataFile Version 3.0\ntitle\nBINARY\n"),
            Some(FiberFormat::VtkBinary)
        );
        assert_eq!(
            detect_format(p, b"# vtk DataFile Version 3.0\ntitle\nASCII\n"),
            Some(FiberFormat::VtkAscii)
        );
        assert_eq!(detect_format(p, b"2\n3 0 0 0"), Some(FiberFormat::AsciiFibers));
        assert_eq!(
            detect_format(Path::new("x.dat"), b"TRACK\0\0\0"),
            Some(FiberFormat::TrackVis)
        );
        assert_eq!(
            detect_format(Path::new("x"), b"mrtrix tracks\n"),
            Some(FiberFormat::Mrtrix)
        );
    }

    #[test]
    fn extension_fallback_is_case_insensitive() {
        assert_eq!(
            detect_format(Path::new("a.Bfloat"), &[0, 0]),
            Some(FiberFormat::Camino)
        );
        assert_eq!(
            detect_format(Path::new("a.BUNDLESDATA"), &[]),
            Some(FiberFormat::Ptk)
        );
        assert_eq!(detect_format(Path::new("a.dmri"), b"1 FA"), Some(FiberFormat::Dmri));
        assert_eq!(detect_format(Path::new("a.png"), b"\x89PNG"), None);
        assert_eq!(detect_format(Path::new("noext"), b""), None);
    }

    #[test]
    fn every_format_has_parser_and_writer() {
        for f in FiberFormat::ALL {
            assert!(PARSERS.iter().any(|(g, _)| *g == f), "{f} parser");
            assert!(WRITERS.iter().any(|(g, _)| *g == f), "{f} writer");
        }
    }

    #[test]
    fn validation_rejects_uncovered_points() {
        let mut p = ParsedFibers::from_counts(vec![Vec3::ZERO; 4], &[2, 1]);
        assert!(matches!(
            p.validate(FiberFormat::Ptk),
            Err(FormatError::InconsistentCounts { .. })
        ));
        p.line_pointers = vec![0, 2, 4];
        assert!(p.validate(FiberFormat::Ptk).is_ok());
        p.colors = Some(vec![[0.0; 3]; 3]);
        assert!(p.validate(FiberFormat::Ptk).is_err());
    }

    #[test]
    fn export_lines_split_by_counts() {
        let data = test_support::sample_export();
        let lens: Vec<usize> = data.lines().map(<[Vec3]>::len).collect();
        assert_eq!(lens, [3, 2]);
    }
}
