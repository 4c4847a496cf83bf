// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! dMRI text export.
//!
//! ```text
//! 1 FA
//! 4 min max mean var
//! 1
//! 4 0 0 0 0
//! 4 0 0 0 0
//! 4 0 0 0 0
//! <line count> <x voxel size>
//! <n> 1        per line
//! 1
//! x y z        n times
//! ```

use std::fmt::Write as _;

use glam::Vec3;

use super::reader::Cursor;
use super::{ExportData, FiberFormat, ParsedFibers};
use crate::error::FormatError;
use crate::types::VolumeGeometry;

const FORMAT: FiberFormat = FiberFormat::Dmri;
const HEADER: [&str; 6] = [
    "1 FA",
    "4 min max mean var",
    "1",
    "4 0 0 0 0",
    "4 0 0 0 0",
    "4 0 0 0 0",
];

pub(super) fn parse(bytes: &[u8]) -> Result<ParsedFibers, FormatError> {
    let mut c = Cursor::new(bytes, FORMAT);
    for (i, expected) in HEADER.iter().enumerate() {
        let line = c.content_line()?.ok_or_else(|| FormatError::Truncated {
            format: FORMAT,
            detail: format!("header ends after {i} lines"),
        })?;
        let first = line.split_whitespace().next();
        if first != expected.split_whitespace().next() {
            return Err(FormatError::BadHeader {
                format: FORMAT,
                reason: format!("header line {}: expected `{expected}`, found `{line}`", i + 1),
            });
        }
    }
    let lines = c.parse_usize("line count")?;
    let _x_voxel = c.parse_f32("voxel size")?;
    let mut points = Vec::new();
    let mut counts = Vec::with_capacity(lines.min(1 << 20));
    for line in 0..lines {
        let n = match c.token()? {
            Some(t) => t.parse::<usize>().map_err(|_| FormatError::Malformed {
                format: FORMAT,
                reason: format!("line {line}: point count `{t}`"),
            })?,
            None => {
                return Err(FormatError::InconsistentCounts {
                    format: FORMAT,
                    reason: format!("header declares {lines} lines, data ends after {line}"),
                });
            }
        };
        c.parse_usize("line marker")?;
        c.parse_usize("line marker")?;
        for _ in 0..n {
            let x = c.parse_f32("x")?;
            let y = c.parse_f32("y")?;
            let z = c.parse_f32("z")?;
            points.push(Vec3::new(x, y, z));
        }
        counts.push(n);
    }
    Ok(ParsedFibers::from_counts(points, &counts))
}

pub(super) fn write(data: &ExportData, geometry: &VolumeGeometry) -> Vec<u8> {
    let mut s = String::new();
    for line in HEADER {
        let _ = writeln!(s, "{line}");
    }
    let _ = writeln!(s, "{} {}", data.counts.len(), geometry.voxel_size[0]);
    for line in data.lines() {
        let _ = writeln!(s, "{} 1", line.len());
        let _ = writeln!(s, "1");
        for p in line {
            let _ = writeln!(s, "{} {} {}", p.x, p.y, p.z);
        }
    }
    s.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::{assert_round_trip, sample_export};

    #[test]
    fn round_trip() {
        assert_round_trip(FORMAT, &sample_export());
    }

    #[test]
    fn layout_matches_the_export_shape() {
        let data = ExportData {
            points: vec![Vec3::new(1.0, 2.0, 3.0)],
            counts: vec![1],
            ..ExportData::default()
        };
        let g = VolumeGeometry {
            voxel_size: [2.5, 1.0, 1.0],
            ..VolumeGeometry::default()
        };
        let text = String::from_utf8(write(&data, &g)).unwrap();
        let tail: Vec<&str> = text.lines().skip(6).collect();
        assert_eq!(tail, ["1 2.5", "1 1", "1", "1 2 3"]);
    }

    #[test]
    fn wrong_header_is_rejected() {
        assert!(matches!(
            parse(b"2 FA\n"),
            Err(FormatError::BadHeader { .. })
        ));
        assert!(matches!(parse(b"1 FA\n"), Err(FormatError::Truncated { .. })));
    }
}
