// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Connectomist / PTK `.bundlesdata`: repeated little-endian `i32` point
//! count followed by that many `f32` triples, until end of file.

use glam::Vec3;

use super::reader::{Cursor, Endian};
use super::{ExportData, FiberFormat, ParsedFibers, count_from_i32, count_to_i32};
use crate::error::FormatError;
use crate::types::VolumeGeometry;

const FORMAT: FiberFormat = FiberFormat::Ptk;

pub(super) fn parse(bytes: &[u8]) -> Result<ParsedFibers, FormatError> {
    let mut c = Cursor::new(bytes, FORMAT);
    let mut points = Vec::with_capacity(bytes.len() / 12);
    let mut counts = Vec::new();
    while !c.is_at_end() {
        let n = c.i32(Endian::Little, "point count")?;
        let n = count_from_i32(FORMAT, "point count", n)?;
        if c.remaining() < n * 12 {
            return Err(FormatError::InconsistentCounts {
                format: FORMAT,
                reason: format!(
                    "bundle {} declares {n} points, {} bytes remain",
                    counts.len(),
                    c.remaining()
                ),
            });
        }
        for _ in 0..n {
            let x = c.f32(Endian::Little, "x")?;
            let y = c.f32(Endian::Little, "y")?;
            let z = c.f32(Endian::Little, "z")?;
            points.push(Vec3::new(x, y, z));
        }
        counts.push(n);
    }
    Ok(ParsedFibers::from_counts(points, &counts))
}

pub(super) fn write(data: &ExportData, _geometry: &VolumeGeometry) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 * (data.counts.len() + 3 * data.points.len()));
    for line in data.lines() {
        out.extend_from_slice(&count_to_i32(line.len()).to_le_bytes());
        for p in line {
            for v in p.to_array() {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
    out
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
    fn empty_file_is_an_empty_dataset() {
        let p = parse(&[]).unwrap();
        assert_eq!(p.line_count(), 0);
        assert!(p.points.is_empty());
    }

    #[test]
    fn negative_and_oversized_counts_are_rejected() {
        assert!(matches!(
            parse(&(-1_i32).to_le_bytes()),
            Err(FormatError::Malformed { .. })
        ));
        let mut bytes = 2_i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0; 12]);
        assert!(matches!(
            parse(&bytes),
            Err(FormatError::InconsistentCounts { .. })
        ));
    }
}
