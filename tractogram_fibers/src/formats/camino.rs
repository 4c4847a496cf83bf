// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Camino `.Bfloat`: a headerless stream of big-endian `f32`. Each tract is
//! `N`, the seed point index, then `3N` coordinates.

use glam::Vec3;

use super::reader::{Cursor, Endian};
use super::{ExportData, FiberFormat, ParsedFibers};
use crate::error::FormatError;
use crate::types::VolumeGeometry;

const FORMAT: FiberFormat = FiberFormat::Camino;

/// Largest float that still holds every integer exactly.
const MAX_EXACT: f32 = 16_777_216.0;

pub(super) fn parse(bytes: &[u8]) -> Result<ParsedFibers, FormatError> {
    if bytes.len() % 4 != 0 {
        return Err(FormatError::Truncated {
            format: FORMAT,
            detail: format!("{} bytes is not a whole number of floats", bytes.len()),
        });
    }
    let mut c = Cursor::new(bytes, FORMAT);
    let mut points = Vec::with_capacity(bytes.len() / 12);
    let mut counts = Vec::new();
    while !c.is_at_end() {
        let n = c.f32(Endian::Big, "tract point count")?;
        if n.fract() != 0.0 || !(0.0..=MAX_EXACT).contains(&n) {
            return Err(FormatError::Malformed {
                format: FORMAT,
                reason: format!("tract {}: point count {n} is not a count", counts.len()),
            });
        }
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "Checked to be a small non-negative integer above."
        )]
        let n = n as usize;
        let _seed = c.f32(Endian::Big, "seed index")?;
        if c.remaining() < n * 12 {
            return Err(FormatError::InconsistentCounts {
                format: FORMAT,
                reason: format!(
                    "tract {} declares {n} points, {} bytes remain",
                    counts.len(),
                    c.remaining()
                ),
            });
        }
        for _ in 0..n {
            let x = c.f32(Endian::Big, "x")?;
            let y = c.f32(Endian::Big, "y")?;
            let z = c.f32(Endian::Big, "z")?;
            points.push(Vec3::new(x, y, z));
        }
        counts.push(n);
    }
    Ok(ParsedFibers::from_counts(points, &counts))
}

pub(super) fn write(data: &ExportData, _geometry: &VolumeGeometry) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 * (2 * data.counts.len() + 3 * data.points.len()));
    for line in data.lines() {
        #[allow(
            clippy::cast_precision_loss,
            reason = "Camino stores counts as floats."
        )]
        let n = line.len() as f32;
        out.extend_from_slice(&n.to_be_bytes());
        out.extend_from_slice(&0.0_f32.to_be_bytes());
        for p in line {
            for v in p.to_array() {
                out.extend_from_slice(&v.to_be_bytes());
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
    fn count_beyond_data_is_rejected() {
        let mut bytes = Vec::new();
        for v in [5.0_f32, 0.0, 1.0, 2.0, 3.0] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        assert!(matches!(
            parse(&bytes),
            Err(FormatError::InconsistentCounts { .. })
        ));
        assert!(matches!(parse(&bytes[..7]), Err(FormatError::Truncated { .. })));
    }

    #[test]
    fn fractional_count_is_rejected() {
        let bytes: Vec<u8> = [1.5_f32, 0.0].iter().flat_map(|v| v.to_be_bytes()).collect();
        assert!(matches!(parse(&bytes), Err(FormatError::Malformed { .. })));
    }
}
