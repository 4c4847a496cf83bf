// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plain text fibers: `N`, then per line `n x0 y0 z0 ... x(n-1) y(n-1) z(n-1)`.
//! `#` comments run to end of line.

use std::fmt::Write as _;

use glam::Vec3;

use super::reader::Cursor;
use super::{ExportData, FiberFormat, ParsedFibers};
use crate::error::FormatError;
use crate::types::VolumeGeometry;

const FORMAT: FiberFormat = FiberFormat::AsciiFibers;

pub(super) fn parse(bytes: &[u8]) -> Result<ParsedFibers, FormatError> {
    let mut c = Cursor::new(bytes, FORMAT).with_comments();
    let lines = c.parse_usize("line count")?;
    let mut points = Vec::new();
    let mut counts = Vec::with_capacity(lines.min(1 << 20));
    for line in 0..lines {
        let n = c.token()?.ok_or_else(|| FormatError::InconsistentCounts {
            format: FORMAT,
            reason: format!("header declares {lines} lines, data ends after {line}"),
        })?;
        let n: usize = n.parse().map_err(|_| FormatError::Malformed {
            format: FORMAT,
            reason: format!("line {line}: point count `{n}` is not an integer"),
        })?;
        for _ in 0..n {
            let x = c.parse_f32("x")?;
            let y = c.parse_f32("y")?;
            let z = c.parse_f32("z")?;
            points.push(Vec3::new(x, y, z));
        }
        counts.push(n);
    }
    if let Some(extra) = c.token()? {
        return Err(FormatError::InconsistentCounts {
            format: FORMAT,
            reason: format!("unexpected `{extra}` after {lines} lines"),
        });
    }
    Ok(ParsedFibers::from_counts(points, &counts))
}

pub(super) fn write(data: &ExportData, _geometry: &VolumeGeometry) -> Vec<u8> {
    let mut out = String::new();
    let _ = writeln!(out, "{}", data.counts.len());
    for line in data.lines() {
        let _ = writeln!(out, "{}", line.len());
        for p in line {
            let _ = writeln!(out, "{} {} {}", p.x, p.y, p.z);
        }
    }
    out.into_bytes()
}
