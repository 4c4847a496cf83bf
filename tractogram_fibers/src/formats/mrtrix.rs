// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! MRtrix `.tck`: a `key: value` text header closed by `END`, then `f32`
//! triples at the offset named by `file: . <offset>`. A NaN triple ends a
//! track and an infinite triple ends the data.

use std::fmt::Write as _;

use glam::Vec3;

use super::reader::{Cursor, Endian};
use super::{ExportData, FiberFormat, ParsedFibers};
use crate::error::FormatError;
use crate::types::VolumeGeometry;

const FORMAT: FiberFormat = FiberFormat::Mrtrix;
const MAGIC: &str = "mrtrix tracks";

fn bad_header(reason: impl Into<String>) -> FormatError {
    FormatError::BadHeader {
        format: FORMAT,
        reason: reason.into(),
    }
}

#[derive(Debug, Default)]
struct Header {
    endian: Option<Endian>,
    offset: Option<usize>,
    count: Option<usize>,
}

fn parse_header(c: &mut Cursor<'_>) -> Result<Header, FormatError> {
    if c.line()?.map(str::trim) != Some(MAGIC) {
        return Err(bad_header("missing `mrtrix tracks` line"));
    }
    let mut header = Header::default();
    loop {
        let Some(line) = c.line()? else {
            return Err(FormatError::Truncated {
                format: FORMAT,
                detail: "header has no END line".into(),
            });
        };
        let line = line.trim();
        if line == "END" {
            return Ok(header);
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "datatype" => {
                header.endian = Some(match value {
                    "Float32LE" => Endian::Little,
                    "Float32BE" => Endian::Big,
                    other => {
                        return Err(FormatError::Unsupported {
                            format: FORMAT,
                            reason: format!("datatype {other}"),
                        });
                    }
                });
            }
            "file" => {
                let mut parts = value.split_whitespace();
                if parts.next() != Some(".") {
                    return Err(FormatError::Unsupported {
                        format: FORMAT,
                        reason: format!("detached data file `{value}`"),
                    });
                }
                let offset = parts
                    .next()
                    .and_then(|o| o.parse().ok())
                    .ok_or_else(|| bad_header(format!("bad data offset in `{value}`")))?;
                header.offset = Some(offset);
            }
            "count" => header.count = value.parse().ok(),
            _ => {}
        }
    }
}

pub(super) fn parse(bytes: &[u8]) -> Result<ParsedFibers, FormatError> {
    let mut c = Cursor::new(bytes, FORMAT);
    let header = parse_header(&mut c)?;
    let endian = header.endian.ok_or_else(|| bad_header("no datatype"))?;
    let offset = header.offset.ok_or_else(|| bad_header("no `file:` entry"))?;
    if offset < c.position() {
        return Err(bad_header(format!(
            "data offset {offset} lies inside the header"
        )));
    }
    c.seek(offset)?;

    let mut points = Vec::with_capacity(c.remaining() / 12);
    let mut counts = Vec::new();
    let mut pending = 0;
    let mut terminated = false;
    while c.remaining() >= 12 {
        let x = c.f32(endian, "x")?;
        let y = c.f32(endian, "y")?;
        let z = c.f32(endian, "z")?;
        if x.is_infinite() {
            terminated = true;
            break;
        }
        if x.is_nan() {
            counts.push(pending);
            pending = 0;
        } else {
            points.push(Vec3::new(x, y, z));
            pending += 1;
        }
    }
    if pending > 0 {
        return Err(FormatError::Truncated {
            format: FORMAT,
            detail: format!("last track ends after {pending} points without a delimiter"),
        });
    }
    if !terminated && !c.is_at_end() {
        return Err(FormatError::Truncated {
            format: FORMAT,
            detail: format!("{} trailing bytes", c.remaining()),
        });
    }
    if let Some(count) = header.count
        && count != counts.len()
    {
        return Err(FormatError::InconsistentCounts {
            format: FORMAT,
            reason: format!("header count {count}, file holds {} tracks", counts.len()),
        });
    }
    Ok(ParsedFibers::from_counts(points, &counts))
}

fn header_text(count: usize, offset: usize) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "{MAGIC}");
    let _ = writeln!(s, "datatype: Float32LE");
    let _ = writeln!(s, "count: {count}");
    let _ = writeln!(s, "file: . {offset}");
    let _ = writeln!(s, "END");
    s
}

pub(super) fn write(data: &ExportData, _geometry: &VolumeGeometry) -> Vec<u8> {
    // The offset is part of the header it points past; iterate to the fixed point.
    let mut offset = 0;
    let mut header = header_text(data.counts.len(), offset);
    while header.len() != offset {
        offset = header.len();
        header = header_text(data.counts.len(), offset);
    }
    let mut out = header.into_bytes();
    let triple = |out: &mut Vec<u8>, v: [f32; 3]| {
        for x in v {
            out.extend_from_slice(&x.to_le_bytes());
        }
    };
    for line in data.lines() {
        for p in line {
            triple(&mut out, p.to_array());
        }
        triple(&mut out, [f32::NAN; 3]);
    }
    triple(&mut out, [f32::INFINITY; 3]);
    out
}
