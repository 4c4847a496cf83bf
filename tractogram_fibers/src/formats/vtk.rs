// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Legacy VTK polydata, ASCII or big-endian binary.
//!
//! Only `POINTS`, `LINES` and `POINT_DATA` (`COLOR_SCALARS`, `SCALARS`) are
//! read; parsing stops quietly at the first other section. Lines may index
//! the points in any order, so points and their attributes are copied into
//! line order.

use std::fmt::Write as _;

use glam::Vec3;

use super::reader::{Cursor, Endian};
use super::{ExportData, FiberFormat, ParsedFibers, PointScalars, count_to_i32};
use crate::error::FormatError;
use crate::types::{Rgb, VolumeGeometry};

const MAGIC: &str = "# vtk DataFile";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    Binary,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ValueType {
    Float,
    Double,
    UnsignedChar,
}

impl ValueType {
    fn parse(format: FiberFormat, s: &str) -> Result<Self, FormatError> {
        match s.to_ascii_lowercase().as_str() {
            "float" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            "unsigned_char" => Ok(Self::UnsignedChar),
            other => Err(FormatError::Unsupported {
                format,
                reason: format!("value type `{other}`"),
            }),
        }
    }
}

struct Reader<'a> {
    c: Cursor<'a>,
    encoding: Encoding,
    format: FiberFormat,
}

impl Reader<'_> {
    fn value(&mut self, ty: ValueType, what: &str) -> Result<f32, FormatError> {
        if self.encoding == Encoding::Ascii {
            return self.c.parse_f32(what);
        }
        Ok(match ty {
            ValueType::Float => self.c.f32(Endian::Big, what)?,
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Coordinates are stored as f32."
            )]
            ValueType::Double => self.c.f64(Endian::Big, what)? as f32,
            ValueType::UnsignedChar => f32::from(self.c.u8(what)?),
        })
    }

    fn int(&mut self, what: &str) -> Result<usize, FormatError> {
        if self.encoding == Encoding::Ascii {
            return self.c.parse_usize(what);
        }
        let v = self.c.i32(Endian::Big, what)?;
        super::count_from_i32(self.format, what, v)
    }

    fn inconsistent(&self, reason: String) -> FormatError {
        FormatError::InconsistentCounts {
            format: self.format,
            reason,
        }
    }

    fn header_usize(&self, tok: Option<&str>, what: &str) -> Result<usize, FormatError> {
        let tok = tok.ok_or_else(|| self.c.malformed(format!("missing {what}")))?;
        tok.parse()
            .map_err(|_| self.c.malformed(format!("{what}: `{tok}` is not an integer")))
    }
}

pub(super) fn parse(bytes: &[u8]) -> Result<ParsedFibers, FormatError> {
    let mut c = Cursor::new(bytes, FiberFormat::VtkAscii);
    let magic = c.line()?.unwrap_or_default();
    if !magic.starts_with(MAGIC) {
        return Err(FormatError::BadHeader {
            format: FiberFormat::VtkAscii,
            reason: "missing `# vtk DataFile` line".into(),
        });
    }
    let _title = c.line()?;
    let enc_line = c.line()?.unwrap_or_default().trim();
    let (encoding, format) = if enc_line.eq_ignore_ascii_case("ASCII") {
        (Encoding::Ascii, FiberFormat::VtkAscii)
    } else if enc_line.eq_ignore_ascii_case("BINARY") {
        (Encoding::Binary, FiberFormat::VtkBinary)
    } else {
        return Err(FormatError::BadHeader {
            format: FiberFormat::VtkAscii,
            reason: format!("expected ASCII or BINARY, found `{enc_line}`"),
        });
    };
    let mut c = Cursor::new(bytes, format);
    for _ in 0..3 {
        c.line()?;
    }
    let mut r = Reader {
        c,
        encoding,
        format,
    };

    let dataset = r.c.content_line()?.unwrap_or_default();
    let mut words = dataset.split_whitespace();
    if !words.next().is_some_and(|w| w.eq_ignore_ascii_case("DATASET")) {
        return Err(FormatError::BadHeader {
            format,
            reason: format!("expected DATASET, found `{dataset}`"),
        });
    }
    match words.next() {
        Some(kind) if kind.eq_ignore_ascii_case("POLYDATA") => {}
        other => {
            return Err(FormatError::Unsupported {
                format,
                reason: format!("dataset type `{}`", other.unwrap_or("")),
            });
        }
    }

    let mut raw_points: Option<Vec<Vec3>> = None;
    let mut lines: Option<Vec<Vec<usize>>> = None;
    let mut raw_colors: Option<Vec<Rgb>> = None;
    let mut raw_scalars: Option<PointScalars> = None;

    while let Some(header) = r.c.content_line()? {
        let mut words = header.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_ascii_uppercase();
        match keyword.as_str() {
            "POINTS" => {
                let n = r.header_usize(words.next(), "point count")?;
                let ty = ValueType::parse(format, words.next().unwrap_or("float"))?;
                let mut pts = Vec::with_capacity(n.min(r.c.remaining()));
                for _ in 0..n {
                    let x = r.value(ty, "point x")?;
                    let y = r.value(ty, "point y")?;
                    let z = r.value(ty, "point z")?;
                    pts.push(Vec3::new(x, y, z));
                }
                raw_points = Some(pts);
            }
            "LINES" => {
                let Some(points) = &raw_points else {
                    return Err(r.c.malformed("LINES before POINTS".into()));
                };
                let npoints = points.len();
                let nlines = r.header_usize(words.next(), "line count")?;
                let size = r.header_usize(words.next(), "line table size")?;
                let mut table = Vec::with_capacity(nlines.min(r.c.remaining()));
                let mut consumed = 0_usize;
                for line in 0..nlines {
                    let n = r.int("line point count")?;
                    consumed = match n.checked_add(1).and_then(|k| consumed.checked_add(k)) {
                        Some(c) if c <= size => c,
                        _ => {
                            return Err(r.inconsistent(format!(
                                "line {line} runs past the declared table size {size}"
                            )));
                        }
                    };
                    let mut ids = Vec::with_capacity(n.min(r.c.remaining()));
                    for _ in 0..n {
                        let id = r.int("point id")?;
                        if id >= npoints {
                            return Err(r.inconsistent(format!(
                                "line {line} refers to point {id}, only {npoints} declared"
                            )));
                        }
                        ids.push(id);
                    }
                    table.push(ids);
                }
                if consumed != size {
                    return Err(r.inconsistent(format!(
                        "line table size is {size}, lines use {consumed}"
                    )));
                }
                lines = Some(table);
            }
            "POINT_DATA" => {
                let n = r.header_usize(words.next(), "point data count")?;
                let declared = raw_points.as_ref().map_or(0, Vec::len);
                if n != declared {
                    return Err(r.inconsistent(format!(
                        "POINT_DATA {n} for {declared} points"
                    )));
                }
            }
            "COLOR_SCALARS" => {
                let n = raw_points.as_ref().map_or(0, Vec::len);
                let _name = words.next();
                let comps = r.header_usize(words.next(), "color components")?;
                if !(3..=4).contains(&comps) {
                    return Err(FormatError::Unsupported {
                        format,
                        reason: format!("{comps} color components"),
                    });
                }
                let ty = match encoding {
                    Encoding::Ascii => ValueType::Float,
                    Encoding::Binary => ValueType::UnsignedChar,
                };
                let scale = if ty == ValueType::UnsignedChar { 255.0 } else { 1.0 };
                let mut colors = Vec::with_capacity(n);
                for _ in 0..n {
                    let mut rgb = [0.0; 3];
                    for slot in &mut rgb {
                        *slot = r.value(ty, "color")? / scale;
                    }
                    if comps == 4 {
                        r.value(ty, "alpha")?;
                    }
                    colors.push(rgb);
                }
                raw_colors = Some(colors);
            }
            "SCALARS" => {
                let n = raw_points.as_ref().map_or(0, Vec::len);
                let name = words.next().unwrap_or_default().to_owned();
                let ty = ValueType::parse(format, words.next().unwrap_or("float"))?;
                let comps = match words.next() {
                    Some(t) => r.header_usize(Some(t), "scalar components")?,
                    None => 1,
                };
                if !(1..=4).contains(&comps) {
                    return Err(FormatError::Unsupported {
                        format,
                        reason: format!("{comps} scalar components"),
                    });
                }
                let lut = r.c.content_line()?.unwrap_or_default();
                if !lut.to_ascii_uppercase().starts_with("LOOKUP_TABLE") {
                    return Err(r.c.malformed(format!("expected LOOKUP_TABLE, found `{lut}`")));
                }
                let total = n
                    .checked_mul(comps)
                    .ok_or_else(|| r.inconsistent(format!("{n} points of {comps} scalars")))?;
                let mut values = Vec::with_capacity(total.min(r.c.remaining()));
                for _ in 0..total {
                    values.push(r.value(ty, "scalar")?);
                }
                raw_scalars = Some(PointScalars {
                    names: vec![name],
                    per_point: comps,
                    values,
                });
            }
            _ => break,
        }
    }

    let raw_points = raw_points.ok_or_else(|| r.c.malformed("no POINTS section".into()))?;
    let lines = lines.ok_or_else(|| r.c.malformed("no LINES section".into()))?;

    let total: usize = lines.iter().map(Vec::len).sum();
    let counts: Vec<usize> = lines.iter().map(Vec::len).collect();
    let order = lines.into_iter().flatten();
    let mut points = Vec::with_capacity(total);
    let mut colors = raw_colors.as_ref().map(|_| Vec::with_capacity(total));
    let mut scalars = raw_scalars.as_ref().map(|s| PointScalars {
        names: s.names.clone(),
        per_point: s.per_point,
        values: Vec::with_capacity(total * s.per_point),
    });
    for id in order {
        points.push(raw_points[id]);
        if let (Some(out), Some(src)) = (&mut colors, &raw_colors) {
            out.push(src[id]);
        }
        if let (Some(out), Some(src)) = (&mut scalars, &raw_scalars) {
            out.values.extend_from_slice(src.point(id));
        }
    }
    let mut parsed = ParsedFibers::from_counts(points, &counts);
    parsed.colors = colors;
    parsed.scalars = scalars;
    Ok(parsed)
}

fn header(out: &mut Vec<u8>, encoding: &str, data: &ExportData) {
    let mut s = String::new();
    let _ = writeln!(s, "# vtk DataFile Version 3.0");
    let _ = writeln!(s, "tractogram export");
    let _ = writeln!(s, "{encoding}");
    let _ = writeln!(s, "DATASET POLYDATA");
    let _ = writeln!(s, "POINTS {} float", data.points.len());
    out.extend_from_slice(s.as_bytes());
}

fn lines_header(data: &ExportData) -> String {
    format!(
        "LINES {} {}\n",
        data.counts.len(),
        data.counts.len() + data.points.len()
    )
}

fn colors_header(data: &ExportData) -> String {
    format!(
        "POINT_DATA {}\nCOLOR_SCALARS colors 3\n",
        data.points.len()
    )
}

pub(super) fn write_ascii(data: &ExportData, _geometry: &VolumeGeometry) -> Vec<u8> {
    let mut out = Vec::new();
    header(&mut out, "ASCII", data);
    let mut s = String::new();
    for p in &data.points {
        let _ = writeln!(s, "{} {} {}", p.x, p.y, p.z);
    }
    s.push_str(&lines_header(data));
    let mut next = 0;
    for &n in &data.counts {
        let _ = write!(s, "{n}");
        for id in next..next + n {
            let _ = write!(s, " {id}");
        }
        s.push('\n');
        next += n;
    }
    if !data.colors.is_empty() {
        s.push_str(&colors_header(data));
        for c in &data.colors {
            let _ = writeln!(s, "{} {} {}", c[0], c[1], c[2]);
        }
    }
    out.extend_from_slice(s.as_bytes());
    out
}

pub(super) fn write_binary(data: &ExportData, _geometry: &VolumeGeometry) -> Vec<u8> {
    let mut out = Vec::new();
    header(&mut out, "BINARY", data);
    for p in &data.points {
        for v in p.to_array() {
            out.extend_from_slice(&v.to_be_bytes());
        }
    }
    out.push(b'\n');
    out.extend_from_slice(lines_header(data).as_bytes());
    let mut next = 0;
    for &n in &data.counts {
        out.extend_from_slice(&count_to_i32(n).to_be_bytes());
        for id in next..next + n {
            out.extend_from_slice(&count_to_i32(id).to_be_bytes());
        }
        next += n;
    }
    out.push(b'\n');
    if !data.colors.is_empty() {
        out.extend_from_slice(colors_header(data).as_bytes());
        for c in &data.colors {
            for v in c {
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    reason = "Clamped to the byte range first."
                )]
                out.push((v.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }
        out.push(b'\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::{assert_round_trip, sample_export};

    const SHUFFLED: &[u8] = b"# vtk DataFile Version 3.0
fibers
ASCII
DATASET POLYDATA
POINTS 4 float
0 0 0  1 1 1  2 2 2  3 3 3
LINES 2 7
2 3 0
3 1 2 3
POINT_DATA 4
COLOR_SCALARS rgb 3
1 0 0  0 1 0  0 0 1  1 1 1
CELL_DATA 2
";

    #[test]
    fn lines_are_copied_into_line_order() {
        let p = parse(SHUFFLED).unwrap();
        assert_eq!(p.line_pointers, [0, 2, 5]);
        assert_eq!(p.points[0], Vec3::splat(3.0));
        assert_eq!(p.points[1], Vec3::ZERO);
        assert_eq!(p.points[4], Vec3::splat(3.0));
        let colors = p.colors.unwrap();
        assert_eq!(colors[0], [1.0, 1.0, 1.0]);
        assert_eq!(colors[1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn line_past_declared_points_is_rejected() {
        let text = b"# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\n\
POINTS 2 float\n0 0 0 1 1 1\nLINES 1 4\n3 0 1 2\n";
        assert!(matches!(
            parse(text),
            Err(FormatError::InconsistentCounts { .. })
        ));
    }

    #[test]
    fn oversized_line_count_is_rejected() {
        let text = b"# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\n\
POINTS 2 float\n0 0 0 1 1 1\nLINES 1 4\n18446744073709551615 0 1\n";
        assert!(matches!(
            parse(text),
            Err(FormatError::InconsistentCounts { .. })
        ));
    }

    #[test]
    fn oversized_scalar_components_are_rejected() {
        let text = b"# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\n\
POINTS 2 float\n0 0 0 1 1 1\nLINES 1 3\n2 0 1\nPOINT_DATA 2\n\
SCALARS s float 9223372036854775808\nLOOKUP_TABLE default\n0 1\n";
        assert!(matches!(parse(text), Err(FormatError::Unsupported { .. })));
    }

    #[test]
    fn scalars_with_components_are_read() {
        let text = b"# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\n\
POINTS 2 float\n0 0 0 1 1 1\nLINES 1 3\n2 0 1\nPOINT_DATA 2\n\
SCALARS fa float 2\nLOOKUP_TABLE default\n0.1 0.2 0.3 0.4\n";
        let p = parse(text).unwrap();
        let s = p.scalars.unwrap();
        assert_eq!(s.per_point, 2);
        assert_eq!(s.values, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn truncated_binary_is_rejected() {
        let bytes = write_binary(&sample_export(), &VolumeGeometry::default());
        let err = parse(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(
            matches!(
                err,
                FormatError::Truncated { .. } | FormatError::Malformed { .. }
            ),
            "{err}"
        );
    }

    #[test]
    fn unsupported_dataset_type() {
        let text = b"# vtk DataFile Version 3.0\nt\nASCII\nDATASET STRUCTURED_POINTS\n";
        assert!(matches!(parse(text), Err(FormatError::Unsupported { .. })));
    }

    #[test]
    fn both_encodings_round_trip() {
        let data = sample_export();
        let p = assert_round_trip(FiberFormat::VtkAscii, &data);
        assert_eq!(p.colors.as_deref(), Some(&data.colors[..]));
        let p = assert_round_trip(FiberFormat::VtkBinary, &data);
        let c = p.colors.unwrap()[0];
        assert!((c[1] - 0.25).abs() < 1.0 / 255.0);
    }
}
