// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! TrackVis `.trk`: a 1000-byte header followed by one record per track.
//!
//! Byte order is whatever makes `hdr_size` read as 1000. Per-point scalars are
//! kept; per-track properties are skipped. Files are always written
//! little-endian, version 2.

use glam::Vec3;

use super::reader::{Cursor, Endian};
use super::{ExportData, FiberFormat, ParsedFibers, PointScalars, count_from_i32, count_to_i32};
use crate::error::FormatError;
use crate::types::VolumeGeometry;

const FORMAT: FiberFormat = FiberFormat::TrackVis;
const HEADER_SIZE: usize = 1000;
const MAGIC: &[u8; 6] = b"TRACK\0";
const NAME_LEN: usize = 20;
const MAX_NAMES: usize = 10;

mod offset {
    pub(super) const DIM: usize = 6;
    pub(super) const VOXEL_SIZE: usize = 12;
    pub(super) const N_SCALARS: usize = 36;
    pub(super) const SCALAR_NAMES: usize = 38;
    pub(super) const N_PROPERTIES: usize = 238;
    pub(super) const VOX_TO_RAS: usize = 440;
    pub(super) const VOXEL_ORDER: usize = 948;
    pub(super) const N_COUNT: usize = 988;
    pub(super) const VERSION: usize = 992;
    pub(super) const HDR_SIZE: usize = 996;
}

fn bad_header(reason: impl Into<String>) -> FormatError {
    FormatError::BadHeader {
        format: FORMAT,
        reason: reason.into(),
    }
}

fn i16_at(header: &[u8], at: usize, endian: Endian) -> i16 {
    let b = [header[at], header[at + 1]];
    match endian {
        Endian::Little => i16::from_le_bytes(b),
        Endian::Big => i16::from_be_bytes(b),
    }
}

fn i32_at(header: &[u8], at: usize, endian: Endian) -> i32 {
    let b = [header[at], header[at + 1], header[at + 2], header[at + 3]];
    match endian {
        Endian::Little => i32::from_le_bytes(b),
        Endian::Big => i32::from_be_bytes(b),
    }
}

fn f32_at(header: &[u8], at: usize, endian: Endian) -> f32 {
    f32::from_bits(i32_at(header, at, endian).cast_unsigned())
}

fn name_at(header: &[u8], i: usize) -> String {
    let start = offset::SCALAR_NAMES + i * NAME_LEN;
    let raw = &header[start..start + NAME_LEN];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

pub(super) fn parse(bytes: &[u8]) -> Result<ParsedFibers, FormatError> {
    let mut c = Cursor::new(bytes, FORMAT);
    let header = c.take(HEADER_SIZE, "header")?;
    if &header[..MAGIC.len()] != MAGIC {
        return Err(bad_header("missing TRACK magic"));
    }
    let endian = if i32_at(header, offset::HDR_SIZE, Endian::Little) == 1000 {
        Endian::Little
    } else if i32_at(header, offset::HDR_SIZE, Endian::Big) == 1000 {
        Endian::Big
    } else {
        return Err(bad_header("hdr_size is not 1000 in either byte order"));
    };
    let version = i32_at(header, offset::VERSION, endian);
    if !(1..=3).contains(&version) {
        return Err(FormatError::Unsupported {
            format: FORMAT,
            reason: format!("version {version}"),
        });
    }
    let n_scalars = usize::try_from(i16_at(header, offset::N_SCALARS, endian))
        .map_err(|_| bad_header("negative n_scalars"))?;
    let n_properties = usize::try_from(i16_at(header, offset::N_PROPERTIES, endian))
        .map_err(|_| bad_header("negative n_properties"))?;
    let n_count = count_from_i32(FORMAT, "n_count", i32_at(header, offset::N_COUNT, endian))?;

    let dims: Vec<i16> = (0..3)
        .map(|k| i16_at(header, offset::DIM + 2 * k, endian))
        .collect();
    let voxel_size = [0, 1, 2].map(|k| f32_at(header, offset::VOXEL_SIZE + 4 * k, endian));
    let geometry = match (
        u32::try_from(dims[0]),
        u32::try_from(dims[1]),
        u32::try_from(dims[2]),
    ) {
        (Ok(columns), Ok(rows), Ok(frames)) => Some(VolumeGeometry {
            columns,
            rows,
            frames,
            voxel_size,
        })
        .filter(|g| g.validate().is_ok()),
        _ => None,
    };

    let mut points = Vec::new();
    let mut counts = Vec::new();
    let mut scalar_values = Vec::new();
    // n_count == 0 means the count was not stored: read to end of file.
    while (n_count == 0 && !c.is_at_end()) || (n_count > 0 && counts.len() < n_count) {
        let track = counts.len();
        let m = c.i32(endian, "track point count").map_err(|e| match e {
            FormatError::Truncated { .. } if n_count > 0 => FormatError::InconsistentCounts {
                format: FORMAT,
                reason: format!("header declares {n_count} tracks, file holds {track}"),
            },
            e => e,
        })?;
        let m = count_from_i32(FORMAT, "track point count", m)?;
        for _ in 0..m {
            let x = c.f32(endian, "x")?;
            let y = c.f32(endian, "y")?;
            let z = c.f32(endian, "z")?;
            points.push(Vec3::new(x, y, z));
            for _ in 0..n_scalars {
                scalar_values.push(c.f32(endian, "scalar")?);
            }
        }
        c.take(4 * n_properties, "track properties")?;
        counts.push(m);
    }

    let mut parsed = ParsedFibers::from_counts(points, &counts);
    parsed.geometry = geometry;
    if n_scalars > 0 {
        parsed.scalars = Some(PointScalars {
            names: (0..n_scalars)
                .map(|i| if i < MAX_NAMES { name_at(header, i) } else { String::new() })
                .collect(),
            per_point: n_scalars,
            values: scalar_values,
        });
    }
    Ok(parsed)
}

fn put(out: &mut [u8], at: usize, bytes: &[u8]) {
    out[at..at + bytes.len()].copy_from_slice(bytes);
}

pub(super) fn write(data: &ExportData, geometry: &VolumeGeometry) -> Vec<u8> {
    let mut header = vec![0_u8; HEADER_SIZE];
    put(&mut header, 0, MAGIC);
    for (k, d) in [geometry.columns, geometry.rows, geometry.frames]
        .into_iter()
        .enumerate()
    {
        let d = i16::try_from(d).unwrap_or(i16::MAX);
        put(&mut header, offset::DIM + 2 * k, &d.to_le_bytes());
    }
    for (k, v) in geometry.voxel_size.into_iter().enumerate() {
        put(&mut header, offset::VOXEL_SIZE + 4 * k, &v.to_le_bytes());
    }
    let (n_scalars, names) = match &data.scalars {
        Some(s) => (s.per_point, s.names.as_slice()),
        None => (0, &[][..]),
    };
    let n_scalars_field = i16::try_from(n_scalars).unwrap_or(i16::MAX);
    put(&mut header, offset::N_SCALARS, &n_scalars_field.to_le_bytes());
    for (i, name) in names.iter().take(MAX_NAMES).enumerate() {
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_LEN - 1);
        put(&mut header, offset::SCALAR_NAMES + i * NAME_LEN, &bytes[..len]);
    }
    for k in 0..4 {
        let v = if k < 3 { geometry.voxel_size[k] } else { 1.0 };
        put(&mut header, offset::VOX_TO_RAS + 4 * (5 * k), &v.to_le_bytes());
    }
    put(&mut header, offset::VOXEL_ORDER, b"RAS\0");
    put(
        &mut header,
        offset::N_COUNT,
        &count_to_i32(data.counts.len()).to_le_bytes(),
    );
    put(&mut header, offset::VERSION, &2_i32.to_le_bytes());
    put(&mut header, offset::HDR_SIZE, &1000_i32.to_le_bytes());

    let mut out = header;
    out.reserve(data.counts.len() * 4 + data.points.len() * 4 * (3 + n_scalars));
    let mut next = 0;
    for line in data.lines() {
        out.extend_from_slice(&count_to_i32(line.len()).to_le_bytes());
        for p in line {
            for v in p.to_array() {
                out.extend_from_slice(&v.to_le_bytes());
            }
            if let Some(s) = &data.scalars {
                for v in s.point(next) {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
            next += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::{assert_round_trip, sample_export};

    #[test]
    fn round_trip_keeps_points_scalars_and_grid() {
        let mut data = sample_export();
        data.scalars = Some(PointScalars {
            names: vec!["fa".into(), "md".into()],
            per_point: 2,
            values: (0..10).map(|i| i as f32 * 0.5).collect(),
        });
        let geometry = VolumeGeometry {
            columns: 96,
            rows: 128,
            frames: 60,
            voxel_size: [2.0, 2.0, 2.5],
        };
        let bytes = write(&data, &geometry);
        assert_eq!(&bytes[..6], MAGIC);
        let p = parse(&bytes).unwrap();
        assert_eq!(p.points, data.points);
        assert_eq!(p.line_pointers, [0, 3, 5]);
        assert_eq!(p.geometry, Some(geometry));
        assert_eq!(p.scalars, data.scalars);
        assert_round_trip(FORMAT, &sample_export());
    }

    #[test]
    fn big_endian_header_is_detected() {
        let mut bytes = vec![0_u8; HEADER_SIZE];
        put(&mut bytes, 0, MAGIC);
        put(&mut bytes, offset::N_PROPERTIES, &1_i16.to_be_bytes());
        put(&mut bytes, offset::N_COUNT, &1_i32.to_be_bytes());
        put(&mut bytes, offset::VERSION, &2_i32.to_be_bytes());
        put(&mut bytes, offset::HDR_SIZE, &1000_i32.to_be_bytes());
        bytes.extend_from_slice(&1_i32.to_be_bytes());
        for v in [1.5_f32, -2.0, 3.25, 99.0] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        let p = parse(&bytes).unwrap();
        assert_eq!(p.points, [Vec3::new(1.5, -2.0, 3.25)]);
        assert_eq!(p.geometry, None);
    }

    #[test]
    fn rejects_bad_headers_and_short_files() {
        let good = write(&sample_export(), &VolumeGeometry::default());
        let mut bad = good.clone();
        bad[0] = b'X';
        assert!(matches!(parse(&bad), Err(FormatError::BadHeader { .. })));
        let mut bad = good.clone();
        put(&mut bad, offset::HDR_SIZE, &999_i32.to_le_bytes());
        assert!(matches!(parse(&bad), Err(FormatError::BadHeader { .. })));
        assert!(matches!(
            parse(&good[..500]),
            Err(FormatError::Truncated { .. })
        ));
        assert!(matches!(
            parse(&good[..good.len() - 4]),
            Err(FormatError::Truncated { .. })
        ));
        let mut more = good.clone();
        put(&mut more, offset::N_COUNT, &3_i32.to_le_bytes());
        assert!(matches!(
            parse(&more),
            Err(FormatError::InconsistentCounts { .. })
        ));
    }
}
