// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Convert formats.
//!
//! Save one dataset in every supported format, reopen each file through
//! format detection, and check a volume query agrees across backends.
//!
//! Run:
//! - `RUST_LOG=info cargo run -p tractogram_demos --example convert_formats`

use glam::Vec3;
use tractogram_fibers::{FiberFormat, Fibers, FibersConfig, SaveScope};
use tractogram_index::{Aabb3D, IndexKind, Volume};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let lines: Vec<Vec<Vec3>> = (0..12)
        .map(|i| {
            let a = i as f32 * 0.5;
            (0..30)
                .map(|t| Vec3::new(t as f32, a.sin() * t as f32 * 0.3, a.cos() * 5.0))
                .collect()
        })
        .collect();
    let fibers = Fibers::from_lines(lines);
    let dir = tempfile::tempdir()?;
    let query = Volume::Box(Aabb3D::new(10.0, -2.0, -6.0, 12.0, 2.0, 6.0));

    for format in FiberFormat::ALL {
        let path = dir.path().join(format!("fibers.{}", format.extension()));
        fibers.save(&path, format, SaveScope::All)?;
        let mut back = Fibers::open(&path)?;
        let hits = back.lines_in_volume(&query).iter().filter(|&&h| h).count();
        println!(
            "{:<14} detected as {:<14} {} lines, {} in query box",
            format.to_string(),
            back.source_format().map_or("?".to_string(), |f| f.to_string()),
            back.line_count(),
            hits
        );
    }

    for kind in [IndexKind::KdTree, IndexKind::Octree, IndexKind::FlatVec] {
        let mut f = Fibers::from_parts(fibers.points().to_vec(), fibers.line_pointers().to_vec())?
            .with_config(FibersConfig {
                index_kind: kind,
                ..FibersConfig::default()
            });
        let hits: Vec<usize> = f
            .lines_in_volume(&query)
            .iter()
            .enumerate()
            .filter_map(|(l, &h)| h.then_some(l))
            .collect();
        println!("{kind:?}: {hits:?}");
    }
    Ok(())
}
