// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Load and filter.
//!
//! Write a small TrackVis file, load it back, filter by length and
//! subsampling, recolor and save the visible subset as VTK.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p tractogram_demos --example load_and_filter`
//! - `cargo run -p tractogram_demos --example load_and_filter -- path/to/file.trk`

use glam::Vec3;
use tractogram_fibers::{
    ColorationMode, FiberFormat, Fibers, FilterParams, SaveScope, VolumeGeometry,
};
use tracing_subscriber::EnvFilter;

fn spiral(turns: usize, radius: f32, z0: f32) -> Vec<Vec3> {
    (0..turns * 16)
        .map(|i| {
            let a = i as f32 * core::f32::consts::TAU / 16.0;
            Vec3::new(radius * a.cos() + 40.0, radius * a.sin() + 40.0, z0 + i as f32 * 0.5)
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let dir = tempfile::tempdir()?;
    let path = match std::env::args().nth(1) {
        Some(p) => p.into(),
        None => {
            let lines: Vec<Vec<Vec3>> = (1..=40)
                .map(|i| spiral(1 + i % 4, 2.0 + i as f32 * 0.5, 10.0))
                .collect();
            let mut seed = Fibers::from_lines(lines);
            seed.set_volume_geometry(VolumeGeometry {
                columns: 80,
                rows: 80,
                frames: 60,
                voxel_size: [1.0; 3],
            })?;
            let path = dir.path().join("spirals.trk");
            seed.save(&path, FiberFormat::TrackVis, SaveScope::All)?;
            path
        }
    };

    let mut fibers = Fibers::open(&path)?;
    println!(
        "{}: {} lines, {} points, lengths {:.1}..{:.1}",
        path.display(),
        fibers.line_count(),
        fibers.point_count(),
        fibers.min_length(),
        fibers.max_length()
    );

    let mid = (fibers.min_length() + fibers.max_length()) / 2.0;
    fibers.set_filter(FilterParams {
        min_length: mid,
        max_length: fibers.max_length(),
        min_subsampling: 0,
        max_subsampling: 49,
    })?;
    println!("visible after filter: {:?}", fibers.visible_lines());

    fibers.set_coloration_mode(ColorationMode::Curvature);
    println!("first color: {:?}", fibers.colors().first());

    let out = dir.path().join("visible.vtk");
    fibers.save(&out, FiberFormat::VtkBinary, SaveScope::Visible)?;
    let reloaded = Fibers::open(&out)?;
    assert_eq!(reloaded.line_count(), fibers.visible_lines().len());
    println!("saved {} visible lines to {}", reloaded.line_count(), out.display());
    Ok(())
}
