// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Select fibers.
//!
//! Build the spatial index in the background, place selection volumes,
//! pick one through a screen-space ray and drag it, and watch the visible
//! set follow.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p tractogram_demos --example select_fibers`

use glam::Vec3;
use kurbo::Point;
use tractogram_fibers::{ColorationMode, Fibers, IndexStatus, SlicePlanes};
use tractogram_selection::{
    CompositionMode, OrthoCaster, RayCaster, SelectionPipeline, SelectionSet, SelectionVolume,
};
use tracing_subscriber::EnvFilter;

/// A grid of straight fibers along x, one per (y, z) cell.
fn grid() -> Vec<Vec<Vec3>> {
    let mut lines = Vec::new();
    for y in 0..10 {
        for z in 0..4 {
            lines.push(
                (0..=20)
                    .map(|x| Vec3::new(x as f32, y as f32 * 2.0, z as f32 * 2.0))
                    .collect(),
            );
        }
    }
    lines
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut fibers = Fibers::from_lines(grid());
    fibers.start_index_build();
    while fibers.poll_index() == IndexStatus::Building {
        std::thread::yield_now();
    }
    println!("index ready: {:?}", fibers.index().stats());

    let mut set = SelectionSet::new();
    let keep = set.insert(SelectionVolume::cuboid(
        Vec3::new(10.0, 5.0, 3.0),
        Vec3::new(4.0, 11.0, 10.0),
    ))?;
    let cut = set.insert(
        SelectionVolume::ellipsoid(Vec3::new(10.0, 4.0, 3.0), Vec3::new(2.0, 3.0, 10.0))
            .with_mode(CompositionMode::Subtract),
    )?;

    fibers.set_coloration_mode(ColorationMode::Distance);
    let mut pipeline = SelectionPipeline::new();
    if let Some(summary) = pipeline.refresh(&mut fibers, &set) {
        println!("{summary:?}");
    }
    println!("visible: {:?}", fibers.visible_lines());

    // Camera looks down -z; one world unit per 10 pixels.
    let caster = OrthoCaster {
        offset: [0.0, 20.0, 50.0],
        scale: 0.1,
    };
    let hit = set
        .pick(&caster, Point::new(100.0, 160.0))
        .ok_or("nothing under the cursor")?;
    println!("picked {:?} at t = {}", hit.id, hit.t);
    assert!(hit.id == keep || hit.id == cut, "pick should land on a placed volume");

    // Drag the picked volume to the far end of the fibers at the same depth.
    let depth = 50.0 - set.get(hit.id).map_or(0.0, |v| v.center.z);
    let target = caster.ray_from_screen_point(Point::new(180.0, 160.0));
    set.drag(hit.id, &target, depth);
    if let Some(summary) = pipeline.refresh(&mut fibers, &set) {
        println!("after drag: {summary:?}");
    }
    println!("visible: {:?}", fibers.visible_lines());

    let planes = SlicePlanes {
        position: Vec3::new(10.0, 0.0, 0.0),
        axial: false,
        coronal: false,
        ..SlicePlanes::default()
    };
    let crossing = fibers.crossing_fibers(&planes)?;
    println!("{} lines cross x = 10", crossing.lines().len());
    Ok(())
}
