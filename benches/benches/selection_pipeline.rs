// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use glam::Vec3;
use tractogram_benches::gen_bundles;
use tractogram_fibers::{Fibers, FilterParams};
use tractogram_selection::{CompositionMode, SelectionPipeline, SelectionSet, SelectionVolume};

fn selection() -> SelectionSet {
    let mut set = SelectionSet::new();
    let volumes = [
        SelectionVolume::cuboid(Vec3::ZERO, Vec3::splat(40.0)),
        SelectionVolume::ellipsoid(Vec3::new(30.0, 0.0, 0.0), Vec3::splat(30.0)),
        SelectionVolume::cuboid(Vec3::new(10.0, 10.0, 0.0), Vec3::splat(10.0))
            .with_mode(CompositionMode::Subtract),
        SelectionVolume::cuboid(Vec3::new(-20.0, 0.0, 0.0), Vec3::splat(10.0))
            .with_mode(CompositionMode::AndNot),
    ];
    for v in volumes {
        let _ = set.insert(v);
    }
    set
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");
    group.sample_size(20);
    let set = selection();
    for lines in [2_000usize, 10_000] {
        let mut fibers = Fibers::from_lines(gen_bundles(lines, 100));
        // Warm the index so only composition is measured.
        let _ = fibers.index();
        let mut pipeline = SelectionPipeline::new();
        group.bench_function(format!("evaluate_{lines}"), |b| {
            b.iter(|| black_box(pipeline.evaluate(&mut fibers, &set)));
        });
    }
    group.finish();
}

fn bench_drag_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection_drag");
    group.sample_size(20);
    let mut fibers = Fibers::from_lines(gen_bundles(5_000, 100));
    let _ = fibers.index();
    let mut pipeline = SelectionPipeline::new();
    group.bench_function("move_then_refresh", |b| {
        b.iter_batched(
            selection,
            |mut set| {
                let Some((id, _)) = set.iter().next() else {
                    return;
                };
                for step in 0..8 {
                    set.set_center(id, Vec3::new(step as f32 * 2.0, 0.0, 0.0));
                    black_box(pipeline.refresh(&mut fibers, &set));
                }
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let mut fibers = Fibers::from_lines(gen_bundles(10_000, 100));
    let mut flip = false;
    group.bench_function("length_window_10000", |b| {
        b.iter(|| {
            flip = !flip;
            let max = if flip { 80.0 } else { 90.0 };
            let _ = fibers.set_filter(FilterParams::length(20.0, max));
            black_box(fibers.visible_lines().len());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_drag_refresh, bench_filter);
criterion_main!(benches);
