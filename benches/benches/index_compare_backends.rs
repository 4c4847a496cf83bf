// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tractogram_benches::gen_points;
use tractogram_index::{Aabb3D, Index, IndexConfig, IndexKind, Volume};

const SIZES: [(usize, usize); 3] = [(1_000, 50), (5_000, 100), (20_000, 100)];

fn query_box() -> Volume<f32> {
    Volume::Box(Aabb3D::from_center_size([0.0, 0.0, 0.0], [20.0, 20.0, 20.0]))
}

fn query_ellipsoid() -> Volume<f32> {
    Volume::Ellipsoid {
        center: [10.0, -5.0, 0.0],
        radii: [15.0, 8.0, 8.0],
    }
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(20);
    for &(lines, per_line) in &SIZES {
        let points = gen_points(lines, per_line);
        group.throughput(Throughput::Elements(points.len() as u64));
        for kind in [IndexKind::KdTree, IndexKind::Octree, IndexKind::FlatVec] {
            group.bench_function(format!("{kind:?}_n{}", points.len()), |b| {
                b.iter_batched(
                    || Index::<f32>::with_kind(kind, IndexConfig::default()),
                    |mut idx| {
                        idx.build(&points);
                        black_box(idx.len());
                    },
                    BatchSize::LargeInput,
                );
            });
        }
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    for &(lines, per_line) in &SIZES {
        let points = gen_points(lines, per_line);
        for kind in [IndexKind::KdTree, IndexKind::Octree, IndexKind::FlatVec] {
            let idx = Index::<f32>::with_kind(kind, IndexConfig::default()).built(&points);
            for (name, volume) in [("box", query_box()), ("ellipsoid", query_ellipsoid())] {
                group.bench_function(format!("{kind:?}_{name}_n{}", points.len()), |b| {
                    b.iter(|| black_box(idx.query_volume(&volume).count()));
                });
            }
        }
    }
    group.finish();
}

fn bench_leaf_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdtree_leaf_size");
    let points = gen_points(5_000, 100);
    let volume = query_box();
    for max_leaf in [4usize, 16, 64] {
        let config = IndexConfig {
            max_leaf,
            ..IndexConfig::default()
        };
        let idx = Index::<f32>::with_kind(IndexKind::KdTree, config).built(&points);
        group.bench_function(format!("query_leaf{max_leaf}"), |b| {
            b.iter(|| black_box(idx.query_volume(&volume).count()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_query, bench_leaf_size);
criterion_main!(benches);
