// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tractogram_benches::gen_points;
use tractogram_index::{Aabb3D, Index, Volume};

use rstar::{AABB, RTree};

fn bench_rstar_external_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("rstar_external_compare");
    group.sample_size(20);
    for &lines in &[1_000usize, 5_000] {
        let points = gen_points(lines, 100);
        let query = Aabb3D::from_center_size([0.0, 0.0, 0.0], [20.0, 20.0, 20.0]);
        group.throughput(Throughput::Elements(points.len() as u64));

        group.bench_function(format!("kdtree_build_query_n{}", points.len()), |b| {
            b.iter_batched(
                Index::<f32>::with_kdtree,
                |mut idx| {
                    idx.build(&points);
                    let hits: usize = idx.query_volume(&Volume::Box(query)).count();
                    black_box(hits);
                },
                BatchSize::LargeInput,
            );
        });

        group.bench_function(format!("rstar_build_query_bulk_n{}", points.len()), |b| {
            b.iter_batched(
                || points.clone(),
                |pts| {
                    let tree = RTree::bulk_load(pts);
                    let aabb = AABB::from_corners(
                        [query.min_x, query.min_y, query.min_z],
                        [query.max_x, query.max_y, query.max_z],
                    );
                    let hits: usize = tree.locate_in_envelope(&aabb).count();
                    black_box(hits);
                },
                BatchSize::LargeInput,
            );
        });

        let idx = Index::<f32>::with_kdtree().built(&points);
        let tree = RTree::bulk_load(points.clone());
        let aabb = AABB::from_corners(
            [query.min_x, query.min_y, query.min_z],
            [query.max_x, query.max_y, query.max_z],
        );
        group.bench_function(format!("kdtree_query_n{}", points.len()), |b| {
            b.iter(|| black_box(idx.query_volume(&Volume::Box(query)).count()));
        });
        group.bench_function(format!("rstar_query_n{}", points.len()), |b| {
            b.iter(|| black_box(tree.locate_in_envelope(&aabb).count()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rstar_external_compare);
criterion_main!(benches);
