// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synthetic fiber bundles shared by the benchmarks.

use glam::Vec3;

/// Xorshift generator; deterministic across runs.
#[derive(Clone, Debug)]
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        let v = self.next_u64() >> 40;
        v as f32 / (1u64 << 24) as f32
    }

    /// Uniform in `[-1, 1)` per component.
    pub fn next_vec3(&mut self) -> Vec3 {
        Vec3::new(self.next_f32(), self.next_f32(), self.next_f32()) * 2.0 - Vec3::ONE
    }
}

/// `lines` random walks of `points_per_line` steps inside a 200 mm cube,
/// grouped into a few bundles so the density is uneven like real data.
pub fn gen_bundles(lines: usize, points_per_line: usize) -> Vec<Vec<Vec3>> {
    let mut rng = Rng::new(0xF1BE_5EED_0BAD_CAFE);
    let seeds: Vec<Vec3> = (0..8).map(|_| rng.next_vec3() * 60.0).collect();
    let headings: Vec<Vec3> = (0..8).map(|_| rng.next_vec3().normalize_or(Vec3::X)).collect();
    (0..lines)
        .map(|i| {
            let b = i % seeds.len();
            let mut p = seeds[b] + rng.next_vec3() * 5.0;
            let mut dir = headings[b];
            (0..points_per_line)
                .map(|_| {
                    dir = (dir + rng.next_vec3() * 0.2).normalize_or(dir);
                    p = (p + dir).clamp(Vec3::splat(-100.0), Vec3::splat(100.0));
                    p
                })
                .collect()
        })
        .collect()
}

/// Flattened points of [`gen_bundles`] as index input.
pub fn gen_points(lines: usize, points_per_line: usize) -> Vec<[f32; 3]> {
    gen_bundles(lines, points_per_line)
        .into_iter()
        .flatten()
        .map(|v| v.to_array())
        .collect()
}
