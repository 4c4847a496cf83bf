// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-point color derivation for each coloration mode.
//!
//! Every mode writes a fresh color buffer and a fresh localized-alpha buffer,
//! both one entry per point. The store swaps them in whole.

use glam::Vec3;

use crate::types::Rgb;

/// How point colors are derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorationMode {
    /// One color for every point.
    Uniform,
    /// Per line: absolute normalized direction from first to last point.
    #[default]
    Direction,
    /// Per point: absolute normalized local tangent.
    LocalDirection,
    /// Discrete curvature through a blue to red ramp.
    Curvature,
    /// Discrete torsion through a blue to red ramp.
    Torsion,
    /// Distance to the nearest anchor; also sets localized alpha.
    Distance,
    /// Per line minimum distance to the anchors, applied to the whole line.
    MinDistance,
    /// Colors read from the file.
    FromFile,
}

/// Inputs shared by every mode.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ColorInputs<'a> {
    pub(crate) points: &'a [Vec3],
    pub(crate) line_pointers: &'a [usize],
    pub(crate) file_colors: Option<&'a [Rgb]>,
    pub(crate) anchors: &'a [Vec3],
    pub(crate) uniform: Rgb,
    pub(crate) distance_threshold: f32,
}

/// Computed buffers.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Coloring {
    pub(crate) colors: Vec<Rgb>,
    pub(crate) alpha: Vec<f32>,
}

/// Blue at 0, green at 0.5, red at 1.
pub fn ramp(t: f32) -> Rgb {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    if t < 0.5 {
        let s = t * 2.0;
        [0.0, s, 1.0 - s]
    } else {
        let s = (t - 0.5) * 2.0;
        [s, 1.0 - s, 0.0]
    }
}

fn abs_rgb(v: Vec3) -> Rgb {
    let n = v.normalize_or_zero();
    if n == Vec3::ZERO {
        [1.0; 3]
    } else {
        n.abs().to_array()
    }
}

fn lines<'a>(inputs: &ColorInputs<'a>) -> impl Iterator<Item = &'a [Vec3]> + 'a {
    let points = inputs.points;
    inputs
        .line_pointers
        .windows(2)
        .map(move |w| &points[w[0]..w[1]])
}

/// Angle between two vectors; zero when either is degenerate.
fn angle(a: Vec3, b: Vec3) -> f32 {
    a.cross(b).length().atan2(a.dot(b))
}

fn per_line_rgb(inputs: &ColorInputs<'_>, f: impl Fn(&[Vec3]) -> Rgb) -> Vec<Rgb> {
    let mut out = Vec::with_capacity(inputs.points.len());
    for line in lines(inputs) {
        let c = f(line);
        out.extend(std::iter::repeat_n(c, line.len()));
    }
    out
}

fn local_direction(line: &[Vec3], out: &mut Vec<Rgb>) {
    let n = line.len();
    for i in 0..n {
        let prev = line[i.saturating_sub(1)];
        let next = line[(i + 1).min(n - 1)];
        out.push(abs_rgb(next - prev));
    }
}

/// Turning angle per unit length at each interior point; ends copy their neighbor.
fn curvature(line: &[Vec3], out: &mut Vec<f32>) {
    let n = line.len();
    let start = out.len();
    for i in 0..n {
        if i == 0 || i + 1 >= n {
            out.push(0.0);
            continue;
        }
        let a = line[i] - line[i - 1];
        let b = line[i + 1] - line[i];
        let len = 0.5 * (a.length() + b.length());
        out.push(if len > 0.0 { angle(a, b) / len } else { 0.0 });
    }
    copy_ends(&mut out[start..], 1, n.saturating_sub(1));
}

/// Rotation of the binormal per unit length; ends copy their neighbor.
fn torsion(line: &[Vec3], out: &mut Vec<f32>) {
    let n = line.len();
    let start = out.len();
    for i in 0..n {
        if i == 0 || i + 2 >= n {
            out.push(0.0);
            continue;
        }
        let d0 = line[i] - line[i - 1];
        let d1 = line[i + 1] - line[i];
        let d2 = line[i + 2] - line[i + 1];
        let len = d1.length();
        let b0 = d0.cross(d1);
        let b1 = d1.cross(d2);
        out.push(if len > 0.0 { angle(b0, b1) / len } else { 0.0 });
    }
    copy_ends(&mut out[start..], 1, n.saturating_sub(2));
}

/// Extend the values computed for `lo..hi` over the ends of the line.
fn copy_ends(values: &mut [f32], lo: usize, hi: usize) {
    if lo >= hi || hi > values.len() {
        return;
    }
    let (first, last) = (values[lo], values[hi - 1]);
    values[..lo].fill(first);
    values[hi..].fill(last);
}

fn normalized_ramp(values: &[f32]) -> Vec<Rgb> {
    let max = values.iter().copied().fold(0.0_f32, f32::max);
    values
        .iter()
        .map(|&v| ramp(if max > 0.0 { v / max } else { 0.0 }))
        .collect()
}

fn nearest_anchor(p: Vec3, anchors: &[Vec3]) -> Option<f32> {
    anchors
        .iter()
        .map(|a| a.distance(p))
        .fold(None, |m, d| Some(m.map_or(d, |m: f32| m.min(d))))
}

fn distance_t(inputs: &ColorInputs<'_>, p: Vec3) -> f32 {
    match nearest_anchor(p, inputs.anchors) {
        Some(d) if inputs.distance_threshold > 0.0 => (d / inputs.distance_threshold).min(1.0),
        _ => 0.0,
    }
}

/// Compute colors and localized alpha for `mode`.
///
/// Returns the mode actually applied: [`ColorationMode::FromFile`] without
/// file colors falls back to [`ColorationMode::Direction`].
pub(crate) fn compute(mode: ColorationMode, inputs: &ColorInputs<'_>) -> (ColorationMode, Coloring) {
    let n = inputs.points.len();
    let mut alpha = vec![1.0; n];
    let colors = match mode {
        ColorationMode::Uniform => vec![inputs.uniform; n],
        ColorationMode::Direction => {
            per_line_rgb(inputs, |l| match (l.first(), l.last()) {
                (Some(&a), Some(&b)) => abs_rgb(b - a),
                _ => [1.0; 3],
            })
        }
        ColorationMode::LocalDirection => {
            let mut out = Vec::with_capacity(n);
            for line in lines(inputs) {
                local_direction(line, &mut out);
            }
            out
        }
        ColorationMode::Curvature | ColorationMode::Torsion => {
            let mut values = Vec::with_capacity(n);
            for line in lines(inputs) {
                if mode == ColorationMode::Curvature {
                    curvature(line, &mut values);
                } else {
                    torsion(line, &mut values);
                }
            }
            normalized_ramp(&values)
        }
        ColorationMode::Distance => {
            let mut out = Vec::with_capacity(n);
            for (i, &p) in inputs.points.iter().enumerate() {
                let t = distance_t(inputs, p);
                alpha[i] = 1.0 - t;
                out.push(ramp(t));
            }
            out
        }
        ColorationMode::MinDistance => {
            let mut out = Vec::with_capacity(n);
            for w in inputs.line_pointers.windows(2) {
                let t = inputs.points[w[0]..w[1]]
                    .iter()
                    .map(|&p| distance_t(inputs, p))
                    .fold(1.0_f32, f32::min);
                alpha[w[0]..w[1]].fill(1.0 - t);
                out.extend(std::iter::repeat_n(ramp(t), w[1] - w[0]));
            }
            out
        }
        ColorationMode::FromFile => match inputs.file_colors {
            Some(c) if c.len() == n => c.to_vec(),
            _ => {
                tracing::warn!("no colors were loaded from the file; coloring by direction");
                return compute(ColorationMode::Direction, inputs);
            }
        },
    };
    (mode, Coloring { colors, alpha })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs<'a>(points: &'a [Vec3], ptrs: &'a [usize], anchors: &'a [Vec3]) -> ColorInputs<'a> {
        ColorInputs {
            points,
            line_pointers: ptrs,
            file_colors: None,
            anchors,
            uniform: [0.2, 0.4, 0.6],
            distance_threshold: 10.0,
        }
    }

    fn circle(n: usize, r: f32) -> Vec<Vec3> {
        (0..n)
            .map(|i| {
                let a = i as f32 * 0.3;
                Vec3::new(r * a.cos(), r * a.sin(), 0.0)
            })
            .collect()
    }

    #[test]
    fn ramp_endpoints() {
        assert_eq!(ramp(0.0), [0.0, 0.0, 1.0]);
        assert_eq!(ramp(0.5), [0.0, 1.0, 0.0]);
        assert_eq!(ramp(1.0), [1.0, 0.0, 0.0]);
        assert_eq!(ramp(7.0), ramp(1.0));
    }

    #[test]
    fn direction_colors_whole_line() {
        let pts = [
            Vec3::ZERO,
            Vec3::new(1.0, 0.5, 0.0),
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -4.0),
        ];
        let ptrs = [0, 3, 5];
        let (mode, c) = compute(ColorationMode::Direction, &inputs(&pts, &ptrs, &[]));
        assert_eq!(mode, ColorationMode::Direction);
        assert_eq!(c.colors.len(), pts.len());
        assert_eq!(c.colors[0], [1.0, 0.0, 0.0]);
        assert_eq!(c.colors[2], [1.0, 0.0, 0.0]);
        assert_eq!(c.colors[3], [0.0, 0.0, 1.0]);
        assert!(c.alpha.iter().all(|&a| a == 1.0));
    }

    #[test]
    fn straight_line_has_no_curvature_and_circle_is_uniform() {
        let straight: Vec<Vec3> = (0..6).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let round = circle(12, 5.0);
        let mut pts = straight.clone();
        pts.extend_from_slice(&round);
        let ptrs = [0, straight.len(), pts.len()];
        let (_, c) = compute(ColorationMode::Curvature, &inputs(&pts, &ptrs, &[]));
        assert!(c.colors[..6].iter().all(|&rgb| rgb == ramp(0.0)));
        for rgb in &c.colors[6..] {
            assert!(rgb[0] > 0.99, "{rgb:?}");
        }
    }

    #[test]
    fn planar_curve_has_no_torsion() {
        let pts = circle(10, 3.0);
        let ptrs = [0, pts.len()];
        let (_, c) = compute(ColorationMode::Torsion, &inputs(&pts, &ptrs, &[]));
        assert!(c.colors.iter().all(|&rgb| rgb == ramp(0.0)));
    }

    #[test]
    fn distance_sets_alpha_and_min_distance_is_per_line() {
        let pts = [
            Vec3::ZERO,
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(20.0, 0.0, 0.0),
        ];
        let ptrs = [0, 3];
        let anchors = [Vec3::ZERO];
        let inp = inputs(&pts, &ptrs, &anchors);
        let (_, c) = compute(ColorationMode::Distance, &inp);
        assert_eq!(c.alpha, [1.0, 0.5, 0.0]);
        assert_eq!(c.colors[1], ramp(0.5));
        let (_, c) = compute(ColorationMode::MinDistance, &inp);
        assert_eq!(c.alpha, [1.0; 3]);
        assert_eq!(c.colors, [ramp(0.0); 3]);
    }

    #[test]
    fn distance_without_anchors_is_opaque() {
        let pts = [Vec3::ONE, Vec3::splat(2.0)];
        let ptrs = [0, 2];
        let (_, c) = compute(ColorationMode::Distance, &inputs(&pts, &ptrs, &[]));
        assert_eq!(c.alpha, [1.0, 1.0]);
    }

    #[test]
    fn from_file_falls_back_without_colors() {
        let pts = [Vec3::ZERO, Vec3::Y];
        let ptrs = [0, 2];
        let mut inp = inputs(&pts, &ptrs, &[]);
        let (mode, c) = compute(ColorationMode::FromFile, &inp);
        assert_eq!(mode, ColorationMode::Direction);
        assert_eq!(c.colors[0], [0.0, 1.0, 0.0]);
        let file = [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]];
        inp.file_colors = Some(&file);
        let (mode, c) = compute(ColorationMode::FromFile, &inp);
        assert_eq!(mode, ColorationMode::FromFile);
        assert_eq!(c.colors, file);
        let (_, c) = compute(ColorationMode::Uniform, &inp);
        assert_eq!(c.colors, [[0.2, 0.4, 0.6]; 2]);
    }
}
