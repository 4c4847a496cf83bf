// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Screen-to-world ray casting, provided by the host viewer.

use kurbo::Point;
use tractogram_index::Ray3D;

/// Maps a point in screen space to a world-space picking ray.
///
/// The camera and viewport live outside this crate; the host implements this
/// once and hands it to [`SelectionSet::pick`](crate::SelectionSet::pick).
/// Closures of the right shape implement it too.
pub trait RayCaster {
    /// Ray through the pixel at `screen`.
    fn ray_from_screen_point(&self, screen: Point) -> Ray3D<f32>;
}

impl<F> RayCaster for F
where
    F: Fn(Point) -> Ray3D<f32>,
{
    fn ray_from_screen_point(&self, screen: Point) -> Ray3D<f32> {
        self(screen)
    }
}

/// Orthographic caster looking down `-z` from a fixed height.
///
/// Screen `(x, y)` maps to world `(x * scale + offset.x, offset.y - y * scale)`,
/// so screen y grows downward like most windowing systems.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrthoCaster {
    /// World position of the screen origin, and the ray start height in `z`.
    pub offset: [f32; 3],
    /// World units per screen unit.
    pub scale: f32,
}

impl RayCaster for OrthoCaster {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "screen coordinates fit comfortably in f32"
    )]
    fn ray_from_screen_point(&self, screen: Point) -> Ray3D<f32> {
        let [ox, oy, oz] = self.offset;
        Ray3D::new(
            [
                ox + screen.x as f32 * self.scale,
                oy - screen.y as f32 * self.scale,
                oz,
            ],
            [0.0, 0.0, -1.0],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_casters() {
        let caster = |p: Point| Ray3D::new([p.x as f32, p.y as f32, 10.0], [0.0, 0.0, -1.0]);
        let ray = caster.ray_from_screen_point(Point::new(2.0, 3.0));
        assert_eq!(ray.origin, [2.0, 3.0, 10.0]);
    }

    #[test]
    fn ortho_flips_screen_y() {
        let caster = OrthoCaster {
            offset: [-50.0, 50.0, 100.0],
            scale: 0.5,
        };
        let ray = caster.ray_from_screen_point(Point::new(100.0, 100.0));
        assert_eq!(ray.origin, [0.0, 0.0, 100.0]);
        assert_eq!(ray.direction, [0.0, 0.0, -1.0]);
    }
}
