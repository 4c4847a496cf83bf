// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Query volumes: boxes and axis-aligned ellipsoids.

use crate::types::{Aabb3D, Point3, Scalar, lt};

/// A closed region of space used to select points.
///
/// Membership is strict: a point exactly on the surface is outside.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Volume<T> {
    /// Axis-aligned box.
    Box(Aabb3D<T>),
    /// Axis-aligned ellipsoid with per-axis radii.
    Ellipsoid {
        /// Center of the ellipsoid.
        center: Point3<T>,
        /// Semi-axis lengths along x, y and z. Must be positive.
        radii: Point3<T>,
    },
}

impl<T: Scalar> Volume<T> {
    /// Whether `p` lies strictly inside the volume.
    pub fn contains_point(&self, p: Point3<T>) -> bool {
        match self {
            Self::Box(b) => b.contains_point_strict(p),
            Self::Ellipsoid { center, radii } => {
                let mut sum = T::zero();
                for axis in 0..3 {
                    let d = T::div(T::sub(p[axis], center[axis]), radii[axis]);
                    sum = T::add(sum, T::mul(d, d));
                }
                lt(sum, T::one())
            }
        }
    }

    /// Whether the volume may contain any point of `aabb`.
    ///
    /// Exact up to the boundary: a box touching the surface from outside is
    /// reported as intersecting, which only costs a leaf scan.
    pub fn intersects_aabb(&self, aabb: &Aabb3D<T>) -> bool {
        match self {
            Self::Box(b) => b.intersects(aabb),
            Self::Ellipsoid { center, radii } => {
                if !self.bounds().intersects(aabb) {
                    return false;
                }
                // Scaling each axis by 1/r maps the ellipsoid onto the unit sphere
                // and keeps the box axis-aligned, so per-axis clamping still finds
                // the closest point.
                let lo = aabb.min();
                let hi = aabb.max();
                let mut sum = T::zero();
                for axis in 0..3 {
                    let c = center[axis];
                    let q = if lt(c, lo[axis]) {
                        lo[axis]
                    } else if lt(hi[axis], c) {
                        hi[axis]
                    } else {
                        c
                    };
                    let d = T::div(T::sub(q, c), radii[axis]);
                    sum = T::add(sum, T::mul(d, d));
                }
                !lt(T::one(), sum)
            }
        }
    }

    /// Bounding box of the volume.
    pub fn bounds(&self) -> Aabb3D<T> {
        match self {
            Self::Box(b) => *b,
            Self::Ellipsoid { center, radii } => Aabb3D::new(
                T::sub(center[0], radii[0]),
                T::sub(center[1], radii[1]),
                T::sub(center[2], radii[2]),
                T::add(center[0], radii[0]),
                T::add(center[1], radii[1]),
                T::add(center[2], radii[2]),
            ),
        }
    }
}
