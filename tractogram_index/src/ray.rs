// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rays and the ray/box slab test used for picking selection volumes.

use crate::types::{Aabb3D, Point3, Scalar, lt, max_t, min_t};

/// A half-line `origin + t * direction` for `t >= 0`.
///
/// The direction need not be normalized; hit distances are expressed in
/// multiples of `direction`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray3D<T> {
    /// Start of the ray.
    pub origin: Point3<T>,
    /// Direction of travel.
    pub direction: Point3<T>,
}

impl<T: Scalar> Ray3D<T> {
    /// Create a ray from origin and direction.
    pub const fn new(origin: Point3<T>, direction: Point3<T>) -> Self {
        Self { origin, direction }
    }

    /// Ray from `from` through `to`; `t = 1` lands on `to`.
    pub fn through(from: Point3<T>, to: Point3<T>) -> Self {
        Self {
            origin: from,
            direction: [
                T::sub(to[0], from[0]),
                T::sub(to[1], from[1]),
                T::sub(to[2], from[2]),
            ],
        }
    }

    /// Point at parameter `t`.
    pub fn at(&self, t: T) -> Point3<T> {
        [
            T::add(self.origin[0], T::mul(self.direction[0], t)),
            T::add(self.origin[1], T::mul(self.direction[1], t)),
            T::add(self.origin[2], T::mul(self.direction[2], t)),
        ]
    }
}

/// Entry and exit parameters of a ray crossing a volume.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit<T> {
    /// Parameter where the ray enters. Negative when the origin is inside.
    pub tmin: T,
    /// Parameter where the ray leaves.
    pub tmax: T,
}

/// Slab test of a ray against an AABB.
///
/// Returns `None` when the ray misses or the box lies entirely behind the origin.
/// Axis-parallel rays are handled without producing NaN.
pub fn ray_aabb<T: Scalar>(ray: &Ray3D<T>, aabb: &Aabb3D<T>) -> Option<RayHit<T>> {
    let lo = aabb.min();
    let hi = aabb.max();
    let mut tmin = T::sub(T::zero(), T::max_value());
    let mut tmax = T::max_value();
    for axis in 0..3 {
        let o = ray.origin[axis];
        let d = ray.direction[axis];
        if d == T::zero() {
            if lt(o, lo[axis]) || lt(hi[axis], o) {
                return None;
            }
            continue;
        }
        let mut t1 = T::div(T::sub(lo[axis], o), d);
        let mut t2 = T::div(T::sub(hi[axis], o), d);
        if lt(t2, t1) {
            core::mem::swap(&mut t1, &mut t2);
        }
        tmin = max_t(tmin, t1);
        tmax = min_t(tmax, t2);
        if lt(tmax, tmin) {
            return None;
        }
    }
    if lt(tmax, T::zero()) {
        return None;
    }
    Some(RayHit { tmin, tmax })
}
