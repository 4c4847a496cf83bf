// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and helpers.

use core::cmp::Ordering;
use core::fmt::Debug;

/// A point in 3D, stored as `[x, y, z]`.
pub type Point3<T> = [T; 3];

/// Axis-aligned bounding box in 3D.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3D<T> {
    /// Minimum x
    pub min_x: T,
    /// Minimum y
    pub min_y: T,
    /// Minimum z
    pub min_z: T,
    /// Maximum x
    pub max_x: T,
    /// Maximum y
    pub max_y: T,
    /// Maximum z
    pub max_z: T,
}

impl<T> Aabb3D<T> {
    /// Create a new AABB from min/max corners.
    pub const fn new(min_x: T, min_y: T, min_z: T, max_x: T, max_y: T, max_z: T) -> Self {
        Self {
            min_x,
            min_y,
            min_z,
            max_x,
            max_y,
            max_z,
        }
    }
}

impl<T: Scalar> Aabb3D<T> {
    /// Create an AABB from its center and full size along each axis.
    pub fn from_center_size(center: Point3<T>, size: Point3<T>) -> Self {
        let two = T::add(T::one(), T::one());
        let h = [
            T::div(size[0], two),
            T::div(size[1], two),
            T::div(size[2], two),
        ];
        Self {
            min_x: T::sub(center[0], h[0]),
            min_y: T::sub(center[1], h[1]),
            min_z: T::sub(center[2], h[2]),
            max_x: T::add(center[0], h[0]),
            max_y: T::add(center[1], h[1]),
            max_z: T::add(center[2], h[2]),
        }
    }

    /// A degenerate AABB enclosing a single point.
    pub const fn from_point(p: Point3<T>) -> Self {
        Self {
            min_x: p[0],
            min_y: p[1],
            min_z: p[2],
            max_x: p[0],
            max_y: p[1],
            max_z: p[2],
        }
    }

    /// Smallest AABB enclosing all points, or `None` for an empty input.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<T>>,
        T: 'a,
    {
        let mut it = points.into_iter();
        let first = Self::from_point(*it.next()?);
        Some(it.fold(first, |acc, p| acc.union_point(*p)))
    }

    /// Minimum corner.
    pub const fn min(&self) -> Point3<T> {
        [self.min_x, self.min_y, self.min_z]
    }

    /// Maximum corner.
    pub const fn max(&self) -> Point3<T> {
        [self.max_x, self.max_y, self.max_z]
    }

    /// Whether this AABB contains the point (boundary inclusive).
    pub fn contains_point(&self, p: Point3<T>) -> bool {
        le(self.min_x, p[0])
            && le(self.min_y, p[1])
            && le(self.min_z, p[2])
            && le(p[0], self.max_x)
            && le(p[1], self.max_y)
            && le(p[2], self.max_z)
    }

    /// Whether the point lies strictly inside (boundary exclusive).
    pub fn contains_point_strict(&self, p: Point3<T>) -> bool {
        lt(self.min_x, p[0])
            && lt(self.min_y, p[1])
            && lt(self.min_z, p[2])
            && lt(p[0], self.max_x)
            && lt(p[1], self.max_y)
            && lt(p[2], self.max_z)
    }

    /// The intersection of two AABBs.
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            min_x: max_t(self.min_x, other.min_x),
            min_y: max_t(self.min_y, other.min_y),
            min_z: max_t(self.min_z, other.min_z),
            max_x: min_t(self.max_x, other.max_x),
            max_y: min_t(self.max_y, other.max_y),
            max_z: min_t(self.max_z, other.max_z),
        }
    }

    /// Whether the two boxes share at least one point (touching counts).
    pub fn intersects(&self, other: &Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Return true if the AABB is inverted on any axis. Assumes no NaN.
    ///
    /// A box with zero extent (a single point) is not empty.
    pub fn is_empty(&self) -> bool {
        lt(self.max_x, self.min_x) || lt(self.max_y, self.min_y) || lt(self.max_z, self.min_z)
    }

    /// Smallest AABB enclosing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_x: min_t(self.min_x, other.min_x),
            min_y: min_t(self.min_y, other.min_y),
            min_z: min_t(self.min_z, other.min_z),
            max_x: max_t(self.max_x, other.max_x),
            max_y: max_t(self.max_y, other.max_y),
            max_z: max_t(self.max_z, other.max_z),
        }
    }

    /// Grow the box to include `p`.
    pub fn union_point(&self, p: Point3<T>) -> Self {
        self.union(&Self::from_point(p))
    }

    /// Center of the box.
    pub fn center(&self) -> Point3<T> {
        [
            T::mid(self.min_x, self.max_x),
            T::mid(self.min_y, self.max_y),
            T::mid(self.min_z, self.max_z),
        ]
    }

    /// Size of the box along `axis` (0 = x, 1 = y, 2 = z).
    pub fn extent(&self, axis: usize) -> T {
        T::max_zero(T::sub(self.max()[axis], self.min()[axis]))
    }

    /// Axis with the greatest extent; ties prefer the lower axis.
    pub fn largest_axis(&self) -> usize {
        let mut best = 0;
        for axis in 1..3 {
            if lt(self.extent(best), self.extent(axis)) {
                best = axis;
            }
        }
        best
    }

    /// One of the eight octants obtained by splitting at the center.
    ///
    /// Bit 0 of `i` selects the upper x half, bit 1 upper y, bit 2 upper z.
    pub fn octant(&self, i: usize) -> Self {
        let c = self.center();
        let lo = self.min();
        let hi = self.max();
        let pick = |axis: usize| {
            if i & (1 << axis) != 0 {
                (c[axis], hi[axis])
            } else {
                (lo[axis], c[axis])
            }
        };
        let (min_x, max_x) = pick(0);
        let (min_y, max_y) = pick(1);
        let (min_z, max_z) = pick(2);
        Self::new(min_x, min_y, min_z, max_x, max_y, max_z)
    }
}

/// Numeric scalar abstraction for 3D geometry used by backends and volumes.
///
/// Only floating-point scalars are supported: ray and ellipsoid tests divide.
pub trait Scalar: Copy + PartialOrd + Debug + Send + Sync + 'static {
    /// Add two scalar values.
    fn add(a: Self, b: Self) -> Self;

    /// Subtract two scalar values: a - b.
    fn sub(a: Self, b: Self) -> Self;

    /// Multiply two scalar values.
    fn mul(a: Self, b: Self) -> Self;

    /// Divide two scalar values: a / b.
    fn div(a: Self, b: Self) -> Self;

    /// Zero value for the scalar type.
    fn zero() -> Self;

    /// One value for the scalar type.
    fn one() -> Self;

    /// Largest finite value.
    fn max_value() -> Self;

    /// Max of the scalar value and zero.
    fn max_zero(v: Self) -> Self;

    /// Absolute value.
    fn abs(v: Self) -> Self;

    /// Midpoint between a and b.
    fn mid(a: Self, b: Self) -> Self;
}

macro_rules! impl_float_scalar {
    ($t:ty) => {
        impl Scalar for $t {
            #[inline]
            fn add(a: Self, b: Self) -> Self {
                a + b
            }

            #[inline]
            fn sub(a: Self, b: Self) -> Self {
                a - b
            }

            #[inline]
            fn mul(a: Self, b: Self) -> Self {
                a * b
            }

            #[inline]
            fn div(a: Self, b: Self) -> Self {
                a / b
            }

            #[inline]
            fn zero() -> Self {
                0.0
            }

            #[inline]
            fn one() -> Self {
                1.0
            }

            #[inline]
            fn max_value() -> Self {
                <$t>::MAX
            }

            #[inline]
            fn max_zero(v: Self) -> Self {
                v.max(0.0)
            }

            #[inline]
            fn abs(v: Self) -> Self {
                if v < 0.0 { -v } else { v }
            }

            #[inline]
            fn mid(a: Self, b: Self) -> Self {
                0.5 * (a + b)
            }
        }
    };
}

impl_float_scalar!(f32);
impl_float_scalar!(f64);

pub(crate) fn min_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => b,
        _ => a,
    }
}

pub(crate) fn max_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => b,
        _ => a,
    }
}

pub(crate) fn le<T: PartialOrd>(a: T, b: T) -> bool {
    a.partial_cmp(&b)
        .map(|o| o != Ordering::Greater)
        .unwrap_or(false)
}

pub(crate) fn lt<T: PartialOrd>(a: T, b: T) -> bool {
    a.partial_cmp(&b)
        .map(|o| o == Ordering::Less)
        .unwrap_or(false)
}

pub(crate) fn cmp_t<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn largest_axis_and_extent() {
        let b = Aabb3D::new(0.0_f32, 0.0, 0.0, 1.0, 5.0, 2.0);
        assert_eq!(b.largest_axis(), 1);
        assert_eq!(b.extent(2), 2.0);
        let flat = Aabb3D::from_point([3.0_f32, 3.0, 3.0]);
        assert_eq!(flat.largest_axis(), 0);
        assert!(!flat.is_empty());
    }

    #[test]
    fn octants_tile_the_box() {
        let b = Aabb3D::new(0.0_f64, 0.0, 0.0, 2.0, 2.0, 2.0);
        let upper = b.octant(7);
        assert_eq!(upper, Aabb3D::new(1.0, 1.0, 1.0, 2.0, 2.0, 2.0));
        let lower = b.octant(0);
        assert_eq!(lower, Aabb3D::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0));
        let mixed = b.octant(0b010);
        assert_eq!(mixed, Aabb3D::new(0.0, 1.0, 0.0, 1.0, 2.0, 1.0));
    }

    #[test]
    fn strict_containment_excludes_boundary() {
        let b = Aabb3D::from_center_size([0.0_f32, 0.0, 0.0], [2.0, 2.0, 2.0]);
        assert!(b.contains_point([1.0, 0.0, 0.0]));
        assert!(!b.contains_point_strict([1.0, 0.0, 0.0]));
        assert!(b.contains_point_strict([0.5, -0.5, 0.9]));
    }

    #[test]
    fn from_points_bounds_everything() {
        let pts = [[1.0_f32, -2.0, 3.0], [-1.0, 4.0, 0.0], [0.0, 0.0, 7.0]];
        let b = Aabb3D::from_points(&pts).unwrap();
        assert_eq!(b, Aabb3D::new(-1.0, -2.0, 0.0, 1.0, 4.0, 7.0));
        assert!(Aabb3D::<f32>::from_points(&[]).is_none());
    }
}
