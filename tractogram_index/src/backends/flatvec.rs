// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat vector backend with linear scans. Small and simple; also the reference
//! the tree backends are checked against.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::{Backend, TreeStats};
use crate::types::{Aabb3D, Point3, Scalar};
use crate::volume::Volume;

/// Flat vector backend with linear scans.
pub struct FlatVec<T: Scalar> {
    points: Vec<Point3<T>>,
    bounds: Option<Aabb3D<T>>,
}

impl<T: Scalar> Default for FlatVec<T> {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            bounds: None,
        }
    }
}

impl<T: Scalar> Debug for FlatVec<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlatVec")
            .field("points", &self.points.len())
            .finish_non_exhaustive()
    }
}

impl<T: Scalar> Backend<T> for FlatVec<T> {
    fn build(&mut self, points: &[Point3<T>]) {
        self.points = points.to_vec();
        self.bounds = Aabb3D::from_points(points);
    }

    fn clear(&mut self) {
        self.points.clear();
        self.bounds = None;
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn bounds(&self) -> Option<Aabb3D<T>> {
        self.bounds
    }

    fn stats(&self) -> TreeStats {
        TreeStats {
            nodes: 1,
            leaves: 1,
            max_depth: 0,
        }
    }

    fn query_volume<'a>(&'a self, volume: &Volume<T>) -> Box<dyn Iterator<Item = usize> + 'a> {
        let mut out = Vec::new();
        for (i, p) in self.points.iter().enumerate() {
            if volume.contains_point(*p) {
                out.push(i);
            }
        }
        Box::new(out.into_iter())
    }
}
