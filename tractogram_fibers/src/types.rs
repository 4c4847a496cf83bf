// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the fiber store: line flags, axes and volume geometry.

use glam::Vec3;

use crate::error::ParameterError;

/// RGB color with components in `[0, 1]`.
pub type Rgb = [f32; 3];

bitflags::bitflags! {
    /// Per-line state written by filtering and selection.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct LineFlags: u8 {
        /// Line is visible: selected by the volumes and not filtered.
        const SELECTED = 0b0000_0001;
        /// Line is excluded by the length or subsampling filter.
        const FILTERED = 0b0000_0010;
        /// Line runs against the preferred orientation; normals are flipped.
        const REVERSED = 0b0000_0100;
    }
}

impl Default for LineFlags {
    fn default() -> Self {
        Self::SELECTED
    }
}

/// Derived attributes of one line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineState {
    /// Sum of distances between consecutive points.
    pub length: f32,
    /// Visibility, filter and orientation flags.
    pub flags: LineFlags,
}

/// Coordinate axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Left/right.
    X,
    /// Posterior/anterior.
    Y,
    /// Inferior/superior.
    Z,
}

impl Axis {
    /// Component index of the axis.
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// All three axes in component order.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];
}

/// Voxel grid of the companion anatomical dataset.
///
/// World coordinates of the fibers are in the same millimetre space as the
/// anatomy; the grid spans `columns * voxel_size[0]` along x and so on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeGeometry {
    /// Voxels along x.
    pub columns: u32,
    /// Voxels along y.
    pub rows: u32,
    /// Voxels along z.
    pub frames: u32,
    /// Voxel size along x, y and z.
    pub voxel_size: [f32; 3],
}

impl Default for VolumeGeometry {
    fn default() -> Self {
        Self {
            columns: 1,
            rows: 1,
            frames: 1,
            voxel_size: [1.0; 3],
        }
    }
}

impl VolumeGeometry {
    /// Check that every dimension and voxel size is positive.
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (name, v) in [
            ("columns", self.columns),
            ("rows", self.rows),
            ("frames", self.frames),
        ] {
            if v == 0 {
                return Err(ParameterError::NonPositive { name, value: 0.0 });
            }
        }
        for (name, v) in ["x_voxel", "y_voxel", "z_voxel"]
            .into_iter()
            .zip(self.voxel_size)
        {
            if v <= 0.0 || !v.is_finite() {
                return Err(ParameterError::NonPositive { name, value: v });
            }
        }
        Ok(())
    }

    /// Number of voxels.
    pub fn voxel_count(&self) -> usize {
        self.columns as usize * self.rows as usize * self.frames as usize
    }

    /// World-space size of the grid.
    pub fn extent(&self) -> Vec3 {
        Vec3::new(
            self.columns as f32 * self.voxel_size[0],
            self.rows as f32 * self.voxel_size[1],
            self.frames as f32 * self.voxel_size[2],
        )
    }

    /// Linear voxel index of a world position, if it falls inside the grid.
    pub fn voxel_of(&self, p: Vec3) -> Option<usize> {
        let dims = [self.columns, self.rows, self.frames];
        let mut ijk = [0_usize; 3];
        for axis in 0..3 {
            let v = (p[axis] / self.voxel_size[axis]).floor();
            if v.is_nan() || v < 0.0 || v >= dims[axis] as f32 {
                return None;
            }
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Bounds checked against the grid dimension above."
            )]
            let i = v as usize;
            ijk[axis] = i;
        }
        let (cols, rows) = (self.columns as usize, self.rows as usize);
        Some(ijk[0] + ijk[1] * cols + ijk[2] * cols * rows)
    }
}
