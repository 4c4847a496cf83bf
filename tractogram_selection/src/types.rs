// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for selection volumes: identifiers, flags, shapes and modes.

use glam::Vec3;
use tractogram_fibers::ParameterError;
use tractogram_index::{Aabb3D, Ray3D, RayHit, Volume};

/// Identifier for a volume in a [`SelectionSet`](crate::SelectionSet).
///
/// A slot index plus a generation counter. Removing a volume frees its slot;
/// reusing the slot bumps the generation, so an old `VolumeId` never refers to
/// the volume that replaced it.
///
/// Use [`SelectionSet::is_alive`](crate::SelectionSet::is_alive) to check a
/// handle before acting on it. Every editing call on a stale id is a no-op.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VolumeId(pub(crate) u32, pub(crate) u32);

impl VolumeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Volume flags controlling composition and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct VolumeFlags: u8 {
        /// Volume takes part in selection composition.
        const ACTIVE = 0b0000_0001;
        /// Volume is drawn and can be picked.
        const SHOWN  = 0b0000_0010;
    }
}

impl Default for VolumeFlags {
    fn default() -> Self {
        Self::ACTIVE | Self::SHOWN
    }
}

/// How a volume's line membership combines with the running selection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompositionMode {
    /// Union its lines into the selection.
    #[default]
    Add,
    /// Remove its lines from the selection.
    Subtract,
    /// Remove its lines and veto them against any later `Add`.
    AndNot,
}

/// Geometric shape of a volume.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum VolumeShape {
    /// Axis-aligned box.
    #[default]
    Box,
    /// Axis-aligned ellipsoid inscribed in the box.
    Ellipsoid,
}

/// A user-placed selection region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionVolume {
    /// Shape of the region.
    pub shape: VolumeShape,
    /// Center in world space.
    pub center: Vec3,
    /// Full extent along each axis. Every component must be positive.
    pub size: Vec3,
    /// Composition mode.
    pub mode: CompositionMode,
    /// Activity and visibility.
    pub flags: VolumeFlags,
}

impl SelectionVolume {
    /// An active, shown `Add` volume.
    pub fn new(shape: VolumeShape, center: Vec3, size: Vec3) -> Self {
        Self {
            shape,
            center,
            size,
            mode: CompositionMode::Add,
            flags: VolumeFlags::default(),
        }
    }

    /// Axis-aligned box volume.
    pub fn cuboid(center: Vec3, size: Vec3) -> Self {
        Self::new(VolumeShape::Box, center, size)
    }

    /// Ellipsoid volume with the given full extents.
    pub fn ellipsoid(center: Vec3, size: Vec3) -> Self {
        Self::new(VolumeShape::Ellipsoid, center, size)
    }

    /// Same volume with a different composition mode.
    #[must_use]
    pub fn with_mode(mut self, mode: CompositionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Same volume with different flags.
    #[must_use]
    pub fn with_flags(mut self, flags: VolumeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Reject non-positive or non-finite extents and a non-finite center.
    pub fn validate(&self) -> Result<(), ParameterError> {
        validate_size(self.size)?;
        for (name, value) in [
            ("center.x", self.center.x),
            ("center.y", self.center.y),
            ("center.z", self.center.z),
        ] {
            if !value.is_finite() {
                return Err(ParameterError::OutOfRange { name, value });
            }
        }
        Ok(())
    }

    /// Whether the volume takes part in composition.
    pub fn is_active(&self) -> bool {
        self.flags.contains(VolumeFlags::ACTIVE)
    }

    /// Whether the volume is drawn and pickable.
    pub fn is_shown(&self) -> bool {
        self.flags.contains(VolumeFlags::SHOWN)
    }

    /// Bounding box of the volume.
    pub fn bounds(&self) -> Aabb3D<f32> {
        Aabb3D::from_center_size(self.center.to_array(), self.size.to_array())
    }

    /// The region as an index query.
    pub fn to_query(&self) -> Volume<f32> {
        match self.shape {
            VolumeShape::Box => Volume::Box(self.bounds()),
            VolumeShape::Ellipsoid => Volume::Ellipsoid {
                center: self.center.to_array(),
                radii: (self.size * 0.5).to_array(),
            },
        }
    }

    /// Entry and exit parameters of `ray` through the volume surface.
    pub fn ray_hit(&self, ray: &Ray3D<f32>) -> Option<RayHit<f32>> {
        match self.shape {
            VolumeShape::Box => tractogram_index::ray_aabb(ray, &self.bounds()),
            VolumeShape::Ellipsoid => ray_ellipsoid(ray, self.center, self.size * 0.5),
        }
    }
}

pub(crate) fn validate_size(size: Vec3) -> Result<(), ParameterError> {
    for (name, value) in [("size.x", size.x), ("size.y", size.y), ("size.z", size.z)] {
        if !(value > 0.0 && value.is_finite()) {
            return Err(ParameterError::NonPositive { name, value });
        }
    }
    Ok(())
}

/// Ray against an axis-aligned ellipsoid, solved in the frame where it is a
/// unit sphere.
///
/// Returns `None` on a miss or when the ellipsoid lies entirely behind the
/// origin.
pub fn ray_ellipsoid(ray: &Ray3D<f32>, center: Vec3, radii: Vec3) -> Option<RayHit<f32>> {
    let o = (Vec3::from_array(ray.origin) - center) / radii;
    let d = Vec3::from_array(ray.direction) / radii;
    let a = d.length_squared();
    if a == 0.0 {
        return None;
    }
    let b = 2.0 * o.dot(d);
    let c = o.length_squared() - 1.0;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let tmin = (-b - root) / (2.0 * a);
    let tmax = (-b + root) / (2.0 * a);
    if tmax < 0.0 {
        return None;
    }
    Some(RayHit { tmin, tmax })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipsoid_hit_along_axis() {
        let ray = Ray3D::new([-10.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let hit = ray_ellipsoid(&ray, Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0)).unwrap();
        assert!((hit.tmin - 8.0).abs() < 1e-5);
        assert!((hit.tmax - 12.0).abs() < 1e-5);
    }

    #[test]
    fn ellipsoid_miss_and_behind() {
        let radii = Vec3::ONE;
        let miss = Ray3D::new([-10.0, 2.0, 0.0], [1.0, 0.0, 0.0]);
        assert!(ray_ellipsoid(&miss, Vec3::ZERO, radii).is_none());
        let behind = Ray3D::new([10.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        assert!(ray_ellipsoid(&behind, Vec3::ZERO, radii).is_none());
        let inside = Ray3D::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        let hit = ray_ellipsoid(&inside, Vec3::ZERO, radii).unwrap();
        assert!(hit.tmin < 0.0 && (hit.tmax - 1.0).abs() < 1e-6);
    }

    #[test]
    fn query_matches_shape() {
        let v = SelectionVolume::ellipsoid(Vec3::new(1.0, 2.0, 3.0), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(
            v.to_query(),
            Volume::Ellipsoid {
                center: [1.0, 2.0, 3.0],
                radii: [1.0, 2.0, 3.0]
            }
        );
        let b = SelectionVolume::cuboid(Vec3::ZERO, Vec3::splat(2.0));
        assert_eq!(b.to_query(), Volume::Box(Aabb3D::new(-1.0, -1.0, -1.0, 1.0, 1.0, 1.0)));
    }

    #[test]
    fn validation_rejects_flat_volumes() {
        let flat = SelectionVolume::cuboid(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(
            flat.validate(),
            Err(ParameterError::NonPositive {
                name: "size.y",
                value: 0.0
            })
        );
        let nan = SelectionVolume::cuboid(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::ONE);
        assert!(nan.validate().is_err());
        assert!(SelectionVolume::cuboid(Vec3::ZERO, Vec3::ONE).validate().is_ok());
    }

    #[test]
    fn default_flags_are_active_and_shown() {
        let v = SelectionVolume::cuboid(Vec3::ZERO, Vec3::ONE);
        assert!(v.is_active() && v.is_shown());
        assert_eq!(v.mode, CompositionMode::Add);
    }
}
