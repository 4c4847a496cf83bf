// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The selection set: volume storage, editing, picking and dragging.

use glam::Vec3;
use kurbo::Point;
use tractogram_fibers::ParameterError;
use tractogram_index::Ray3D;

use crate::raycast::RayCaster;
use crate::types::{
    CompositionMode, SelectionVolume, VolumeFlags, VolumeId, VolumeShape, validate_size,
};
use slots::Slots;

mod slots {
    //! Generational slot storage.

    use crate::types::{SelectionVolume, VolumeId};

    #[derive(Clone, Default)]
    pub(super) struct Slots {
        pub(super) volumes: Vec<Option<SelectionVolume>>,
        pub(super) generations: Vec<u32>,
        pub(super) free_list: Vec<usize>,
    }

    impl Slots {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "VolumeId uses 32-bit slots; a selection never holds 2^32 volumes"
        )]
        pub(super) fn insert(&mut self, volume: SelectionVolume) -> VolumeId {
            let (idx, generation) = if let Some(idx) = self.free_list.pop() {
                let generation = self.generations[idx].saturating_add(1);
                self.generations[idx] = generation;
                self.volumes[idx] = Some(volume);
                (idx, generation)
            } else {
                self.volumes.push(Some(volume));
                self.generations.push(1);
                (self.volumes.len() - 1, 1)
            };
            VolumeId::new(idx as u32, generation)
        }

        pub(super) fn get(&self, id: VolumeId) -> Option<&SelectionVolume> {
            if self.generations.get(id.idx()) != Some(&id.1) {
                return None;
            }
            self.volumes.get(id.idx()).and_then(Option::as_ref)
        }

        pub(super) fn get_mut(&mut self, id: VolumeId) -> Option<&mut SelectionVolume> {
            if self.generations.get(id.idx()) != Some(&id.1) {
                return None;
            }
            self.volumes.get_mut(id.idx()).and_then(Option::as_mut)
        }

        pub(super) fn remove(&mut self, id: VolumeId) -> Option<SelectionVolume> {
            self.get(id)?;
            let old = self.volumes[id.idx()].take();
            self.free_list.push(id.idx());
            old
        }
    }
}

/// A point where a picking ray meets a volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeHit {
    /// Volume that was hit.
    pub id: VolumeId,
    /// Ray parameter of the entry point, clamped to `0` when the origin is inside.
    pub t: f32,
}

/// The user's selection volumes.
///
/// Volumes are kept in creation order, which is the order the
/// [`SelectionPipeline`](crate::SelectionPipeline) composes them in.
/// Every effective edit bumps [`SelectionSet::revision`].
#[derive(Clone, Default)]
pub struct SelectionSet {
    slots: Slots,
    order: Vec<VolumeId>,
    revision: u64,
}

impl core::fmt::Debug for SelectionSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SelectionSet")
            .field("volumes", &self.order.len())
            .field("free_slots", &self.slots.free_list.len())
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl SelectionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live volumes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set holds no volumes.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Counter bumped on every effective change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Add a volume after validating it; it composes after every existing one.
    pub fn insert(&mut self, volume: SelectionVolume) -> Result<VolumeId, ParameterError> {
        volume.validate()?;
        let id = self.slots.insert(volume);
        self.order.push(id);
        self.bump();
        tracing::debug!(?id, shape = ?volume.shape, mode = ?volume.mode, "selection volume added");
        Ok(id)
    }

    /// Remove a volume. Returns it if `id` was live.
    pub fn remove(&mut self, id: VolumeId) -> Option<SelectionVolume> {
        let removed = self.slots.remove(id)?;
        self.order.retain(|&o| o != id);
        self.bump();
        Some(removed)
    }

    /// Remove every volume.
    pub fn clear(&mut self) {
        if self.order.is_empty() {
            return;
        }
        for id in core::mem::take(&mut self.order) {
            self.slots.remove(id);
        }
        self.bump();
    }

    /// The volume behind `id`, if live.
    pub fn get(&self, id: VolumeId) -> Option<&SelectionVolume> {
        self.slots.get(id)
    }

    /// Whether `id` refers to a live volume.
    pub fn is_alive(&self, id: VolumeId) -> bool {
        self.slots.get(id).is_some()
    }

    /// Live volumes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (VolumeId, &SelectionVolume)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.slots.get(id).map(|v| (id, v)))
    }

    /// Active volumes in creation order.
    pub fn active(&self) -> impl Iterator<Item = (VolumeId, &SelectionVolume)> + '_ {
        self.iter().filter(|(_, v)| v.is_active())
    }

    /// Whether any active volume uses [`CompositionMode::Add`].
    pub fn has_active_add(&self) -> bool {
        self.active().any(|(_, v)| v.mode == CompositionMode::Add)
    }

    fn edit(&mut self, id: VolumeId, f: impl FnOnce(&mut SelectionVolume)) -> bool {
        let Some(v) = self.slots.get_mut(id) else {
            return false;
        };
        let before = *v;
        f(v);
        let changed = *v != before;
        if changed {
            self.bump();
        }
        changed
    }

    /// Move a volume. Returns whether anything changed; non-finite centers are ignored.
    pub fn set_center(&mut self, id: VolumeId, center: Vec3) -> bool {
        if !center.is_finite() {
            return false;
        }
        self.edit(id, |v| v.center = center)
    }

    /// Resize a volume; extents must be positive.
    pub fn set_size(&mut self, id: VolumeId, size: Vec3) -> Result<bool, ParameterError> {
        validate_size(size)?;
        Ok(self.edit(id, |v| v.size = size))
    }

    /// Change how a volume composes.
    pub fn set_mode(&mut self, id: VolumeId, mode: CompositionMode) -> bool {
        self.edit(id, |v| v.mode = mode)
    }

    /// Switch between box and ellipsoid.
    pub fn set_shape(&mut self, id: VolumeId, shape: VolumeShape) -> bool {
        self.edit(id, |v| v.shape = shape)
    }

    /// Replace a volume's flags.
    pub fn set_flags(&mut self, id: VolumeId, flags: VolumeFlags) -> bool {
        self.edit(id, |v| v.flags = flags)
    }

    /// Nearest shown volume along `ray`.
    ///
    /// Volumes containing the origin hit at `t = 0`. On equal distance the
    /// newer id wins.
    pub fn hit_test(&self, ray: &Ray3D<f32>) -> Option<VolumeHit> {
        let mut best: Option<VolumeHit> = None;
        for (id, v) in self.iter().filter(|(_, v)| v.is_shown()) {
            let Some(hit) = v.ray_hit(ray) else {
                continue;
            };
            let t = hit.tmin.max(0.0);
            let better = match best {
                None => true,
                Some(b) => t < b.t || (t == b.t && id_is_newer(id, b.id)),
            };
            if better {
                best = Some(VolumeHit { id, t });
            }
        }
        best
    }

    /// Hit test the ray the host casts through `screen`.
    pub fn pick(&self, caster: &impl RayCaster, screen: Point) -> Option<VolumeHit> {
        self.hit_test(&caster.ray_from_screen_point(screen))
    }

    /// Move a volume's center to `ray` at parameter `t`.
    ///
    /// Passing the `t` of the initial pick keeps the volume at the same depth
    /// while the pointer moves.
    pub fn drag(&mut self, id: VolumeId, ray: &Ray3D<f32>, t: f32) -> bool {
        if !t.is_finite() {
            return false;
        }
        let center = Vec3::from_array(ray.at(t));
        self.set_center(id, center)
    }
}

fn id_is_newer(a: VolumeId, b: VolumeId) -> bool {
    (a.1 > b.1) || (a.1 == b.1 && a.0 > b.0)
}
