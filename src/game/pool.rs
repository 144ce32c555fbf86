//! Fixed-capacity visual object pools
//!
//! Every pool creates all of its visuals once at startup and afterwards only
//! toggles slots in and out of use. When a pool is exhausted, `acquire` still
//! hands back a usable slot: it takes the one bound to the effect with the
//! smallest remaining life, resets it and reports who lost it. Acquisition is
//! O(capacity) and never allocates.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PoolConfig;
use crate::game::constants::pools::MAX_CAPACITY;
use crate::game::effects::EffectId;
use crate::game::presentation::{Color, GraphicsHandle, Material, Presentation, Transform, VisualKind};
use crate::metrics::SimMetrics;
use crate::util::vec3::Vec3;

/// The pools managed by [`PoolManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolId {
    Particle,
    Debris,
    Light,
    Shockwave,
    Trail,
}

impl PoolId {
    pub const COUNT: usize = 5;
    pub const ALL: [PoolId; Self::COUNT] = [
        PoolId::Particle,
        PoolId::Debris,
        PoolId::Light,
        PoolId::Shockwave,
        PoolId::Trail,
    ];

    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            PoolId::Particle => "particles",
            PoolId::Debris => "debris",
            PoolId::Light => "lights",
            PoolId::Shockwave => "shockwaves",
            PoolId::Trail => "trails",
        }
    }

    fn visual_kind(&self) -> VisualKind {
        match self {
            PoolId::Particle => VisualKind::Particle,
            PoolId::Debris => VisualKind::Debris,
            PoolId::Light => VisualKind::Light,
            PoolId::Shockwave => VisualKind::Shockwave,
            PoolId::Trail => VisualKind::Trail,
        }
    }

    fn material(&self) -> Material {
        match self {
            PoolId::Particle => Material::glowing(Color::ORANGE, 1.0),
            PoolId::Debris => Material::solid(Color::DARK_GREY),
            PoolId::Light => Material::glowing(Color::ORANGE, 0.0),
            PoolId::Shockwave => Material::glowing(Color::WHITE, 1.0),
            PoolId::Trail => Material::glowing(Color::CYAN, 1.0),
        }
    }

    fn capacity(&self, config: &PoolConfig) -> usize {
        match self {
            PoolId::Particle => config.particles,
            PoolId::Debris => config.debris,
            PoolId::Light => config.lights,
            PoolId::Shockwave => config.shockwaves,
            PoolId::Trail => config.trails,
        }
    }
}

/// A borrowed pool slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PooledHandle {
    pool: PoolId,
    slot: u16,
    graphics: GraphicsHandle,
}

impl PooledHandle {
    #[inline]
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    #[inline]
    pub fn slot(&self) -> u16 {
        self.slot
    }

    #[inline]
    pub fn graphics(&self) -> GraphicsHandle {
        self.graphics
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Every slot already belongs to the requesting effect
    #[error("pool '{pool}' has no slot that can be reclaimed for this effect")]
    Exhausted { pool: &'static str },
}

/// Result of a successful acquire
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acquisition {
    pub handle: PooledHandle,
    /// Effect that lost this slot, if it was forcibly reclaimed.
    /// `Some(None)` means an in-use slot with no owner was taken.
    pub reclaimed_from: Option<Option<EffectId>>,
}

/// One fixed-capacity pool
pub struct ObjectPool {
    id: PoolId,
    handles: Vec<GraphicsHandle>,
    in_use: BitVec,
    owners: Vec<Option<EffectId>>,
    in_use_count: usize,
    reclaims: u64,
}

impl ObjectPool {
    /// Create `capacity` hidden visuals up front
    pub fn new(id: PoolId, capacity: usize, gfx: &mut dyn Presentation) -> Self {
        let capacity = capacity.min(MAX_CAPACITY);
        let material = id.material();
        let handles: Vec<GraphicsHandle> = (0..capacity)
            .map(|_| {
                let handle = gfx.create_visual(id.visual_kind(), &Transform::default(), &material);
                gfx.set_visible(handle, false);
                handle
            })
            .collect();

        Self {
            id,
            handles,
            in_use: bitvec![0; capacity],
            owners: vec![None; capacity],
            in_use_count: 0,
            reclaims: 0,
        }
    }

    /// Borrow a slot for `owner`.
    ///
    /// Prefers a free slot. When none is free, reclaims the slot whose owner
    /// has the smallest remaining life according to `life_of`; owner-less
    /// slots and owners `life_of` no longer knows count as life 0. Slots
    /// already held by `owner` are never reclaimed. Ties go to the lowest slot.
    pub fn acquire(
        &mut self,
        owner: Option<EffectId>,
        life_of: impl Fn(EffectId) -> Option<f32>,
        gfx: &mut dyn Presentation,
    ) -> Result<Acquisition, PoolError> {
        if let Some(slot) = self.in_use.first_zero() {
            self.in_use.set(slot, true);
            self.owners[slot] = owner;
            self.in_use_count += 1;
            let handle = self.handle_at(slot);
            reset_visual(handle.graphics, gfx);
            return Ok(Acquisition {
                handle,
                reclaimed_from: None,
            });
        }

        let mut victim: Option<(usize, f32)> = None;
        for (slot, current) in self.owners.iter().enumerate() {
            if owner.is_some() && *current == owner {
                continue;
            }
            let life = current.and_then(&life_of).unwrap_or(0.0);
            match victim {
                Some((_, best)) if life >= best => {}
                _ => victim = Some((slot, life)),
            }
        }

        let (slot, _) = victim.ok_or(PoolError::Exhausted {
            pool: self.id.name(),
        })?;
        let previous = std::mem::replace(&mut self.owners[slot], owner);
        self.reclaims += 1;
        let handle = self.handle_at(slot);
        reset_visual(handle.graphics, gfx);
        tracing::debug!(
            pool = self.id.name(),
            slot,
            "reclaimed slot from {:?}",
            previous
        );
        Ok(Acquisition {
            handle,
            reclaimed_from: Some(previous),
        })
    }

    /// Return a slot and hide its visual. Releasing a free slot or a handle
    /// from another pool is a no-op that returns false.
    pub fn release(&mut self, handle: PooledHandle, gfx: &mut dyn Presentation) -> bool {
        let Some(slot) = self.slot_of(handle) else {
            return false;
        };
        if !self.in_use[slot] {
            return false;
        }
        self.in_use.set(slot, false);
        self.owners[slot] = None;
        self.in_use_count -= 1;
        gfx.set_visible(handle.graphics, false);
        true
    }

    /// Current owner of an in-use slot
    pub fn owner_of(&self, handle: PooledHandle) -> Option<EffectId> {
        let slot = self.slot_of(handle)?;
        if self.in_use[slot] {
            self.owners[slot]
        } else {
            None
        }
    }

    pub fn is_in_use(&self, handle: PooledHandle) -> bool {
        self.slot_of(handle).map(|slot| self.in_use[slot]).unwrap_or(false)
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.handles.len()
    }

    pub fn in_use_count(&self) -> usize {
        self.in_use_count
    }

    pub fn available(&self) -> usize {
        self.capacity() - self.in_use_count
    }

    pub fn reclaims(&self) -> u64 {
        self.reclaims
    }

    /// Destroy every visual; the pool is unusable afterwards
    pub fn destroy(self, gfx: &mut dyn Presentation) {
        for handle in self.handles {
            gfx.destroy_visual(handle);
        }
    }

    fn handle_at(&self, slot: usize) -> PooledHandle {
        PooledHandle {
            pool: self.id,
            slot: slot as u16,
            graphics: self.handles[slot],
        }
    }

    fn slot_of(&self, handle: PooledHandle) -> Option<usize> {
        let slot = handle.slot as usize;
        if handle.pool != self.id || self.handles.get(slot) != Some(&handle.graphics) {
            return None;
        }
        Some(slot)
    }
}

fn reset_visual(handle: GraphicsHandle, gfx: &mut dyn Presentation) {
    gfx.set_transform(handle, Vec3::ZERO, Vec3::ZERO, Vec3::ONE);
    gfx.set_opacity(handle, 1.0);
    gfx.set_visible(handle, true);
}

/// All effect pools, indexed by [`PoolId`]
pub struct PoolManager {
    pools: Vec<ObjectPool>,
}

impl PoolManager {
    pub fn new(config: &PoolConfig, gfx: &mut dyn Presentation) -> Self {
        let pools = PoolId::ALL
            .iter()
            .map(|id| ObjectPool::new(*id, id.capacity(config), gfx))
            .collect();
        Self { pools }
    }

    pub fn acquire(
        &mut self,
        pool: PoolId,
        owner: Option<EffectId>,
        life_of: impl Fn(EffectId) -> Option<f32>,
        gfx: &mut dyn Presentation,
    ) -> Result<Acquisition, PoolError> {
        self.pools[pool.index()].acquire(owner, life_of, gfx)
    }

    pub fn release(&mut self, handle: PooledHandle, gfx: &mut dyn Presentation) -> bool {
        self.pools[handle.pool.index()].release(handle, gfx)
    }

    pub fn owner_of(&self, handle: PooledHandle) -> Option<EffectId> {
        self.pools[handle.pool.index()].owner_of(handle)
    }

    pub fn is_in_use(&self, handle: PooledHandle) -> bool {
        self.pools[handle.pool.index()].is_in_use(handle)
    }

    pub fn pool(&self, pool: PoolId) -> &ObjectPool {
        &self.pools[pool.index()]
    }

    pub fn total_in_use(&self) -> usize {
        self.pools.iter().map(|p| p.in_use_count()).sum()
    }

    pub fn record_metrics(&self, metrics: &mut SimMetrics) {
        for pool in &self.pools {
            metrics.pool_in_use[pool.id.index()] = pool.in_use_count() as u64;
            metrics.pool_reclaims[pool.id.index()] = pool.reclaims();
        }
    }

    pub fn destroy(self, gfx: &mut dyn Presentation) {
        for pool in self.pools {
            pool.destroy(gfx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::presentation::HeadlessPresentation;
    use hashbrown::HashMap;

    fn owner(index: u16) -> EffectId {
        EffectId::new(index, 0)
    }

    #[test]
    fn test_acquire_marks_in_use() {
        let mut gfx = HeadlessPresentation::new();
        let mut pool = ObjectPool::new(PoolId::Light, 4, &mut gfx);
        assert_eq!(gfx.visible_count(VisualKind::Light), 0);

        let a = pool.acquire(Some(owner(1)), |_| Some(10.0), &mut gfx).unwrap();
        let b = pool.acquire(Some(owner(2)), |_| Some(10.0), &mut gfx).unwrap();

        assert!(a.reclaimed_from.is_none());
        assert_ne!(a.handle, b.handle);
        assert!(pool.is_in_use(a.handle));
        assert_eq!(pool.owner_of(b.handle), Some(owner(2)));
        assert_eq!(pool.in_use_count(), 2);
        assert_eq!(pool.available(), 2);
        assert_eq!(gfx.visible_count(VisualKind::Light), 2);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut gfx = HeadlessPresentation::new();
        let mut pool = ObjectPool::new(PoolId::Particle, 3, &mut gfx);
        let acq = pool.acquire(Some(owner(1)), |_| None, &mut gfx).unwrap();

        assert!(pool.release(acq.handle, &mut gfx));
        assert!(!pool.release(acq.handle, &mut gfx));
        assert_eq!(pool.in_use_count(), 0);
        assert_eq!(pool.available(), 3);
        assert!(!gfx.visual(acq.handle.graphics()).unwrap().visible);

        // Slot is reusable after the double release
        let again = pool.acquire(Some(owner(2)), |_| None, &mut gfx).unwrap();
        assert_eq!(again.handle, acq.handle);
        assert_eq!(pool.in_use_count(), 1);
    }

    #[test]
    fn test_release_foreign_handle() {
        let mut gfx = HeadlessPresentation::new();
        let mut lights = ObjectPool::new(PoolId::Light, 2, &mut gfx);
        let mut debris = ObjectPool::new(PoolId::Debris, 2, &mut gfx);
        let light = lights.acquire(None, |_| None, &mut gfx).unwrap();

        assert!(!debris.release(light.handle, &mut gfx));
        assert!(lights.is_in_use(light.handle));
    }

    #[test]
    fn test_saturation_reclaims_soonest_to_expire() {
        let mut gfx = HeadlessPresentation::new();
        let mut pool = ObjectPool::new(PoolId::Particle, 100, &mut gfx);

        // Owner i has life 10 + i; later owners live much longer
        let mut lives: HashMap<EffectId, f32> = HashMap::new();
        for i in 0..105u16 {
            let life = if i < 100 { 10.0 + i as f32 } else { 1000.0 };
            lives.insert(owner(i), life);
        }

        let mut reclaimed = Vec::new();
        for i in 0..105u16 {
            let acq = pool
                .acquire(Some(owner(i)), |id| lives.get(&id).copied(), &mut gfx)
                .unwrap();
            if let Some(victim) = acq.reclaimed_from {
                reclaimed.push(victim);
            }
        }

        assert_eq!(pool.reclaims(), 5);
        assert_eq!(pool.in_use_count(), 100);
        assert_eq!(
            reclaimed,
            (0..5u16).map(|i| Some(owner(i))).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_reclaim_never_takes_from_requester() {
        let mut gfx = HeadlessPresentation::new();
        let mut pool = ObjectPool::new(PoolId::Debris, 2, &mut gfx);
        let me = owner(7);
        pool.acquire(Some(me), |_| Some(1.0), &mut gfx).unwrap();
        pool.acquire(Some(me), |_| Some(1.0), &mut gfx).unwrap();

        assert_eq!(
            pool.acquire(Some(me), |_| Some(1.0), &mut gfx),
            Err(PoolError::Exhausted { pool: "debris" })
        );
    }

    #[test]
    fn test_orphan_and_stale_owners_go_first() {
        let mut gfx = HeadlessPresentation::new();
        let mut pool = ObjectPool::new(PoolId::Trail, 3, &mut gfx);
        pool.acquire(Some(owner(1)), |_| None, &mut gfx).unwrap();
        pool.acquire(None, |_| None, &mut gfx).unwrap();
        pool.acquire(Some(owner(3)), |_| None, &mut gfx).unwrap();

        // owner(3) is unknown to the registry (stale)
        let life_of = |id: EffectId| match id.index() {
            1 => Some(5.0),
            4 => Some(50.0),
            _ => None,
        };
        let acq = pool.acquire(Some(owner(4)), life_of, &mut gfx).unwrap();
        assert_eq!(acq.reclaimed_from, Some(None));
        assert_eq!(acq.handle.slot(), 1);

        let acq = pool.acquire(Some(owner(5)), life_of, &mut gfx).unwrap();
        assert_eq!(acq.reclaimed_from, Some(Some(owner(3))));
    }

    #[test]
    fn test_reclaim_resets_visual() {
        let mut gfx = HeadlessPresentation::new();
        let mut pool = ObjectPool::new(PoolId::Particle, 1, &mut gfx);
        let first = pool.acquire(Some(owner(1)), |_| Some(2.0), &mut gfx).unwrap();
        let g = first.handle.graphics();
        gfx.set_opacity(g, 0.1);
        gfx.set_transform(g, Vec3::new(5.0, 5.0, 5.0), Vec3::ZERO, Vec3::splat(3.0));

        let second = pool.acquire(Some(owner(2)), |_| Some(2.0), &mut gfx).unwrap();
        assert_eq!(second.handle, first.handle);

        let record = gfx.visual(g).unwrap();
        assert_eq!(record.opacity, 1.0);
        assert_eq!(record.transform.scale, Vec3::ONE);
        assert!(record.visible);
        assert_eq!(pool.owner_of(second.handle), Some(owner(2)));
    }

    #[test]
    fn test_manager_uses_configured_capacities() {
        let mut gfx = HeadlessPresentation::new();
        let config = PoolConfig {
            particles: 3,
            debris: 2,
            lights: 1,
            shockwaves: 1,
            trails: 4,
        };
        let mut pools = PoolManager::new(&config, &mut gfx);
        assert_eq!(pools.pool(PoolId::Trail).capacity(), 4);
        assert_eq!(gfx.created_count(VisualKind::Particle), 3);

        let acq = pools.acquire(PoolId::Shockwave, None, |_| None, &mut gfx).unwrap();
        let mut metrics = SimMetrics::new();
        pools.record_metrics(&mut metrics);
        assert_eq!(metrics.pool_in_use[PoolId::Shockwave.index()], 1);
        assert_eq!(pools.total_in_use(), 1);

        assert!(pools.release(acq.handle, &mut gfx));
        pools.destroy(&mut gfx);
        assert_eq!(gfx.live_count(), 0);
    }
}
