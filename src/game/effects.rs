//! Effect lifecycle registry
//!
//! An effect record is a short-lived bundle of pooled visuals (light,
//! shockwave ring, particles, debris, trail) that animate together and are
//! handed back to the pools when the record's life runs out. Records live in a
//! preallocated slab addressed by generational [`EffectId`]s.
//!
//! A record is registered before its resources are acquired, so a record
//! being built is never chosen as a reclaim victim for its own requests. When
//! a pool reclaims a slot from another record, that record simply loses the
//! resource. Each tick also skips any resource its record no longer owns.

use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::f32::consts::FRAC_PI_2;

use crate::config::{EffectConfig, SimConfig};
use crate::game::constants::{arena::GROUND_HEIGHT, effects as fx};
use crate::game::context::SimulationContext;
use crate::game::pool::{PoolId, PoolManager, PooledHandle};
use crate::game::presentation::{Color, Presentation};
use crate::metrics::SimMetrics;
use crate::util::vec3::Vec3;

/// Inline capacity of the per-record particle list
const PARTICLE_INLINE: usize = 24;
/// Inline capacity of the per-record debris list
const DEBRIS_INLINE: usize = 8;

/// Generational handle to an effect record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectId {
    index: u16,
    generation: u16,
}

impl EffectId {
    pub(crate) const fn new(index: u16, generation: u16) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }
}

/// What struck what, for impact colouring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImpactKind {
    Wall,
    Vehicle,
    Turret,
    Remote,
}

impl ImpactKind {
    pub fn color(&self) -> Color {
        match self {
            ImpactKind::Wall => Color::CYAN,
            ImpactKind::Vehicle => Color::RED,
            ImpactKind::Turret => Color::ORANGE,
            ImpactKind::Remote => Color::MAGENTA,
        }
    }

    /// Body hits get a small shockwave ring, glancing hits do not
    fn has_shockwave(&self) -> bool {
        matches!(self, ImpactKind::Vehicle | ImpactKind::Turret)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Explosion,
    Impact(ImpactKind),
    Trail,
    Spark,
}

/// Update cadence class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectClass {
    /// Explosions and impacts
    Major,
    /// Trails and sparks
    Minor,
}

impl EffectClass {
    fn index(&self) -> usize {
        match self {
            EffectClass::Major => 0,
            EffectClass::Minor => 1,
        }
    }
}

impl EffectKind {
    pub fn class(&self) -> EffectClass {
        match self {
            EffectKind::Explosion | EffectKind::Impact(_) => EffectClass::Major,
            EffectKind::Trail | EffectKind::Spark => EffectClass::Minor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    /// Holds full opacity, then fades while cooling toward red
    Fire,
    /// Fades from the start and keeps growing
    Smoke,
    /// Linear fade
    Spark,
}

#[derive(Debug, Clone, Copy)]
pub struct ParticleState {
    pub handle: PooledHandle,
    pub kind: ParticleKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub scale: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct DebrisState {
    pub handle: PooledHandle,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Vec3,
    pub spin: Vec3,
}

/// One active effect
#[derive(Debug, Clone)]
pub struct EffectRecord {
    pub kind: EffectKind,
    pub life: f32,
    pub max_life: f32,
    pub origin: Vec3,
    pub size: f32,
    pub base_intensity: f32,
    pub color: Color,
    pub light: Option<PooledHandle>,
    pub shockwave: Option<PooledHandle>,
    pub trail: Option<PooledHandle>,
    pub particles: SmallVec<[ParticleState; PARTICLE_INLINE]>,
    pub debris: SmallVec<[DebrisState; DEBRIS_INLINE]>,
    /// Class dt that was already pending when the record spawned
    spawn_credit: f32,
}

impl EffectRecord {
    fn new(kind: EffectKind, max_life: f32, origin: Vec3, size: f32, base_intensity: f32, color: Color) -> Self {
        Self {
            kind,
            life: max_life,
            max_life,
            origin,
            size,
            base_intensity,
            color,
            light: None,
            shockwave: None,
            trail: None,
            particles: SmallVec::new(),
            debris: SmallVec::new(),
            spawn_credit: 0.0,
        }
    }

    /// 0 at spawn, 1 at expiry
    pub fn progress(&self) -> f32 {
        if self.max_life <= 0.0 {
            return 1.0;
        }
        (1.0 - self.life / self.max_life).clamp(0.0, 1.0)
    }

    /// Every pooled handle this record still references
    pub fn resources(&self) -> impl Iterator<Item = PooledHandle> + '_ {
        self.light
            .iter()
            .copied()
            .chain(self.shockwave.iter().copied())
            .chain(self.trail.iter().copied())
            .chain(self.particles.iter().map(|p| p.handle))
            .chain(self.debris.iter().map(|d| d.handle))
    }

    pub fn resource_count(&self) -> usize {
        self.resources().count()
    }

    /// Forget a handle that was reclaimed by another effect
    fn detach(&mut self, handle: PooledHandle) {
        if self.light == Some(handle) {
            self.light = None;
        }
        if self.shockwave == Some(handle) {
            self.shockwave = None;
        }
        if self.trail == Some(handle) {
            self.trail = None;
        }
        self.particles.retain(|p| p.handle != handle);
        self.debris.retain(|d| d.handle != handle);
    }
}

pub struct EffectRegistry {
    pools: PoolManager,
    slots: Vec<Option<EffectRecord>>,
    generations: Vec<u16>,
    active: usize,
    debris_enabled: bool,
    /// dt accrued per class since its last `tick_class`
    pending_dt: [f32; 2],
    config: EffectConfig,
}

impl EffectRegistry {
    pub fn new(config: &SimConfig, gfx: &mut dyn Presentation) -> Self {
        let capacity = config.effects.max_effects.clamp(1, u16::MAX as usize);
        Self {
            pools: PoolManager::new(&config.pools, gfx),
            slots: (0..capacity).map(|_| None).collect(),
            generations: vec![0; capacity],
            active: 0,
            debris_enabled: true,
            pending_dt: [0.0; 2],
            config: config.effects.clone(),
        }
    }

    pub fn pools(&self) -> &PoolManager {
        &self.pools
    }

    pub fn get(&self, id: EffectId) -> Option<&EffectRecord> {
        life_slot(&self.slots, &self.generations, id)
    }

    pub fn life_of(&self, id: EffectId) -> Option<f32> {
        self.get(id).map(|r| r.life)
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EffectId, &EffectRecord)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref()
                .map(|record| (EffectId::new(i as u16, self.generations[i]), record))
        })
    }

    /// Destruction debris is skipped while disabled (frame budget pressure)
    pub fn set_debris_enabled(&mut self, enabled: bool) {
        self.debris_enabled = enabled;
    }

    pub fn debris_enabled(&self) -> bool {
        self.debris_enabled
    }

    /// Record frame time that the next `tick_class` of each class will carry.
    /// Records spawned afterwards are not charged for it.
    pub fn accrue(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        for pending in &mut self.pending_dt {
            *pending += dt;
        }
    }

    // ------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------

    /// Light, shockwave and alternating fire/smoke particles
    pub fn spawn_explosion(&mut self, ctx: &mut SimulationContext, position: Vec3, size: f32) -> EffectId {
        self.explosion(ctx, position, size, false)
    }

    /// Explosion that also throws debris (vehicle or turret destroyed)
    pub fn spawn_destruction(&mut self, ctx: &mut SimulationContext, position: Vec3, size: f32) -> EffectId {
        let with_debris = self.debris_enabled;
        self.explosion(ctx, position, size, with_debris)
    }

    pub fn spawn_impact(&mut self, ctx: &mut SimulationContext, position: Vec3, kind: ImpactKind) -> EffectId {
        let color = kind.color();
        let id = self.insert(
            EffectRecord::new(
                EffectKind::Impact(kind),
                self.config.impact_life,
                position,
                1.0,
                fx::IMPACT_LIGHT_INTENSITY,
                color,
            ),
            ctx.gfx,
            ctx.metrics,
        );

        self.attach_light(id, ctx.gfx, position, color, fx::IMPACT_LIGHT_INTENSITY);
        if kind.has_shockwave() {
            self.attach_shockwave(id, ctx.gfx, position, color);
        }
        for _ in 0..self.config.impact_particles.min(PARTICLE_INLINE) {
            let velocity = random_direction(ctx) * ctx.rng.gen_range(0.1..0.3);
            self.attach_particle(id, ctx.gfx, ParticleKind::Spark, position, velocity, 0.2, color);
        }
        id
    }

    /// Single fading trail particle behind a projectile
    pub fn spawn_trail(&mut self, ctx: &mut SimulationContext, position: Vec3, color: Color) -> EffectId {
        let id = self.insert(
            EffectRecord::new(EffectKind::Trail, self.config.trail_life, position, 0.3, 0.0, color),
            ctx.gfx,
            ctx.metrics,
        );
        if let Some(handle) = self.acquire(id, PoolId::Trail, ctx.gfx) {
            let g = handle.graphics();
            ctx.gfx.set_transform(g, position, Vec3::ZERO, Vec3::splat(0.3));
            ctx.gfx.set_color(g, color);
            ctx.gfx.set_opacity(g, fx::TRAIL_OPACITY);
            match self.record_mut(id) {
                Some(record) => record.trail = Some(handle),
                None => {
                    self.pools.release(handle, ctx.gfx);
                }
            }
        }
        id
    }

    /// A few sparks thrown along `direction` (vehicle scraping a pillar)
    pub fn spawn_spark(&mut self, ctx: &mut SimulationContext, position: Vec3, direction: Vec3) -> EffectId {
        let id = self.insert(
            EffectRecord::new(EffectKind::Spark, self.config.spark_life, position, 0.5, 0.0, Color::YELLOW),
            ctx.gfx,
            ctx.metrics,
        );
        let along = direction.normalize();
        for _ in 0..self.config.spark_particles.min(PARTICLE_INLINE) {
            let velocity = (along + random_direction(ctx) * 0.5) * ctx.rng.gen_range(0.1..0.25);
            self.attach_particle(id, ctx.gfx, ParticleKind::Spark, position, velocity, 0.15, Color::YELLOW);
        }
        id
    }

    fn explosion(&mut self, ctx: &mut SimulationContext, position: Vec3, size: f32, with_debris: bool) -> EffectId {
        let size = if size.is_finite() && size > 0.0 { size } else { 1.0 };
        let intensity = fx::EXPLOSION_LIGHT_INTENSITY * size;
        let id = self.insert(
            EffectRecord::new(
                EffectKind::Explosion,
                self.config.explosion_life,
                position,
                size,
                intensity,
                Color::ORANGE,
            ),
            ctx.gfx,
            ctx.metrics,
        );

        self.attach_light(id, ctx.gfx, position, Color::ORANGE, intensity);
        self.attach_shockwave(id, ctx.gfx, position, Color::WHITE);

        for i in 0..self.config.explosion_particles.min(PARTICLE_INLINE) {
            let (kind, speed, scale, color) = if i % 2 == 0 {
                (ParticleKind::Fire, 0.3, 0.5, Color::ORANGE)
            } else {
                (ParticleKind::Smoke, 0.1, 0.8, Color::SMOKE)
            };
            let mut velocity = random_direction(ctx) * speed * size;
            velocity.y = velocity.y.abs();
            self.attach_particle(id, ctx.gfx, kind, position, velocity, scale * size, color);
        }

        if with_debris {
            for _ in 0..self.config.destruction_debris.min(DEBRIS_INLINE) {
                let velocity = Vec3::new(
                    ctx.rng.gen_range(-0.3..0.3),
                    ctx.rng.gen_range(0.2..0.5),
                    ctx.rng.gen_range(-0.3..0.3),
                ) * size;
                let spin = Vec3::new(
                    ctx.rng.gen_range(-0.2..0.2),
                    ctx.rng.gen_range(-0.2..0.2),
                    ctx.rng.gen_range(-0.2..0.2),
                );
                self.attach_debris(id, ctx.gfx, position + Vec3::UP * 0.5, velocity, spin);
            }
        }

        tracing::debug!(?id, x = position.x, z = position.z, with_debris, "explosion spawned");
        id
    }

    /// Register a record, evicting the shortest-lived one when the slab is full
    fn insert(&mut self, mut record: EffectRecord, gfx: &mut dyn Presentation, metrics: &mut SimMetrics) -> EffectId {
        record.spawn_credit = self.pending_dt[record.kind.class().index()];
        let index = match self.slots.iter().position(|s| s.is_none()) {
            Some(index) => index,
            None => {
                let victim = self
                    .slots
                    .iter()
                    .enumerate()
                    .filter_map(|(i, s)| s.as_ref().map(|r| (i, r.life)))
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                self.retire(victim, gfx);
                metrics.effects_evicted += 1;
                victim
            }
        };

        self.slots[index] = Some(record);
        self.active += 1;
        metrics.effects_spawned += 1;
        EffectId::new(index as u16, self.generations[index])
    }

    fn record_mut(&mut self, id: EffectId) -> Option<&mut EffectRecord> {
        let index = id.index as usize;
        if self.generations.get(index) != Some(&id.generation) {
            return None;
        }
        self.slots[index].as_mut()
    }

    /// Borrow a slot for `id`, detaching it from whichever record loses it
    fn acquire(&mut self, id: EffectId, pool: PoolId, gfx: &mut dyn Presentation) -> Option<PooledHandle> {
        let slots = &self.slots;
        let generations = &self.generations;
        let life_of = |other: EffectId| life_slot(slots, generations, other).map(|r| r.life);

        match self.pools.acquire(pool, Some(id), life_of, gfx) {
            Ok(acquisition) => {
                if let Some(Some(victim)) = acquisition.reclaimed_from {
                    self.detach(victim, acquisition.handle);
                }
                Some(acquisition.handle)
            }
            Err(e) => {
                tracing::debug!(?id, "effect resource skipped: {}", e);
                None
            }
        }
    }

    fn detach(&mut self, victim: EffectId, handle: PooledHandle) {
        let Some(record) = self.record_mut(victim) else {
            return;
        };
        record.detach(handle);
        if record.resource_count() == 0 {
            // Nothing left to animate
            self.remove(victim.index as usize);
        }
    }

    fn attach_light(&mut self, id: EffectId, gfx: &mut dyn Presentation, position: Vec3, color: Color, intensity: f32) {
        let Some(handle) = self.acquire(id, PoolId::Light, gfx) else {
            return;
        };
        let g = handle.graphics();
        gfx.set_transform(g, position + Vec3::UP, Vec3::ZERO, Vec3::ONE);
        gfx.set_color(g, color);
        gfx.set_intensity(g, intensity);
        match self.record_mut(id) {
            Some(record) => record.light = Some(handle),
            None => {
                self.pools.release(handle, gfx);
            }
        }
    }

    fn attach_shockwave(&mut self, id: EffectId, gfx: &mut dyn Presentation, position: Vec3, color: Color) {
        let Some(handle) = self.acquire(id, PoolId::Shockwave, gfx) else {
            return;
        };
        let g = handle.graphics();
        // Ring lies flat on the ground and starts at zero size
        gfx.set_transform(g, position, Vec3::new(-FRAC_PI_2, 0.0, 0.0), Vec3::ZERO);
        gfx.set_color(g, color);
        gfx.set_opacity(g, fx::SHOCKWAVE_OPACITY);
        match self.record_mut(id) {
            Some(record) => record.shockwave = Some(handle),
            None => {
                self.pools.release(handle, gfx);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn attach_particle(
        &mut self,
        id: EffectId,
        gfx: &mut dyn Presentation,
        kind: ParticleKind,
        position: Vec3,
        velocity: Vec3,
        scale: f32,
        color: Color,
    ) {
        let Some(handle) = self.acquire(id, PoolId::Particle, gfx) else {
            return;
        };
        let g = handle.graphics();
        gfx.set_transform(g, position, Vec3::ZERO, Vec3::splat(scale));
        gfx.set_color(g, color);
        if kind == ParticleKind::Smoke {
            gfx.set_opacity(g, fx::SMOKE_OPACITY);
        }
        let state = ParticleState {
            handle,
            kind,
            position,
            velocity,
            scale,
            color,
        };
        match self.record_mut(id) {
            Some(record) => record.particles.push(state),
            None => {
                self.pools.release(handle, gfx);
            }
        }
    }

    fn attach_debris(&mut self, id: EffectId, gfx: &mut dyn Presentation, position: Vec3, velocity: Vec3, spin: Vec3) {
        let Some(handle) = self.acquire(id, PoolId::Debris, gfx) else {
            return;
        };
        gfx.set_transform(handle.graphics(), position, Vec3::ZERO, Vec3::splat(0.4));
        let state = DebrisState {
            handle,
            position,
            velocity,
            rotation: Vec3::ZERO,
            spin,
        };
        match self.record_mut(id) {
            Some(record) => record.debris.push(state),
            None => {
                self.pools.release(handle, gfx);
            }
        }
    }

    // ------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------

    /// Advance every record by `dt` ticks
    pub fn tick(&mut self, dt: f32, gfx: &mut dyn Presentation) {
        self.tick_class(EffectClass::Major, dt, gfx);
        self.tick_class(EffectClass::Minor, dt, gfx);
    }

    /// Advance records of one class. Records whose life reaches zero release
    /// all of their resources in the same call.
    pub fn tick_class(&mut self, class: EffectClass, dt: f32, gfx: &mut dyn Presentation) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        self.pending_dt[class.index()] = 0.0;

        for index in 0..self.slots.len() {
            let pools = &self.pools;
            let id = EffectId::new(index as u16, self.generations[index]);
            let expired = match self.slots[index].as_mut() {
                Some(record) if record.kind.class() == class => {
                    // Time that passed before the record existed is not charged
                    let step = (dt - std::mem::take(&mut record.spawn_credit)).max(0.0);
                    record.life -= step;
                    if record.life <= 0.0 {
                        true
                    } else {
                        animate(record, id, pools, gfx, step);
                        false
                    }
                }
                _ => false,
            };
            if expired {
                self.retire(index, gfx);
            }
        }
    }

    /// Retire every record and return all resources
    pub fn clear(&mut self, gfx: &mut dyn Presentation) {
        for index in 0..self.slots.len() {
            self.retire(index, gfx);
        }
    }

    pub fn record_metrics(&self, metrics: &mut SimMetrics) {
        metrics.effects_active = self.active as u64;
        self.pools.record_metrics(metrics);
    }

    /// Release the resources the record still owns and free its slot
    fn retire(&mut self, index: usize, gfx: &mut dyn Presentation) {
        let id = EffectId::new(index as u16, self.generations[index]);
        let Some(record) = self.remove(index) else {
            return;
        };
        for handle in record.resources() {
            if self.pools.owner_of(handle) == Some(id) {
                self.pools.release(handle, gfx);
            }
        }
    }

    fn remove(&mut self, index: usize) -> Option<EffectRecord> {
        let record = self.slots[index].take()?;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.active -= 1;
        Some(record)
    }
}

fn life_slot<'a>(slots: &'a [Option<EffectRecord>], generations: &[u16], id: EffectId) -> Option<&'a EffectRecord> {
    let index = id.index as usize;
    if generations.get(index) != Some(&id.generation) {
        return None;
    }
    slots[index].as_ref()
}

fn random_direction(ctx: &mut SimulationContext) -> Vec3 {
    let v = Vec3::new(
        ctx.rng.gen_range(-1.0..1.0),
        ctx.rng.gen_range(-1.0..1.0),
        ctx.rng.gen_range(-1.0..1.0),
    );
    let n = v.normalize();
    if n == Vec3::ZERO {
        Vec3::UP
    } else {
        n
    }
}

/// Apply the per-resource animation rules for the record's current progress
fn animate(record: &mut EffectRecord, id: EffectId, pools: &PoolManager, gfx: &mut dyn Presentation, dt: f32) {
    let progress = record.progress();
    let owns = |handle: &PooledHandle| pools.owner_of(*handle) == Some(id);

    if let Some(light) = record.light.filter(owns) {
        gfx.set_intensity(light.graphics(), (1.0 - progress) * record.base_intensity);
    }

    if let Some(ring) = record.shockwave.filter(owns) {
        let scale = record.size * fx::SHOCKWAVE_SPREAD * progress;
        gfx.set_transform(
            ring.graphics(),
            record.origin,
            Vec3::new(-FRAC_PI_2, 0.0, 0.0),
            Vec3::new(scale, scale, 1.0),
        );
        gfx.set_opacity(ring.graphics(), fx::SHOCKWAVE_OPACITY * (1.0 - progress));
    }

    if let Some(trail) = record.trail.filter(owns) {
        gfx.set_opacity(trail.graphics(), fx::TRAIL_OPACITY * (1.0 - progress));
    }

    let drag = fx::PARTICLE_DRAG.powf(dt);
    for particle in record.particles.iter_mut().filter(|p| owns(&p.handle)) {
        particle.position += particle.velocity * dt;
        particle.velocity *= drag;

        let g = particle.handle.graphics();
        let opacity = match particle.kind {
            ParticleKind::Fire => {
                gfx.set_color(g, particle.color.lerp(Color::RED, progress));
                if progress <= fx::FIRE_HOLD {
                    1.0
                } else {
                    1.0 - (progress - fx::FIRE_HOLD) / (1.0 - fx::FIRE_HOLD)
                }
            }
            ParticleKind::Smoke => {
                particle.scale *= fx::SMOKE_GROWTH.powf(dt);
                fx::SMOKE_OPACITY * (1.0 - progress)
            }
            ParticleKind::Spark => 1.0 - progress,
        };
        gfx.set_transform(g, particle.position, Vec3::ZERO, Vec3::splat(particle.scale));
        gfx.set_opacity(g, opacity.clamp(0.0, 1.0));
    }

    let debris_opacity = if progress > fx::DEBRIS_FADE_START {
        1.0 - (progress - fx::DEBRIS_FADE_START) / (1.0 - fx::DEBRIS_FADE_START)
    } else {
        1.0
    };
    for piece in record.debris.iter_mut().filter(|d| owns(&d.handle)) {
        piece.velocity.y -= fx::DEBRIS_GRAVITY * dt;
        piece.position += piece.velocity * dt;
        if piece.position.y <= GROUND_HEIGHT {
            piece.position.y = GROUND_HEIGHT;
            if piece.velocity.y < 0.0 {
                piece.velocity.y = -piece.velocity.y * fx::DEBRIS_BOUNCE;
                piece.velocity.x *= fx::DEBRIS_FRICTION;
                piece.velocity.z *= fx::DEBRIS_FRICTION;
            }
        }
        piece.rotation += piece.spin * dt;

        let g = piece.handle.graphics();
        gfx.set_transform(g, piece.position, piece.rotation, Vec3::splat(0.4));
        gfx.set_opacity(g, debris_opacity.clamp(0.0, 1.0));
    }
}
