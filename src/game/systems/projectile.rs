//! Projectile and collision engine
//!
//! Every live projectile advances each tick and is tested, in order, against
//! the arena walls, the local vehicle, the turrets and finally the remote
//! players through the [`RemoteHitHook`]. The first positive test ends the
//! projectile; nothing can damage two targets in one tick.
//!
//! Removal is deferred: hit projectiles are only marked dead during the pass
//! and compacted out at the end, so later steps in the same tick never see a
//! half-removed list.

use std::panic::{catch_unwind, AssertUnwindSafe};

#[cfg(feature = "trails")]
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::audio::Sound;
use crate::game::context::SimulationContext;
use crate::game::effects::{EffectRegistry, ImpactKind};
use crate::game::events::CombatEvent;
use crate::game::network::{PlayerId, RemoteHitHook, RemoteRoster};
use crate::game::presentation::{Color, GraphicsHandle, Material, Transform, VisualKind};
use crate::game::state::{Turret, Vehicle};
use crate::game::systems::arena::Arena;
use crate::game::systems::{damage, turret};
use crate::util::vec3::Vec3;

/// Projectile identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectileId(pub u64);

/// Who fired a projectile. Governs which collision checks apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileSource {
    Player,
    Turret,
    /// Visual copy of another player's shot
    Remote,
}

impl ProjectileSource {
    pub fn color(&self) -> Color {
        match self {
            ProjectileSource::Player => Color::CYAN,
            ProjectileSource::Turret => Color::ORANGE,
            ProjectileSource::Remote => Color::MAGENTA,
        }
    }
}

/// Projectile errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectileError {
    #[error("projectile origin is not finite")]
    NonFiniteOrigin,

    #[error("projectile direction must be finite and non-zero")]
    InvalidDirection,

    #[error("projectile speed must be finite and positive, got {0}")]
    InvalidSpeed(f32),

    #[error("{0:?} projectile requires an owner")]
    MissingOwner(ProjectileSource),

    #[error("projectile {0:?} left finite space")]
    NonFinitePosition(ProjectileId),

    #[error("projectile list is full ({0} live)")]
    CapacityReached(usize),
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: ProjectileId,
    pub position: Vec3,
    /// Unit vector
    pub direction: Vec3,
    pub speed: f32,
    pub damage: u32,
    /// Ticks left before expiry
    pub lifetime: u32,
    pub source: ProjectileSource,
    pub owner: Option<PlayerId>,
    pub visual: Option<GraphicsHandle>,
    alive: bool,
}

impl Projectile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ProjectileId,
        position: Vec3,
        direction: Vec3,
        speed: f32,
        damage: u32,
        lifetime: u32,
        source: ProjectileSource,
        owner: Option<PlayerId>,
    ) -> Self {
        Self {
            id,
            position,
            direction,
            speed,
            damage,
            lifetime,
            source,
            owner,
            visual: None,
            alive: true,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Fired by the local player
    fn is_local_shot(&self, local_player: PlayerId) -> bool {
        self.source == ProjectileSource::Player && self.owner == Some(local_player)
    }
}

/// Fire request
#[derive(Debug, Clone, Copy)]
pub struct ShotSpec {
    pub origin: Vec3,
    pub direction: Vec3,
    pub speed: f32,
    pub damage: u32,
    pub source: ProjectileSource,
    pub owner: Option<PlayerId>,
    pub lifetime: u32,
}

/// Everything a projectile can collide with this tick
pub struct CollisionTargets<'a> {
    pub arena: &'a Arena,
    pub vehicle: &'a mut Vehicle,
    pub turrets: &'a mut [Turret],
    pub roster: &'a RemoteRoster,
    pub remote_hits: &'a mut dyn RemoteHitHook,
    pub score: &'a mut u64,
}

/// What ended a projectile
#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Flying,
    Wall,
    Vehicle,
    Turret,
    Remote,
    Expired,
}

pub struct ProjectileEngine {
    projectiles: Vec<Projectile>,
    max_active: usize,
    next_id: u64,
    trail_cap: usize,
}

impl ProjectileEngine {
    pub fn new(max_active: usize, trail_cap: usize) -> Self {
        Self {
            projectiles: Vec::with_capacity(max_active),
            max_active,
            next_id: 1,
            trail_cap,
        }
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn active_count(&self) -> usize {
        self.projectiles.len()
    }

    pub fn get(&self, id: ProjectileId) -> Option<&Projectile> {
        self.projectiles.iter().find(|p| p.id == id)
    }

    /// Per-frame trail budget, adjusted by the frame budget monitor
    pub fn set_trail_cap(&mut self, cap: usize) {
        self.trail_cap = cap;
    }

    pub fn trail_cap(&self) -> usize {
        self.trail_cap
    }

    /// Validate and launch a projectile
    pub fn fire(&mut self, ctx: &mut SimulationContext, spec: ShotSpec) -> Result<ProjectileId, ProjectileError> {
        let result = self.launch(ctx, spec);
        if let Err(e) = &result {
            ctx.metrics.projectiles_rejected += 1;
            tracing::warn!(source = ?spec.source, "fire request dropped: {}", e);
        }
        result
    }

    fn launch(&mut self, ctx: &mut SimulationContext, spec: ShotSpec) -> Result<ProjectileId, ProjectileError> {
        if !spec.origin.is_finite() {
            return Err(ProjectileError::NonFiniteOrigin);
        }
        if !spec.direction.is_finite() || spec.direction.length_sq() <= f32::EPSILON {
            return Err(ProjectileError::InvalidDirection);
        }
        if !(spec.speed.is_finite() && spec.speed > 0.0) {
            return Err(ProjectileError::InvalidSpeed(spec.speed));
        }
        if spec.source != ProjectileSource::Turret && spec.owner.is_none() {
            return Err(ProjectileError::MissingOwner(spec.source));
        }
        if self.projectiles.len() >= self.max_active {
            return Err(ProjectileError::CapacityReached(self.projectiles.len()));
        }

        let id = ProjectileId(self.next_id);
        self.next_id += 1;

        let mut projectile = Projectile::new(
            id,
            spec.origin,
            spec.direction.normalize(),
            spec.speed,
            spec.damage,
            spec.lifetime,
            spec.source,
            spec.owner,
        );
        projectile.visual = Some(ctx.gfx.create_visual(
            VisualKind::Projectile,
            &Transform::at(spec.origin).with_scale(0.3),
            &Material::glowing(spec.source.color(), 1.0),
        ));

        if projectile.is_local_shot(ctx.local_player) {
            ctx.net.notify_projectile_created(&projectile);
        }
        ctx.emit(CombatEvent::ProjectileFired {
            id,
            source: spec.source,
            position: spec.origin,
        });
        ctx.metrics.projectiles_fired += 1;
        tracing::debug!(?id, source = ?spec.source, "projectile fired");

        self.projectiles.push(projectile);
        Ok(id)
    }

    /// Advance and collide every projectile.
    ///
    /// A projectile whose processing fails is removed on its own. A panic
    /// escaping the pass clears the whole list.
    pub fn tick(
        &mut self,
        ctx: &mut SimulationContext,
        targets: &mut CollisionTargets,
        effects: &mut EffectRegistry,
        dt: f32,
    ) {
        if self.projectiles.is_empty() {
            return;
        }

        let projectiles = &mut self.projectiles;
        let trail_cap = self.trail_cap;
        let pass = catch_unwind(AssertUnwindSafe(|| {
            let mut trails_left = trail_cap;
            for projectile in projectiles.iter_mut() {
                match step(projectile, ctx, targets, effects, dt, &mut trails_left) {
                    Ok(Outcome::Flying) => {}
                    Ok(outcome) => {
                        tracing::trace!(id = ?projectile.id, ?outcome, "projectile ended");
                        projectile.alive = false;
                    }
                    Err(e) => {
                        tracing::warn!(id = ?projectile.id, "projectile dropped: {}", e);
                        ctx.metrics.projectile_faults += 1;
                        projectile.alive = false;
                    }
                }
            }
        }));

        if pass.is_err() {
            tracing::error!(
                count = self.projectiles.len(),
                "projectile pass panicked, clearing all projectiles"
            );
            ctx.metrics.projectile_resets += 1;
            for projectile in &mut self.projectiles {
                projectile.alive = false;
            }
        }

        self.compact(ctx);
    }

    /// Drop every projectile and its visual
    pub fn clear(&mut self, ctx: &mut SimulationContext) {
        for projectile in &mut self.projectiles {
            projectile.alive = false;
        }
        self.compact(ctx);
    }

    fn compact(&mut self, ctx: &mut SimulationContext) {
        let before = self.projectiles.len();
        self.projectiles.retain(|p| {
            if !p.alive {
                if let Some(visual) = p.visual {
                    ctx.gfx.destroy_visual(visual);
                }
            }
            p.alive
        });
        ctx.metrics.projectiles_removed += (before - self.projectiles.len()) as u64;
        ctx.metrics.projectiles_active = self.projectiles.len() as u64;
    }
}

/// Advance one projectile and run its collision checks
fn step(
    p: &mut Projectile,
    ctx: &mut SimulationContext,
    targets: &mut CollisionTargets,
    effects: &mut EffectRegistry,
    dt: f32,
    trails_left: &mut usize,
) -> Result<Outcome, ProjectileError> {
    if !p.alive {
        return Ok(Outcome::Expired);
    }

    p.position += p.direction * (p.speed * dt);
    if !p.position.is_finite() {
        return Err(ProjectileError::NonFinitePosition(p.id));
    }
    p.lifetime = p.lifetime.saturating_sub(dt.ceil() as u32);
    if let Some(visual) = p.visual {
        ctx.gfx.set_transform(visual, p.position, Vec3::ZERO, Vec3::splat(0.3));
    }

    #[cfg(feature = "trails")]
    leave_trail(p, ctx, effects, trails_left);
    #[cfg(not(feature = "trails"))]
    let _ = trails_left;

    // Walls
    if targets.arena.hits_wall(p.position) {
        let contact = targets.arena.clamp_inside(p.position);
        effects.spawn_impact(ctx, contact, ImpactKind::Wall);
        ctx.play(Sound::WallHit, Some(contact));
        ctx.emit(CombatEvent::WallHit {
            position: contact,
            damage: 0,
        });
        return Ok(Outcome::Wall);
    }

    // Local vehicle; the local player's own shots never test against it
    let vehicle = &mut *targets.vehicle;
    if !p.is_local_shot(ctx.local_player)
        && vehicle.is_alive()
        && vehicle.hit_test(p.position, ctx.config.vehicle.hitbox_margin)
    {
        // Remote shots are visual copies; the shooter's peer reports the damage
        if p.source != ProjectileSource::Remote {
            damage::apply_to_vehicle(vehicle, p.damage, p.owner, ctx);
        }
        effects.spawn_impact(ctx, p.position, ImpactKind::Vehicle);
        return Ok(Outcome::Vehicle);
    }

    // Turrets, player shots only
    if p.source == ProjectileSource::Player {
        let margin = ctx.config.turret.hitbox_margin;
        if let Some(target) = targets
            .turrets
            .iter_mut()
            .find(|t| !t.is_destroyed() && t.hit_test(p.position, margin))
        {
            effects.spawn_impact(ctx, p.position, ImpactKind::Turret);
            turret::apply_damage(target, p.damage, ctx, effects, targets.score);
            return Ok(Outcome::Turret);
        }
    }

    // Remote players, resolved locally only for our own shots
    if p.is_local_shot(ctx.local_player) {
        if let Some(hit) = targets.remote_hits.check_remote_hits(p, targets.roster) {
            effects.spawn_impact(ctx, hit.position, ImpactKind::Remote);
            ctx.play(Sound::Hit, Some(hit.position));
            ctx.emit(CombatEvent::RemoteEntityHit {
                target: hit.target,
                damage: p.damage,
                position: hit.position,
            });
            return Ok(Outcome::Remote);
        }
    }

    if p.lifetime == 0 || targets.arena.beyond_world(p.position) {
        return Ok(Outcome::Expired);
    }

    Ok(Outcome::Flying)
}

#[cfg(feature = "trails")]
fn leave_trail(p: &Projectile, ctx: &mut SimulationContext, effects: &mut EffectRegistry, trails_left: &mut usize) {
    let chance = match p.source {
        ProjectileSource::Remote => ctx.config.projectile.remote_trail_chance,
        _ => ctx.config.projectile.trail_chance,
    };
    if ctx.rng.gen::<f32>() >= chance {
        return;
    }
    if *trails_left == 0 {
        ctx.metrics.trails_suppressed += 1;
        return;
    }
    *trails_left -= 1;
    ctx.metrics.trails_spawned += 1;
    effects.spawn_trail(ctx, p.position, p.source.color());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::game::context::TestContext;
    use crate::game::network::{NoRemoteHits, RemoteEntity, RosterHitbox};
    use crate::game::presentation::HeadlessPresentation;
    use crate::game::state::{GameState, TurretState};

    struct World {
        t: TestContext,
        state: GameState,
        effects: EffectRegistry,
        engine: ProjectileEngine,
        hook: Box<dyn RemoteHitHook>,
    }

    impl World {
        fn new() -> Self {
            let mut t = TestContext::new(SimConfig::default());
            let state = GameState::new(&t.config, &mut t.gfx, t.local_player);
            let effects = EffectRegistry::new(&t.config, &mut t.gfx);
            let engine = ProjectileEngine::new(t.config.projectile.max_active, 0);
            Self {
                t,
                state,
                effects,
                engine,
                hook: Box::new(NoRemoteHits),
            }
        }

        fn fire(&mut self, spec: ShotSpec) -> Result<ProjectileId, ProjectileError> {
            self.engine.fire(&mut self.t.ctx(), spec)
        }

        fn tick(&mut self) {
            let mut targets = CollisionTargets {
                arena: &self.state.arena,
                vehicle: &mut self.state.vehicle,
                turrets: &mut self.state.turrets,
                roster: &self.state.roster,
                remote_hits: self.hook.as_mut(),
                score: &mut self.state.score,
            };
            self.engine.tick(&mut self.t.ctx(), &mut targets, &mut self.effects, 1.0);
        }

        fn local_shot(&self, origin: Vec3, direction: Vec3) -> ShotSpec {
            ShotSpec {
                origin,
                direction,
                speed: 2.0,
                damage: 25,
                source: ProjectileSource::Player,
                owner: Some(self.t.local_player),
                lifetime: 120,
            }
        }

        fn turret_shot(origin: Vec3, direction: Vec3) -> ShotSpec {
            ShotSpec {
                origin,
                direction,
                speed: 1.5,
                damage: 10,
                source: ProjectileSource::Turret,
                owner: None,
                lifetime: 200,
            }
        }
    }

    #[test]
    fn test_fire_validates_requests() {
        let mut w = World::new();
        let good = w.local_shot(Vec3::new(0.0, 1.5, 2.0), Vec3::new(0.0, 0.0, 5.0));
        let id = w.fire(good).unwrap();
        assert_eq!(w.engine.get(id).unwrap().direction, Vec3::FORWARD);

        let mut bad = good;
        bad.direction = Vec3::ZERO;
        assert_eq!(w.fire(bad), Err(ProjectileError::InvalidDirection));

        let mut bad = good;
        bad.origin.x = f32::NAN;
        assert_eq!(w.fire(bad), Err(ProjectileError::NonFiniteOrigin));

        let mut bad = good;
        bad.speed = 0.0;
        assert!(matches!(w.fire(bad), Err(ProjectileError::InvalidSpeed(_))));

        let mut bad = good;
        bad.source = ProjectileSource::Remote;
        bad.owner = None;
        assert_eq!(
            w.fire(bad),
            Err(ProjectileError::MissingOwner(ProjectileSource::Remote))
        );

        assert_eq!(w.engine.active_count(), 1);
        assert_eq!(w.t.metrics.projectiles_fired, 1);
        assert_eq!(w.t.metrics.projectiles_rejected, 4);
        assert!(matches!(w.t.events[0], CombatEvent::ProjectileFired { id: fired, .. } if fired == id));
    }

    #[test]
    fn test_capacity_limit() {
        let mut w = World::new();
        w.engine = ProjectileEngine::new(2, 0);
        let shot = World::turret_shot(Vec3::new(0.0, 1.5, 50.0), Vec3::RIGHT);
        assert!(w.fire(shot).is_ok());
        assert!(w.fire(shot).is_ok());
        assert_eq!(w.fire(shot), Err(ProjectileError::CapacityReached(2)));
    }

    #[test]
    fn test_local_shot_never_hits_own_vehicle() {
        let mut w = World::new();
        // Spawned inside the vehicle's hitbox
        w.fire(w.local_shot(Vec3::new(0.0, 1.0, 0.5), Vec3::FORWARD)).unwrap();
        w.tick();
        assert_eq!(w.engine.active_count(), 1);
        assert_eq!(w.state.vehicle.health, 100);
    }

    #[test]
    fn test_turret_shot_hits_vehicle() {
        let mut w = World::new();
        w.fire(World::turret_shot(Vec3::new(0.0, 1.0, -4.0), Vec3::FORWARD)).unwrap();
        w.tick();

        assert_eq!(w.engine.active_count(), 0);
        assert_eq!(w.state.vehicle.health, 90);
        assert_eq!(w.effects.active_count(), 1);
        assert!(w
            .t
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::PlayerHit { damage: 10, .. })));
    }

    #[test]
    fn test_remote_copy_hits_vehicle_without_damage() {
        let mut w = World::new();
        let mut shot = World::turret_shot(Vec3::new(0.0, 1.0, -4.0), Vec3::FORWARD);
        shot.source = ProjectileSource::Remote;
        shot.owner = Some(uuid::Uuid::new_v4());
        w.fire(shot).unwrap();
        w.tick();

        assert_eq!(w.engine.active_count(), 0);
        assert_eq!(w.state.vehicle.health, 100);
    }

    #[test]
    fn test_player_shot_damages_turret() {
        let mut w = World::new();
        let site = w.state.turrets[0].position;
        w.fire(w.local_shot(site + Vec3::new(0.0, 1.5, -4.5), Vec3::FORWARD)).unwrap();
        w.tick();

        assert_eq!(w.engine.active_count(), 0);
        assert_eq!(w.state.turrets[0].health, 75);
        assert!(w.t.events.iter().any(|e| matches!(
            e,
            CombatEvent::TurretHit {
                turret: 0,
                damage: 25,
                remaining_health: 75
            }
        )));
    }

    #[test]
    fn test_turret_shot_passes_through_turrets() {
        let mut w = World::new();
        let site = w.state.turrets[0].position;
        w.fire(World::turret_shot(site + Vec3::new(0.0, 1.5, -4.0), Vec3::FORWARD)).unwrap();
        w.tick();
        assert_eq!(w.engine.active_count(), 1);
        assert_eq!(w.state.turrets[0].health, 100);
    }

    #[test]
    fn test_destroyed_turret_is_not_a_target() {
        let mut w = World::new();
        w.state.turrets[0].state = TurretState::Destroyed;
        let site = w.state.turrets[0].position;
        w.fire(w.local_shot(site + Vec3::new(0.0, 1.5, -4.5), Vec3::FORWARD)).unwrap();
        w.tick();
        assert_eq!(w.engine.active_count(), 1);
    }

    #[test]
    fn test_straight_shot_ends_at_wall() {
        let mut w = World::new();
        // Lane along z = 30 is clear of pillars and turrets
        w.fire(w.local_shot(Vec3::new(0.0, 1.5, 30.0), Vec3::RIGHT)).unwrap();

        let mut ticks = 0;
        while w.engine.active_count() > 0 {
            w.tick();
            ticks += 1;
            for p in w.engine.projectiles() {
                assert!(p.position.x <= w.state.arena.inner_bound());
            }
            assert!(ticks < 100);
        }
        // 98 units at 2 per tick
        assert_eq!(ticks, 50);
        assert!(w
            .t
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::WallHit { damage: 0, .. })));
        assert_eq!(w.t.metrics.projectiles_removed, 1);
    }

    #[test]
    fn test_lifetime_expiry() {
        let mut w = World::new();
        let mut shot = w.local_shot(Vec3::new(0.0, 1.5, 30.0), Vec3::RIGHT);
        shot.lifetime = 3;
        let id = w.fire(shot).unwrap();

        w.tick();
        assert_eq!(w.engine.get(id).unwrap().lifetime, 2);
        w.tick();
        assert_eq!(w.engine.get(id).unwrap().lifetime, 1);
        w.tick();
        assert!(w.engine.get(id).is_none());
        assert_eq!(w.effects.active_count(), 0);
    }

    #[test]
    fn test_remote_hook_only_for_local_shots() {
        let mut w = World::new();
        let target = uuid::Uuid::new_v4();
        w.state.roster.insert(
            target,
            RemoteEntity {
                id: target,
                position: Vec3::new(0.0, 0.5, 34.0),
                yaw: 0.0,
                health: 100,
                last_update_frame: 0,
            },
        );
        w.hook = Box::new(RosterHitbox::default());

        w.fire(World::turret_shot(Vec3::new(0.0, 1.5, 30.0), Vec3::FORWARD)).unwrap();
        w.fire(w.local_shot(Vec3::new(0.5, 1.5, 30.0), Vec3::FORWARD)).unwrap();
        w.tick();

        assert_eq!(w.engine.active_count(), 1);
        assert_eq!(w.engine.projectiles()[0].source, ProjectileSource::Turret);
        assert!(w.t.events.iter().any(|e| matches!(
            e,
            CombatEvent::RemoteEntityHit { target: hit, damage: 25, .. } if *hit == target
        )));
    }

    #[test]
    fn test_faulted_projectile_removed_alone() {
        let mut w = World::new();
        w.fire(w.local_shot(Vec3::new(0.0, 1.5, 30.0), Vec3::RIGHT)).unwrap();
        w.engine.projectiles.push(Projectile::new(
            ProjectileId(999),
            Vec3::new(f32::NAN, 1.0, 0.0),
            Vec3::FORWARD,
            1.0,
            10,
            100,
            ProjectileSource::Turret,
            None,
        ));
        w.fire(w.local_shot(Vec3::new(0.0, 1.5, -30.0), Vec3::RIGHT)).unwrap();

        w.tick();
        assert_eq!(w.engine.active_count(), 2);
        assert!(w.engine.get(ProjectileId(999)).is_none());
        assert_eq!(w.t.metrics.projectile_faults, 1);
    }

    struct PanickingHook;

    impl RemoteHitHook for PanickingHook {
        fn check_remote_hits(&mut self, _projectile: &Projectile, _roster: &RemoteRoster) -> Option<crate::game::network::RemoteHit> {
            panic!("remote hook failure");
        }
    }

    #[test]
    fn test_panic_clears_all_projectiles() {
        let mut w = World::new();
        w.hook = Box::new(PanickingHook);
        for z in [20.0, 30.0, 40.0] {
            w.fire(w.local_shot(Vec3::new(0.0, 1.5, z), Vec3::RIGHT)).unwrap();
        }
        w.tick();

        assert_eq!(w.engine.active_count(), 0);
        assert_eq!(w.t.metrics.projectile_resets, 1);
        assert_eq!(w.t.metrics.projectiles_removed, 3);
        assert_eq!(w.t.gfx.visible_count(VisualKind::Projectile), 0);

        // The engine keeps working afterwards
        w.hook = Box::new(NoRemoteHits);
        w.fire(w.local_shot(Vec3::new(0.0, 1.5, 30.0), Vec3::RIGHT)).unwrap();
        w.tick();
        assert_eq!(w.engine.active_count(), 1);
    }

    #[cfg(feature = "trails")]
    #[test]
    fn test_trails_respect_frame_cap() {
        let mut w = World::new();
        w.t.config.projectile.trail_chance = 1.0;
        w.engine.set_trail_cap(2);
        for z in [10.0, 20.0, 30.0, 40.0, 50.0] {
            w.fire(World::turret_shot(Vec3::new(-50.0, 1.5, z), Vec3::RIGHT)).unwrap();
        }
        w.tick();

        assert_eq!(w.t.metrics.trails_spawned, 2);
        assert_eq!(w.t.metrics.trails_suppressed, 3);
        assert_eq!(w.effects.active_count(), 2);
    }

    #[test]
    fn test_visual_follows_projectile() {
        let mut w = World::new();
        let id = w.fire(w.local_shot(Vec3::new(0.0, 1.5, 30.0), Vec3::RIGHT)).unwrap();
        w.tick();
        let visual = w.engine.get(id).unwrap().visual.unwrap();
        let gfx: &HeadlessPresentation = &w.t.gfx;
        assert_eq!(gfx.visual(visual).unwrap().transform.position, Vec3::new(2.0, 1.5, 30.0));
    }
}
