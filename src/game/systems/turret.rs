//! Turret controller
//!
//! Per-turret state machine:
//! `Idle -> Tracking -> Aligned -> Firing -> Cooldown -> Tracking ...`
//! with `Destroyed` reachable from any state at zero health and a timed
//! return to `Idle` at the same site.

use rand::Rng;

use crate::game::audio::Sound;
use crate::game::constants::turret::{BARREL_HEIGHT, BARREL_LENGTH, DESTRUCTION_SIZE, RECOIL_DISTANCE, RECOIL_TICKS};
use crate::game::context::SimulationContext;
use crate::game::effects::EffectRegistry;
use crate::game::events::CombatEvent;
use crate::game::state::{Turret, TurretState};
use crate::game::systems::projectile::{ProjectileEngine, ProjectileSource, ShotSpec};
use crate::game::transform::TransformArena;
use crate::util::vec3::{shortest_angle, wrap_angle, Vec3};

/// Occlusion test between a turret and its target. Pillars do not block
/// shots, so this always passes.
pub fn line_of_sight(_from: Vec3, _to: Vec3) -> bool {
    true
}

/// Run every turret for one tick. `target` is the local vehicle position,
/// or `None` once it is destroyed.
pub fn update(
    turrets: &mut [Turret],
    target: Option<Vec3>,
    ctx: &mut SimulationContext,
    engine: &mut ProjectileEngine,
    transforms: &mut TransformArena,
    dt: f32,
) {
    for turret in turrets.iter_mut() {
        update_one(turret, target, ctx, engine, dt);

        let base = transforms.local_mut(turret.base);
        base.rotation.y = turret.yaw;
        let kick = RECOIL_DISTANCE * (turret.recoil / RECOIL_TICKS).clamp(0.0, 1.0);
        transforms.local_mut(turret.barrel).position = Vec3::new(0.0, BARREL_HEIGHT, BARREL_LENGTH / 2.0 - kick);
    }
}

fn update_one(
    turret: &mut Turret,
    target: Option<Vec3>,
    ctx: &mut SimulationContext,
    engine: &mut ProjectileEngine,
    dt: f32,
) {
    if turret.is_destroyed() {
        // The countdown starts the tick after destruction
        if turret.destroyed_frame == Some(ctx.frame) {
            return;
        }
        turret.respawn_in -= dt;
        if turret.respawn_in <= 0.0 {
            respawn(turret, ctx);
        }
        return;
    }

    turret.recoil = (turret.recoil - dt).max(0.0);
    turret.shoot_cooldown = (turret.shoot_cooldown - dt).max(0.0);

    let sim = ctx.config;
    let config = &sim.turret;
    let Some(target) = target.filter(|t| t.horizontal_distance_to(turret.position) < config.range) else {
        turret.state = TurretState::Idle;
        return;
    };

    // Turn a fraction of the remaining angle per tick
    let desired = (target - turret.position).yaw();
    let step = (config.turn_rate * dt).min(1.0);
    turret.yaw = wrap_angle(turret.yaw + shortest_angle(turret.yaw, desired) * step);
    let diff = shortest_angle(turret.yaw, desired);

    turret.state = if turret.shoot_cooldown > 0.0 && turret.last_shot_frame.is_some() {
        TurretState::Cooldown
    } else {
        TurretState::Tracking
    };

    if diff.abs() < config.align_tolerance
        && turret.shoot_cooldown <= 0.0
        && line_of_sight(turret.position, target)
    {
        turret.state = TurretState::Aligned;
        fire(turret, ctx, engine);
    }
}

fn fire(turret: &mut Turret, ctx: &mut SimulationContext, engine: &mut ProjectileEngine) {
    let sim = ctx.config;
    let config = &sim.turret;
    let deviation = if config.aim_deviation > 0.0 {
        ctx.rng.gen_range(-config.aim_deviation..config.aim_deviation)
    } else {
        0.0
    };
    let direction = Vec3::from_yaw(turret.yaw + deviation);
    let spec = ShotSpec {
        origin: turret.position + Vec3::UP * BARREL_HEIGHT + direction * BARREL_LENGTH,
        direction,
        speed: config.projectile_speed,
        damage: config.projectile_damage,
        source: ProjectileSource::Turret,
        owner: None,
        lifetime: config.projectile_lifetime,
    };
    let cooldown = if config.cooldown_max > config.cooldown_min {
        ctx.rng.gen_range(config.cooldown_min..config.cooldown_max)
    } else {
        config.cooldown_min
    };

    // A full projectile list still costs the turret its reload
    let _ = engine.fire(ctx, spec);
    ctx.play(Sound::TurretShoot, Some(turret.position));

    turret.shoot_cooldown = cooldown;
    turret.last_shot_frame = Some(ctx.frame);
    turret.recoil = RECOIL_TICKS;
    turret.state = TurretState::Firing;
}

/// Apply damage; at zero health the turret is destroyed, scored and
/// scheduled for respawn. Returns true if this hit destroyed it.
pub fn apply_damage(
    turret: &mut Turret,
    damage: u32,
    ctx: &mut SimulationContext,
    effects: &mut EffectRegistry,
    score: &mut u64,
) -> bool {
    if turret.is_destroyed() {
        return false;
    }

    turret.health = turret.health.saturating_sub(damage);
    ctx.emit(CombatEvent::TurretHit {
        turret: turret.id,
        damage,
        remaining_health: turret.health,
    });
    ctx.play(Sound::MetalImpact, Some(turret.position));

    if turret.health > 0 {
        return false;
    }

    turret.state = TurretState::Destroyed;
    turret.respawn_in = ctx.config.turret.respawn_ticks;
    turret.destroyed_frame = Some(ctx.frame);
    turret.recoil = 0.0;
    *score += ctx.config.turret.score_award;

    effects.spawn_destruction(ctx, turret.position + Vec3::UP * BARREL_HEIGHT, DESTRUCTION_SIZE);
    ctx.play(Sound::Explosion, Some(turret.position));
    for visual in turret.visuals {
        ctx.gfx.set_visible(visual, false);
    }
    ctx.emit(CombatEvent::TurretDestroyed {
        turret: turret.id,
        position: turret.position,
        score: *score,
    });
    ctx.metrics.turrets_destroyed += 1;
    tracing::info!(turret = turret.id, score = *score, "turret destroyed");
    true
}

fn respawn(turret: &mut Turret, ctx: &mut SimulationContext) {
    turret.health = turret.max_health;
    turret.state = TurretState::Idle;
    turret.respawn_in = 0.0;
    turret.destroyed_frame = None;
    turret.shoot_cooldown = ctx.config.turret.cooldown_min;
    turret.last_shot_frame = None;
    for visual in turret.visuals {
        ctx.gfx.set_visible(visual, true);
    }
    ctx.emit(CombatEvent::TurretRespawned { turret: turret.id });
    ctx.metrics.turrets_respawned += 1;
    tracing::info!(turret = turret.id, "turret respawned");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::game::context::TestContext;

    struct Rig {
        t: TestContext,
        transforms: TransformArena,
        turrets: Vec<Turret>,
        engine: ProjectileEngine,
        effects: EffectRegistry,
    }

    fn rig() -> Rig {
        let mut t = TestContext::new(SimConfig::default());
        let mut transforms = TransformArena::new();
        let turret = Turret::spawn(0, Vec3::ZERO, &t.config, &mut transforms, &mut t.gfx);
        let effects = EffectRegistry::new(&t.config, &mut t.gfx);
        Rig {
            t,
            transforms,
            turrets: vec![turret],
            engine: ProjectileEngine::new(64, 0),
            effects,
        }
    }

    impl Rig {
        fn step(&mut self, target: Option<Vec3>) {
            update(&mut self.turrets, target, &mut self.t.ctx(), &mut self.engine, &mut self.transforms, 1.0);
            self.t.frame += 1;
        }
    }

    #[test]
    fn test_fires_when_aligned_and_ready() {
        let mut r = rig();
        // Target at yaw 0.05 from the barrel
        let target = Vec3::from_yaw(0.05) * 100.0;
        r.turrets[0].shoot_cooldown = 0.0;

        r.step(Some(target));

        let turret = &r.turrets[0];
        assert_eq!(turret.state, TurretState::Firing);
        assert_eq!(r.engine.active_count(), 1);
        assert!(turret.shoot_cooldown >= 90.0 && turret.shoot_cooldown < 150.0);
        assert_eq!(turret.last_shot_frame, Some(0));
        assert_eq!(r.engine.projectiles()[0].source, ProjectileSource::Turret);
        assert!(r.engine.projectiles()[0].owner.is_none());
    }

    #[test]
    fn test_cooldowns_are_not_synchronized() {
        let mut r = rig();
        let mut cooldowns = Vec::new();
        for _ in 0..5 {
            r.turrets[0].shoot_cooldown = 0.0;
            r.step(Some(Vec3::new(0.0, 0.0, 50.0)));
            cooldowns.push(r.turrets[0].shoot_cooldown);
        }
        assert!(cooldowns.iter().all(|c| (90.0..150.0).contains(c)));
        assert!(cooldowns.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_out_of_range_is_idle() {
        let mut r = rig();
        r.turrets[0].shoot_cooldown = 0.0;
        r.step(Some(Vec3::new(0.0, 0.0, 301.0)));
        assert_eq!(r.turrets[0].state, TurretState::Idle);
        assert_eq!(r.turrets[0].yaw, 0.0);
        assert_eq!(r.engine.active_count(), 0);

        r.step(None);
        assert_eq!(r.turrets[0].state, TurretState::Idle);
    }

    #[test]
    fn test_tracking_turns_slowly() {
        let mut r = rig();
        r.turrets[0].shoot_cooldown = 0.0;
        // Target directly to the side: PI/2 away
        r.step(Some(Vec3::new(100.0, 0.0, 0.0)));

        let turret = &r.turrets[0];
        assert_eq!(turret.state, TurretState::Tracking);
        assert!((turret.yaw - std::f32::consts::FRAC_PI_2 * 0.02).abs() < 1e-5);
        assert_eq!(r.engine.active_count(), 0);
        assert_eq!(r.transforms.local(turret.base).rotation.y, turret.yaw);
    }

    #[test]
    fn test_cooldown_state_after_firing() {
        let mut r = rig();
        r.turrets[0].shoot_cooldown = 0.0;
        let target = Vec3::new(0.0, 0.0, 50.0);
        r.step(Some(target));
        assert_eq!(r.turrets[0].state, TurretState::Firing);

        r.step(Some(target));
        assert_eq!(r.turrets[0].state, TurretState::Cooldown);
        assert_eq!(r.engine.active_count(), 1);
    }

    #[test]
    fn test_recoil_moves_barrel_back_then_recovers() {
        let mut r = rig();
        r.turrets[0].shoot_cooldown = 0.0;
        let target = Vec3::new(0.0, 0.0, 50.0);
        r.step(Some(target));

        let barrel = r.turrets[0].barrel;
        let rest = BARREL_LENGTH / 2.0;
        assert!((r.transforms.local(barrel).position.z - (rest - RECOIL_DISTANCE)).abs() < 1e-5);

        for _ in 0..8 {
            r.step(Some(target));
        }
        assert_eq!(r.transforms.local(barrel).position.z, rest);
    }

    #[test]
    fn test_destroy_and_respawn() {
        let mut r = rig();
        let mut score = 0;

        assert!(!apply_damage(&mut r.turrets[0], 60, &mut r.t.ctx(), &mut r.effects, &mut score));
        assert!(apply_damage(&mut r.turrets[0], 60, &mut r.t.ctx(), &mut r.effects, &mut score));

        let turret = &r.turrets[0];
        assert_eq!(turret.state, TurretState::Destroyed);
        assert_eq!(turret.health, 0);
        assert_eq!(score, 100);
        assert_eq!(r.effects.active_count(), 1);
        assert!(!r.t.gfx.visual(turret.visuals[0]).unwrap().visible);
        assert_eq!(r.t.metrics.turrets_destroyed, 1);

        // Further hits are ignored
        assert!(!apply_damage(&mut r.turrets[0], 60, &mut r.t.ctx(), &mut r.effects, &mut score));
        assert_eq!(score, 100);

        // Destroyed turrets neither aim nor fire. The destruction tick itself
        // does not count toward the respawn delay.
        let target = Vec3::new(0.0, 0.0, 50.0);
        for _ in 0..1800 {
            r.step(Some(target));
        }
        assert_eq!(r.turrets[0].state, TurretState::Destroyed);
        assert_eq!(r.engine.active_count(), 0);

        r.step(Some(target));
        let turret = &r.turrets[0];
        assert_eq!(turret.state, TurretState::Idle);
        assert_eq!(turret.health, 100);
        assert_eq!(turret.position, Vec3::ZERO);
        assert!(r.t.gfx.visual(turret.visuals[1]).unwrap().visible);
        assert!(r
            .t
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::TurretRespawned { turret: 0 })));
    }

    #[test]
    fn test_respawn_countdown_skips_destruction_tick() {
        let mut r = rig();
        let mut score = 0;
        r.t.frame = 5;
        r.turrets[0].health = 10;
        assert!(apply_damage(&mut r.turrets[0], 10, &mut r.t.ctx(), &mut r.effects, &mut score));
        assert_eq!(r.turrets[0].destroyed_frame, Some(5));

        r.step(None);
        assert_eq!(r.turrets[0].respawn_in, 1800.0);
        assert_eq!(r.turrets[0].state, TurretState::Destroyed);

        r.step(None);
        assert_eq!(r.turrets[0].respawn_in, 1799.0);
    }

    #[test]
    fn test_line_of_sight_stub() {
        assert!(line_of_sight(Vec3::ZERO, Vec3::new(0.0, 0.0, 100.0)));
    }
}
