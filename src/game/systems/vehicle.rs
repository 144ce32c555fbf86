//! Local vehicle control and integration
//!
//! Runs on the critical path every tick: input, buff timers, arcade
//! handling, wall and pillar response, the player weapon and the chase
//! camera. Turret body collisions are cheaper to defer and run in frame
//! group 1.

use serde::{Deserialize, Serialize};

use crate::game::audio::Sound;
use crate::game::constants::turret::HALF_EXTENT as TURRET_HALF_EXTENT;
use crate::game::constants::vehicle::{
    COLLISION_RADIUS, MIN_TURN_SPEED, REVERSE_FACTOR, STOP_THRESHOLD, WALL_COLLISION_HALF_SIZE,
};
use crate::game::constants::{camera, weapon, wheels};
use crate::game::context::SimulationContext;
use crate::game::effects::{EffectRegistry, ImpactKind};
use crate::game::events::CombatEvent;
use crate::game::presentation::Presentation;
use crate::game::state::{ChaseCamera, Turret, Vehicle};
use crate::game::systems::arena::Arena;
use crate::game::systems::damage;
use crate::game::systems::projectile::{ProjectileEngine, ProjectileId, ProjectileSource, ShotSpec};
use crate::game::transform::TransformArena;
use crate::util::vec3::Vec3;

/// Player input for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveInput {
    /// -1 full reverse, 1 full forward
    pub throttle: f32,
    /// Positive turns left
    pub steer: f32,
    pub fire: bool,
}

impl DriveInput {
    /// Clamp axes to [-1, 1]; non-finite axes read as zero
    pub fn sanitized(&self) -> Self {
        let axis = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Self {
            throttle: axis(self.throttle),
            steer: axis(self.steer),
            fire: self.fire,
        }
    }
}

/// Control, integration and collision response for one tick
pub fn update(
    vehicle: &mut Vehicle,
    input: &DriveInput,
    arena: &Arena,
    ctx: &mut SimulationContext,
    effects: &mut EffectRegistry,
    engine: &mut ProjectileEngine,
    dt: f32,
) {
    vehicle.shield_ticks = (vehicle.shield_ticks - dt).max(0.0);
    vehicle.damage_boost_ticks = (vehicle.damage_boost_ticks - dt).max(0.0);
    vehicle.speed_boost_ticks = (vehicle.speed_boost_ticks - dt).max(0.0);
    vehicle.fire_cooldown = (vehicle.fire_cooldown - dt).max(0.0);

    if !vehicle.is_alive() {
        vehicle.velocity = 0.0;
        vehicle.steer = 0.0;
        return;
    }

    let input = input.sanitized();
    drive(vehicle, &input, ctx, dt);

    vehicle.position += vehicle.forward() * (vehicle.velocity * dt);
    resolve_wall_collision(vehicle, arena, ctx, effects);
    resolve_pillar_collision(vehicle, arena, ctx, effects);

    if input.fire {
        fire_weapon(vehicle, ctx, engine);
    }
}

fn drive(vehicle: &mut Vehicle, input: &DriveInput, ctx: &mut SimulationContext, dt: f32) {
    let sim = ctx.config;
    let config = &sim.vehicle;

    if input.throttle != 0.0 {
        vehicle.velocity += config.acceleration * input.throttle * dt;
    } else {
        vehicle.velocity *= config.friction.powf(dt);
        if vehicle.velocity.abs() < STOP_THRESHOLD {
            vehicle.velocity = 0.0;
        }
    }

    let top = if vehicle.speed_boost_active() {
        config.max_speed * sim.pickups.speed_multiplier
    } else {
        config.max_speed
    };
    vehicle.velocity = vehicle.velocity.clamp(-config.max_speed * REVERSE_FACTOR, top);

    // Steering gets weaker at speed and flips in reverse
    let speed = vehicle.velocity.abs();
    vehicle.steer = input.steer;
    if speed > MIN_TURN_SPEED && input.steer != 0.0 {
        let factor = 1.0 - speed / config.max_speed * 0.5;
        vehicle.yaw += input.steer * config.turn_speed * factor * dt * vehicle.velocity.signum();
        if speed > config.max_speed * 0.8 {
            ctx.play(Sound::TireScreech, Some(vehicle.position));
        }
    }
}

/// Keep the vehicle inside the walls. Returns the impact damage if it hit one.
pub fn resolve_wall_collision(
    vehicle: &mut Vehicle,
    arena: &Arena,
    ctx: &mut SimulationContext,
    effects: &mut EffectRegistry,
) -> Option<u32> {
    let limit = arena.half_size - WALL_COLLISION_HALF_SIZE;
    let outward = Vec3::new(
        wall_axis(vehicle.position.x, limit),
        0.0,
        wall_axis(vehicle.position.z, limit),
    );
    if outward == Vec3::ZERO {
        return None;
    }

    vehicle.position.x = vehicle.position.x.clamp(-limit, limit);
    vehicle.position.z = vehicle.position.z.clamp(-limit, limit);

    let sim = ctx.config;
    let config = &sim.vehicle;
    let impact_speed = vehicle.velocity.abs();
    let damage = (impact_speed * config.wall_damage_factor).floor() as u32;
    vehicle.velocity = -vehicle.velocity * config.wall_restitution;

    let contact = vehicle.position + outward.normalize() * WALL_COLLISION_HALF_SIZE + Vec3::UP * 0.5;
    effects.spawn_impact(ctx, contact, ImpactKind::Wall);
    ctx.play(Sound::WallHit, Some(contact));
    ctx.emit(CombatEvent::WallHit {
        position: contact,
        damage,
    });
    if damage > 0 {
        damage::apply_to_vehicle(vehicle, damage, None, ctx);
    }
    tracing::debug!(damage, speed = impact_speed, "vehicle hit wall");
    Some(damage)
}

fn wall_axis(value: f32, limit: f32) -> f32 {
    if value > limit {
        1.0
    } else if value < -limit {
        -1.0
    } else {
        0.0
    }
}

/// Push the vehicle out of the first overlapping pillar
pub fn resolve_pillar_collision(
    vehicle: &mut Vehicle,
    arena: &Arena,
    ctx: &mut SimulationContext,
    effects: &mut EffectRegistry,
) -> bool {
    let Some(pillar) = arena.pillar_overlap(vehicle.position, COLLISION_RADIUS) else {
        return false;
    };

    let away = separation(vehicle.position, pillar.position, vehicle.forward());
    let surface = pillar.position + away * pillar.radius;
    vehicle.position = Vec3::new(
        pillar.position.x + away.x * (pillar.radius + COLLISION_RADIUS),
        vehicle.position.y,
        pillar.position.z + away.z * (pillar.radius + COLLISION_RADIUS),
    );
    vehicle.velocity *= ctx.config.vehicle.pillar_restitution;

    effects.spawn_spark(ctx, Vec3::new(surface.x, vehicle.position.y, surface.z), away);
    ctx.play(Sound::TireScreech, Some(surface));
    true
}

/// Push the vehicle off standing turret bases
pub fn resolve_turret_collisions(vehicle: &mut Vehicle, turrets: &[Turret], ctx: &mut SimulationContext) {
    if !vehicle.is_alive() {
        return;
    }
    let reach = COLLISION_RADIUS + TURRET_HALF_EXTENT;
    for turret in turrets.iter().filter(|t| !t.is_destroyed()) {
        if vehicle.position.horizontal_distance_to(turret.position) >= reach {
            continue;
        }
        let away = separation(vehicle.position, turret.position, vehicle.forward());
        vehicle.position.x = turret.position.x + away.x * reach;
        vehicle.position.z = turret.position.z + away.z * reach;
        vehicle.velocity *= ctx.config.vehicle.pillar_restitution;
        ctx.play(Sound::MetalImpact, Some(turret.position));
    }
}

/// Horizontal unit vector from `obstacle` to `position`. Falls back to
/// backing out along `forward` when the centres coincide.
fn separation(position: Vec3, obstacle: Vec3, forward: Vec3) -> Vec3 {
    let delta = Vec3::new(position.x - obstacle.x, 0.0, position.z - obstacle.z);
    if delta.length_sq() > f32::EPSILON {
        delta.normalize()
    } else {
        -forward
    }
}

/// Fire the player weapon if loaded and off cooldown
pub fn fire_weapon(
    vehicle: &mut Vehicle,
    ctx: &mut SimulationContext,
    engine: &mut ProjectileEngine,
) -> Option<ProjectileId> {
    if !vehicle.is_alive() || vehicle.fire_cooldown > 0.0 {
        return None;
    }
    if vehicle.ammo == 0 {
        tracing::trace!("fire pressed with no ammo");
        return None;
    }

    let sim = ctx.config;
    let config = &sim.projectile;
    let damage = if vehicle.damage_boost_active() {
        config.player_damage * weapon::DAMAGE_BOOST_MULTIPLIER
    } else {
        config.player_damage
    };
    let forward = vehicle.forward();
    let spec = ShotSpec {
        origin: vehicle.position + forward * weapon::MUZZLE_OFFSET + Vec3::UP * weapon::BARREL_HEIGHT,
        direction: forward,
        speed: config.player_speed,
        damage,
        source: ProjectileSource::Player,
        owner: Some(ctx.local_player),
        lifetime: config.player_lifetime,
    };

    let id = engine.fire(ctx, spec).ok()?;
    vehicle.ammo -= 1;
    vehicle.fire_cooldown = config.fire_cooldown;
    ctx.play(Sound::Shoot, Some(vehicle.position));
    Some(id)
}

/// Ease the chase camera toward its target behind the vehicle
pub fn follow_camera(camera_state: &mut ChaseCamera, vehicle: &Vehicle, gfx: &mut dyn Presentation, dt: f32) {
    let target = vehicle.position - vehicle.forward() * camera::DISTANCE + Vec3::UP * camera::HEIGHT;
    let t = 1.0 - (1.0 - camera::LERP).powf(dt);
    camera_state.position = camera_state.position.lerp(target, t);
    gfx.set_camera(camera_state.position, vehicle.position);
}

/// Write body pose, wheel roll and front wheel steering into the rig
pub fn animate_rig(vehicle: &mut Vehicle, transforms: &mut TransformArena, dt: f32) {
    let Some(rig) = vehicle.rig else {
        return;
    };

    vehicle.wheel_roll = (vehicle.wheel_roll + vehicle.velocity * wheels::ROLL_FACTOR * dt) % std::f32::consts::TAU;
    let body = transforms.local_mut(rig.body);
    body.position = vehicle.position;
    body.rotation.y = vehicle.yaw;

    let steer = vehicle.steer * wheels::STEER_ANGLE;
    for (i, wheel) in rig.wheels.iter().enumerate() {
        let local = transforms.local_mut(*wheel);
        local.rotation.x = vehicle.wheel_roll;
        local.rotation.y = if i < 2 { steer } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::game::context::TestContext;
    use crate::game::presentation::HeadlessPresentation;
    use crate::game::state::VehicleRig;
    use std::f32::consts::FRAC_PI_2;

    struct Rig {
        t: TestContext,
        arena: Arena,
        vehicle: Vehicle,
        effects: EffectRegistry,
        engine: ProjectileEngine,
    }

    fn rig() -> Rig {
        let mut t = TestContext::new(SimConfig::default());
        let arena = Arena::new(&t.config.arena);
        let effects = EffectRegistry::new(&t.config, &mut t.gfx);
        let engine = ProjectileEngine::new(
            t.config.projectile.max_active,
            t.config.projectile.trail_cap_per_frame,
        );
        let mut vehicle = Vehicle::new(t.local_player, &t.config);
        // Start clear of the pillar ring
        vehicle.position = Vec3::new(10.0, 0.5, 10.0);
        Rig {
            t,
            arena,
            vehicle,
            effects,
            engine,
        }
    }

    impl Rig {
        fn step(&mut self, input: DriveInput) {
            update(
                &mut self.vehicle,
                &input,
                &self.arena,
                &mut self.t.ctx(),
                &mut self.effects,
                &mut self.engine,
                1.0,
            );
        }
    }

    fn throttle(value: f32) -> DriveInput {
        DriveInput {
            throttle: value,
            ..Default::default()
        }
    }

    #[test]
    fn test_throttle_accelerates_to_cap() {
        let mut r = rig();
        r.step(throttle(1.0));
        assert!((r.vehicle.velocity - 0.01).abs() < 1e-6);
        assert!((r.vehicle.position.z - 10.01).abs() < 1e-4);

        for _ in 0..100 {
            r.step(throttle(1.0));
        }
        assert_eq!(r.vehicle.velocity, 0.5);
    }

    #[test]
    fn test_speed_boost_raises_cap() {
        let mut r = rig();
        r.vehicle.speed_boost_ticks = 1000.0;
        for _ in 0..100 {
            r.step(throttle(1.0));
        }
        assert!((r.vehicle.velocity - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_reverse_capped_at_half() {
        let mut r = rig();
        for _ in 0..60 {
            r.step(throttle(-1.0));
        }
        assert_eq!(r.vehicle.velocity, -0.25);
        assert!(r.vehicle.position.z < 10.0);
    }

    #[test]
    fn test_friction_coasts_to_stop() {
        let mut r = rig();
        r.vehicle.velocity = 0.2;
        r.step(DriveInput::default());
        assert!((r.vehicle.velocity - 0.196).abs() < 1e-6);

        for _ in 0..500 {
            r.step(DriveInput::default());
        }
        assert_eq!(r.vehicle.velocity, 0.0);
    }

    #[test]
    fn test_no_turning_while_stationary() {
        let mut r = rig();
        let steer = DriveInput {
            steer: 1.0,
            ..Default::default()
        };
        r.step(steer);
        assert_eq!(r.vehicle.yaw, 0.0);

        r.vehicle.velocity = 0.2;
        r.step(DriveInput { throttle: 0.0, ..steer });
        assert!(r.vehicle.yaw > 0.0);

        // Reverse steers the other way
        let mut r = rig();
        r.vehicle.velocity = -0.2;
        r.step(steer);
        assert!(r.vehicle.yaw < 0.0);
    }

    #[test]
    fn test_wall_collision_damage_and_bounce() {
        let mut r = rig();
        // Facing +x, just short of the collision limit at 97.5
        r.vehicle.position = Vec3::new(97.4, 0.5, 0.0);
        r.vehicle.yaw = FRAC_PI_2;
        r.vehicle.velocity = 0.3;
        r.vehicle.position += r.vehicle.forward() * r.vehicle.velocity;

        let damage = resolve_wall_collision(&mut r.vehicle, &r.arena, &mut r.t.ctx(), &mut r.effects);

        assert_eq!(damage, Some(15));
        assert_eq!(r.vehicle.position.x, 97.5);
        assert!((r.vehicle.velocity + 0.21).abs() < 1e-5);
        assert_eq!(r.vehicle.health, 85);
        assert_eq!(r.effects.active_count(), 1);
        assert!(r
            .t
            .events
            .iter()
            .any(|e| matches!(e, CombatEvent::WallHit { damage: 15, .. })));
    }

    #[test]
    fn test_inside_walls_no_collision() {
        let mut r = rig();
        assert_eq!(
            resolve_wall_collision(&mut r.vehicle, &r.arena, &mut r.t.ctx(), &mut r.effects),
            None
        );
        assert!(r.t.events.is_empty());
    }

    #[test]
    fn test_shield_blocks_wall_damage() {
        let mut r = rig();
        r.vehicle.shield_ticks = 100.0;
        r.vehicle.position = Vec3::new(0.0, 0.5, -98.0);
        r.vehicle.velocity = -0.4;
        resolve_wall_collision(&mut r.vehicle, &r.arena, &mut r.t.ctx(), &mut r.effects);
        assert_eq!(r.vehicle.position.z, -97.5);
        assert_eq!(r.vehicle.health, 100);
    }

    #[test]
    fn test_pillar_pushout() {
        let mut r = rig();
        let pillar = r.arena.pillars[0].position;
        r.vehicle.position = Vec3::new(pillar.x - 2.0, 0.5, pillar.z);
        r.vehicle.velocity = 0.5;

        assert!(resolve_pillar_collision(&mut r.vehicle, &r.arena, &mut r.t.ctx(), &mut r.effects));
        assert!((r.vehicle.position.horizontal_distance_to(pillar) - 5.5).abs() < 1e-4);
        assert!((r.vehicle.velocity - 0.2).abs() < 1e-6);
        assert_eq!(r.effects.active_count(), 1);
    }

    #[test]
    fn test_turret_body_pushout() {
        let mut r = rig();
        let turret = Turret::spawn(
            0,
            Vec3::new(20.0, 0.0, 10.0),
            &r.t.config,
            &mut TransformArena::new(),
            &mut r.t.gfx,
        );
        r.vehicle.position = Vec3::new(18.0, 0.5, 10.0);
        resolve_turret_collisions(&mut r.vehicle, std::slice::from_ref(&turret), &mut r.t.ctx());
        assert!((r.vehicle.position.x - 16.0).abs() < 1e-4);
    }

    #[test]
    fn test_fire_weapon_ammo_and_cooldown() {
        let mut r = rig();
        let fire = DriveInput {
            fire: true,
            ..Default::default()
        };
        r.step(fire);
        assert_eq!(r.vehicle.ammo, 49);
        assert_eq!(r.engine.active_count(), 1);

        // Cooldown blocks the next 10 ticks
        for _ in 0..9 {
            r.step(fire);
        }
        assert_eq!(r.vehicle.ammo, 49);
        r.step(fire);
        assert_eq!(r.vehicle.ammo, 48);

        let shot = &r.engine.projectiles()[0];
        assert_eq!(shot.source, ProjectileSource::Player);
        assert_eq!(shot.owner, Some(r.t.local_player));
        assert_eq!(shot.damage, 25);
    }

    #[test]
    fn test_out_of_ammo_and_damage_boost() {
        let mut r = rig();
        r.vehicle.ammo = 0;
        assert!(fire_weapon(&mut r.vehicle, &mut r.t.ctx(), &mut r.engine).is_none());
        assert_eq!(r.engine.active_count(), 0);

        r.vehicle.ammo = 1;
        r.vehicle.damage_boost_ticks = 10.0;
        let id = fire_weapon(&mut r.vehicle, &mut r.t.ctx(), &mut r.engine).unwrap();
        assert_eq!(r.engine.get(id).unwrap().damage, 50);
        assert_eq!(r.vehicle.ammo, 0);
    }

    #[test]
    fn test_destroyed_vehicle_ignores_input() {
        let mut r = rig();
        r.vehicle.destroyed = true;
        r.vehicle.shield_ticks = 5.0;
        let before = r.vehicle.position;
        r.step(DriveInput {
            throttle: 1.0,
            steer: 1.0,
            fire: true,
        });
        assert_eq!(r.vehicle.position, before);
        assert_eq!(r.engine.active_count(), 0);
        assert_eq!(r.vehicle.shield_ticks, 4.0);
    }

    #[test]
    fn test_sanitized_input() {
        let input = DriveInput {
            throttle: f32::NAN,
            steer: 3.0,
            fire: false,
        }
        .sanitized();
        assert_eq!(input.throttle, 0.0);
        assert_eq!(input.steer, 1.0);
    }

    #[test]
    fn test_camera_eases_toward_target() {
        let config = SimConfig::default();
        let mut gfx = HeadlessPresentation::new();
        let vehicle = Vehicle::new(uuid::Uuid::new_v4(), &config);
        let mut cam = ChaseCamera { position: Vec3::ZERO };

        follow_camera(&mut cam, &vehicle, &mut gfx, 1.0);
        let target = Vec3::new(0.0, 8.5, -15.0);
        assert!(cam.position.approx_eq(target * 0.05, 1e-4));
        assert_eq!(gfx.camera(), Some((cam.position, vehicle.position)));

        for _ in 0..500 {
            follow_camera(&mut cam, &vehicle, &mut gfx, 1.0);
        }
        assert!(cam.position.approx_eq(target, 1e-3));
    }

    #[test]
    fn test_rig_wheels_roll_and_steer() {
        let config = SimConfig::default();
        let mut gfx = HeadlessPresentation::new();
        let mut transforms = TransformArena::new();
        let mut vehicle = Vehicle::new(uuid::Uuid::new_v4(), &config);
        let rig = VehicleRig::build(&mut transforms, &mut gfx, vehicle.position);
        vehicle.rig = Some(rig);
        vehicle.velocity = 0.4;
        vehicle.steer = 1.0;
        vehicle.yaw = 0.5;

        animate_rig(&mut vehicle, &mut transforms, 1.0);

        assert!((vehicle.wheel_roll - 0.2).abs() < 1e-6);
        assert_eq!(transforms.local(rig.body).rotation.y, 0.5);
        assert_eq!(transforms.local(rig.wheels[0]).rotation.y, 0.3);
        assert_eq!(transforms.local(rig.wheels[3]).rotation.y, 0.0);
        assert_eq!(transforms.local(rig.wheels[2]).rotation.x, vehicle.wheel_roll);
    }
}
