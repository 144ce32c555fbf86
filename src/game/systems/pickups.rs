//! Power-up spawning and collection
//!
//! Visuals are created once per slot and toggled; a spawn attempt happens
//! every `spawn_interval` ticks while fewer than `max_active` are out.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::config::PickupConfig;
use crate::game::audio::Sound;
use crate::game::constants::pickups::*;
use crate::game::constants::vehicle::LOW_HEALTH_FRACTION;
use crate::game::context::SimulationContext;
use crate::game::events::CombatEvent;
use crate::game::presentation::{Color, GraphicsHandle, Material, Presentation, Transform, VisualKind};
use crate::game::state::Vehicle;
use crate::game::systems::arena::Arena;
use crate::util::vec3::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupKind {
    Health,
    Ammo,
    Shield,
    DamageBoost,
    SpeedBoost,
}

impl PickupKind {
    pub const ALL: [PickupKind; 5] = [
        PickupKind::Health,
        PickupKind::Ammo,
        PickupKind::Shield,
        PickupKind::DamageBoost,
        PickupKind::SpeedBoost,
    ];

    pub fn color(&self) -> Color {
        match self {
            PickupKind::Health => Color::GREEN,
            PickupKind::Ammo => Color::YELLOW,
            PickupKind::Shield => Color::CYAN,
            PickupKind::DamageBoost => Color::RED,
            PickupKind::SpeedBoost => Color::MAGENTA,
        }
    }

    pub fn sound(&self) -> Sound {
        match self {
            PickupKind::Health => Sound::PowerupHealth,
            PickupKind::Ammo => Sound::PowerupAmmo,
            PickupKind::Shield => Sound::PowerupShield,
            PickupKind::DamageBoost => Sound::PowerupDamage,
            PickupKind::SpeedBoost => Sound::PowerupSpeed,
        }
    }

    /// Apply the pickup to the vehicle
    pub fn apply(&self, vehicle: &mut Vehicle, config: &PickupConfig, max_ammo: u32) {
        match self {
            PickupKind::Health => {
                vehicle.health = (vehicle.health + config.health_amount).min(vehicle.max_health);
                let threshold = (vehicle.max_health as f32 * LOW_HEALTH_FRACTION) as u32;
                if vehicle.health >= threshold {
                    vehicle.warned_low_health = false;
                }
            }
            PickupKind::Ammo => vehicle.ammo = (vehicle.ammo + config.ammo_amount).min(max_ammo),
            PickupKind::Shield => vehicle.shield_ticks = config.buff_duration,
            PickupKind::DamageBoost => vehicle.damage_boost_ticks = config.buff_duration,
            PickupKind::SpeedBoost => vehicle.speed_boost_ticks = config.buff_duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivePickup {
    pub kind: PickupKind,
    pub position: Vec3,
    /// Yaw of the spinning visual
    pub spin: f32,
    /// Bob phase
    pub bob: f32,
}

#[derive(Debug, Clone)]
struct PickupSlot {
    visual: GraphicsHandle,
    active: Option<ActivePickup>,
}

#[derive(Debug, Clone)]
pub struct PickupField {
    slots: Vec<PickupSlot>,
    spawn_timer: f32,
}

impl PickupField {
    pub fn new(config: &PickupConfig, gfx: &mut dyn Presentation) -> Self {
        let slots = (0..config.max_active)
            .map(|_| {
                let visual = gfx.create_visual(
                    VisualKind::Pickup,
                    &Transform::default(),
                    &Material::glowing(Color::WHITE, 1.0),
                );
                gfx.set_visible(visual, false);
                PickupSlot { visual, active: None }
            })
            .collect();
        Self {
            slots,
            spawn_timer: 0.0,
        }
    }

    pub fn active(&self) -> impl Iterator<Item = &ActivePickup> + '_ {
        self.slots.iter().filter_map(|s| s.active.as_ref())
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Spawn timer and collection checks
    pub fn update(&mut self, vehicle: &mut Vehicle, arena: &Arena, ctx: &mut SimulationContext, dt: f32) {
        let interval = ctx.config.pickups.spawn_interval;
        self.spawn_timer += dt;
        while interval > 0.0 && self.spawn_timer >= interval {
            self.spawn_timer -= interval;
            self.try_spawn(arena, ctx);
        }

        if vehicle.is_alive() {
            self.collect(vehicle, ctx);
        }
    }

    /// Place one random pickup in a free slot. Returns the kind spawned.
    pub fn try_spawn(&mut self, arena: &Arena, ctx: &mut SimulationContext) -> Option<PickupKind> {
        let slot = self.slots.iter_mut().find(|s| s.active.is_none())?;
        let position = spawn_position(arena, ctx)?;
        let kind = PickupKind::ALL[ctx.rng.gen_range(0..PickupKind::ALL.len())];

        slot.active = Some(ActivePickup {
            kind,
            position,
            spin: 0.0,
            bob: ctx.rng.gen_range(0.0..TAU),
        });
        ctx.gfx.set_color(slot.visual, kind.color());
        ctx.gfx.set_transform(slot.visual, position, Vec3::ZERO, Vec3::ONE);
        ctx.gfx.set_visible(slot.visual, true);
        tracing::debug!(?kind, x = position.x, z = position.z, "pickup spawned");
        Some(kind)
    }

    fn collect(&mut self, vehicle: &mut Vehicle, ctx: &mut SimulationContext) {
        let radius = ctx.config.pickups.collect_radius;
        for slot in &mut self.slots {
            let Some(pickup) = slot.active else {
                continue;
            };
            if pickup.position.horizontal_distance_to(vehicle.position) >= radius {
                continue;
            }

            pickup.kind.apply(vehicle, &ctx.config.pickups, ctx.config.projectile.max_ammo);
            slot.active = None;
            ctx.gfx.set_visible(slot.visual, false);
            ctx.play(pickup.kind.sound(), Some(pickup.position));
            ctx.emit(CombatEvent::PickupCollected {
                kind: pickup.kind,
                position: pickup.position,
            });
            ctx.metrics.pickups_collected += 1;
        }
    }

    /// Spin and bob
    pub fn animate(&mut self, gfx: &mut dyn Presentation, dt: f32) {
        for slot in &mut self.slots {
            if let Some(pickup) = slot.active.as_mut() {
                pickup.spin = (pickup.spin + SPIN_RATE * dt) % TAU;
                pickup.bob = (pickup.bob + BOB_RATE * dt) % TAU;
                gfx.set_transform(
                    slot.visual,
                    pickup.position + Vec3::UP * (pickup.bob.sin() * BOB_AMPLITUDE),
                    Vec3::new(0.0, pickup.spin, 0.0),
                    Vec3::ONE,
                );
            }
        }
    }
}

/// Random point inside the walls, clear of pillars. Gives up after a few tries.
fn spawn_position(arena: &Arena, ctx: &mut SimulationContext) -> Option<Vec3> {
    let extent = arena.half_size - WALL_CLEARANCE;
    if extent <= 0.0 {
        return None;
    }
    (0..SPAWN_ATTEMPTS).find_map(|_| {
        let candidate = Vec3::new(
            ctx.rng.gen_range(-extent..extent),
            HOVER_HEIGHT,
            ctx.rng.gen_range(-extent..extent),
        );
        arena
            .pillar_overlap(candidate, PILLAR_CLEARANCE)
            .is_none()
            .then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::game::context::TestContext;

    fn setup() -> (TestContext, PickupField, Arena, Vehicle) {
        let mut t = TestContext::new(SimConfig::default());
        let field = PickupField::new(&t.config.pickups, &mut t.gfx);
        let arena = Arena::new(&t.config.arena);
        let vehicle = Vehicle::new(t.local_player, &t.config);
        (t, field, arena, vehicle)
    }

    #[test]
    fn test_visuals_preallocated_hidden() {
        let (t, field, _, _) = setup();
        assert_eq!(t.gfx.created_count(VisualKind::Pickup), 5);
        assert_eq!(t.gfx.visible_count(VisualKind::Pickup), 0);
        assert_eq!(field.active_count(), 0);
    }

    #[test]
    fn test_spawn_every_interval_up_to_max() {
        let (mut t, mut field, arena, mut vehicle) = setup();
        vehicle.position = Vec3::new(0.0, 0.5, 200.0); // out of reach

        field.update(&mut vehicle, &arena, &mut t.ctx(), 599.0);
        assert_eq!(field.active_count(), 0);
        field.update(&mut vehicle, &arena, &mut t.ctx(), 1.0);
        assert_eq!(field.active_count(), 1);

        for _ in 0..10 {
            field.update(&mut vehicle, &arena, &mut t.ctx(), 600.0);
        }
        assert_eq!(field.active_count(), 5);
        assert_eq!(t.gfx.visible_count(VisualKind::Pickup), 5);

        for pickup in field.active() {
            assert!(pickup.position.x.abs() < arena.half_size - WALL_CLEARANCE);
            assert!(arena.pillar_overlap(pickup.position, PILLAR_CLEARANCE).is_none());
        }
    }

    #[test]
    fn test_collect_applies_and_hides() {
        let (mut t, mut field, arena, mut vehicle) = setup();
        field.try_spawn(&arena, &mut t.ctx()).unwrap();
        let pickup = *field.active().next().unwrap();
        vehicle.health = 50;
        vehicle.position = pickup.position + Vec3::new(2.0, -0.5, 0.0);

        field.update(&mut vehicle, &arena, &mut t.ctx(), 1.0);

        assert_eq!(field.active_count(), 0);
        assert_eq!(t.gfx.visible_count(VisualKind::Pickup), 0);
        assert_eq!(t.metrics.pickups_collected, 1);
        assert_eq!(
            t.events,
            vec![CombatEvent::PickupCollected {
                kind: pickup.kind,
                position: pickup.position
            }]
        );
    }

    #[test]
    fn test_pickup_effects() {
        let config = SimConfig::default();
        let mut v = Vehicle::new(uuid::Uuid::new_v4(), &config);

        v.health = 90;
        PickupKind::Health.apply(&mut v, &config.pickups, 100);
        assert_eq!(v.health, 100);

        v.ammo = 95;
        PickupKind::Ammo.apply(&mut v, &config.pickups, 100);
        assert_eq!(v.ammo, 100);

        PickupKind::Shield.apply(&mut v, &config.pickups, 100);
        PickupKind::DamageBoost.apply(&mut v, &config.pickups, 100);
        PickupKind::SpeedBoost.apply(&mut v, &config.pickups, 100);
        assert_eq!(v.shield_ticks, 600.0);
        assert!(v.damage_boost_active());
        assert!(v.speed_boost_active());
    }

    #[test]
    fn test_dead_vehicle_collects_nothing() {
        let (mut t, mut field, arena, mut vehicle) = setup();
        field.try_spawn(&arena, &mut t.ctx()).unwrap();
        vehicle.position = field.active().next().unwrap().position;
        vehicle.destroyed = true;

        field.update(&mut vehicle, &arena, &mut t.ctx(), 1.0);
        assert_eq!(field.active_count(), 1);
    }

    #[test]
    fn test_animate_moves_visual() {
        let (mut t, mut field, arena, _) = setup();
        field.try_spawn(&arena, &mut t.ctx()).unwrap();
        let before = *field.active().next().unwrap();
        field.animate(&mut t.gfx, 10.0);
        let after = *field.active().next().unwrap();
        assert_ne!(before.spin, after.spin);
        assert_ne!(before.bob, after.bob);
        assert_eq!(before.position, after.position);
    }
}
