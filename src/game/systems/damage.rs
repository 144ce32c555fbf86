//! Damage to the local vehicle and the game-over check

use crate::game::audio::Sound;
use crate::game::constants::vehicle::LOW_HEALTH_FRACTION;
use crate::game::context::SimulationContext;
use crate::game::effects::EffectRegistry;
use crate::game::events::CombatEvent;
use crate::game::network::PlayerId;
use crate::game::state::Vehicle;
use crate::util::vec3::Vec3;

/// Size of the explosion when the local vehicle is destroyed
const VEHICLE_EXPLOSION_SIZE: f32 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Health actually removed
    pub applied: u32,
    /// Absorbed by the shield
    pub absorbed: bool,
}

/// Apply `damage` to the local vehicle. An active shield absorbs it all.
pub fn apply_to_vehicle(
    vehicle: &mut Vehicle,
    damage: u32,
    source: Option<PlayerId>,
    ctx: &mut SimulationContext,
) -> DamageOutcome {
    if !vehicle.is_alive() || damage == 0 {
        return DamageOutcome {
            applied: 0,
            absorbed: false,
        };
    }

    if vehicle.shield_active() {
        ctx.play(Sound::ShieldHit, Some(vehicle.position));
        ctx.emit(CombatEvent::PlayerHit {
            damage,
            source,
            remaining_health: vehicle.health,
            absorbed: true,
        });
        return DamageOutcome {
            applied: 0,
            absorbed: true,
        };
    }

    let before = vehicle.health;
    vehicle.health = vehicle.health.saturating_sub(damage);
    let applied = before - vehicle.health;

    ctx.play(Sound::VehicleHit, Some(vehicle.position));
    ctx.net.notify_player_hit(ctx.local_player, applied, source);
    ctx.emit(CombatEvent::PlayerHit {
        damage: applied,
        source,
        remaining_health: vehicle.health,
        absorbed: false,
    });
    ctx.metrics.player_hits += 1;
    tracing::debug!(damage = applied, health = vehicle.health, "local vehicle hit");

    let threshold = (vehicle.max_health as f32 * LOW_HEALTH_FRACTION) as u32;
    if !vehicle.warned_low_health && vehicle.health > 0 && vehicle.health < threshold {
        vehicle.warned_low_health = true;
        ctx.play(Sound::DamageWarning, None);
    }

    DamageOutcome {
        applied,
        absorbed: false,
    }
}

/// Transition to game over the first time health reaches zero.
/// Returns true on that transition only.
pub fn check_game_over(
    vehicle: &mut Vehicle,
    score: u64,
    ctx: &mut SimulationContext,
    effects: &mut EffectRegistry,
) -> bool {
    if vehicle.destroyed || vehicle.health > 0 {
        return false;
    }

    vehicle.destroyed = true;
    vehicle.velocity = 0.0;
    effects.spawn_destruction(ctx, vehicle.position + Vec3::UP * 0.5, VEHICLE_EXPLOSION_SIZE);
    ctx.play(Sound::Explosion, Some(vehicle.position));
    ctx.emit(CombatEvent::GameOver {
        score,
        frame: ctx.frame,
    });
    tracing::info!(score, frame = ctx.frame, "game over");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::game::audio::{Audio, RecordingAudio};
    use crate::game::context::TestContext;

    fn setup() -> (TestContext, Vehicle) {
        let t = TestContext::new(SimConfig::default());
        let vehicle = Vehicle::new(t.local_player, &t.config);
        (t, vehicle)
    }

    #[test]
    fn test_damage_reduces_health() {
        let (mut t, mut v) = setup();
        let source = uuid::Uuid::new_v4();
        let outcome = apply_to_vehicle(&mut v, 30, Some(source), &mut t.ctx());

        assert_eq!(outcome, DamageOutcome { applied: 30, absorbed: false });
        assert_eq!(v.health, 70);
        assert_eq!(t.metrics.player_hits, 1);
        assert_eq!(
            t.events,
            vec![CombatEvent::PlayerHit {
                damage: 30,
                source: Some(source),
                remaining_health: 70,
                absorbed: false
            }]
        );
    }

    #[test]
    fn test_shield_absorbs() {
        let (mut t, mut v) = setup();
        v.shield_ticks = 100.0;
        let outcome = apply_to_vehicle(&mut v, 50, None, &mut t.ctx());
        assert!(outcome.absorbed);
        assert_eq!(v.health, 100);
        assert_eq!(t.metrics.player_hits, 0);
    }

    #[test]
    fn test_overkill_saturates() {
        let (mut t, mut v) = setup();
        let outcome = apply_to_vehicle(&mut v, 250, None, &mut t.ctx());
        assert_eq!(outcome.applied, 100);
        assert_eq!(v.health, 0);
    }

    #[test]
    fn test_low_health_warning_plays_once() {
        let (mut t, mut v) = setup();
        let (backend, log) = RecordingAudio::new();
        t.audio = Audio::with_backend(Box::new(backend));

        apply_to_vehicle(&mut v, 70, None, &mut t.ctx());
        assert!(!v.warned_low_health);
        apply_to_vehicle(&mut v, 10, None, &mut t.ctx());
        assert!(v.warned_low_health);
        apply_to_vehicle(&mut v, 5, None, &mut t.ctx());

        let warnings = log.borrow().iter().filter(|s| **s == Sound::DamageWarning).count();
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_game_over_once() {
        let (mut t, mut v) = setup();
        let mut effects = EffectRegistry::new(&t.config, &mut t.gfx);

        assert!(!check_game_over(&mut v, 0, &mut t.ctx(), &mut effects));
        apply_to_vehicle(&mut v, 100, None, &mut t.ctx());
        assert!(check_game_over(&mut v, 300, &mut t.ctx(), &mut effects));
        assert!(!check_game_over(&mut v, 300, &mut t.ctx(), &mut effects));

        assert!(v.destroyed);
        assert_eq!(effects.active_count(), 1);
        let game_overs = t
            .events
            .iter()
            .filter(|e| matches!(e, CombatEvent::GameOver { score: 300, .. }))
            .count();
        assert_eq!(game_overs, 1);

        // Dead vehicles take no further damage
        assert_eq!(apply_to_vehicle(&mut v, 10, None, &mut t.ctx()).applied, 0);
    }
}
