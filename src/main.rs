use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use neon_arena_core::config::SimConfig;
use neon_arena_core::game::events::CombatEvent;
use neon_arena_core::game::game_loop::Game;
use neon_arena_core::game::network::RosterHitbox;
use neon_arena_core::game::presentation::HeadlessPresentation;
use neon_arena_core::game::systems::vehicle::DriveInput;

/// Frames simulated when SIM_FRAMES is not set (10 seconds at 60 Hz)
const DEFAULT_FRAMES: u64 = 600;

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Neon Arena core v{}", env!("CARGO_PKG_VERSION"));

    let config = SimConfig::load_or_default();
    info!(
        "Configuration loaded: seed={}, half_size={}, max_effects={}",
        config.seed, config.arena.half_size, config.effects.max_effects
    );

    let frames: u64 = std::env::var("SIM_FRAMES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);

    let mut game = Game::new(config, HeadlessPresentation::new())?
        .with_remote_hits(Box::new(RosterHitbox::default()));

    let mut turrets_destroyed = 0u32;
    let mut hits_taken = 0u32;
    for frame in 0..frames {
        game.tick(&scripted_input(frame), 1.0);

        for event in game.drain_events() {
            match event {
                CombatEvent::TurretDestroyed { turret, score, .. } => {
                    turrets_destroyed += 1;
                    info!(turret, score, frame, "turret down");
                }
                CombatEvent::PlayerHit { absorbed: false, .. } => hits_taken += 1,
                CombatEvent::GameOver { score, .. } => info!(score, frame, "vehicle destroyed"),
                _ => {}
            }
        }

        if frame % 60 == 59 {
            tracing::debug!("{}", game.performance().status_message());
        }
        if game.is_game_over() {
            break;
        }
    }

    let metrics = game.metrics();
    if metrics.projectile_resets > 0 {
        warn!("projectile list was reset {} times", metrics.projectile_resets);
    }
    info!(
        "Simulated {} frames: score={}, turrets destroyed={}, hits taken={}, reclaims={}",
        game.frame(),
        game.state().score,
        turrets_destroyed,
        hits_taken,
        metrics.total_reclaims()
    );
    info!("Frame budget: {}", game.performance().status_message());

    println!("{}", metrics.to_prometheus());
    Ok(())
}

/// Circle the arena centre, firing whenever the weapon is ready
fn scripted_input(frame: u64) -> DriveInput {
    let phase = (frame / 240) % 2;
    DriveInput {
        throttle: 1.0,
        steer: if phase == 0 { 0.6 } else { -0.4 },
        fire: frame % 12 == 0,
    }
}
