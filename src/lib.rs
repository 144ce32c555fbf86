//! Neon Arena simulation core
//!
//! Runtime simulation for a real-time arena vehicle-combat game: pooled
//! visual effects, projectiles and collisions, turret adversaries and a
//! round-robin frame scheduler. Rendering, audio playback, HUD widgets and
//! the multiplayer transport are external collaborators reached through
//! the traits in [`game::presentation`], [`game::audio`] and
//! [`game::network`].
//!
//! # Features
//!
//! - `trails` - Probabilistic projectile trails (enabled by default)

pub mod config;
pub mod game;
pub mod metrics;
pub mod util;
