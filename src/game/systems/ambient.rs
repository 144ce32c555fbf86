//! Ambient arena animation

use crate::game::constants::ambient::{SPECTATOR_BOB_AMPLITUDE, SPECTATOR_BOB_RATE};
use crate::game::presentation::Presentation;
use crate::game::systems::arena::Arena;
use crate::util::vec3::Vec3;

/// Advance the ambient clock by `dt` and bob every spectator
pub fn update(arena: &Arena, clock: &mut f32, gfx: &mut dyn Presentation, dt: f32) {
    *clock += dt;
    for spectator in &arena.spectators {
        let bob = (*clock * SPECTATOR_BOB_RATE + spectator.phase).sin().abs() * SPECTATOR_BOB_AMPLITUDE;
        gfx.set_transform(spectator.visual, spectator.base + Vec3::UP * bob, Vec3::ZERO, Vec3::ONE);
    }
}
