//! Per-tick simulation context
//!
//! The game loop owns every collaborator and lends them to subsystems through
//! one [`SimulationContext`] per tick. There are no global managers.

use rand_chacha::ChaCha8Rng;

use crate::config::SimConfig;
use crate::game::audio::{Audio, Sound};
use crate::game::events::CombatEvent;
use crate::game::network::{NetworkSink, PlayerId};
use crate::game::presentation::Presentation;
use crate::metrics::SimMetrics;
use crate::util::vec3::Vec3;

pub struct SimulationContext<'a> {
    pub config: &'a SimConfig,
    pub gfx: &'a mut dyn Presentation,
    pub audio: &'a mut Audio,
    pub net: &'a mut dyn NetworkSink,
    pub rng: &'a mut ChaCha8Rng,
    pub metrics: &'a mut SimMetrics,
    pub events: &'a mut Vec<CombatEvent>,
    pub local_player: PlayerId,
    pub frame: u64,
}

impl SimulationContext<'_> {
    #[inline]
    pub fn emit(&mut self, event: CombatEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn play(&mut self, sound: Sound, position: Option<Vec3>) {
        self.audio.play(sound, position);
    }
}

/// Owned collaborators for exercising subsystems without a full game
#[cfg(test)]
pub(crate) struct TestContext {
    pub config: SimConfig,
    pub gfx: crate::game::presentation::HeadlessPresentation,
    pub audio: Audio,
    pub net: crate::game::network::NullNetwork,
    pub rng: ChaCha8Rng,
    pub metrics: SimMetrics,
    pub events: Vec<CombatEvent>,
    pub local_player: PlayerId,
    pub frame: u64,
}

#[cfg(test)]
impl TestContext {
    pub fn new(config: SimConfig) -> Self {
        use rand::SeedableRng;
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            gfx: Default::default(),
            audio: Audio::Null,
            net: crate::game::network::NullNetwork,
            metrics: SimMetrics::new(),
            events: Vec::new(),
            local_player: uuid::Uuid::new_v4(),
            frame: 0,
        }
    }

    pub fn ctx(&mut self) -> SimulationContext<'_> {
        SimulationContext {
            config: &self.config,
            gfx: &mut self.gfx,
            audio: &mut self.audio,
            net: &mut self.net,
            rng: &mut self.rng,
            metrics: &mut self.metrics,
            events: &mut self.events,
            local_player: self.local_player,
            frame: self.frame,
        }
    }
}
