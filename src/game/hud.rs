//! HUD publishing
//!
//! The core never touches widgets. It builds a [`HudSnapshot`] every tick and
//! hands it to the registered observer only when something changed.

use serde::{Deserialize, Serialize};

/// Numbers shown on the heads-up display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub health: u32,
    pub max_health: u32,
    pub health_percent: u32,
    pub ammo: u32,
    pub score: u64,
    pub turrets_alive: usize,
    pub shield_active: bool,
    pub game_over: bool,
}

impl HudSnapshot {
    pub fn health_percent(health: u32, max_health: u32) -> u32 {
        if max_health == 0 {
            return 0;
        }
        ((health as u64 * 100) / max_health as u64) as u32
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub type HudObserver = Box<dyn FnMut(&HudSnapshot)>;

/// Change-detecting publisher for HUD snapshots
#[derive(Default)]
pub struct HudPublisher {
    last: Option<HudSnapshot>,
    observer: Option<HudObserver>,
    publishes: u64,
}

impl HudPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_observer(&mut self, observer: HudObserver) {
        self.observer = Some(observer);
        // A new observer gets the current state on the next publish
        self.last = None;
    }

    /// Publish if the snapshot differs from the last one. Returns true if published.
    pub fn publish(&mut self, snapshot: HudSnapshot) -> bool {
        if self.last.as_ref() == Some(&snapshot) {
            return false;
        }
        if let Some(observer) = self.observer.as_mut() {
            observer(&snapshot);
        }
        self.last = Some(snapshot);
        self.publishes += 1;
        true
    }

    pub fn last(&self) -> Option<&HudSnapshot> {
        self.last.as_ref()
    }

    pub fn publish_count(&self) -> u64 {
        self.publishes
    }
}
