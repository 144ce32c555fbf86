//! Gameplay events produced during a tick and drained by the host

use serde::{Deserialize, Serialize};

use crate::game::network::PlayerId;
use crate::game::systems::pickups::PickupKind;
use crate::game::systems::projectile::{ProjectileId, ProjectileSource};
use crate::util::vec3::Vec3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    ProjectileFired {
        id: ProjectileId,
        source: ProjectileSource,
        position: Vec3,
    },
    /// The local vehicle or a projectile struck an arena wall
    WallHit {
        position: Vec3,
        damage: u32,
    },
    PlayerHit {
        damage: u32,
        source: Option<PlayerId>,
        remaining_health: u32,
        absorbed: bool,
    },
    TurretHit {
        turret: usize,
        damage: u32,
        remaining_health: u32,
    },
    TurretDestroyed {
        turret: usize,
        position: Vec3,
        score: u64,
    },
    TurretRespawned {
        turret: usize,
    },
    RemoteEntityHit {
        target: PlayerId,
        damage: u32,
        position: Vec3,
    },
    PickupCollected {
        kind: PickupKind,
        position: Vec3,
    },
    GameOver {
        score: u64,
        frame: u64,
    },
}
