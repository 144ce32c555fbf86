//! Multiplayer boundary
//!
//! The transport lives outside the simulation. Inbound callbacks push
//! [`InboundEvent`]s through a bounded crossbeam channel and the game loop
//! drains them at the start of the next tick, so nothing touches the live
//! collections mid-tick. Outbound notifications go through [`NetworkSink`].

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::game::audio::Sound;
use crate::game::constants::{inbox, vehicle};
use crate::game::systems::projectile::{Projectile, ProjectileId};
use crate::util::vec3::Vec3;

pub type PlayerId = Uuid;

/// Mirrored state of another player's vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntity {
    pub id: PlayerId,
    pub position: Vec3,
    pub yaw: f32,
    pub health: u32,
    /// Frame on which the last state update was applied
    pub last_update_frame: u64,
}

pub type RemoteRoster = HashMap<PlayerId, RemoteEntity>;

/// Messages delivered by the transport between ticks
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Another player's projectile hit the local vehicle
    RemoteProjectileHit { source: PlayerId, damage: u32 },
    RemoteEntityState {
        id: PlayerId,
        position: Vec3,
        yaw: f32,
        health: u32,
    },
    RemoteEntityLeft { id: PlayerId },
    /// Visual-only copy of a remote player's shot
    RemoteProjectileFired {
        owner: PlayerId,
        origin: Vec3,
        direction: Vec3,
        speed: f32,
        damage: u32,
    },
    /// A sound asset finished loading
    AssetReady { sound: Sound },
}

/// Inbox errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InboxError {
    /// Inbox is full (backpressure)
    #[error("inbox is full")]
    Full,
    /// Game loop dropped the inbox
    #[error("inbox disconnected")]
    Disconnected,
}

/// Receiving side of the inbound queue, owned by the game loop
pub struct Inbox {
    sender: Sender<InboundEvent>,
    receiver: Receiver<InboundEvent>,
    capacity: usize,
}

impl Inbox {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Clonable handle for transport callbacks
    pub fn sender(&self) -> InboxSender {
        InboxSender {
            sender: self.sender.clone(),
        }
    }

    /// Pending events in arrival order; only events already queued are yielded
    pub fn drain(&self) -> impl Iterator<Item = InboundEvent> + '_ {
        let pending = self.receiver.len();
        self.receiver.try_iter().take(pending)
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new(inbox::CAPACITY)
    }
}

/// Enqueue-only handle given to transport and asset callbacks
#[derive(Clone)]
pub struct InboxSender {
    sender: Sender<InboundEvent>,
}

impl InboxSender {
    pub fn send(&self, event: InboundEvent) -> Result<(), InboxError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => InboxError::Full,
            TrySendError::Disconnected(_) => InboxError::Disconnected,
        })
    }

    pub fn on_remote_projectile_hit(&self, source: PlayerId, damage: u32) -> Result<(), InboxError> {
        self.send(InboundEvent::RemoteProjectileHit { source, damage })
    }

    pub fn on_remote_entity_state(
        &self,
        id: PlayerId,
        position: Vec3,
        yaw: f32,
        health: u32,
    ) -> Result<(), InboxError> {
        self.send(InboundEvent::RemoteEntityState {
            id,
            position,
            yaw,
            health,
        })
    }

    pub fn on_remote_entity_left(&self, id: PlayerId) -> Result<(), InboxError> {
        self.send(InboundEvent::RemoteEntityLeft { id })
    }

    pub fn on_remote_projectile_fired(
        &self,
        owner: PlayerId,
        origin: Vec3,
        direction: Vec3,
        speed: f32,
        damage: u32,
    ) -> Result<(), InboxError> {
        self.send(InboundEvent::RemoteProjectileFired {
            owner,
            origin,
            direction,
            speed,
            damage,
        })
    }

    pub fn on_asset_ready(&self, sound: Sound) -> Result<(), InboxError> {
        self.send(InboundEvent::AssetReady { sound })
    }
}

/// Outbound, best-effort notifications to the transport
pub trait NetworkSink {
    fn notify_projectile_created(&mut self, projectile: &Projectile);
    fn notify_player_hit(&mut self, local_player: PlayerId, damage: u32, source: Option<PlayerId>);
}

/// Single-player sink
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNetwork;

impl NetworkSink for NullNetwork {
    fn notify_projectile_created(&mut self, _projectile: &Projectile) {}
    fn notify_player_hit(&mut self, _local_player: PlayerId, _damage: u32, _source: Option<PlayerId>) {}
}

/// Outbound message captured by [`QueuedNetwork`]
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    ProjectileCreated { id: ProjectileId, origin: Vec3, direction: Vec3 },
    PlayerHit { local_player: PlayerId, damage: u32, source: Option<PlayerId> },
}

/// Sink that queues notifications for a transport to pick up after the tick
#[derive(Debug, Clone)]
pub struct QueuedNetwork {
    outbox: Sender<OutboundEvent>,
    dropped: u64,
}

impl QueuedNetwork {
    pub fn new(capacity: usize) -> (Self, Receiver<OutboundEvent>) {
        let (outbox, receiver) = bounded(capacity);
        (Self { outbox, dropped: 0 }, receiver)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn push(&mut self, event: OutboundEvent) {
        if self.outbox.try_send(event).is_err() {
            self.dropped += 1;
        }
    }
}

impl NetworkSink for QueuedNetwork {
    fn notify_projectile_created(&mut self, projectile: &Projectile) {
        self.push(OutboundEvent::ProjectileCreated {
            id: projectile.id,
            origin: projectile.position,
            direction: projectile.direction,
        });
    }

    fn notify_player_hit(&mut self, local_player: PlayerId, damage: u32, source: Option<PlayerId>) {
        self.push(OutboundEvent::PlayerHit {
            local_player,
            damage,
            source,
        });
    }
}

/// Result of a remote collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteHit {
    pub target: PlayerId,
    pub position: Vec3,
}

/// Narrow hook through which projectiles are tested against remote players
pub trait RemoteHitHook {
    fn check_remote_hits(&mut self, projectile: &Projectile, roster: &RemoteRoster) -> Option<RemoteHit>;
}

/// Hook for single-player sessions
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRemoteHits;

impl RemoteHitHook for NoRemoteHits {
    fn check_remote_hits(&mut self, _projectile: &Projectile, _roster: &RemoteRoster) -> Option<RemoteHit> {
        None
    }
}

/// Generous box test against mirrored remote transforms.
///
/// Remote positions lag behind the real ones, so the box is widened by
/// `margin` on every axis. When several remotes overlap the projectile the
/// closest one wins.
#[derive(Debug, Clone, Copy)]
pub struct RosterHitbox {
    pub half_extents: Vec3,
    pub margin: f32,
}

impl Default for RosterHitbox {
    fn default() -> Self {
        let (hx, hy, hz) = vehicle::HALF_EXTENTS;
        let horizontal = hx.max(hz);
        Self {
            half_extents: Vec3::new(horizontal, hy, horizontal),
            margin: vehicle::HITBOX_MARGIN,
        }
    }
}

impl RemoteHitHook for RosterHitbox {
    fn check_remote_hits(&mut self, projectile: &Projectile, roster: &RemoteRoster) -> Option<RemoteHit> {
        let reach = self.half_extents + Vec3::splat(self.margin);
        roster
            .values()
            .filter(|remote| Some(remote.id) != projectile.owner && remote.health > 0)
            .filter(|remote| {
                let d = (projectile.position - remote.position).abs();
                d.x <= reach.x && d.y <= reach.y && d.z <= reach.z
            })
            .min_by(|a, b| {
                let da = a.position.distance_sq_to(projectile.position);
                let db = b.position.distance_sq_to(projectile.position);
                da.total_cmp(&db)
            })
            .map(|remote| RemoteHit {
                target: remote.id,
                position: projectile.position,
            })
    }
}
