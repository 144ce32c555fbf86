//! Round-robin frame scheduler
//!
//! Secondary work is split into [`FRAME_GROUPS`] groups keyed by
//! `frame % FRAME_GROUPS`. Group 0 (weapon core) runs every frame; every
//! other group runs once per cycle and receives the dt accumulated since it
//! last ran, so cadence does not change simulated speed.

use crate::game::constants::timing::FRAME_GROUPS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameGroup {
    /// Projectile and weapon core, always essential
    WeaponCore,
    /// Body collisions and explosion/impact advancement
    Collision,
    /// Pickup spawning and collection
    Pickups,
    /// Trails, sparks and ambient animation
    Cosmetic,
}

impl FrameGroup {
    pub const ALL: [FrameGroup; FRAME_GROUPS] = [
        FrameGroup::WeaponCore,
        FrameGroup::Collision,
        FrameGroup::Pickups,
        FrameGroup::Cosmetic,
    ];

    pub fn index(&self) -> usize {
        match self {
            FrameGroup::WeaponCore => 0,
            FrameGroup::Collision => 1,
            FrameGroup::Pickups => 2,
            FrameGroup::Cosmetic => 3,
        }
    }

    /// Group whose turn it is on `frame`
    pub fn for_frame(frame: u64) -> FrameGroup {
        Self::ALL[(frame % FRAME_GROUPS as u64) as usize]
    }
}

/// Which groups run on one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    pub frame: u64,
    pub active: FrameGroup,
}

impl FramePlan {
    pub fn runs(&self, group: FrameGroup) -> bool {
        group == FrameGroup::WeaponCore || group == self.active
    }
}

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    frame: u64,
    pending_dt: [f32; FRAME_GROUPS],
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            frame: 0,
            pending_dt: [0.0; FRAME_GROUPS],
        }
    }

    /// Start a frame: accrue `dt` to every group and return the plan
    pub fn begin_frame(&mut self, dt: f32) -> FramePlan {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        for pending in &mut self.pending_dt {
            *pending += dt;
        }
        let plan = FramePlan {
            frame: self.frame,
            active: FrameGroup::for_frame(self.frame),
        };
        self.frame += 1;
        plan
    }

    /// Take the dt a group has accumulated since it last ran
    pub fn take_dt(&mut self, group: FrameGroup) -> f32 {
        std::mem::take(&mut self.pending_dt[group.index()])
    }

    /// Frames started so far
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}
