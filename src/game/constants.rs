//! Compile-time defaults for the arena simulation.
//!
//! Time is measured in ticks (one rendered frame at the nominal 60 Hz), so
//! every rate below is "per tick" unless stated otherwise. Values marked with
//! `ENV:` can be overridden through `SimConfig::load_or_default`.

/// Frame timing constants
pub mod timing {
    /// Nominal frame rate the tick budget is measured against
    pub const TICK_RATE: u32 = 60;
    /// Delta time of a nominal frame, in ticks
    pub const NOMINAL_DT: f32 = 1.0;
    /// Largest dt accepted by a single tick (host stalls are clamped)
    pub const MAX_DT: f32 = 3.0;
    /// Number of round-robin frame budget groups
    pub const FRAME_GROUPS: usize = 4;
}

/// Arena layout constants
pub mod arena {
    /// Half the side length of the square arena (grid size 200)
    /// ENV: ARENA_HALF_SIZE
    pub const HALF_SIZE: f32 = 100.0;
    /// ENV: ARENA_WALL_THICKNESS
    pub const WALL_THICKNESS: f32 = 2.0;
    pub const WALL_HEIGHT: f32 = 10.0;
    /// Anything farther than this from the origin is discarded
    /// ENV: WORLD_EXTENT_LIMIT
    pub const WORLD_EXTENT_LIMIT: f32 = 500.0;
    pub const GROUND_HEIGHT: f32 = 0.0;

    pub const PILLAR_RADIUS: f32 = 3.0;
    pub const PILLAR_HEIGHT: f32 = 15.0;
    /// Pillar centres as fractions of the half size (x, z)
    pub const PILLAR_LAYOUT: [(f32, f32); 12] = [
        // Outer ring
        (0.8, 0.0),
        (-0.8, 0.0),
        (0.0, 0.8),
        (0.0, -0.8),
        // Inner diagonals
        (0.4, 0.4),
        (-0.4, 0.4),
        (0.4, -0.4),
        (-0.4, -0.4),
        // Offset extras
        (0.2, 0.6),
        (-0.2, -0.6),
        (0.6, -0.2),
        (-0.6, 0.2),
    ];

    /// Turret sites sit at (+-0.6, +-0.6) of the half size
    pub const TURRET_SITE_FRACTION: f32 = 0.6;

    /// Spectators stand in a ring just outside the walls
    pub const SPECTATOR_COUNT: usize = 32;
    pub const SPECTATOR_RING_OFFSET: f32 = 8.0;
}

/// Local vehicle handling constants
pub mod vehicle {
    pub const MAX_HEALTH: u32 = 100;
    /// Body dimensions 2 x 1 x 3, stored as half extents
    pub const HALF_EXTENTS: (f32, f32, f32) = (1.0, 0.5, 1.5);
    /// Height of the body centre above the ground
    pub const RIDE_HEIGHT: f32 = 0.5;
    /// Half size used against the arena walls
    pub const WALL_COLLISION_HALF_SIZE: f32 = 2.5;
    /// Radius used against pillars and turret bases
    pub const COLLISION_RADIUS: f32 = 2.5;

    pub const ACCELERATION: f32 = 0.01;
    /// Velocity multiplier per tick while coasting
    pub const FRICTION: f32 = 0.98;
    pub const MAX_SPEED: f32 = 0.5;
    /// Reverse speed is capped at this fraction of the max speed
    pub const REVERSE_FACTOR: f32 = 0.5;
    pub const TURN_SPEED: f32 = 0.03;
    /// No steering below this speed
    pub const MIN_TURN_SPEED: f32 = 0.01;
    /// Coasting below this speed snaps to a stop
    pub const STOP_THRESHOLD: f32 = 0.001;

    /// Wall impact damage = floor(|v| * factor)
    pub const WALL_DAMAGE_FACTOR: f32 = 50.0;
    /// Velocity after a wall impact = -v * restitution
    pub const WALL_RESTITUTION: f32 = 0.7;
    pub const PILLAR_RESTITUTION: f32 = 0.4;

    /// Generous hitbox margin against projectiles
    /// ENV: VEHICLE_HITBOX_MARGIN
    pub const HITBOX_MARGIN: f32 = 1.5;
    /// Warning sound plays once when health first drops under this fraction
    pub const LOW_HEALTH_FRACTION: f32 = 0.25;
}

/// Chase camera constants
pub mod camera {
    pub const DISTANCE: f32 = 15.0;
    pub const HEIGHT: f32 = 8.0;
    pub const LERP: f32 = 0.05;
}

/// Wheel animation constants
pub mod wheels {
    /// Roll angle per unit of velocity
    pub const ROLL_FACTOR: f32 = 0.5;
    pub const STEER_ANGLE: f32 = 0.3;
    pub const RADIUS: f32 = 0.4;
    /// Wheel offsets from the body centre (x, z)
    pub const OFFSETS: [(f32, f32); 4] = [(-1.1, 1.0), (1.1, 1.0), (-1.1, -1.0), (1.1, -1.0)];
}

/// Player weapon constants
pub mod weapon {
    pub const START_AMMO: u32 = 50;
    pub const MAX_AMMO: u32 = 100;
    /// Ticks between shots
    pub const FIRE_COOLDOWN: f32 = 10.0;
    pub const PROJECTILE_SPEED: f32 = 2.0;
    pub const DAMAGE: u32 = 25;
    pub const DAMAGE_BOOST_MULTIPLIER: u32 = 2;
    /// Shots spawn this far ahead of the vehicle
    pub const MUZZLE_OFFSET: f32 = 2.0;
    pub const BARREL_HEIGHT: f32 = 1.0;
    pub const PROJECTILE_LIFETIME: u32 = 120;
}

/// Projectile engine constants
pub mod projectile {
    /// Upper bound on live projectiles; the list is preallocated to this size
    pub const MAX_ACTIVE: usize = 512;
    /// Per-tick chance to leave a trail particle (player and turret shots)
    pub const TRAIL_CHANCE: f32 = 0.3;
    /// Remote shots trail more often so they read better on screen
    pub const REMOTE_TRAIL_CHANCE: f32 = 0.6;
    /// ENV: TRAIL_CAP_PER_FRAME
    pub const TRAIL_CAP_PER_FRAME: usize = 8;
    pub const REMOTE_LIFETIME: u32 = 150;
}

/// Turret constants
pub mod turret {
    /// ENV: TURRET_RANGE
    pub const RANGE: f32 = 300.0;
    /// Fraction of the shortest angular difference turned per tick
    pub const TURN_RATE: f32 = 0.02;
    pub const ALIGN_TOLERANCE: f32 = 0.2;
    /// Random yaw deviation applied to every shot (radians)
    pub const AIM_DEVIATION: f32 = 0.05;
    pub const COOLDOWN_MIN: f32 = 90.0;
    pub const COOLDOWN_MAX: f32 = 150.0;
    pub const MAX_HEALTH: u32 = 100;
    pub const PROJECTILE_SPEED: f32 = 1.5;
    pub const PROJECTILE_DAMAGE: u32 = 10;
    pub const PROJECTILE_LIFETIME: u32 = 200;
    /// ENV: TURRET_RESPAWN_SECONDS
    pub const RESPAWN_SECONDS: f32 = 30.0;
    pub const SCORE_AWARD: u64 = 100;

    pub const RECOIL_TICKS: f32 = 8.0;
    pub const RECOIL_DISTANCE: f32 = 0.3;

    /// Half width of the turret base
    pub const HALF_EXTENT: f32 = 1.5;
    pub const BODY_HEIGHT: f32 = 3.0;
    pub const BARREL_HEIGHT: f32 = 1.5;
    pub const BARREL_LENGTH: f32 = 2.0;
    /// ENV: TURRET_HITBOX_MARGIN
    pub const HITBOX_MARGIN: f32 = 1.5;
    pub const DESTRUCTION_SIZE: f32 = 2.0;
}

/// Effect lifecycle constants
pub mod effects {
    /// Preallocated effect record slots
    /// ENV: MAX_EFFECTS
    pub const MAX_EFFECTS: usize = 64;

    pub const EXPLOSION_LIFE: f32 = 30.0;
    pub const IMPACT_LIFE: f32 = 20.0;
    pub const TRAIL_LIFE: f32 = 12.0;
    pub const SPARK_LIFE: f32 = 10.0;

    pub const EXPLOSION_PARTICLES: usize = 20;
    pub const IMPACT_PARTICLES: usize = 6;
    pub const SPARK_PARTICLES: usize = 4;
    pub const DESTRUCTION_DEBRIS: usize = 8;

    pub const EXPLOSION_LIGHT_INTENSITY: f32 = 4.0;
    pub const IMPACT_LIGHT_INTENSITY: f32 = 2.0;
    /// Shockwave ring reaches size * this at the end of its life
    pub const SHOCKWAVE_SPREAD: f32 = 4.0;
    pub const SHOCKWAVE_OPACITY: f32 = 0.8;

    /// Fire particles hold full opacity until this progress
    pub const FIRE_HOLD: f32 = 0.5;
    pub const SMOKE_OPACITY: f32 = 0.6;
    /// Smoke scale multiplier per tick
    pub const SMOKE_GROWTH: f32 = 1.02;
    pub const PARTICLE_DRAG: f32 = 0.95;

    pub const DEBRIS_GRAVITY: f32 = 0.015;
    /// Vertical velocity kept (and inverted) on a ground bounce
    pub const DEBRIS_BOUNCE: f32 = 0.4;
    /// Horizontal velocity kept on a ground bounce
    pub const DEBRIS_FRICTION: f32 = 0.8;
    /// Debris starts fading at this progress (final 30% of life)
    pub const DEBRIS_FADE_START: f32 = 0.7;

    pub const TRAIL_OPACITY: f32 = 0.8;
}

/// Object pool capacities
pub mod pools {
    /// ENV: POOL_PARTICLES
    pub const PARTICLES: usize = 150;
    /// ENV: POOL_DEBRIS
    pub const DEBRIS: usize = 40;
    /// ENV: POOL_LIGHTS
    pub const LIGHTS: usize = 20;
    /// ENV: POOL_SHOCKWAVES
    pub const SHOCKWAVES: usize = 10;
    /// ENV: POOL_TRAILS
    pub const TRAILS: usize = 64;
    /// Slots are addressed with u16
    pub const MAX_CAPACITY: usize = u16::MAX as usize;
}

/// Power-up constants
pub mod pickups {
    /// ENV: PICKUP_MAX_ACTIVE
    pub const MAX_ACTIVE: usize = 5;
    /// Ticks between spawn attempts
    pub const SPAWN_INTERVAL: f32 = 600.0;
    pub const COLLECT_RADIUS: f32 = 3.0;
    /// Duration of timed buffs (shield, damage, speed)
    pub const BUFF_DURATION: f32 = 600.0;
    pub const HEALTH_AMOUNT: u32 = 25;
    pub const AMMO_AMOUNT: u32 = 20;
    pub const SPEED_MULTIPLIER: f32 = 1.5;
    /// Minimum distance between a pickup and a pillar surface
    pub const PILLAR_CLEARANCE: f32 = 4.0;
    pub const WALL_CLEARANCE: f32 = 5.0;
    pub const SPAWN_ATTEMPTS: usize = 10;
    pub const HOVER_HEIGHT: f32 = 1.0;
    pub const SPIN_RATE: f32 = 0.02;
    pub const BOB_AMPLITUDE: f32 = 0.3;
    pub const BOB_RATE: f32 = 0.05;
}

/// Ambient animation constants
pub mod ambient {
    pub const SPECTATOR_BOB_AMPLITUDE: f32 = 0.2;
    pub const SPECTATOR_BOB_RATE: f32 = 0.1;
}

/// Inbound message queue constants
pub mod inbox {
    /// Bounded capacity; senders see backpressure beyond this
    pub const CAPACITY: usize = 256;
}
