use std::str::FromStr;

use thiserror::Error;

use crate::game::constants::{
    arena, effects, pickups, pools, projectile, timing, turret, vehicle, weapon,
};

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("arena half size {half_size} must exceed wall thickness {wall_thickness}")]
    ArenaTooSmall { half_size: f32, wall_thickness: f32 },
    #[error("world extent limit {limit} must exceed the arena half size {half_size}")]
    WorldExtentInsideArena { limit: f32, half_size: f32 },
    #[error("{name} must be finite and positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },
    #[error("pool '{pool}' capacity must be 1..={max}, got {value}")]
    PoolCapacity {
        pool: &'static str,
        value: usize,
        max: usize,
    },
    #[error("turret cooldown range {min}..{max} is empty")]
    CooldownRange { min: f32, max: f32 },
    #[error("{name} must be at least 1")]
    ZeroCount { name: &'static str },
}

/// Arena geometry
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub half_size: f32,
    pub wall_thickness: f32,
    pub wall_height: f32,
    pub world_extent_limit: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            half_size: arena::HALF_SIZE,
            wall_thickness: arena::WALL_THICKNESS,
            wall_height: arena::WALL_HEIGHT,
            world_extent_limit: arena::WORLD_EXTENT_LIMIT,
        }
    }
}

impl ArenaConfig {
    /// Inner face of the walls; projectiles past it have hit a wall
    pub fn inner_bound(&self) -> f32 {
        self.half_size - self.wall_thickness
    }
}

/// Local vehicle handling and hitbox
#[derive(Debug, Clone)]
pub struct VehicleConfig {
    pub max_health: u32,
    pub hitbox_margin: f32,
    pub acceleration: f32,
    pub friction: f32,
    pub max_speed: f32,
    pub turn_speed: f32,
    pub wall_damage_factor: f32,
    pub wall_restitution: f32,
    pub pillar_restitution: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            max_health: vehicle::MAX_HEALTH,
            hitbox_margin: vehicle::HITBOX_MARGIN,
            acceleration: vehicle::ACCELERATION,
            friction: vehicle::FRICTION,
            max_speed: vehicle::MAX_SPEED,
            turn_speed: vehicle::TURN_SPEED,
            wall_damage_factor: vehicle::WALL_DAMAGE_FACTOR,
            wall_restitution: vehicle::WALL_RESTITUTION,
            pillar_restitution: vehicle::PILLAR_RESTITUTION,
        }
    }
}

/// Player weapon and projectile engine tuning
#[derive(Debug, Clone)]
pub struct ProjectileConfig {
    pub start_ammo: u32,
    pub max_ammo: u32,
    pub fire_cooldown: f32,
    pub player_speed: f32,
    pub player_damage: u32,
    pub player_lifetime: u32,
    pub remote_lifetime: u32,
    pub max_active: usize,
    pub trail_chance: f32,
    pub remote_trail_chance: f32,
    pub trail_cap_per_frame: usize,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            start_ammo: weapon::START_AMMO,
            max_ammo: weapon::MAX_AMMO,
            fire_cooldown: weapon::FIRE_COOLDOWN,
            player_speed: weapon::PROJECTILE_SPEED,
            player_damage: weapon::DAMAGE,
            player_lifetime: weapon::PROJECTILE_LIFETIME,
            remote_lifetime: projectile::REMOTE_LIFETIME,
            max_active: projectile::MAX_ACTIVE,
            trail_chance: projectile::TRAIL_CHANCE,
            remote_trail_chance: projectile::REMOTE_TRAIL_CHANCE,
            trail_cap_per_frame: projectile::TRAIL_CAP_PER_FRAME,
        }
    }
}

/// Turret behaviour
#[derive(Debug, Clone)]
pub struct TurretConfig {
    pub range: f32,
    pub turn_rate: f32,
    pub align_tolerance: f32,
    pub aim_deviation: f32,
    pub cooldown_min: f32,
    pub cooldown_max: f32,
    pub max_health: u32,
    pub projectile_speed: f32,
    pub projectile_damage: u32,
    pub projectile_lifetime: u32,
    /// Respawn delay in ticks
    pub respawn_ticks: f32,
    pub hitbox_margin: f32,
    pub score_award: u64,
}

impl Default for TurretConfig {
    fn default() -> Self {
        Self {
            range: turret::RANGE,
            turn_rate: turret::TURN_RATE,
            align_tolerance: turret::ALIGN_TOLERANCE,
            aim_deviation: turret::AIM_DEVIATION,
            cooldown_min: turret::COOLDOWN_MIN,
            cooldown_max: turret::COOLDOWN_MAX,
            max_health: turret::MAX_HEALTH,
            projectile_speed: turret::PROJECTILE_SPEED,
            projectile_damage: turret::PROJECTILE_DAMAGE,
            projectile_lifetime: turret::PROJECTILE_LIFETIME,
            respawn_ticks: turret::RESPAWN_SECONDS * timing::TICK_RATE as f32,
            hitbox_margin: turret::HITBOX_MARGIN,
            score_award: turret::SCORE_AWARD,
        }
    }
}

/// Effect registry sizing and lifetimes
#[derive(Debug, Clone)]
pub struct EffectConfig {
    pub max_effects: usize,
    pub explosion_life: f32,
    pub impact_life: f32,
    pub trail_life: f32,
    pub spark_life: f32,
    pub explosion_particles: usize,
    pub impact_particles: usize,
    pub spark_particles: usize,
    pub destruction_debris: usize,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            max_effects: effects::MAX_EFFECTS,
            explosion_life: effects::EXPLOSION_LIFE,
            impact_life: effects::IMPACT_LIFE,
            trail_life: effects::TRAIL_LIFE,
            spark_life: effects::SPARK_LIFE,
            explosion_particles: effects::EXPLOSION_PARTICLES,
            impact_particles: effects::IMPACT_PARTICLES,
            spark_particles: effects::SPARK_PARTICLES,
            destruction_debris: effects::DESTRUCTION_DEBRIS,
        }
    }
}

/// Fixed pool capacities
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub particles: usize,
    pub debris: usize,
    pub lights: usize,
    pub shockwaves: usize,
    pub trails: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            particles: pools::PARTICLES,
            debris: pools::DEBRIS,
            lights: pools::LIGHTS,
            shockwaves: pools::SHOCKWAVES,
            trails: pools::TRAILS,
        }
    }
}

/// Power-up spawning and effects
#[derive(Debug, Clone)]
pub struct PickupConfig {
    pub max_active: usize,
    pub spawn_interval: f32,
    pub collect_radius: f32,
    pub buff_duration: f32,
    pub health_amount: u32,
    pub ammo_amount: u32,
    pub speed_multiplier: f32,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            max_active: pickups::MAX_ACTIVE,
            spawn_interval: pickups::SPAWN_INTERVAL,
            collect_radius: pickups::COLLECT_RADIUS,
            buff_duration: pickups::BUFF_DURATION,
            health_amount: pickups::HEALTH_AMOUNT,
            ammo_amount: pickups::AMMO_AMOUNT,
            speed_multiplier: pickups::SPEED_MULTIPLIER,
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Seed for the simulation RNG (turret cooldowns, aim jitter, effects)
    pub seed: u64,
    pub arena: ArenaConfig,
    pub vehicle: VehicleConfig,
    pub projectile: ProjectileConfig,
    pub turret: TurretConfig,
    pub effects: EffectConfig,
    pub pools: PoolConfig,
    pub pickups: PickupConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_a2e7,
            arena: ArenaConfig::default(),
            vehicle: VehicleConfig::default(),
            projectile: ProjectileConfig::default(),
            turret: TurretConfig::default(),
            effects: EffectConfig::default(),
            pools: PoolConfig::default(),
            pickups: PickupConfig::default(),
        }
    }
}

/// Override `target` from an env var when it parses and passes `accept`
fn env_override<T: FromStr>(key: &str, target: &mut T, accept: impl Fn(&T) -> bool, rule: &str) {
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(parsed) if accept(&parsed) => *target = parsed,
        Ok(_) => tracing::warn!("{} {}, using default", key, rule),
        Err(_) => tracing::warn!("Invalid {} '{}', using default", key, raw),
    }
}

fn positive(v: &f32) -> bool {
    v.is_finite() && *v > 0.0
}

fn pool_capacity(v: &usize) -> bool {
    (1..=pools::MAX_CAPACITY).contains(v)
}

impl SimConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        env_override("SIM_SEED", &mut config.seed, |_| true, "");

        env_override("ARENA_HALF_SIZE", &mut config.arena.half_size, positive, "must be > 0");
        env_override(
            "ARENA_WALL_THICKNESS",
            &mut config.arena.wall_thickness,
            |v| v.is_finite() && *v >= 0.0,
            "must be >= 0",
        );
        env_override(
            "WORLD_EXTENT_LIMIT",
            &mut config.arena.world_extent_limit,
            positive,
            "must be > 0",
        );

        env_override(
            "VEHICLE_HITBOX_MARGIN",
            &mut config.vehicle.hitbox_margin,
            |v| v.is_finite() && *v >= 0.0,
            "must be >= 0",
        );
        env_override(
            "TURRET_HITBOX_MARGIN",
            &mut config.turret.hitbox_margin,
            |v| v.is_finite() && *v >= 0.0,
            "must be >= 0",
        );
        env_override("TURRET_RANGE", &mut config.turret.range, positive, "must be > 0");

        let mut respawn_seconds = config.turret.respawn_ticks / timing::TICK_RATE as f32;
        env_override(
            "TURRET_RESPAWN_SECONDS",
            &mut respawn_seconds,
            |v| v.is_finite() && *v >= 0.0 && *v <= 3600.0,
            "must be 0-3600",
        );
        config.turret.respawn_ticks = respawn_seconds * timing::TICK_RATE as f32;

        env_override(
            "TRAIL_CAP_PER_FRAME",
            &mut config.projectile.trail_cap_per_frame,
            |v| *v <= 256,
            "must be 0-256",
        );

        env_override("POOL_PARTICLES", &mut config.pools.particles, pool_capacity, "must be 1-65535");
        env_override("POOL_DEBRIS", &mut config.pools.debris, pool_capacity, "must be 1-65535");
        env_override("POOL_LIGHTS", &mut config.pools.lights, pool_capacity, "must be 1-65535");
        env_override(
            "POOL_SHOCKWAVES",
            &mut config.pools.shockwaves,
            pool_capacity,
            "must be 1-65535",
        );
        env_override("POOL_TRAILS", &mut config.pools.trails, pool_capacity, "must be 1-65535");
        env_override(
            "MAX_EFFECTS",
            &mut config.effects.max_effects,
            |v| (1..=4096).contains(v),
            "must be 1-4096",
        );
        env_override(
            "PICKUP_MAX_ACTIVE",
            &mut config.pickups.max_active,
            |v| *v <= 64,
            "must be 0-64",
        );

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let arena = &self.arena;
        if !positive(&arena.half_size) {
            return Err(ConfigError::NotPositive {
                name: "arena.half_size",
                value: arena.half_size,
            });
        }
        if !(arena.wall_thickness >= 0.0) {
            return Err(ConfigError::Negative {
                name: "arena.wall_thickness",
                value: arena.wall_thickness,
            });
        }
        if arena.half_size <= arena.wall_thickness {
            return Err(ConfigError::ArenaTooSmall {
                half_size: arena.half_size,
                wall_thickness: arena.wall_thickness,
            });
        }
        if !(arena.world_extent_limit > arena.half_size) {
            return Err(ConfigError::WorldExtentInsideArena {
                limit: arena.world_extent_limit,
                half_size: arena.half_size,
            });
        }

        for (name, value) in [
            ("vehicle.hitbox_margin", self.vehicle.hitbox_margin),
            ("turret.hitbox_margin", self.turret.hitbox_margin),
            ("turret.respawn_ticks", self.turret.respawn_ticks),
            ("turret.aim_deviation", self.turret.aim_deviation),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { name, value });
            }
        }

        for (name, value) in [
            ("vehicle.max_speed", self.vehicle.max_speed),
            ("projectile.player_speed", self.projectile.player_speed),
            ("turret.range", self.turret.range),
            ("turret.projectile_speed", self.turret.projectile_speed),
            ("effects.explosion_life", self.effects.explosion_life),
            ("effects.impact_life", self.effects.impact_life),
            ("effects.trail_life", self.effects.trail_life),
            ("effects.spark_life", self.effects.spark_life),
            ("pickups.spawn_interval", self.pickups.spawn_interval),
        ] {
            if !positive(&value) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        if !(self.turret.cooldown_min < self.turret.cooldown_max) || self.turret.cooldown_min < 0.0 {
            return Err(ConfigError::CooldownRange {
                min: self.turret.cooldown_min,
                max: self.turret.cooldown_max,
            });
        }

        for (pool, value) in [
            ("particles", self.pools.particles),
            ("debris", self.pools.debris),
            ("lights", self.pools.lights),
            ("shockwaves", self.pools.shockwaves),
            ("trails", self.pools.trails),
        ] {
            if !pool_capacity(&value) {
                return Err(ConfigError::PoolCapacity {
                    pool,
                    value,
                    max: pools::MAX_CAPACITY,
                });
            }
        }

        if self.effects.max_effects == 0 {
            return Err(ConfigError::ZeroCount {
                name: "effects.max_effects",
            });
        }
        if self.turret.max_health == 0 {
            return Err(ConfigError::ZeroCount {
                name: "turret.max_health",
            });
        }
        if self.vehicle.max_health == 0 {
            return Err(ConfigError::ZeroCount {
                name: "vehicle.max_health",
            });
        }
        Ok(())
    }
}
