//! Simulation counters with a Prometheus-compatible text rendering
//!
//! Everything runs on the tick thread, so the counters are plain integers.
//! The host decides where the text exposition goes.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

use crate::game::pool::PoolId;

/// Rolling window used for tick percentiles
const TICK_HISTORY: usize = 1000;

/// Metrics registry for one simulation
#[derive(Debug, Clone, Serialize)]
pub struct SimMetrics {
    // Tick timing (microseconds)
    pub tick_count: u64,
    pub tick_time_us: u64,
    pub tick_time_p95_us: u64,
    pub tick_time_p99_us: u64,
    pub tick_time_max_us: u64,

    // Performance status (0=Excellent .. 4=Catastrophic)
    pub performance_status: u8,
    pub budget_usage_percent: u64,

    // Projectiles
    pub projectiles_active: u64,
    pub projectiles_fired: u64,
    pub projectiles_removed: u64,
    pub projectiles_rejected: u64,
    pub projectile_faults: u64,
    pub projectile_resets: u64,
    pub trails_spawned: u64,
    pub trails_suppressed: u64,

    // Pools, indexed by PoolId
    pub pool_in_use: [u64; PoolId::COUNT],
    pub pool_reclaims: [u64; PoolId::COUNT],

    // Effects
    pub effects_active: u64,
    pub effects_spawned: u64,
    pub effects_evicted: u64,

    // Gameplay
    pub turrets_destroyed: u64,
    pub turrets_respawned: u64,
    pub pickups_collected: u64,
    pub player_hits: u64,

    // Inbound queue
    pub inbound_events: u64,
    pub inbound_rejected: u64,

    pub hud_publishes: u64,

    #[serde(skip)]
    tick_history: VecDeque<u64>,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            tick_time_us: 0,
            tick_time_p95_us: 0,
            tick_time_p99_us: 0,
            tick_time_max_us: 0,
            performance_status: 0,
            budget_usage_percent: 0,
            projectiles_active: 0,
            projectiles_fired: 0,
            projectiles_removed: 0,
            projectiles_rejected: 0,
            projectile_faults: 0,
            projectile_resets: 0,
            trails_spawned: 0,
            trails_suppressed: 0,
            pool_in_use: [0; PoolId::COUNT],
            pool_reclaims: [0; PoolId::COUNT],
            effects_active: 0,
            effects_spawned: 0,
            effects_evicted: 0,
            turrets_destroyed: 0,
            turrets_respawned: 0,
            pickups_collected: 0,
            player_hits: 0,
            inbound_events: 0,
            inbound_rejected: 0,
            hud_publishes: 0,
            tick_history: VecDeque::with_capacity(TICK_HISTORY),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&mut self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us = us;
        self.tick_count += 1;

        self.tick_history.push_back(us);
        while self.tick_history.len() > TICK_HISTORY {
            self.tick_history.pop_front();
        }

        if self.tick_history.len() >= 10 {
            let mut sorted: Vec<u64> = self.tick_history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us = sorted[p95_idx.min(sorted.len() - 1)];
            self.tick_time_p99_us = sorted[p99_idx.min(sorted.len() - 1)];
            self.tick_time_max_us = sorted.last().copied().unwrap_or(0);
        }
    }

    pub fn total_reclaims(&self) -> u64 {
        self.pool_reclaims.iter().sum()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        // Timing
        metric!("neon_arena_tick_count", "Total ticks processed", "counter", self.tick_count);
        metric!("neon_arena_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us);
        metric!("neon_arena_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us);
        metric!("neon_arena_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us);
        metric!("neon_arena_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us);
        metric!("neon_arena_performance_status", "Performance status (0=Excellent, 4=Catastrophic)", "gauge",
            self.performance_status);
        metric!("neon_arena_budget_usage_percent", "Frame budget usage percentage", "gauge",
            self.budget_usage_percent);

        // Projectiles
        metric!("neon_arena_projectiles", "Number of live projectiles", "gauge", self.projectiles_active);
        metric!("neon_arena_projectiles_fired_total", "Projectiles fired", "counter", self.projectiles_fired);
        metric!("neon_arena_projectiles_removed_total", "Projectiles removed", "counter",
            self.projectiles_removed);
        metric!("neon_arena_projectiles_rejected_total", "Malformed fire requests dropped", "counter",
            self.projectiles_rejected);
        metric!("neon_arena_projectile_faults_total", "Projectiles removed after a processing fault", "counter",
            self.projectile_faults);
        metric!("neon_arena_projectile_resets_total", "Projectile list cleared after a panic", "counter",
            self.projectile_resets);
        metric!("neon_arena_trails_total", "Trail particles spawned", "counter", self.trails_spawned);
        metric!("neon_arena_trails_suppressed_total", "Trail particles skipped by the frame cap", "counter",
            self.trails_suppressed);

        // Pools, one labelled series per pool
        output.push_str("# HELP neon_arena_pool_in_use Pool slots currently in use\n# TYPE neon_arena_pool_in_use gauge\n");
        for pool in PoolId::ALL {
            output.push_str(&format!(
                "neon_arena_pool_in_use{{pool=\"{}\"}} {}\n",
                pool.name(),
                self.pool_in_use[pool.index()]
            ));
        }
        output.push_str("# HELP neon_arena_pool_reclaims_total Slots forcibly reclaimed from live effects\n# TYPE neon_arena_pool_reclaims_total counter\n");
        for pool in PoolId::ALL {
            output.push_str(&format!(
                "neon_arena_pool_reclaims_total{{pool=\"{}\"}} {}\n",
                pool.name(),
                self.pool_reclaims[pool.index()]
            ));
        }

        // Effects
        metric!("neon_arena_effects", "Active effect records", "gauge", self.effects_active);
        metric!("neon_arena_effects_spawned_total", "Effect records created", "counter", self.effects_spawned);
        metric!("neon_arena_effects_evicted_total", "Effect records retired early", "counter",
            self.effects_evicted);

        // Gameplay
        metric!("neon_arena_turrets_destroyed_total", "Turrets destroyed", "counter", self.turrets_destroyed);
        metric!("neon_arena_turrets_respawned_total", "Turrets respawned", "counter", self.turrets_respawned);
        metric!("neon_arena_pickups_collected_total", "Power-ups collected", "counter", self.pickups_collected);
        metric!("neon_arena_player_hits_total", "Hits taken by the local vehicle", "counter", self.player_hits);
        metric!("neon_arena_inbound_events_total", "Inbound network events applied", "counter",
            self.inbound_events);
        metric!("neon_arena_inbound_rejected_total", "Inbound network events rejected", "counter",
            self.inbound_rejected);
        metric!("neon_arena_hud_publishes_total", "HUD snapshots published", "counter", self.hud_publishes);

        output
    }

    /// JSON rendering of the same counters
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl Default for SimMetrics {
    fn default() -> Self {
        Self::new()
    }
}
