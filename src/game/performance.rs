//! Frame budget monitoring and adaptive visual fidelity
//!
//! Tracks tick durations against the 60 Hz frame budget and provides signals for:
//! - Trail density (per-frame trail cap shrinks as the budget tightens)
//! - Debris (destruction debris is skipped when performance is critical)

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::game::constants::timing::TICK_RATE;

/// Performance status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceStatus {
    /// Plenty of headroom
    Excellent,
    /// Normal operation
    Good,
    /// Budget is getting tight, thin out cosmetics
    Warning,
    /// At or over budget, cosmetics off
    Critical,
    /// Sustained overload
    Catastrophic,
}

impl PerformanceStatus {
    /// Scale the configured per-frame trail cap
    pub fn trail_cap(&self, base: usize) -> usize {
        match self {
            PerformanceStatus::Excellent | PerformanceStatus::Good => base,
            PerformanceStatus::Warning => base / 2,
            PerformanceStatus::Critical | PerformanceStatus::Catastrophic => 0,
        }
    }

    /// Should destruction effects carry debris?
    pub fn debris_enabled(&self) -> bool {
        matches!(
            self,
            PerformanceStatus::Excellent | PerformanceStatus::Good | PerformanceStatus::Warning
        )
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            PerformanceStatus::Excellent => 0,
            PerformanceStatus::Good => 1,
            PerformanceStatus::Warning => 2,
            PerformanceStatus::Critical => 3,
            PerformanceStatus::Catastrophic => 4,
        }
    }
}

/// Performance monitor that tracks tick durations
pub struct PerformanceMonitor {
    /// Rolling window of tick durations
    tick_durations: VecDeque<Duration>,
    max_samples: usize,
    /// Target tick duration (budget)
    target_tick_duration: Duration,
    /// Thresholds as fractions of the budget
    excellent_threshold: f32,
    warning_threshold: f32,
    critical_threshold: f32,
    catastrophic_threshold: f32,
    status: PerformanceStatus,
    tick_start: Option<Instant>,
    /// Active effect records at last measurement
    last_effect_count: usize,
}

impl PerformanceMonitor {
    pub fn new(tick_rate: u32) -> Self {
        let target_tick_duration = Duration::from_secs_f32(1.0 / tick_rate.max(1) as f32);

        Self {
            tick_durations: VecDeque::with_capacity(120), // ~2 seconds at 60Hz
            max_samples: 120,
            target_tick_duration,
            excellent_threshold: 0.3,
            warning_threshold: 0.7,
            critical_threshold: 0.9,
            catastrophic_threshold: 1.5,
            status: PerformanceStatus::Excellent,
            tick_start: None,
            last_effect_count: 0,
        }
    }

    /// Start timing a tick
    pub fn tick_start(&mut self) {
        self.tick_start = Some(Instant::now());
    }

    /// End timing a tick, record the duration and return it
    pub fn tick_end(&mut self, effect_count: usize) -> Option<Duration> {
        let start = self.tick_start.take()?;
        let duration = start.elapsed();
        self.record_tick(duration);
        self.last_effect_count = effect_count;
        Some(duration)
    }

    /// Record a tick duration
    pub fn record_tick(&mut self, duration: Duration) {
        self.tick_durations.push_back(duration);
        while self.tick_durations.len() > self.max_samples {
            self.tick_durations.pop_front();
        }
        self.update_status();
    }

    fn update_status(&mut self) {
        if self.tick_durations.len() < 10 {
            // Not enough data yet
            return;
        }

        let ratio = self.budget_usage_percent() / 100.0;

        let status = if ratio < self.excellent_threshold {
            PerformanceStatus::Excellent
        } else if ratio < self.warning_threshold {
            PerformanceStatus::Good
        } else if ratio < self.critical_threshold {
            PerformanceStatus::Warning
        } else if ratio < self.catastrophic_threshold {
            PerformanceStatus::Critical
        } else {
            PerformanceStatus::Catastrophic
        };

        if status != self.status {
            tracing::debug!("Frame budget status {:?} -> {:?}", self.status, status);
        }
        self.status = status;
    }

    pub fn average_tick_duration(&self) -> Duration {
        if self.tick_durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.tick_durations.iter().sum();
        sum / self.tick_durations.len() as u32
    }

    /// Get the 95th percentile tick duration
    pub fn p95_tick_duration(&self) -> Duration {
        if self.tick_durations.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted: Vec<_> = self.tick_durations.iter().copied().collect();
        sorted.sort();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted.get(idx.min(sorted.len() - 1)).copied().unwrap_or(Duration::ZERO)
    }

    pub fn status(&self) -> PerformanceStatus {
        self.status
    }

    /// Get budget usage as percentage (0-100+)
    pub fn budget_usage_percent(&self) -> f32 {
        let avg = self.average_tick_duration();
        (avg.as_secs_f32() / self.target_tick_duration.as_secs_f32()) * 100.0
    }

    pub fn last_effect_count(&self) -> usize {
        self.last_effect_count
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.1}% budget, {} effects",
            self.status,
            self.budget_usage_percent(),
            self.last_effect_count
        )
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(TICK_RATE)
    }
}
