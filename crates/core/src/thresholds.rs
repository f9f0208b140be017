//! Policy constants for metric derivation.
//!
//! Multipliers, thresholds, bucket counts and trailing windows all live
//! here so a policy change never touches derivation logic.

use chrono::Duration;
use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// A metric above `threshold * CRITICAL_MULTIPLIER` is critical.
pub const CRITICAL_MULTIPLIER: f64 = 1.5;

/// Length of every ranked list.
pub const TOP_N: usize = 5;

/// A target that polled within this many minutes counts as online.
pub const DEFAULT_ONLINE_FRESHNESS_MINUTES: i64 = 10;

/// An active action older than this is delayed.
pub const DEFAULT_DELAYED_AFTER_MINUTES: i64 = 10;

/// An active action older than this is stuck.
pub const DEFAULT_STUCK_AFTER_MINUTES: i64 = 30;

/// Warning threshold for the number of concurrently active actions.
pub const DEFAULT_ACTIVE_ACTIONS_WARNING: u64 = 30;

/// Warning threshold for the mean completion time of finished actions.
pub const DEFAULT_AVG_COMPLETION_WARNING_MINUTES: f64 = 15.0;

/// Trailing window for the current deployment velocity.
pub const VELOCITY_WINDOW: TrendWindow = TrendWindow {
    minutes: 5,
    buckets: 1,
};

/// Trailing hour split into six 10-minute slices.
pub const VELOCITY_TREND: TrendWindow = TrendWindow {
    minutes: 60,
    buckets: 6,
};

/// Action volume over the last day in two-hour buckets.
pub const ACTION_TREND: TrendWindow = TrendWindow {
    minutes: 24 * 60,
    buckets: 12,
};

/// Newly registered targets over the last week, one bucket per day.
pub const TARGET_TREND: TrendWindow = TrendWindow {
    minutes: 7 * 24 * 60,
    buckets: 7,
};

// ---------------------------------------------------------------------------
// TrendWindow
// ---------------------------------------------------------------------------

/// A trailing window of `minutes` split into `buckets` equal intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendWindow {
    pub minutes: i64,
    pub buckets: usize,
}

impl TrendWindow {
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes)
    }

    /// Length of one bucket in minutes.
    pub fn bucket_minutes(&self) -> f64 {
        self.minutes as f64 / self.buckets as f64
    }
}

/// Windows used by the trend and velocity derivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendConfig {
    pub velocity_window: TrendWindow,
    pub velocity_trend: TrendWindow,
    pub action_trend: TrendWindow,
    pub target_trend: TrendWindow,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            velocity_window: VELOCITY_WINDOW,
            velocity_trend: VELOCITY_TREND,
            action_trend: ACTION_TREND,
            target_trend: TARGET_TREND,
        }
    }
}

impl TrendConfig {
    fn windows(&self) -> [(&'static str, TrendWindow); 4] {
        [
            ("velocity_window", self.velocity_window),
            ("velocity_trend", self.velocity_trend),
            ("action_trend", self.action_trend),
            ("target_trend", self.target_trend),
        ]
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Configurable thresholds consumed by the metric derivers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thresholds {
    pub online_freshness_minutes: i64,
    pub delayed_after_minutes: i64,
    pub stuck_after_minutes: i64,
    pub active_actions_warning: u64,
    pub avg_completion_warning_minutes: f64,
    pub critical_multiplier: f64,
    pub top_n: usize,
    pub trends: TrendConfig,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            online_freshness_minutes: DEFAULT_ONLINE_FRESHNESS_MINUTES,
            delayed_after_minutes: DEFAULT_DELAYED_AFTER_MINUTES,
            stuck_after_minutes: DEFAULT_STUCK_AFTER_MINUTES,
            active_actions_warning: DEFAULT_ACTIVE_ACTIONS_WARNING,
            avg_completion_warning_minutes: DEFAULT_AVG_COMPLETION_WARNING_MINUTES,
            critical_multiplier: CRITICAL_MULTIPLIER,
            top_n: TOP_N,
            trends: TrendConfig::default(),
        }
    }
}

impl Thresholds {
    /// Reject configurations that would make classification meaningless.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.online_freshness_minutes <= 0 {
            return Err(CoreError::Validation(
                "online_freshness_minutes must be positive".to_string(),
            ));
        }
        if self.delayed_after_minutes <= 0 || self.stuck_after_minutes <= 0 {
            return Err(CoreError::Validation(
                "delay thresholds must be positive".to_string(),
            ));
        }
        if self.stuck_after_minutes < self.delayed_after_minutes {
            return Err(CoreError::Validation(format!(
                "stuck_after_minutes ({}) must not be below delayed_after_minutes ({})",
                self.stuck_after_minutes, self.delayed_after_minutes
            )));
        }
        if self.active_actions_warning == 0 {
            return Err(CoreError::Validation(
                "active_actions_warning must be positive".to_string(),
            ));
        }
        if self.avg_completion_warning_minutes.is_nan() || self.avg_completion_warning_minutes <= 0.0 {
            return Err(CoreError::Validation(
                "avg_completion_warning_minutes must be positive".to_string(),
            ));
        }
        if self.critical_multiplier.is_nan() || self.critical_multiplier < 1.0 {
            return Err(CoreError::Validation(
                "critical_multiplier must be at least 1.0".to_string(),
            ));
        }
        for (name, window) in self.trends.windows() {
            if window.minutes <= 0 || window.buckets == 0 {
                return Err(CoreError::Validation(format!(
                    "{name} needs a positive length and at least one bucket"
                )));
            }
        }
        Ok(())
    }

    pub fn online_freshness(&self) -> Duration {
        Duration::minutes(self.online_freshness_minutes)
    }
}
