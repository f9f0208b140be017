//! Delay levels of active actions and the overall bottleneck status.

use chrono::Duration;
use serde::Serialize;

use crate::action::Action;
use crate::clock::StableClock;
use crate::correlator::CorrelatedAction;
use crate::metrics::classification::{classify_action, ActionOutcome};
use crate::metrics::rates::round1;
use crate::metrics::ranking::top_n_by;
use crate::thresholds::Thresholds;
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

/// `Critical` above `threshold * multiplier`, `Warning` above `threshold`.
pub fn evaluate_severity(value: f64, threshold: f64, multiplier: f64) -> Severity {
    if value > threshold * multiplier {
        Severity::Critical
    } else if value > threshold {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

// ---------------------------------------------------------------------------
// Delay levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayLevel {
    OnTime,
    Delayed,
    Stuck,
}

pub fn delay_level(elapsed: Duration, thresholds: &Thresholds) -> DelayLevel {
    if elapsed >= Duration::minutes(thresholds.stuck_after_minutes) {
        DelayLevel::Stuck
    } else if elapsed >= Duration::minutes(thresholds.delayed_after_minutes) {
        DelayLevel::Delayed
    } else {
        DelayLevel::OnTime
    }
}

/// An active action with how long it has been running.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayedAction {
    pub action_id: EntityId,
    pub target_id: String,
    pub target_name: String,
    pub status: &'static str,
    pub elapsed_minutes: i64,
    pub level: DelayLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DelayCounts {
    pub on_time: u64,
    pub delayed: u64,
    pub stuck: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayReport {
    pub counts: DelayCounts,
    /// Longest-running active actions, longest first.
    pub longest: Vec<DelayedAction>,
}

/// Classify every active action by age.
///
/// Actions without a creation timestamp cannot be aged and are left out.
pub fn delay_report(
    actions: &[CorrelatedAction],
    clock: &StableClock,
    thresholds: &Thresholds,
) -> DelayReport {
    let mut counts = DelayCounts::default();
    let mut active = Vec::new();

    for c in actions {
        if classify_action(&c.action) != ActionOutcome::Active {
            continue;
        }
        let Some(created_at) = c.action.created_at else {
            continue;
        };
        let elapsed = clock.elapsed_since(created_at);
        let level = delay_level(elapsed, thresholds);
        match level {
            DelayLevel::OnTime => counts.on_time += 1,
            DelayLevel::Delayed => counts.delayed += 1,
            DelayLevel::Stuck => counts.stuck += 1,
        }
        active.push((
            elapsed,
            DelayedAction {
                action_id: c.action.id,
                target_id: c.target.controller_id.clone(),
                target_name: c.target.name.clone(),
                status: c.action.status.as_str(),
                elapsed_minutes: elapsed.num_minutes(),
                level,
            },
        ));
    }

    let longest = top_n_by(active, thresholds.top_n, |(elapsed, _)| *elapsed)
        .into_iter()
        .map(|(_, d)| d)
        .collect();

    DelayReport { counts, longest }
}

// ---------------------------------------------------------------------------
// Bottleneck
// ---------------------------------------------------------------------------

/// Mean minutes from creation to last modification over finished actions.
///
/// `None` when no finished action carries both timestamps.
pub fn mean_completion_minutes(actions: &[Action]) -> Option<f64> {
    let durations: Vec<f64> = actions
        .iter()
        .filter(|a| classify_action(a) == ActionOutcome::Success)
        .filter_map(|a| match (a.created_at, a.last_modified_at) {
            (Some(created), Some(modified)) if modified >= created => {
                Some((modified - created).num_milliseconds() as f64 / 60_000.0)
            }
            _ => None,
        })
        .collect();

    if durations.is_empty() {
        return None;
    }
    Some(durations.iter().sum::<f64>() / durations.len() as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BottleneckReport {
    pub active_actions: u64,
    pub active_actions_status: Severity,
    pub avg_completion_minutes: Option<f64>,
    pub avg_completion_status: Severity,
    /// The worse of the two.
    pub status: Severity,
}

pub fn bottleneck(active_actions: u64, actions: &[Action], thresholds: &Thresholds) -> BottleneckReport {
    let avg = mean_completion_minutes(actions);

    let active_actions_status = evaluate_severity(
        active_actions as f64,
        thresholds.active_actions_warning as f64,
        thresholds.critical_multiplier,
    );
    let avg_completion_status = match avg {
        Some(minutes) => evaluate_severity(
            minutes,
            thresholds.avg_completion_warning_minutes,
            thresholds.critical_multiplier,
        ),
        None => Severity::Normal,
    };

    BottleneckReport {
        active_actions,
        active_actions_status,
        avg_completion_minutes: avg.map(round1),
        avg_completion_status,
        status: active_actions_status.max(avg_completion_status),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
