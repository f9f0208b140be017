//! Deployment velocity: finished actions per minute.

use serde::Serialize;

use crate::action::Action;
use crate::clock::StableClock;
use crate::error::CoreError;
use crate::metrics::buckets::{Tally, TimeBuckets};
use crate::metrics::classification::{classify_action, ActionOutcome};
use crate::metrics::rates::round1;
use crate::thresholds::TrendWindow;
use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocityPoint {
    pub start: Timestamp,
    pub end: Timestamp,
    pub count: u64,
    pub per_minute: f64,
}

fn completed_at(action: &Action) -> Option<Timestamp> {
    (classify_action(action) == ActionOutcome::Success)
        .then_some(action.last_modified_at)
        .flatten()
}

/// Finished actions whose last modification falls in the trailing
/// `window`, per minute, rounded to one decimal.
pub fn current_velocity(
    actions: &[Action],
    clock: &StableClock,
    window: TrendWindow,
) -> Result<f64, CoreError> {
    let buckets = TimeBuckets::trailing(clock, TrendWindow { buckets: 1, ..window })?;
    let completed = actions
        .iter()
        .filter_map(completed_at)
        .filter(|ts| buckets.index_of(*ts).is_some())
        .count();
    Ok(round1(completed as f64 / window.minutes as f64))
}

/// Completions per sub-interval of the trailing `window`.
pub fn velocity_trend(
    actions: &[Action],
    clock: &StableClock,
    window: TrendWindow,
) -> Result<Vec<VelocityPoint>, CoreError> {
    let buckets = TimeBuckets::trailing(clock, window)?;
    let minutes = window.bucket_minutes();
    let series = buckets.series(actions, completed_at, |_| Tally::Finished);
    Ok(series
        .into_iter()
        .map(|b| VelocityPoint {
            start: b.start,
            end: b.end,
            count: b.total,
            per_minute: round1(b.total as f64 / minutes),
        })
        .collect())
}
