//! Zero-guarded percentages and the deployment-rate fallback chain.

use serde::Serialize;

use crate::metrics::classification::{
    classify_rollout, ActionCounts, RolloutBucket, UpdateStatusCounts,
};
use crate::rollout::Rollout;

/// `round(part / whole * 100)`, or `None` when `whole` is zero.
///
/// The result is clamped to 100 so a part larger than its whole (which
/// only happens with inconsistent backend counters) cannot leave [0, 100].
pub fn percent(part: u64, whole: u64) -> Option<u8> {
    if whole == 0 {
        return None;
    }
    let pct = (part as f64 / whole as f64 * 100.0).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Deployment rate
// ---------------------------------------------------------------------------

/// Which tier of the fallback chain produced the deployment rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentRateSource {
    /// Target-weighted progress across ongoing rollouts.
    OngoingRollouts,
    /// Fleet-wide in-sync ratio.
    FleetInSync,
    /// Finished actions over all fetched actions.
    ActionCompletion,
    /// Nothing to base a rate on.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeploymentRate {
    pub value: Option<u8>,
    pub source: DeploymentRateSource,
}

/// Headline deployment rate.
///
/// The tiers are evaluated in this exact order:
/// 1. any ongoing rollout: sum of finished targets over sum of total
///    targets across all ongoing rollouts;
/// 2. any targets at all: fleet in-sync ratio;
/// 3. any actions: finished actions over all actions;
/// 4. otherwise absent.
pub fn deployment_rate(
    rollouts: &[Rollout],
    targets: &UpdateStatusCounts,
    actions: &ActionCounts,
) -> DeploymentRate {
    let ongoing: Vec<&Rollout> = rollouts
        .iter()
        .filter(|r| classify_rollout(r.status) == RolloutBucket::Ongoing)
        .collect();

    if !ongoing.is_empty() {
        let finished: u64 = ongoing.iter().map(|r| r.targets_per_status.finished).sum();
        let total: u64 = ongoing.iter().map(|r| r.total_targets).sum();
        return DeploymentRate {
            value: percent(finished, total),
            source: DeploymentRateSource::OngoingRollouts,
        };
    }

    if targets.total > 0 {
        return DeploymentRate {
            value: targets.in_sync_rate,
            source: DeploymentRateSource::FleetInSync,
        };
    }

    if actions.total > 0 {
        return DeploymentRate {
            value: percent(actions.success, actions.total),
            source: DeploymentRateSource::ActionCompletion,
        };
    }

    DeploymentRate {
        value: None,
        source: DeploymentRateSource::Unavailable,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
