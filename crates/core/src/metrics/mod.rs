//! The derivation pass: one merged snapshot plus one stable clock in, one
//! immutable set of dashboard metrics out.
//!
//! Every function below is pure. Calling [`derive`] twice with the same
//! snapshot and clock yields equal output.

pub mod bottleneck;
pub mod buckets;
pub mod classification;
pub mod inventory;
pub mod progress;
pub mod ranking;
pub mod rates;
pub mod velocity;

use serde::Serialize;

use crate::clock::StableClock;
use crate::correlator::{correlate_actions, CorrelatedAction};
use crate::error::CoreError;
use crate::snapshot::ResourceSnapshot;
use crate::target::UpdateStatus;
use crate::thresholds::Thresholds;

use self::bottleneck::{bottleneck, delay_report, BottleneckReport, DelayReport};
use self::buckets::{BucketCount, Tally, TimeBuckets};
use self::classification::{
    classify_action, ActionCounts, ActionOutcome, ConnectivityCounts, OnlinePolicy,
    RolloutCounts, UpdateStatusCounts,
};
use self::inventory::{catalog_summary, CatalogSummary};
use self::progress::{rollout_progress, RolloutProgress};
use self::ranking::{
    most_recent, rollouts_with_most_errors, targets_with_most_errors, PackageSummary,
    RolloutErrorCount, TargetErrorCount,
};
use self::rates::{deployment_rate, DeploymentRate};
use self::velocity::{current_velocity, velocity_trend, VelocityPoint};

/// Every named metric the dashboard displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub connectivity: ConnectivityCounts,
    pub update_status: UpdateStatusCounts,
    pub actions: ActionCounts,
    pub rollouts: RolloutCounts,
    pub deployment_rate: DeploymentRate,
    pub delays: DelayReport,
    pub bottleneck: BottleneckReport,
    /// Finished actions per minute over the velocity window.
    pub current_velocity: f64,
    pub velocity_trend: Vec<VelocityPoint>,
    /// Actions by creation time: total, finished, error.
    pub action_trend: Vec<BucketCount>,
    /// Targets by registration time: total, in sync, error.
    pub target_trend: Vec<BucketCount>,
    pub rollout_progress: Vec<RolloutProgress>,
    pub top_error_targets: Vec<TargetErrorCount>,
    pub top_error_rollouts: Vec<RolloutErrorCount>,
    pub recent_distribution_sets: Vec<PackageSummary>,
    pub recent_software_modules: Vec<PackageSummary>,
    pub catalog: CatalogSummary,
}

/// Output of one derivation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedSnapshot {
    /// The single "now" every metric below was computed against.
    pub observed_at: StableClock,
    pub correlated_actions: Vec<CorrelatedAction>,
    pub metrics: DashboardMetrics,
}

fn action_tally(outcome: ActionOutcome) -> Tally {
    match outcome {
        ActionOutcome::Success => Tally::Finished,
        ActionOutcome::Error => Tally::Error,
        _ => Tally::Other,
    }
}

/// Run every deriver over `snapshot` at `clock`.
///
/// Fails only when `thresholds` describe an empty trend window.
pub fn derive(
    snapshot: &ResourceSnapshot,
    clock: StableClock,
    thresholds: &Thresholds,
    online: &dyn OnlinePolicy,
) -> Result<DerivedSnapshot, CoreError> {
    let targets = snapshot.targets.as_slice();
    let actions = snapshot.actions.as_slice();
    let rollouts = snapshot.rollouts.as_slice();
    let distribution_sets = snapshot.distribution_sets.as_slice();
    let software_modules = snapshot.software_modules.as_slice();
    let trends = &thresholds.trends;

    let correlated = correlate_actions(actions, targets);

    let connectivity = ConnectivityCounts::tally(targets, online, &clock);
    let update_status = UpdateStatusCounts::tally(targets);
    let action_counts = ActionCounts::tally(actions);
    let rollout_counts = RolloutCounts::tally(rollouts);

    let action_trend = TimeBuckets::trailing(&clock, trends.action_trend)?.series(
        actions,
        |a| a.created_at,
        |a| action_tally(classify_action(a)),
    );
    let target_trend = TimeBuckets::trailing(&clock, trends.target_trend)?.series(
        targets,
        |t| t.created_at,
        |t| match t.update_status {
            UpdateStatus::InSync => Tally::Finished,
            UpdateStatus::Error => Tally::Error,
            _ => Tally::Other,
        },
    );

    let metrics = DashboardMetrics {
        connectivity,
        update_status,
        actions: action_counts,
        rollouts: rollout_counts,
        deployment_rate: deployment_rate(rollouts, &update_status, &action_counts),
        delays: delay_report(&correlated, &clock, thresholds),
        bottleneck: bottleneck(action_counts.active, actions, thresholds),
        current_velocity: current_velocity(actions, &clock, trends.velocity_window)?,
        velocity_trend: velocity_trend(actions, &clock, trends.velocity_trend)?,
        action_trend,
        target_trend,
        rollout_progress: rollout_progress(rollouts),
        top_error_targets: targets_with_most_errors(&correlated, thresholds.top_n),
        top_error_rollouts: rollouts_with_most_errors(rollouts, thresholds.top_n),
        recent_distribution_sets: most_recent(distribution_sets, thresholds.top_n),
        recent_software_modules: most_recent(software_modules, thresholds.top_n),
        catalog: catalog_summary(
            snapshot.target_types.as_slice(),
            distribution_sets,
            software_modules,
            targets,
        ),
    };

    Ok(DerivedSnapshot {
        observed_at: clock,
        correlated_actions: correlated,
        metrics,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
