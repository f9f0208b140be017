//! Bucketing of targets, actions and rollouts into display categories.
//!
//! Statuses are driven by the backend; nothing here transitions state, it
//! only classifies what was observed.

use chrono::Duration;
use serde::Serialize;

use crate::action::{Action, ActionStatus, ActionType};
use crate::clock::StableClock;
use crate::metrics::rates::percent;
use crate::rollout::{Rollout, RolloutStatus};
use crate::target::{Target, UpdateStatus};
use crate::thresholds::DEFAULT_ONLINE_FRESHNESS_MINUTES;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Online,
    Offline,
    NeverConnected,
}

/// Decides whether a target that has polled at least once is online.
pub trait OnlinePolicy: Send + Sync {
    fn is_online(&self, last_poll_at: Timestamp, clock: &StableClock) -> bool;
}

/// Online when the last poll happened within `window` of now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    pub window: Duration,
}

impl FreshnessWindow {
    pub fn minutes(minutes: i64) -> Self {
        Self {
            window: Duration::minutes(minutes),
        }
    }
}

impl Default for FreshnessWindow {
    fn default() -> Self {
        Self::minutes(DEFAULT_ONLINE_FRESHNESS_MINUTES)
    }
}

impl OnlinePolicy for FreshnessWindow {
    fn is_online(&self, last_poll_at: Timestamp, clock: &StableClock) -> bool {
        clock.elapsed_since(last_poll_at) <= self.window
    }
}

pub fn classify_connectivity(
    target: &Target,
    policy: &dyn OnlinePolicy,
    clock: &StableClock,
) -> Connectivity {
    match target.last_poll_at {
        None => Connectivity::NeverConnected,
        Some(ts) if policy.is_online(ts, clock) => Connectivity::Online,
        Some(_) => Connectivity::Offline,
    }
}

/// Connectivity partition of the target page. The three counts always sum
/// to `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectivityCounts {
    pub online: u64,
    pub offline: u64,
    pub never_connected: u64,
    pub total: u64,
    pub online_rate: Option<u8>,
}

impl ConnectivityCounts {
    pub fn tally(targets: &[Target], policy: &dyn OnlinePolicy, clock: &StableClock) -> Self {
        let mut counts = Self::default();
        for target in targets {
            match classify_connectivity(target, policy, clock) {
                Connectivity::Online => counts.online += 1,
                Connectivity::Offline => counts.offline += 1,
                Connectivity::NeverConnected => counts.never_connected += 1,
            }
        }
        counts.total = targets.len() as u64;
        counts.online_rate = percent(counts.online, counts.total);
        counts
    }
}

// ---------------------------------------------------------------------------
// Update status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStatusCounts {
    pub in_sync: u64,
    pub pending: u64,
    pub error: u64,
    pub registered: u64,
    pub unknown: u64,
    pub total: u64,
    pub in_sync_rate: Option<u8>,
    pub error_rate: Option<u8>,
}

impl UpdateStatusCounts {
    pub fn tally(targets: &[Target]) -> Self {
        let mut counts = Self::default();
        for target in targets {
            match target.update_status {
                UpdateStatus::InSync => counts.in_sync += 1,
                UpdateStatus::Pending => counts.pending += 1,
                UpdateStatus::Error => counts.error += 1,
                UpdateStatus::Registered => counts.registered += 1,
                UpdateStatus::Unknown => counts.unknown += 1,
            }
        }
        counts.total = targets.len() as u64;
        counts.in_sync_rate = percent(counts.in_sync, counts.total);
        counts.error_rate = percent(counts.error, counts.total);
        counts
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Active,
    Success,
    Error,
    Canceled,
    Unknown,
}

/// Bucket an action by outcome.
///
/// A cancel-type action, or any cancel status, is `Canceled` regardless of
/// its nominal status.
pub fn classify_action(action: &Action) -> ActionOutcome {
    if action.action_type == ActionType::Cancel || action.status.is_cancel() {
        return ActionOutcome::Canceled;
    }
    match action.status {
        ActionStatus::Finished => ActionOutcome::Success,
        ActionStatus::Error => ActionOutcome::Error,
        s if s.is_in_progress() => ActionOutcome::Active,
        _ => ActionOutcome::Unknown,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    pub active: u64,
    pub success: u64,
    pub error: u64,
    pub canceled: u64,
    pub unknown: u64,
    pub total: u64,
    /// `success / (success + error)`; absent when no action has settled.
    pub success_rate: Option<u8>,
    /// `error / total`.
    pub error_rate: Option<u8>,
}

impl ActionCounts {
    pub fn tally(actions: &[Action]) -> Self {
        let mut counts = Self::default();
        for action in actions {
            match classify_action(action) {
                ActionOutcome::Active => counts.active += 1,
                ActionOutcome::Success => counts.success += 1,
                ActionOutcome::Error => counts.error += 1,
                ActionOutcome::Canceled => counts.canceled += 1,
                ActionOutcome::Unknown => counts.unknown += 1,
            }
        }
        counts.total = actions.len() as u64;
        counts.success_rate = percent(counts.success, counts.success + counts.error);
        counts.error_rate = percent(counts.error, counts.total);
        counts
    }
}

// ---------------------------------------------------------------------------
// Rollouts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutBucket {
    Ongoing,
    Pending,
    Finished,
    Errored,
    Unknown,
}

pub fn classify_rollout(status: RolloutStatus) -> RolloutBucket {
    match status {
        RolloutStatus::Running
        | RolloutStatus::Paused
        | RolloutStatus::Starting
        | RolloutStatus::WaitingForApproval => RolloutBucket::Ongoing,
        RolloutStatus::Creating | RolloutStatus::Ready | RolloutStatus::Scheduled => {
            RolloutBucket::Pending
        }
        RolloutStatus::Finished | RolloutStatus::Deleting | RolloutStatus::Deleted => {
            RolloutBucket::Finished
        }
        RolloutStatus::Error | RolloutStatus::Stopped | RolloutStatus::ApprovalDenied => {
            RolloutBucket::Errored
        }
        RolloutStatus::Unknown => RolloutBucket::Unknown,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RolloutCounts {
    pub ongoing: u64,
    pub pending: u64,
    pub finished: u64,
    pub errored: u64,
    pub unknown: u64,
    pub total: u64,
    /// `finished / (finished + errored)` over rollouts.
    pub success_rate: Option<u8>,
}

impl RolloutCounts {
    pub fn tally(rollouts: &[Rollout]) -> Self {
        let mut counts = Self::default();
        for rollout in rollouts {
            match classify_rollout(rollout.status) {
                RolloutBucket::Ongoing => counts.ongoing += 1,
                RolloutBucket::Pending => counts.pending += 1,
                RolloutBucket::Finished => counts.finished += 1,
                RolloutBucket::Errored => counts.errored += 1,
                RolloutBucket::Unknown => counts.unknown += 1,
            }
        }
        counts.total = rollouts.len() as u64;
        counts.success_rate = percent(counts.finished, counts.finished + counts.errored);
        counts
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
