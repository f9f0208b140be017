//! Per-rollout and per-group completion.

use serde::Serialize;

use crate::metrics::classification::{classify_rollout, RolloutBucket};
use crate::metrics::rates::percent;
use crate::rollout::{Rollout, RolloutGroup, RolloutGroupStatus, RolloutStatus, TargetCounts};
use crate::types::EntityId;

/// `round(finished / total * 100)`; a rollout without targets is at 0.
pub fn progress_percent(counts: &TargetCounts, total: u64) -> u8 {
    percent(counts.finished, total).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolloutProgress {
    pub rollout_id: EntityId,
    pub name: String,
    pub status: RolloutStatus,
    pub bucket: RolloutBucket,
    pub finished_targets: u64,
    pub error_targets: u64,
    pub total_targets: u64,
    pub percent: u8,
}

impl RolloutProgress {
    pub fn of(rollout: &Rollout) -> Self {
        Self {
            rollout_id: rollout.id,
            name: rollout.name.clone(),
            status: rollout.status,
            bucket: classify_rollout(rollout.status),
            finished_targets: rollout.targets_per_status.finished,
            error_targets: rollout.targets_per_status.error,
            total_targets: rollout.total_targets,
            percent: progress_percent(&rollout.targets_per_status, rollout.total_targets),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupProgress {
    pub group_id: EntityId,
    pub name: String,
    pub status: RolloutGroupStatus,
    pub total_targets: u64,
    pub percent: u8,
}

impl GroupProgress {
    pub fn of(group: &RolloutGroup) -> Self {
        Self {
            group_id: group.id,
            name: group.name.clone(),
            status: group.status,
            total_targets: group.total_targets,
            percent: progress_percent(&group.targets_per_status, group.total_targets),
        }
    }
}

/// Progress of every rollout in snapshot order.
pub fn rollout_progress(rollouts: &[Rollout]) -> Vec<RolloutProgress> {
    rollouts.iter().map(RolloutProgress::of).collect()
}
