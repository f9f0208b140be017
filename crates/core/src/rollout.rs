//! Rollout campaigns and their ordered groups.

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// RolloutStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum RolloutStatus {
    Creating,
    Ready,
    Starting,
    Running,
    Paused,
    WaitingForApproval,
    ApprovalDenied,
    Scheduled,
    Finished,
    Error,
    Stopped,
    Deleting,
    Deleted,
    #[default]
    Unknown,
}

impl RolloutStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "creating" => Self::Creating,
            "ready" => Self::Ready,
            "starting" => Self::Starting,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "waiting_for_approval" => Self::WaitingForApproval,
            "approval_denied" => Self::ApprovalDenied,
            "scheduled" => Self::Scheduled,
            "finished" => Self::Finished,
            "error" | "error_creating" | "error_starting" => Self::Error,
            "stopped" => Self::Stopped,
            "deleting" => Self::Deleting,
            "deleted" => Self::Deleted,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for RolloutStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

// ---------------------------------------------------------------------------
// RolloutGroupStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum RolloutGroupStatus {
    Creating,
    Ready,
    Scheduled,
    Running,
    Finished,
    Error,
    #[default]
    Unknown,
}

impl RolloutGroupStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "creating" => Self::Creating,
            "ready" => Self::Ready,
            "scheduled" => Self::Scheduled,
            "running" => Self::Running,
            "finished" => Self::Finished,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for RolloutGroupStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

// ---------------------------------------------------------------------------
// Target counts
// ---------------------------------------------------------------------------

/// Per-status target-count breakdown of a rollout or rollout group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCounts {
    pub running: u64,
    pub not_started: u64,
    pub scheduled: u64,
    pub canceled: u64,
    pub finished: u64,
    pub error: u64,
}

// ---------------------------------------------------------------------------
// Rollout / RolloutGroup
// ---------------------------------------------------------------------------

/// A campaign distributing one distribution set across a filtered set of
/// targets, organised into ordered groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollout {
    pub id: EntityId,
    pub name: String,
    pub status: RolloutStatus,
    pub total_targets: u64,
    pub targets_per_status: TargetCounts,
    pub total_groups: u32,
    pub created_at: Option<Timestamp>,
    pub distribution_set_id: Option<EntityId>,
}

impl Rollout {
    /// Stand-in for a rollout that is not in the fetched window.
    pub fn placeholder(id: EntityId) -> Self {
        Self {
            id,
            name: format!("rollout-{id}"),
            status: RolloutStatus::Unknown,
            total_targets: 0,
            targets_per_status: TargetCounts::default(),
            total_groups: 0,
            created_at: None,
            distribution_set_id: None,
        }
    }
}

/// A subdivision of a rollout's targets with its own status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutGroup {
    pub id: EntityId,
    /// Parent rollout, attached by whoever fetched the group.
    pub rollout_id: EntityId,
    pub name: String,
    pub status: RolloutGroupStatus,
    pub total_targets: u64,
    pub targets_per_status: TargetCounts,
}
