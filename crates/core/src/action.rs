//! Deployment actions: one operation applied to one target.
//!
//! Action and type strings come straight from the backend and are parsed
//! leniently. An unrecognised value becomes `Unknown` instead of failing
//! the whole page.

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Timestamp};

// ---------------------------------------------------------------------------
// ActionStatus
// ---------------------------------------------------------------------------

/// Detailed lifecycle status of an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ActionStatus {
    Pending,
    Scheduled,
    Running,
    Retrieving,
    Downloading,
    WaitForConfirmation,
    Canceling,
    Canceled,
    Finished,
    Error,
    #[default]
    Unknown,
}

impl ActionStatus {
    /// Parse a backend status string (case-insensitive).
    ///
    /// Every `cancel*` spelling the backend uses (`cancelled`,
    /// `canceled_rejected`, ...) collapses into [`ActionStatus::Canceled`],
    /// except the in-progress `canceling`/`cancelling`.
    pub fn parse(s: &str) -> Self {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Self::Pending,
            "scheduled" => Self::Scheduled,
            "running" => Self::Running,
            "retrieving" | "retrieved" => Self::Retrieving,
            "downloading" | "download" => Self::Downloading,
            "wait_for_confirmation" => Self::WaitForConfirmation,
            "canceling" | "cancelling" => Self::Canceling,
            "finished" => Self::Finished,
            "error" => Self::Error,
            other if other.starts_with("cancel") => Self::Canceled,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Retrieving => "retrieving",
            Self::Downloading => "downloading",
            Self::WaitForConfirmation => "wait_for_confirmation",
            Self::Canceling => "canceling",
            Self::Canceled => "canceled",
            Self::Finished => "finished",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the backend is still working on the action.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::Pending
                | Self::Scheduled
                | Self::Running
                | Self::Retrieving
                | Self::Downloading
                | Self::WaitForConfirmation
        )
    }

    /// `canceling` and every terminal cancel spelling.
    pub fn is_cancel(&self) -> bool {
        matches!(self, Self::Canceling | Self::Canceled)
    }
}

impl From<String> for ActionStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

/// Kind of deployment operation. `Cancel` marks an action that cancels a
/// previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ActionType {
    Update,
    Forced,
    Soft,
    TimeForced,
    DownloadOnly,
    Cancel,
    #[default]
    Unknown,
}

impl ActionType {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "update" => Self::Update,
            "forced" => Self::Forced,
            "soft" => Self::Soft,
            "timeforced" | "time_forced" => Self::TimeForced,
            "downloadonly" | "download_only" => Self::DownloadOnly,
            "cancel" => Self::Cancel,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Embedded relation references of an action.
///
/// The owning target is not carried as a foreign key; it has to be parsed
/// out of these hrefs (see [`crate::correlator::resolve_target_id`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLinks {
    pub self_href: Option<String>,
    pub target_href: Option<String>,
}

/// One deployment operation against one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: EntityId,
    pub status: ActionStatus,
    pub action_type: ActionType,
    pub created_at: Option<Timestamp>,
    pub last_modified_at: Option<Timestamp>,
    pub detail_status: Option<String>,
    pub last_status_code: Option<i32>,
    pub rollout_id: Option<EntityId>,
    pub links: ActionLinks,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
