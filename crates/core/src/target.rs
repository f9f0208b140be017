//! Managed devices ("targets") and their update status.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const UPDATE_STATUS_IN_SYNC: &str = "in_sync";
pub const UPDATE_STATUS_PENDING: &str = "pending";
pub const UPDATE_STATUS_ERROR: &str = "error";
pub const UPDATE_STATUS_REGISTERED: &str = "registered";
pub const UPDATE_STATUS_UNKNOWN: &str = "unknown";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Update status reported by the backend for a target.
///
/// Parsing is case-insensitive; anything unrecognised (including an empty
/// string) becomes [`UpdateStatus::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum UpdateStatus {
    InSync,
    Pending,
    Error,
    Registered,
    #[default]
    Unknown,
}

impl UpdateStatus {
    /// Parse a backend status string.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            UPDATE_STATUS_IN_SYNC => Self::InSync,
            UPDATE_STATUS_PENDING => Self::Pending,
            UPDATE_STATUS_ERROR => Self::Error,
            UPDATE_STATUS_REGISTERED => Self::Registered,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InSync => UPDATE_STATUS_IN_SYNC,
            Self::Pending => UPDATE_STATUS_PENDING,
            Self::Error => UPDATE_STATUS_ERROR,
            Self::Registered => UPDATE_STATUS_REGISTERED,
            Self::Unknown => UPDATE_STATUS_UNKNOWN,
        }
    }
}

impl From<String> for UpdateStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// A managed device under fleet control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Controller id; the identifier every relation reference points at.
    pub controller_id: String,
    pub name: String,
    /// When the device last polled the backend. `None` means it never has.
    pub last_poll_at: Option<Timestamp>,
    pub update_status: UpdateStatus,
    pub target_type_name: Option<String>,
    pub created_at: Option<Timestamp>,
    pub has_security_token: bool,
    /// Relation reference to the assigned distribution set, if any.
    pub assigned_distribution_set: Option<String>,
}

impl Target {
    /// Minimal stand-in for a target that is not in the fetched window.
    ///
    /// Identifier and display name are both `id`; nothing else is known.
    pub fn placeholder(id: impl Into<String>, update_status: UpdateStatus) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            controller_id: id,
            last_poll_at: None,
            update_status,
            target_type_name: None,
            created_at: None,
            has_security_token: false,
            assigned_distribution_set: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
