//! Cross-resource joins.
//!
//! Actions reference their owning target only through embedded hrefs, and
//! the owning target may sit outside the fetched page. Rollout groups carry
//! an explicit parent id, but the parent may likewise be missing. Both
//! joins fall back to placeholder entities so the derivation layer never
//! has to branch on "related record missing".

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::action::{Action, ActionStatus};
use crate::metrics::progress::GroupProgress;
use crate::rollout::{Rollout, RolloutGroup};
use crate::target::{Target, UpdateStatus};
use crate::types::EntityId;

/// `.../targets/{id}/actions...` inside an action's self reference.
static SELF_HREF_TARGET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"targets/([^/?#]+)/actions").expect("valid regex"));

// ---------------------------------------------------------------------------
// Target id resolution
// ---------------------------------------------------------------------------

/// Resolve the controller id of the target an action belongs to.
///
/// Rules, in order:
/// 1. the trailing path segment of the `target` relation href;
/// 2. the `{id}` of a `targets/{id}/actions` segment in the `self` href.
///
/// Query strings and fragments are ignored, as is a trailing slash.
/// Returns `None` when neither rule yields a non-empty segment.
pub fn resolve_target_id(action: &Action) -> Option<String> {
    if let Some(id) = action
        .links
        .target_href
        .as_deref()
        .and_then(trailing_segment)
    {
        return Some(id);
    }

    let self_href = action.links.self_href.as_deref()?;
    SELF_HREF_TARGET_RE
        .captures(self_href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

/// Last non-empty path segment of `href`, without query or fragment.
///
/// Scheme and authority are never taken as a segment, so a bare
/// `https://host` yields `None`. Colons inside the path are kept.
fn trailing_segment(href: &str) -> Option<String> {
    let href = href.split(['?', '#']).next().unwrap_or_default();
    let path = match href.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, path)| path).unwrap_or_default(),
        None => href,
    };
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|seg| !seg.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Action -> Target
// ---------------------------------------------------------------------------

/// An action together with the target view it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedAction {
    pub action: Action,
    pub target: Target,
    /// `false` when `target` is a synthesized placeholder.
    pub target_resolved: bool,
}

/// Update status a placeholder target inherits from its action.
fn mirrored_update_status(status: ActionStatus) -> UpdateStatus {
    match status {
        ActionStatus::Finished => UpdateStatus::InSync,
        ActionStatus::Error => UpdateStatus::Error,
        s if s.is_in_progress() => UpdateStatus::Pending,
        _ => UpdateStatus::Unknown,
    }
}

/// Resolve every action's owning target against the current target page.
///
/// Output order matches `actions`.
pub fn correlate_actions(actions: &[Action], targets: &[Target]) -> Vec<CorrelatedAction> {
    let by_id: HashMap<&str, &Target> = targets
        .iter()
        .map(|t| (t.controller_id.as_str(), t))
        .collect();

    actions
        .iter()
        .map(|action| {
            let candidate = resolve_target_id(action);
            match candidate.as_deref().and_then(|id| by_id.get(id)) {
                Some(target) => CorrelatedAction {
                    action: action.clone(),
                    target: (*target).clone(),
                    target_resolved: true,
                },
                None => {
                    let id = candidate.unwrap_or_else(|| format!("action-{}", action.id));
                    CorrelatedAction {
                        action: action.clone(),
                        target: Target::placeholder(id, mirrored_update_status(action.status)),
                        target_resolved: false,
                    }
                }
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// RolloutGroup -> Rollout
// ---------------------------------------------------------------------------

/// A rollout's groups joined with the parent rollout view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedGroups {
    pub rollout: Rollout,
    /// `false` when `rollout` is a synthesized placeholder.
    pub rollout_resolved: bool,
    pub groups: Vec<RolloutGroup>,
    /// Completion of each group, in `groups` order.
    pub progress: Vec<GroupProgress>,
}

/// Attach `groups` to rollout `rollout_id` from the current rollout page.
pub fn correlate_groups(
    rollout_id: EntityId,
    groups: Vec<RolloutGroup>,
    rollouts: &[Rollout],
) -> CorrelatedGroups {
    let (rollout, rollout_resolved) = match rollouts.iter().find(|r| r.id == rollout_id) {
        Some(rollout) => (rollout.clone(), true),
        None => (Rollout::placeholder(rollout_id), false),
    };
    let progress = groups.iter().map(GroupProgress::of).collect();
    CorrelatedGroups {
        rollout,
        rollout_resolved,
        groups,
        progress,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
