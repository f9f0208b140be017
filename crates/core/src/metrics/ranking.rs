//! Top-N lists.
//!
//! Every ranking sorts descending by one key with a stable sort, so ties
//! keep the order the backend returned.

use std::cmp::Reverse;
use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::Package;
use crate::correlator::CorrelatedAction;
use crate::metrics::classification::{classify_action, ActionOutcome};
use crate::rollout::Rollout;
use crate::types::{EntityId, Timestamp};

/// The first `n` of `items` by descending `key`, ties in input order.
pub fn top_n_by<T, K: Ord>(mut items: Vec<T>, n: usize, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| Reverse(key(item)));
    items.truncate(n);
    items
}

// ---------------------------------------------------------------------------
// Targets with the most error actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetErrorCount {
    pub target_id: String,
    pub target_name: String,
    pub error_actions: u64,
    pub target_resolved: bool,
}

pub fn targets_with_most_errors(actions: &[CorrelatedAction], n: usize) -> Vec<TargetErrorCount> {
    let mut order: Vec<TargetErrorCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for c in actions {
        if classify_action(&c.action) != ActionOutcome::Error {
            continue;
        }
        let id = c.target.controller_id.as_str();
        match index.get(id) {
            Some(&i) => order[i].error_actions += 1,
            None => {
                index.insert(id, order.len());
                order.push(TargetErrorCount {
                    target_id: c.target.controller_id.clone(),
                    target_name: c.target.name.clone(),
                    error_actions: 1,
                    target_resolved: c.target_resolved,
                });
            }
        }
    }

    top_n_by(order, n, |t| t.error_actions)
}

// ---------------------------------------------------------------------------
// Rollouts with the most errored targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolloutErrorCount {
    pub rollout_id: EntityId,
    pub name: String,
    pub error_targets: u64,
    pub total_targets: u64,
}

/// Rollouts ranked by errored target count; rollouts without errors are
/// left out.
pub fn rollouts_with_most_errors(rollouts: &[Rollout], n: usize) -> Vec<RolloutErrorCount> {
    let errored = rollouts
        .iter()
        .filter(|r| r.targets_per_status.error > 0)
        .map(|r| RolloutErrorCount {
            rollout_id: r.id,
            name: r.name.clone(),
            error_targets: r.targets_per_status.error,
            total_targets: r.total_targets,
        })
        .collect();
    top_n_by(errored, n, |r| r.error_targets)
}

// ---------------------------------------------------------------------------
// Recent packages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    pub id: EntityId,
    pub name: String,
    pub version: String,
    pub type_name: Option<String>,
    pub created_at: Option<Timestamp>,
}

/// Most recently created packages. Undated entries sort last.
pub fn most_recent<P: Package>(packages: &[P], n: usize) -> Vec<PackageSummary> {
    let summaries = packages
        .iter()
        .map(|p| PackageSummary {
            id: p.id(),
            name: p.name().to_string(),
            version: p.version().to_string(),
            type_name: p.type_name().map(str::to_string),
            created_at: p.created_at(),
        })
        .collect();
    top_n_by(summaries, n, |p| p.created_at)
}
