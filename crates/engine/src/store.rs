//! Merge of every poller's latest state into one resource snapshot.

use serde::Serialize;
use tokio::sync::watch;

use fleetwatch_core::action::Action;
use fleetwatch_core::catalog::{DistributionSet, SoftwareModule, TargetType};
use fleetwatch_core::rollout::Rollout;
use fleetwatch_core::target::Target;
use fleetwatch_core::types::Timestamp;
use fleetwatch_core::{ResourceKind, ResourceSnapshot};

use crate::poller::{PollState, ResourcePoller};

/// Per-resource flags published alongside the metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceStatus {
    pub kind: ResourceKind,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub last_success_at: Option<Timestamp>,
    pub last_error: Option<String>,
    /// Entries in the last good page.
    pub count: usize,
    /// Backend total for the last good page.
    pub total: u64,
}

impl ResourceStatus {
    fn of<T>(kind: ResourceKind, state: &PollState<T>) -> Self {
        Self {
            kind,
            is_loading: state.is_loading,
            is_fetching: state.is_fetching,
            last_success_at: state.last_success_at,
            last_error: state.last_error.clone(),
            count: state.data.len(),
            total: state.total,
        }
    }
}

/// One consistent read of every poller.
#[derive(Debug, Clone)]
pub struct StoreView {
    pub snapshot: ResourceSnapshot,
    pub resources: Vec<ResourceStatus>,
}

impl StoreView {
    /// True while any resource has never loaded.
    pub fn is_loading(&self) -> bool {
        self.resources.iter().any(|r| r.is_loading)
    }

    /// True while any fetch is outstanding.
    pub fn is_fetching(&self) -> bool {
        self.resources.iter().any(|r| r.is_fetching)
    }

    /// Per-resource time of the last successful fetch. Advances on every
    /// refresh, including one that returned identical content.
    pub fn refreshed_at(&self) -> Vec<Option<Timestamp>> {
        self.resources.iter().map(|r| r.last_success_at).collect()
    }

    /// Most recent successful fetch across all resources.
    pub fn last_updated(&self) -> Option<Timestamp> {
        self.resources.iter().filter_map(|r| r.last_success_at).max()
    }
}

/// The six pollers the dashboard observes.
#[derive(Clone)]
pub struct PollerSet {
    pub targets: ResourcePoller<Target>,
    pub actions: ResourcePoller<Action>,
    pub rollouts: ResourcePoller<Rollout>,
    pub target_types: ResourcePoller<TargetType>,
    pub distribution_sets: ResourcePoller<DistributionSet>,
    pub software_modules: ResourcePoller<SoftwareModule>,
}

impl PollerSet {
    pub fn subscribe(&self) -> SnapshotStore {
        SnapshotStore {
            targets: self.targets.subscribe(),
            actions: self.actions.subscribe(),
            rollouts: self.rollouts.subscribe(),
            target_types: self.target_types.subscribe(),
            distribution_sets: self.distribution_sets.subscribe(),
            software_modules: self.software_modules.subscribe(),
        }
    }
}

/// Watches every poller and merges on demand.
pub struct SnapshotStore {
    targets: watch::Receiver<PollState<Target>>,
    actions: watch::Receiver<PollState<Action>>,
    rollouts: watch::Receiver<PollState<Rollout>>,
    target_types: watch::Receiver<PollState<TargetType>>,
    distribution_sets: watch::Receiver<PollState<DistributionSet>>,
    software_modules: watch::Receiver<PollState<SoftwareModule>>,
}

impl SnapshotStore {
    /// Whole-object read of the latest state of every poller.
    pub fn merge(&mut self) -> StoreView {
        let targets = self.targets.borrow_and_update().clone();
        let actions = self.actions.borrow_and_update().clone();
        let rollouts = self.rollouts.borrow_and_update().clone();
        let target_types = self.target_types.borrow_and_update().clone();
        let distribution_sets = self.distribution_sets.borrow_and_update().clone();
        let software_modules = self.software_modules.borrow_and_update().clone();

        let resources = vec![
            ResourceStatus::of(ResourceKind::Targets, &targets),
            ResourceStatus::of(ResourceKind::Actions, &actions),
            ResourceStatus::of(ResourceKind::Rollouts, &rollouts),
            ResourceStatus::of(ResourceKind::TargetTypes, &target_types),
            ResourceStatus::of(ResourceKind::DistributionSets, &distribution_sets),
            ResourceStatus::of(ResourceKind::SoftwareModules, &software_modules),
        ];

        StoreView {
            snapshot: ResourceSnapshot {
                targets: targets.data,
                actions: actions.data,
                rollouts: rollouts.data,
                target_types: target_types.data,
                distribution_sets: distribution_sets.data,
                software_modules: software_modules.data,
            },
            resources,
        }
    }

    /// Wait until any poller publishes. Returns `false` once a poller has
    /// stopped.
    pub async fn changed(&mut self) -> bool {
        tokio::select! {
            r = self.targets.changed() => r.is_ok(),
            r = self.actions.changed() => r.is_ok(),
            r = self.rollouts.changed() => r.is_ok(),
            r = self.target_types.changed() => r.is_ok(),
            r = self.distribution_sets.changed() => r.is_ok(),
            r = self.software_modules.changed() => r.is_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn status(kind: ResourceKind, loading: bool, fetching: bool, at: Option<i64>) -> ResourceStatus {
        ResourceStatus {
            kind,
            is_loading: loading,
            is_fetching: fetching,
            last_success_at: at.map(|h| Utc.with_ymd_and_hms(2024, 5, 1, h as u32, 0, 0).unwrap()),
            last_error: None,
            count: 0,
            total: 0,
        }
    }

    #[test]
    fn aggregate_flags() {
        let view = StoreView {
            snapshot: ResourceSnapshot::default(),
            resources: vec![
                status(ResourceKind::Targets, false, false, Some(9)),
                status(ResourceKind::Actions, false, true, Some(11)),
                status(ResourceKind::Rollouts, true, false, None),
            ],
        };
        assert!(view.is_loading());
        assert!(view.is_fetching());
        assert_eq!(
            view.last_updated(),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap())
        );
    }

    #[test]
    fn nothing_loaded_has_no_last_update() {
        let view = StoreView {
            snapshot: ResourceSnapshot::default(),
            resources: vec![status(ResourceKind::Targets, true, false, None)],
        };
        assert_eq!(view.last_updated(), None);
        assert!(!view.is_fetching());
    }

    #[test]
    fn refresh_marks_follow_resource_order() {
        let view = StoreView {
            snapshot: ResourceSnapshot::default(),
            resources: vec![
                status(ResourceKind::Targets, false, false, Some(9)),
                status(ResourceKind::Actions, true, false, None),
            ],
        };
        assert_eq!(
            view.refreshed_at(),
            vec![Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()), None]
        );
    }
}
