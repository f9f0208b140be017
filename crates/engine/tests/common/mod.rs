//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::watch;

use fleetwatch_client::{ClientError, ListQuery, Page, ResourceSource};
use fleetwatch_core::action::{Action, ActionLinks, ActionStatus, ActionType};
use fleetwatch_core::catalog::{DistributionSet, SoftwareModule, TargetType};
use fleetwatch_core::clock::Clock;
use fleetwatch_core::rollout::{
    Rollout, RolloutGroup, RolloutGroupStatus, RolloutStatus, TargetCounts,
};
use fleetwatch_core::target::{Target, UpdateStatus};
use fleetwatch_core::types::{EntityId, Timestamp};
use fleetwatch_core::ResourceKind;
use fleetwatch_engine::DashboardSnapshot;

pub fn base_time() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall time that advances with tokio's (possibly paused) clock.
pub struct TokioClock {
    base: Timestamp,
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: base_time(),
            origin: tokio::time::Instant::now(),
        })
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        self.base + chrono::Duration::from_std(self.origin.elapsed()).unwrap()
    }
}

// ---------------------------------------------------------------------------
// Fake source
// ---------------------------------------------------------------------------

/// In-memory management backend with call counters and failure injection.
#[derive(Default)]
pub struct FakeSource {
    pub targets: Mutex<Vec<Target>>,
    pub actions: Mutex<Vec<Action>>,
    pub rollouts: Mutex<Vec<Rollout>>,
    pub target_types: Mutex<Vec<TargetType>>,
    pub distribution_sets: Mutex<Vec<DistributionSet>>,
    pub software_modules: Mutex<Vec<SoftwareModule>>,
    pub groups: Mutex<Vec<RolloutGroup>>,
    calls: Mutex<HashMap<ResourceKind, usize>>,
    queries: Mutex<Vec<(ResourceKind, ListQuery)>>,
    failing: Mutex<HashSet<ResourceKind>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self, kind: ResourceKind) -> usize {
        self.calls.lock().unwrap().get(&kind).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn queries(&self, kind: ResourceKind) -> Vec<ListQuery> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, q)| q.clone())
            .collect()
    }

    pub fn fail(&self, kind: ResourceKind, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(kind);
        } else {
            set.remove(&kind);
        }
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    async fn serve<T: Clone>(
        &self,
        kind: ResourceKind,
        query: &ListQuery,
        data: &Mutex<Vec<T>>,
    ) -> Result<Page<T>, ClientError> {
        *self.calls.lock().unwrap().entry(kind).or_default() += 1;
        self.queries.lock().unwrap().push((kind, query.clone()));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(&kind) {
            return Err(ClientError::Api {
                status: 503,
                body: "unavailable".into(),
            });
        }

        let content: Vec<T> = data
            .lock()
            .unwrap()
            .iter()
            .take(query.limit as usize)
            .cloned()
            .collect();
        let total = data.lock().unwrap().len() as u64;
        Ok(Page { content, total })
    }
}

#[async_trait]
impl ResourceSource for FakeSource {
    async fn list_targets(&self, query: &ListQuery) -> Result<Page<Target>, ClientError> {
        self.serve(ResourceKind::Targets, query, &self.targets).await
    }

    async fn list_actions(&self, query: &ListQuery) -> Result<Page<Action>, ClientError> {
        self.serve(ResourceKind::Actions, query, &self.actions).await
    }

    async fn list_rollouts(&self, query: &ListQuery) -> Result<Page<Rollout>, ClientError> {
        self.serve(ResourceKind::Rollouts, query, &self.rollouts).await
    }

    async fn list_target_types(
        &self,
        query: &ListQuery,
    ) -> Result<Page<TargetType>, ClientError> {
        self.serve(ResourceKind::TargetTypes, query, &self.target_types)
            .await
    }

    async fn list_distribution_sets(
        &self,
        query: &ListQuery,
    ) -> Result<Page<DistributionSet>, ClientError> {
        self.serve(ResourceKind::DistributionSets, query, &self.distribution_sets)
            .await
    }

    async fn list_software_modules(
        &self,
        query: &ListQuery,
    ) -> Result<Page<SoftwareModule>, ClientError> {
        self.serve(ResourceKind::SoftwareModules, query, &self.software_modules)
            .await
    }

    async fn list_rollout_groups(
        &self,
        rollout_id: EntityId,
        limit: u32,
    ) -> Result<Page<RolloutGroup>, ClientError> {
        let content: Vec<RolloutGroup> = self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.rollout_id == rollout_id)
            .take(limit as usize)
            .cloned()
            .collect();
        let total = content.len() as u64;
        Ok(Page { content, total })
    }
}

// ---------------------------------------------------------------------------
// Entity builders
// ---------------------------------------------------------------------------

pub fn target(id: &str, status: UpdateStatus, polled_min_ago: Option<i64>) -> Target {
    Target {
        controller_id: id.to_string(),
        name: format!("Device {id}"),
        last_poll_at: polled_min_ago.map(|m| base_time() - chrono::Duration::minutes(m)),
        update_status: status,
        target_type_name: Some("gateway".into()),
        created_at: Some(base_time() - chrono::Duration::days(2)),
        has_security_token: true,
        assigned_distribution_set: None,
    }
}

pub fn action(id: EntityId, status: ActionStatus, target_id: &str, created_min_ago: i64) -> Action {
    let created = base_time() - chrono::Duration::minutes(created_min_ago);
    Action {
        id,
        status,
        action_type: ActionType::Update,
        created_at: Some(created),
        last_modified_at: Some(created + chrono::Duration::minutes(1)),
        detail_status: None,
        last_status_code: None,
        rollout_id: None,
        links: ActionLinks {
            self_href: Some(format!("https://mgmt/rest/v1/targets/{target_id}/actions/{id}")),
            target_href: Some(format!("https://mgmt/rest/v1/targets/{target_id}")),
        },
    }
}

pub fn rollout(id: EntityId, status: RolloutStatus, total: u64, finished: u64) -> Rollout {
    Rollout {
        id,
        name: format!("Wave {id}"),
        status,
        total_targets: total,
        targets_per_status: TargetCounts {
            finished,
            running: total - finished,
            ..TargetCounts::default()
        },
        total_groups: 1,
        created_at: Some(base_time() - chrono::Duration::hours(1)),
        distribution_set_id: None,
    }
}

pub fn group(id: EntityId, rollout_id: EntityId) -> RolloutGroup {
    RolloutGroup {
        id,
        rollout_id,
        name: format!("Group {id}"),
        status: RolloutGroupStatus::Running,
        total_targets: 10,
        targets_per_status: TargetCounts {
            running: 10,
            ..TargetCounts::default()
        },
    }
}

pub fn distribution_set(id: EntityId, complete: bool) -> DistributionSet {
    DistributionSet {
        id,
        name: format!("firmware-{id}"),
        version: "1.0.0".into(),
        type_name: Some("os".into()),
        complete,
        created_at: Some(base_time() - chrono::Duration::days(id)),
    }
}

/// A small fleet: six healthy devices polling, four erroring ones gone
/// quiet, one running rollout and a mix of actions.
pub fn seeded_source() -> Arc<FakeSource> {
    let source = FakeSource::new();
    {
        let mut targets = source.targets.lock().unwrap();
        for i in 0..6 {
            targets.push(target(&format!("dev-{i}"), UpdateStatus::InSync, Some(2)));
        }
        for i in 6..10 {
            targets.push(target(&format!("dev-{i}"), UpdateStatus::Error, Some(45)));
        }
    }
    *source.actions.lock().unwrap() = vec![
        action(1, ActionStatus::Finished, "dev-0", 20),
        action(2, ActionStatus::Error, "dev-7", 40),
        action(3, ActionStatus::Running, "dev-1", 15),
    ];
    *source.rollouts.lock().unwrap() = vec![rollout(7, RolloutStatus::Running, 10, 4)];
    *source.target_types.lock().unwrap() = vec![TargetType {
        id: 1,
        name: "gateway".into(),
        description: None,
        colour: None,
    }];
    *source.distribution_sets.lock().unwrap() =
        vec![distribution_set(1, true), distribution_set(2, false)];
    *source.software_modules.lock().unwrap() = vec![SoftwareModule {
        id: 1,
        name: "kernel".into(),
        version: "6.1".into(),
        type_name: Some("os".into()),
        created_at: Some(base_time()),
    }];
    source
}

// ---------------------------------------------------------------------------
// Waiting
// ---------------------------------------------------------------------------

/// Wait (in tokio time) until a published snapshot satisfies `pred`.
pub async fn wait_for<F>(
    rx: &mut watch::Receiver<Arc<DashboardSnapshot>>,
    mut pred: F,
) -> Arc<DashboardSnapshot>
where
    F: FnMut(&DashboardSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            let snapshot = Arc::clone(&rx.borrow_and_update());
            if pred(&snapshot) {
                return snapshot;
            }
            rx.changed().await.expect("engine stopped");
        }
    })
    .await
    .expect("condition not reached in time")
}

/// Let spawned tasks run until they block. Under paused time this moves
/// the clock forward by one millisecond.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
