//! The running dashboard: six pollers, one derivation task and the
//! published [`DashboardSnapshot`].
//!
//! Every merge of the pollers' state is checked against the last
//! derivation pass. A new [`StableClock`] is captured and the metrics
//! recomputed when a collection was replaced or any resource completed a
//! refresh, even one that returned identical content. Flag-only changes
//! (fetch started, fetch failed, visibility) republish the previous metrics
//! with fresh flags.

use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fleetwatch_client::ResourceSource;
use fleetwatch_core::action::Action;
use fleetwatch_core::clock::Clock;
use fleetwatch_core::correlator::{correlate_groups, CorrelatedGroups};
use fleetwatch_core::metrics::classification::{
    classify_action, classify_rollout, ActionOutcome, RolloutBucket,
};
use fleetwatch_core::rollout::Rollout;
use fleetwatch_core::target::{Target, UpdateStatus};
use fleetwatch_core::types::{EntityId, Timestamp};
use fleetwatch_core::{
    derive, DerivedSnapshot, FreshnessWindow, OnlinePolicy, ResourceKind, ResourceSnapshot,
    StableClock, SystemClock, Thresholds,
};

use crate::config::EngineConfig;
use crate::coordinator::RefreshCoordinator;
use crate::error::EngineError;
use crate::poller::{ActivityFn, FetchFn, PollPolicy, ResourcePoller};
use crate::store::{PollerSet, ResourceStatus, SnapshotStore, StoreView};
use crate::visibility::VisibilityGate;

// ---------------------------------------------------------------------------
// DashboardSnapshot
// ---------------------------------------------------------------------------

/// Everything the dashboard renders, published as one immutable value.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// True while any resource has never loaded.
    pub is_loading: bool,
    /// True while any fetch is outstanding.
    pub is_fetching: bool,
    pub last_updated: Option<Timestamp>,
    pub visible: bool,
    pub resources: Vec<ResourceStatus>,
    pub targets: Arc<Vec<Target>>,
    pub rollouts: Arc<Vec<Rollout>>,
    #[serde(flatten)]
    pub derived: Arc<DerivedSnapshot>,
}

impl DashboardSnapshot {
    fn assemble(view: &StoreView, derived: Arc<DerivedSnapshot>, visible: bool) -> Self {
        Self {
            is_loading: view.is_loading(),
            is_fetching: view.is_fetching(),
            last_updated: view.last_updated(),
            visible,
            resources: view.resources.clone(),
            targets: Arc::clone(&view.snapshot.targets),
            rollouts: Arc::clone(&view.snapshot.rollouts),
            derived,
        }
    }

    /// When the metrics in this snapshot were computed.
    pub fn observed_at(&self) -> Timestamp {
        self.derived.observed_at.now()
    }
}

// ---------------------------------------------------------------------------
// DashboardEngine
// ---------------------------------------------------------------------------

macro_rules! fetcher {
    ($source:expr, $query:expr, $method:ident) => {{
        let source = Arc::clone(&$source);
        let query = $query;
        let fetch: FetchFn<_> = Arc::new(move || {
            let source = Arc::clone(&source);
            let query = query.clone();
            async move { source.$method(&query).await }.boxed()
        });
        fetch
    }};
}

pub struct DashboardEngine {
    source: Arc<dyn ResourceSource>,
    config: EngineConfig,
    gate: VisibilityGate,
    pollers: PollerSet,
    coordinator: RefreshCoordinator,
    snapshot_rx: watch::Receiver<Arc<DashboardSnapshot>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DashboardEngine {
    /// Start polling `source` with the wall clock and the default
    /// freshness-window online policy.
    pub fn start(
        source: Arc<dyn ResourceSource>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let online = FreshnessWindow {
            window: config.thresholds.online_freshness(),
        };
        Self::start_with(source, config, Arc::new(SystemClock), Arc::new(online))
    }

    /// Start polling with an injected clock and online policy.
    ///
    /// Fails only when the configured thresholds are invalid. Must be
    /// called within a tokio runtime.
    pub fn start_with(
        source: Arc<dyn ResourceSource>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        online: Arc<dyn OnlinePolicy>,
    ) -> Result<Self, EngineError> {
        config.thresholds.validate()?;

        let cancel = CancellationToken::new();
        let gate = VisibilityGate::new(config.start_visible);
        let mut tasks = Vec::with_capacity(7);

        let adaptive = PollPolicy::Adaptive {
            active: config.active_poll,
            idle: config.idle_poll,
        };
        let reference = PollPolicy::Fixed(config.reference_poll);

        let mut spawner = Spawner {
            gate: &gate,
            clock: &clock,
            cancel: &cancel,
            tasks: &mut tasks,
        };

        let targets_busy: ActivityFn<Target> = Arc::new(|targets: &[Target]| {
            targets
                .iter()
                .any(|t| t.update_status == UpdateStatus::Pending)
        });
        let actions_busy: ActivityFn<Action> = Arc::new(|actions: &[Action]| {
            actions
                .iter()
                .any(|a| classify_action(a) == ActionOutcome::Active)
        });
        let rollouts_busy: ActivityFn<Rollout> = Arc::new(|rollouts: &[Rollout]| {
            rollouts
                .iter()
                .any(|r| classify_rollout(r.status) == RolloutBucket::Ongoing)
        });

        let pollers = PollerSet {
            targets: spawner.spawn(
                ResourceKind::Targets,
                fetcher!(source, config.target_query(), list_targets),
                adaptive,
                Some(targets_busy),
            ),
            actions: spawner.spawn(
                ResourceKind::Actions,
                fetcher!(source, config.action_query(), list_actions),
                adaptive,
                Some(actions_busy),
            ),
            rollouts: spawner.spawn(
                ResourceKind::Rollouts,
                fetcher!(source, config.rollout_query(), list_rollouts),
                adaptive,
                Some(rollouts_busy),
            ),
            target_types: spawner.spawn(
                ResourceKind::TargetTypes,
                fetcher!(source, config.catalog_query(), list_target_types),
                reference,
                None,
            ),
            distribution_sets: spawner.spawn(
                ResourceKind::DistributionSets,
                fetcher!(source, config.catalog_query(), list_distribution_sets),
                reference,
                None,
            ),
            software_modules: spawner.spawn(
                ResourceKind::SoftwareModules,
                fetcher!(source, config.catalog_query(), list_software_modules),
                reference,
                None,
            ),
        };

        let mut store = pollers.subscribe();
        let view = store.merge();
        let initial = Arc::new(derive(
            &view.snapshot,
            StableClock::capture(clock.as_ref()),
            &config.thresholds,
            online.as_ref(),
        )?);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(DashboardSnapshot::assemble(
            &view,
            Arc::clone(&initial),
            gate.current_value(),
        )));

        let derivation = Derivation {
            store,
            gate: gate.clone(),
            clock,
            online,
            thresholds: config.thresholds.clone(),
            refreshed: view.refreshed_at(),
            inputs: view.snapshot,
            derived: initial,
            snapshot_tx,
        };
        tasks.push(tokio::spawn(derivation.run(cancel.child_token())));

        tracing::info!(
            visible = gate.current_value(),
            active_poll_secs = config.active_poll.as_secs(),
            idle_poll_secs = config.idle_poll.as_secs(),
            reference_poll_secs = config.reference_poll.as_secs(),
            "Dashboard engine started"
        );

        Ok(Self {
            source,
            coordinator: RefreshCoordinator::from_set(&pollers),
            config,
            gate,
            pollers,
            snapshot_rx,
            cancel,
            tasks: Mutex::new(tasks),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSnapshot>> {
        self.snapshot_rx.clone()
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Arc<DashboardSnapshot> {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    pub fn gate(&self) -> &VisibilityGate {
        &self.gate
    }

    pub fn set_visible(&self, visible: bool) {
        self.gate.set_visible(visible);
    }

    pub fn pollers(&self) -> &PollerSet {
        &self.pollers
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.config.thresholds
    }

    /// Refresh every resource without waiting.
    pub fn refetch(&self) {
        self.coordinator.refetch();
    }

    /// Refresh every resource and wait until all fetches have settled.
    pub async fn refetch_and_wait(&self) {
        self.coordinator.refetch_and_wait().await;
    }

    pub fn is_fetching(&self) -> bool {
        self.coordinator.is_fetching()
    }

    /// Fetch the groups of one rollout and attach them to the rollout from
    /// the latest snapshot (or a placeholder when it is not in the page).
    pub async fn rollout_groups(
        &self,
        rollout_id: EntityId,
    ) -> Result<CorrelatedGroups, EngineError> {
        let page = self
            .source
            .list_rollout_groups(rollout_id, self.config.group_limit)
            .await?;
        let rollouts = Arc::clone(&self.snapshot_rx.borrow().rollouts);
        Ok(correlate_groups(rollout_id, page.content, &rollouts))
    }

    /// Stop every task and wait for them to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *tasks)
        };
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Dashboard task panicked");
            }
        }
        tracing::info!("Dashboard engine stopped");
    }
}

impl Drop for DashboardEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawns pollers that share one gate, clock and shutdown token.
struct Spawner<'a> {
    gate: &'a VisibilityGate,
    clock: &'a Arc<dyn Clock>,
    cancel: &'a CancellationToken,
    tasks: &'a mut Vec<JoinHandle<()>>,
}

impl Spawner<'_> {
    fn spawn<T>(
        &mut self,
        kind: ResourceKind,
        fetch: FetchFn<T>,
        policy: PollPolicy,
        activity: Option<ActivityFn<T>>,
    ) -> ResourcePoller<T>
    where
        T: PartialEq + Send + Sync + 'static,
    {
        let (poller, handle) = ResourcePoller::spawn(
            kind,
            fetch,
            policy,
            activity,
            self.gate.clone(),
            Arc::clone(self.clock),
            self.cancel.child_token(),
        );
        self.tasks.push(handle);
        poller
    }
}

// ---------------------------------------------------------------------------
// Derivation task
// ---------------------------------------------------------------------------

struct Derivation {
    store: SnapshotStore,
    gate: VisibilityGate,
    clock: Arc<dyn Clock>,
    online: Arc<dyn OnlinePolicy>,
    thresholds: Thresholds,
    /// Inputs of the last successful pass.
    inputs: ResourceSnapshot,
    /// Per-resource refresh times seen by the last successful pass.
    refreshed: Vec<Option<Timestamp>>,
    derived: Arc<DerivedSnapshot>,
    snapshot_tx: watch::Sender<Arc<DashboardSnapshot>>,
}

impl Derivation {
    async fn run(mut self, cancel: CancellationToken) {
        let mut gate_rx = self.gate.subscribe();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = self.store.changed() => {
                    if !changed {
                        break;
                    }
                }
                changed = gate_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
            self.publish();
        }

        tracing::debug!("Derivation task stopped");
    }

    fn publish(&mut self) {
        let view = self.store.merge();

        let refreshed = view.refreshed_at();

        if !view.snapshot.same_inputs(&self.inputs) || refreshed != self.refreshed {
            let clock = StableClock::capture(self.clock.as_ref());
            match derive(&view.snapshot, clock, &self.thresholds, self.online.as_ref()) {
                Ok(derived) => {
                    self.derived = Arc::new(derived);
                    self.inputs = view.snapshot.clone();
                    self.refreshed = refreshed;
                    tracing::debug!(observed_at = %clock.now(), "Metrics derived");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Derivation failed, keeping previous metrics");
                }
            }
        }

        let snapshot =
            DashboardSnapshot::assemble(&view, Arc::clone(&self.derived), self.gate.current_value());
        self.snapshot_tx.send_replace(Arc::new(snapshot));
    }
}
