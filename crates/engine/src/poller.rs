//! One background task per backend resource.
//!
//! A poller fetches one page on a timer while the [`VisibilityGate`] is
//! open and publishes the latest [`PollState`] through a watch channel.
//! Failures keep the last good data; the next tick is the retry.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use fleetwatch_client::{ClientError, Page};
use fleetwatch_core::clock::Clock;
use fleetwatch_core::types::Timestamp;
use fleetwatch_core::ResourceKind;

use crate::visibility::VisibilityGate;

/// Queued refetch requests per poller. Fire-and-forget requests beyond
/// this are dropped since one is already pending.
const REFETCH_QUEUE: usize = 8;

/// Fetches one page of a resource.
pub type FetchFn<T> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Page<T>, ClientError>> + Send + Sync>;

/// Decides from the last good page whether the resource is busy.
pub type ActivityFn<T> = Arc<dyn Fn(&[T]) -> bool + Send + Sync>;

// ---------------------------------------------------------------------------
// PollPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPolicy {
    /// `active` while the activity predicate holds for the last good page,
    /// `idle` otherwise.
    Adaptive { active: Duration, idle: Duration },
    /// Reference data; not activity sensitive.
    Fixed(Duration),
}

impl PollPolicy {
    pub fn period(&self, busy: bool) -> Duration {
        match *self {
            Self::Adaptive { active, idle } => {
                if busy {
                    active
                } else {
                    idle
                }
            }
            Self::Fixed(period) => period,
        }
    }
}

// ---------------------------------------------------------------------------
// PollState
// ---------------------------------------------------------------------------

/// Observable state of one poller.
#[derive(Debug)]
pub struct PollState<T> {
    /// Last successfully fetched page content.
    pub data: Arc<Vec<T>>,
    /// Backend total for the last good page.
    pub total: u64,
    /// True until the first successful fetch.
    pub is_loading: bool,
    /// True while a fetch is outstanding.
    pub is_fetching: bool,
    pub last_success_at: Option<Timestamp>,
    pub last_error: Option<String>,
}

impl<T> Clone for PollState<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            total: self.total,
            is_loading: self.is_loading,
            is_fetching: self.is_fetching,
            last_success_at: self.last_success_at,
            last_error: self.last_error.clone(),
        }
    }
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            data: Arc::new(Vec::new()),
            total: 0,
            is_loading: true,
            is_fetching: false,
            last_success_at: None,
            last_error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ResourcePoller
// ---------------------------------------------------------------------------

/// Handle to a running poller. Cheap to clone.
pub struct ResourcePoller<T> {
    kind: ResourceKind,
    state_rx: watch::Receiver<PollState<T>>,
    refetch_tx: mpsc::Sender<Option<oneshot::Sender<()>>>,
}

impl<T> Clone for ResourcePoller<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            state_rx: self.state_rx.clone(),
            refetch_tx: self.refetch_tx.clone(),
        }
    }
}

impl<T> ResourcePoller<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    /// Spawn the polling task. It runs until `cancel` fires.
    pub fn spawn(
        kind: ResourceKind,
        fetch: FetchFn<T>,
        policy: PollPolicy,
        activity: Option<ActivityFn<T>>,
        gate: VisibilityGate,
        clock: Arc<dyn Clock>,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (state_tx, state_rx) = watch::channel(PollState::default());
        let (refetch_tx, refetch_rx) = mpsc::channel(REFETCH_QUEUE);

        let task = PollTask {
            kind,
            fetch,
            policy,
            activity,
            gate,
            clock,
            state_tx,
            busy: false,
        };
        let handle = tokio::spawn(task.run(refetch_rx, cancel));

        (
            Self {
                kind,
                state_rx,
                refetch_tx,
            },
            handle,
        )
    }
}

impl<T> ResourcePoller<T> {
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState<T>> {
        self.state_rx.clone()
    }

    pub fn state(&self) -> PollState<T> {
        self.state_rx.borrow().clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.state_rx.borrow().is_fetching
    }

    /// Request an immediate fetch without waiting for it.
    pub fn refetch(&self) {
        if self.refetch_tx.try_send(None).is_err() {
            tracing::debug!(resource = %self.kind, "Refetch already queued");
        }
    }

    /// Request an immediate fetch and wait until it settles.
    ///
    /// Returns at once if the poller has stopped.
    pub async fn refetch_and_wait(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.refetch_tx.send(Some(done_tx)).await.is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

struct PollTask<T> {
    kind: ResourceKind,
    fetch: FetchFn<T>,
    policy: PollPolicy,
    activity: Option<ActivityFn<T>>,
    gate: VisibilityGate,
    clock: Arc<dyn Clock>,
    state_tx: watch::Sender<PollState<T>>,
    /// Activity predicate result for the last good page.
    busy: bool,
}

impl<T> PollTask<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    async fn run(
        mut self,
        mut refetch_rx: mpsc::Receiver<Option<oneshot::Sender<()>>>,
        cancel: CancellationToken,
    ) {
        let mut gate_rx = self.gate.subscribe();
        // Due immediately the first time the gate is open.
        let mut next_due = Instant::now();

        tracing::debug!(resource = %self.kind, "Poller started");

        loop {
            let visible = gate_rx.borrow_and_update().visible;
            let timer = async move {
                if visible {
                    tokio::time::sleep_until(next_due).await;
                } else {
                    std::future::pending::<()>().await;
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = gate_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if gate_rx.borrow().visible {
                        // Catch up at once when the dashboard comes back.
                        next_due = Instant::now();
                    }
                }
                request = refetch_rx.recv() => {
                    let Some(waiter) = request else { break };
                    if !self.fetch_or_cancel(&cancel).await {
                        break;
                    }
                    if let Some(waiter) = waiter {
                        let _ = waiter.send(());
                    }
                    next_due = Instant::now() + self.period();
                }
                _ = timer => {
                    if !self.fetch_or_cancel(&cancel).await {
                        break;
                    }
                    next_due = Instant::now() + self.period();
                }
            }
        }

        tracing::debug!(resource = %self.kind, "Poller stopped");
    }

    fn period(&self) -> Duration {
        self.policy.period(self.busy)
    }

    /// Run one fetch unless shutdown wins. Returns `false` on shutdown.
    async fn fetch_or_cancel(&mut self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = self.fetch_once() => true,
        }
    }

    async fn fetch_once(&mut self) {
        let generation = self.gate.state().hidden_generation;
        self.state_tx.send_modify(|s| s.is_fetching = true);

        let result = (self.fetch)().await;

        if self.gate.state().hidden_generation != generation {
            tracing::debug!(resource = %self.kind, "Dashboard hidden during fetch, discarding result");
            self.state_tx.send_modify(|s| s.is_fetching = false);
            return;
        }

        match result {
            Ok(page) => {
                let now = self.clock.now();
                let count = page.content.len();
                self.state_tx.send_modify(|s| {
                    // Identical content keeps the old allocation so
                    // downstream identity checks see no change.
                    if *s.data != page.content {
                        s.data = Arc::new(page.content);
                    }
                    s.total = page.total;
                    s.is_loading = false;
                    s.is_fetching = false;
                    s.last_success_at = Some(now);
                    s.last_error = None;
                });
                self.busy = match &self.activity {
                    Some(predicate) => predicate(&self.state_tx.borrow().data),
                    None => false,
                };
                tracing::trace!(resource = %self.kind, count, busy = self.busy, "Fetched page");
            }
            Err(e) => {
                tracing::warn!(resource = %self.kind, error = %e, "Fetch failed, keeping last good data");
                self.state_tx.send_modify(|s| {
                    s.is_fetching = false;
                    s.last_error = Some(e.to_string());
                });
            }
        }
    }
}
