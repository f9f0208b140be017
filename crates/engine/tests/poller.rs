//! Scheduling and failure behaviour of a single resource poller, driven
//! with paused tokio time.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use fleetwatch_client::{ClientError, Page};
use fleetwatch_core::{FixedClock, ResourceKind};
use fleetwatch_engine::poller::{ActivityFn, FetchFn, PollPolicy, ResourcePoller};
use fleetwatch_engine::VisibilityGate;

use common::{base_time, settle};

const ADAPTIVE: PollPolicy = PollPolicy::Adaptive {
    active: Duration::from_secs(3),
    idle: Duration::from_secs(30),
};

/// Fetch function whose n-th call (0-based) returns `respond(n)` after
/// `latency`.
fn scripted<F>(calls: Arc<AtomicUsize>, latency: Duration, respond: F) -> FetchFn<u32>
where
    F: Fn(usize) -> Result<Vec<u32>, ClientError> + Send + Sync + 'static,
{
    let respond = Arc::new(respond);
    Arc::new(move || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let respond = Arc::clone(&respond);
        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            respond(n).map(|content| {
                let total = content.len() as u64;
                Page { content, total }
            })
        }
        .boxed()
    })
}

fn unavailable() -> ClientError {
    ClientError::Api {
        status: 503,
        body: "unavailable".into(),
    }
}

fn spawn(
    fetch: FetchFn<u32>,
    policy: PollPolicy,
    activity: Option<ActivityFn<u32>>,
    gate: &VisibilityGate,
    cancel: &CancellationToken,
) -> ResourcePoller<u32> {
    let (poller, _handle) = ResourcePoller::spawn(
        ResourceKind::Actions,
        fetch,
        policy,
        activity,
        gate.clone(),
        Arc::new(FixedClock(base_time())),
        cancel.clone(),
    );
    poller
}

#[tokio::test(start_paused = true)]
async fn fetches_at_once_then_on_the_idle_period() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = VisibilityGate::new(true);
    let cancel = CancellationToken::new();
    let poller = spawn(
        scripted(calls.clone(), Duration::ZERO, |_| Ok(vec![1, 2])),
        ADAPTIVE,
        Some(Arc::new(|_: &[u32]| false)),
        &gate,
        &cancel,
    );

    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let state = poller.state();
    assert!(!state.is_loading);
    assert_eq!(*state.data, vec![1, 2]);
    assert_eq!(state.last_success_at, Some(base_time()));

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn busy_resources_poll_on_the_active_period() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = VisibilityGate::new(true);
    let cancel = CancellationToken::new();
    let _poller = spawn(
        scripted(calls.clone(), Duration::ZERO, |_| Ok(vec![7])),
        ADAPTIVE,
        Some(Arc::new(|items: &[u32]| items.contains(&7))),
        &gate,
        &cancel,
    );

    settle().await;
    tokio::time::sleep(Duration::from_millis(9_500)).await;
    // t=0, 3, 6, 9
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn hidden_gate_runs_no_timers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = VisibilityGate::new(false);
    let cancel = CancellationToken::new();
    let poller = spawn(
        scripted(calls.clone(), Duration::ZERO, |_| Ok(vec![1])),
        PollPolicy::Fixed(Duration::from_secs(60)),
        None,
        &gate,
        &cancel,
    );

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(poller.state().is_loading);

    gate.set_visible(true);
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn hiding_mid_fetch_discards_the_result() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = VisibilityGate::new(true);
    let cancel = CancellationToken::new();
    let poller = spawn(
        scripted(calls.clone(), Duration::from_secs(2), |_| Ok(vec![1])),
        PollPolicy::Fixed(Duration::from_secs(60)),
        None,
        &gate,
        &cancel,
    );

    settle().await;
    assert!(poller.is_fetching());
    gate.set_visible(false);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let state = poller.state();
    assert!(!state.is_fetching);
    assert!(state.is_loading);
    assert!(state.data.is_empty());

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_last_good_data() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = VisibilityGate::new(true);
    let cancel = CancellationToken::new();
    let poller = spawn(
        scripted(calls.clone(), Duration::ZERO, |n| {
            if n == 0 {
                Ok(vec![4, 5])
            } else {
                Err(unavailable())
            }
        }),
        PollPolicy::Fixed(Duration::from_secs(10)),
        None,
        &gate,
        &cancel,
    );

    settle().await;
    tokio::time::sleep(Duration::from_secs(11)).await;

    let state = poller.state();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*state.data, vec![4, 5]);
    assert!(!state.is_loading);
    assert!(state.last_error.as_deref().unwrap().contains("503"));

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn first_failure_leaves_resource_loading() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = VisibilityGate::new(true);
    let cancel = CancellationToken::new();
    let poller = spawn(
        scripted(calls, Duration::ZERO, |_| Err(unavailable())),
        PollPolicy::Fixed(Duration::from_secs(10)),
        None,
        &gate,
        &cancel,
    );

    settle().await;
    let state = poller.state();
    assert!(state.is_loading);
    assert!(!state.is_fetching);
    assert!(state.last_error.is_some());

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn identical_content_keeps_the_allocation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = VisibilityGate::new(true);
    let cancel = CancellationToken::new();
    let poller = spawn(
        scripted(calls.clone(), Duration::ZERO, |n| {
            Ok(if n < 2 { vec![1, 2, 3] } else { vec![1, 2] })
        }),
        PollPolicy::Fixed(Duration::from_secs(10)),
        None,
        &gate,
        &cancel,
    );

    settle().await;
    let first = poller.state().data;

    poller.refetch_and_wait().await;
    assert!(Arc::ptr_eq(&first, &poller.state().data));

    poller.refetch_and_wait().await;
    assert!(!Arc::ptr_eq(&first, &poller.state().data));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn manual_refetch_works_while_hidden() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = VisibilityGate::new(false);
    let cancel = CancellationToken::new();
    let poller = spawn(
        scripted(calls.clone(), Duration::ZERO, |_| Ok(vec![9])),
        PollPolicy::Fixed(Duration::from_secs(60)),
        None,
        &gate,
        &cancel,
    );

    poller.refetch_and_wait().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*poller.state().data, vec![9]);

    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_task() {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = VisibilityGate::new(true);
    let cancel = CancellationToken::new();
    let (poller, handle) = ResourcePoller::spawn(
        ResourceKind::Targets,
        scripted(calls.clone(), Duration::ZERO, |_| Ok(vec![1])),
        PollPolicy::Fixed(Duration::from_secs(5)),
        None,
        gate,
        Arc::new(FixedClock(base_time())),
        cancel.clone(),
    );

    settle().await;
    cancel.cancel();
    handle.await.unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Waiting on a stopped poller returns at once.
    poller.refetch_and_wait().await;
}
