//! Fan-out of a manual "refresh everything" across all pollers.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;

use fleetwatch_core::ResourceKind;

use crate::poller::ResourcePoller;
use crate::store::PollerSet;

/// Type-erased view of a poller for refresh purposes.
pub trait Refetch: Send + Sync {
    fn kind(&self) -> ResourceKind;
    fn refetch(&self);
    fn refetch_and_wait(&self) -> BoxFuture<'_, ()>;
    fn is_fetching(&self) -> bool;
}

impl<T: Send + Sync + 'static> Refetch for ResourcePoller<T> {
    fn kind(&self) -> ResourceKind {
        ResourcePoller::kind(self)
    }

    fn refetch(&self) {
        ResourcePoller::refetch(self)
    }

    fn refetch_and_wait(&self) -> BoxFuture<'_, ()> {
        ResourcePoller::refetch_and_wait(self).boxed()
    }

    fn is_fetching(&self) -> bool {
        ResourcePoller::is_fetching(self)
    }
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    pollers: Vec<Arc<dyn Refetch>>,
}

impl RefreshCoordinator {
    pub fn new(pollers: Vec<Arc<dyn Refetch>>) -> Self {
        Self { pollers }
    }

    pub fn from_set(set: &PollerSet) -> Self {
        Self::new(vec![
            Arc::new(set.targets.clone()),
            Arc::new(set.actions.clone()),
            Arc::new(set.rollouts.clone()),
            Arc::new(set.target_types.clone()),
            Arc::new(set.distribution_sets.clone()),
            Arc::new(set.software_modules.clone()),
        ])
    }

    /// Ask every poller to fetch now. Does not wait.
    pub fn refetch(&self) {
        tracing::info!(pollers = self.pollers.len(), "Refreshing all resources");
        for poller in &self.pollers {
            poller.refetch();
        }
    }

    /// Fetch every resource concurrently and wait until all have settled.
    pub async fn refetch_and_wait(&self) {
        join_all(self.pollers.iter().map(|p| p.refetch_and_wait())).await;
    }

    /// True while any poller has a fetch outstanding.
    pub fn is_fetching(&self) -> bool {
        self.pollers.iter().any(|p| p.is_fetching())
    }

    /// Resources with a fetch outstanding.
    pub fn fetching(&self) -> Vec<ResourceKind> {
        self.pollers
            .iter()
            .filter(|p| p.is_fetching())
            .map(|p| p.kind())
            .collect()
    }
}
