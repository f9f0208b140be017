use std::sync::Arc;

use async_trait::async_trait;
use fleetwatch_core::action::Action;
use fleetwatch_core::catalog::{DistributionSet, SoftwareModule, TargetType};
use fleetwatch_core::rollout::{Rollout, RolloutGroup};
use fleetwatch_core::target::Target;
use fleetwatch_core::types::EntityId;

use crate::error::ClientError;
use crate::query::{ListQuery, Page};

/// Read access to the management backend.
///
/// Every method fetches one page. Implementations must be cheap to call
/// concurrently; the dashboard engine polls all list endpoints in
/// parallel.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn list_targets(&self, query: &ListQuery) -> Result<Page<Target>, ClientError>;

    async fn list_actions(&self, query: &ListQuery) -> Result<Page<Action>, ClientError>;

    async fn list_rollouts(&self, query: &ListQuery) -> Result<Page<Rollout>, ClientError>;

    async fn list_target_types(&self, query: &ListQuery)
        -> Result<Page<TargetType>, ClientError>;

    async fn list_distribution_sets(
        &self,
        query: &ListQuery,
    ) -> Result<Page<DistributionSet>, ClientError>;

    async fn list_software_modules(
        &self,
        query: &ListQuery,
    ) -> Result<Page<SoftwareModule>, ClientError>;

    /// Groups of one rollout. Each group carries `rollout_id`.
    async fn list_rollout_groups(
        &self,
        rollout_id: EntityId,
        limit: u32,
    ) -> Result<Page<RolloutGroup>, ClientError>;
}

#[async_trait]
impl<S: ResourceSource + ?Sized> ResourceSource for Arc<S> {
    async fn list_targets(&self, query: &ListQuery) -> Result<Page<Target>, ClientError> {
        (**self).list_targets(query).await
    }

    async fn list_actions(&self, query: &ListQuery) -> Result<Page<Action>, ClientError> {
        (**self).list_actions(query).await
    }

    async fn list_rollouts(&self, query: &ListQuery) -> Result<Page<Rollout>, ClientError> {
        (**self).list_rollouts(query).await
    }

    async fn list_target_types(
        &self,
        query: &ListQuery,
    ) -> Result<Page<TargetType>, ClientError> {
        (**self).list_target_types(query).await
    }

    async fn list_distribution_sets(
        &self,
        query: &ListQuery,
    ) -> Result<Page<DistributionSet>, ClientError> {
        (**self).list_distribution_sets(query).await
    }

    async fn list_software_modules(
        &self,
        query: &ListQuery,
    ) -> Result<Page<SoftwareModule>, ClientError> {
        (**self).list_software_modules(query).await
    }

    async fn list_rollout_groups(
        &self,
        rollout_id: EntityId,
        limit: u32,
    ) -> Result<Page<RolloutGroup>, ClientError> {
        (**self).list_rollout_groups(rollout_id, limit).await
    }
}
