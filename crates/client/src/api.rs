//! REST client for the management API list endpoints.
//!
//! Wraps the read-only `/rest/v1` collection endpoints using [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use fleetwatch_core::action::Action;
use fleetwatch_core::catalog::{DistributionSet, SoftwareModule, TargetType};
use fleetwatch_core::rollout::{Rollout, RolloutGroup};
use fleetwatch_core::target::Target;
use fleetwatch_core::types::EntityId;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::query::{ListQuery, Page};
use crate::source::ResourceSource;
use crate::wire::{
    ActionDto, DistributionSetDto, PageDto, RolloutDto, RolloutGroupDto, SoftwareModuleDto,
    TargetDto, TargetTypeDto,
};

const API_PREFIX: &str = "/rest/v1";

/// HTTP client for one management server.
#[derive(Clone)]
pub struct ManagementClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl std::fmt::Debug for ManagementClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.credentials.is_some())
            .finish()
    }
}

impl ManagementClient {
    /// Build a client with its own connection pool and request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self::with_client(
            client,
            config.base_url.clone(),
            config.credentials(),
        ))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        credentials: Option<(String, String)>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}/rest/v1/{path}` with the page query, decoded as a page.
    async fn fetch_page<D: DeserializeOwned>(
        &self,
        resource: &'static str,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<PageDto<D>, ClientError> {
        let url = format!("{}{API_PREFIX}/{path}", self.base_url);
        let mut request = self.client.get(&url).query(params);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }

        tracing::debug!(resource, url = %url, "Fetching page");
        let response = request.send().await?;
        Self::parse_response(resource, response).await
    }

    async fn list<D, T>(
        &self,
        resource: &'static str,
        path: &str,
        query: &ListQuery,
    ) -> Result<Page<T>, ClientError>
    where
        D: DeserializeOwned,
        T: From<D>,
    {
        let page = self
            .fetch_page::<D>(resource, path, &query.params())
            .await?;
        Ok(page.into_page(T::from))
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ClientError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        resource: &'static str,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
            resource,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ResourceSource for ManagementClient {
    async fn list_targets(&self, query: &ListQuery) -> Result<Page<Target>, ClientError> {
        self.list::<TargetDto, _>("targets", "targets", query).await
    }

    async fn list_actions(&self, query: &ListQuery) -> Result<Page<Action>, ClientError> {
        self.list::<ActionDto, _>("actions", "actions", query).await
    }

    async fn list_rollouts(&self, query: &ListQuery) -> Result<Page<Rollout>, ClientError> {
        self.list::<RolloutDto, _>("rollouts", "rollouts", query).await
    }

    async fn list_target_types(
        &self,
        query: &ListQuery,
    ) -> Result<Page<TargetType>, ClientError> {
        self.list::<TargetTypeDto, _>("target_types", "targettypes", query)
            .await
    }

    async fn list_distribution_sets(
        &self,
        query: &ListQuery,
    ) -> Result<Page<DistributionSet>, ClientError> {
        self.list::<DistributionSetDto, _>("distribution_sets", "distributionsets", query)
            .await
    }

    async fn list_software_modules(
        &self,
        query: &ListQuery,
    ) -> Result<Page<SoftwareModule>, ClientError> {
        self.list::<SoftwareModuleDto, _>("software_modules", "softwaremodules", query)
            .await
    }

    async fn list_rollout_groups(
        &self,
        rollout_id: EntityId,
        limit: u32,
    ) -> Result<Page<RolloutGroup>, ClientError> {
        let query = ListQuery::limit(limit);
        let page = self
            .fetch_page::<RolloutGroupDto>(
                "rollout_groups",
                &format!("rollouts/{rollout_id}/deploygroups"),
                &query.params(),
            )
            .await?;
        Ok(page.into_page(|dto| dto.into_group(rollout_id)))
    }
}
