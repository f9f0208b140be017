#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{Duration as ChronoDuration, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use fleetwatch_api::config::ServerConfig;
use fleetwatch_api::router::build_app_router;
use fleetwatch_api::state::AppState;
use fleetwatch_client::{ClientError, ListQuery, Page, ResourceSource};
use fleetwatch_core::action::Action;
use fleetwatch_core::catalog::{DistributionSet, SoftwareModule, TargetType};
use fleetwatch_core::rollout::{
    Rollout, RolloutGroup, RolloutGroupStatus, RolloutStatus, TargetCounts,
};
use fleetwatch_core::target::{Target, UpdateStatus};
use fleetwatch_core::types::EntityId;
use fleetwatch_engine::{DashboardEngine, EngineConfig};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
    }
}

// ---------------------------------------------------------------------------
// Fake backend
// ---------------------------------------------------------------------------

/// Minimal in-memory management backend.
#[derive(Default)]
pub struct FakeSource {
    pub targets: Mutex<Vec<Target>>,
    pub rollouts: Mutex<Vec<Rollout>>,
    pub groups: Mutex<Vec<RolloutGroup>>,
    /// Status returned by the group endpoint instead of data.
    pub groups_status: Mutex<Option<u16>>,
    pub target_calls: AtomicUsize,
}

impl FakeSource {
    pub fn seeded() -> Arc<Self> {
        let source = Self::default();
        let now = Utc::now();
        *source.targets.lock().unwrap() = (0..4)
            .map(|i| Target {
                controller_id: format!("dev-{i}"),
                name: format!("Device {i}"),
                last_poll_at: Some(now - ChronoDuration::minutes(1)),
                update_status: UpdateStatus::InSync,
                target_type_name: None,
                created_at: Some(now - ChronoDuration::days(1)),
                has_security_token: true,
                assigned_distribution_set: None,
            })
            .collect();
        *source.rollouts.lock().unwrap() = vec![Rollout {
            id: 3,
            name: "Spring wave".into(),
            status: RolloutStatus::Running,
            total_targets: 4,
            targets_per_status: TargetCounts {
                running: 2,
                finished: 2,
                ..TargetCounts::default()
            },
            total_groups: 1,
            created_at: Some(now - ChronoDuration::hours(2)),
            distribution_set_id: None,
        }];
        *source.groups.lock().unwrap() = vec![RolloutGroup {
            id: 30,
            rollout_id: 3,
            name: "Canary".into(),
            status: RolloutGroupStatus::Running,
            total_targets: 4,
            targets_per_status: TargetCounts {
                running: 2,
                finished: 2,
                ..TargetCounts::default()
            },
        }];
        Arc::new(source)
    }

    pub fn target_calls(&self) -> usize {
        self.target_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceSource for FakeSource {
    async fn list_targets(&self, _query: &ListQuery) -> Result<Page<Target>, ClientError> {
        self.target_calls.fetch_add(1, Ordering::SeqCst);
        let content = self.targets.lock().unwrap().clone();
        let total = content.len() as u64;
        Ok(Page { content, total })
    }

    async fn list_actions(&self, _query: &ListQuery) -> Result<Page<Action>, ClientError> {
        Ok(Page::empty())
    }

    async fn list_rollouts(&self, _query: &ListQuery) -> Result<Page<Rollout>, ClientError> {
        let content = self.rollouts.lock().unwrap().clone();
        let total = content.len() as u64;
        Ok(Page { content, total })
    }

    async fn list_target_types(
        &self,
        _query: &ListQuery,
    ) -> Result<Page<TargetType>, ClientError> {
        Ok(Page::empty())
    }

    async fn list_distribution_sets(
        &self,
        _query: &ListQuery,
    ) -> Result<Page<DistributionSet>, ClientError> {
        Ok(Page::empty())
    }

    async fn list_software_modules(
        &self,
        _query: &ListQuery,
    ) -> Result<Page<SoftwareModule>, ClientError> {
        Ok(Page::empty())
    }

    async fn list_rollout_groups(
        &self,
        rollout_id: EntityId,
        _limit: u32,
    ) -> Result<Page<RolloutGroup>, ClientError> {
        if let Some(status) = *self.groups_status.lock().unwrap() {
            return Err(ClientError::Api {
                status,
                body: "backend says no".into(),
            });
        }
        let content: Vec<RolloutGroup> = self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.rollout_id == rollout_id)
            .cloned()
            .collect();
        let total = content.len() as u64;
        Ok(Page { content, total })
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub engine: Arc<DashboardEngine>,
    pub source: Arc<FakeSource>,
}

/// Start an engine over `source`, wait for the first full load, and build
/// the router with the production middleware stack.
pub async fn build_test_app(source: Arc<FakeSource>) -> TestApp {
    let engine = Arc::new(
        DashboardEngine::start(source.clone(), EngineConfig::default()).unwrap(),
    );

    let mut rx = engine.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        while rx.borrow_and_update().is_loading {
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("engine did not load");

    let config = test_config();
    let state = AppState {
        engine: Arc::clone(&engine),
    };

    TestApp {
        router: build_app_router(state, &config),
        engine,
        source,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn put_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
