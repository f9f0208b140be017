//! ManagementClient against an in-process mock of the management API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use fleetwatch_client::{ClientError, FilterExpr, ListQuery, ManagementClient, ResourceSource};
use fleetwatch_core::action::ActionStatus;
use fleetwatch_core::target::UpdateStatus;

#[derive(Clone, Default)]
struct Recorded {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

async fn targets(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    rec.queries.lock().unwrap().push(q);
    rec.auth.lock().unwrap().push(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    Json(json!({
        "content": [
            {
                "controllerId": "dev-01",
                "name": "Gateway 1",
                "updateStatus": "in_sync",
                "lastControllerRequestAt": 1714564800000_i64
            },
            { "controllerId": "dev-02", "updateStatus": "error" }
        ],
        "total": 42,
        "size": 2
    }))
}

async fn actions() -> impl IntoResponse {
    Json(json!({
        "content": [{
            "id": 5,
            "status": "pending",
            "detailStatus": "running",
            "type": "update",
            "_links": { "target": { "href": "http://mgmt/rest/v1/targets/dev-01" } }
        }],
        "total": 1
    }))
}

async fn deploy_groups(Path(id): Path<i64>) -> impl IntoResponse {
    Json(json!({
        "content": [
            { "id": id * 10, "name": "canary", "status": "finished", "totalTargets": 2 },
            { "id": id * 10 + 1, "name": "wave 1", "status": "running", "totalTargets": 8 }
        ],
        "total": 2
    }))
}

async fn broken() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
}

async fn garbage() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{\"content\": 7}")
}

async fn spawn_server(rec: Recorded) -> String {
    let app = Router::new()
        .route("/rest/v1/targets", get(targets))
        .route("/rest/v1/actions", get(actions))
        .route("/rest/v1/rollouts/{id}/deploygroups", get(deploy_groups))
        .route("/rest/v1/rollouts", get(broken))
        .route("/rest/v1/targettypes", get(garbage))
        .with_state(rec);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: String) -> ManagementClient {
    ManagementClient::with_client(
        reqwest::Client::new(),
        base_url,
        Some(("admin".to_string(), "secret".to_string())),
    )
}

#[tokio::test]
async fn lists_targets_with_query_and_auth() {
    let rec = Recorded::default();
    let client = client(spawn_server(rec.clone()).await);

    let query = ListQuery::limit(25)
        .with_offset(50)
        .with_filter(FilterExpr::eq("updatestatus", "error"));
    let page = client.list_targets(&query).await.unwrap();

    assert_eq!(page.total, 42);
    assert_eq!(page.content.len(), 2);
    assert_eq!(page.content[0].name, "Gateway 1");
    assert_eq!(page.content[1].update_status, UpdateStatus::Error);
    assert!(page.content[0].last_poll_at.is_some());

    let queries = rec.queries.lock().unwrap();
    assert_eq!(queries[0].get("limit").map(String::as_str), Some("25"));
    assert_eq!(queries[0].get("offset").map(String::as_str), Some("50"));
    assert_eq!(queries[0].get("q").map(String::as_str), Some("updatestatus==error"));

    let auth = rec.auth.lock().unwrap();
    // base64("admin:secret")
    assert_eq!(auth[0].as_deref(), Some("Basic YWRtaW46c2VjcmV0"));
}

#[tokio::test]
async fn actions_use_detail_status() {
    let client = client(spawn_server(Recorded::default()).await);
    let page = client.list_actions(&ListQuery::default()).await.unwrap();
    assert_eq!(page.content[0].status, ActionStatus::Running);
}

#[tokio::test]
async fn rollout_groups_carry_parent_id() {
    let client = client(spawn_server(Recorded::default()).await);
    let page = client.list_rollout_groups(4, 100).await.unwrap();
    assert_eq!(page.content.len(), 2);
    assert!(page.content.iter().all(|g| g.rollout_id == 4));
    assert_eq!(page.content[0].id, 40);
}

#[tokio::test]
async fn server_error_is_reported_with_status() {
    let client = client(spawn_server(Recorded::default()).await);
    let err = client.list_rollouts(&ListQuery::default()).await.unwrap_err();
    assert_matches!(err, ClientError::Api { status: 500, ref body } if body.contains("unavailable"));
    assert!(err.is_transient());
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let client = client(spawn_server(Recorded::default()).await);
    let err = client
        .list_target_types(&ListQuery::default())
        .await
        .unwrap_err();
    assert_matches!(err, ClientError::Decode { resource: "target_types", .. });
    assert!(!err.is_transient());
}

#[tokio::test]
async fn missing_endpoint_is_an_api_error() {
    let client = client(spawn_server(Recorded::default()).await);
    let err = client
        .list_software_modules(&ListQuery::default())
        .await
        .unwrap_err();
    assert_matches!(err, ClientError::Api { status: 404, .. });
}
