use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok` once every resource has loaded, `starting` before.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether any resource has been fetched successfully.
    pub loaded: bool,
    /// Current value of the visibility gate.
    pub visible: bool,
}

/// GET /health -- returns service status and whether data has loaded.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.engine.latest();

    let status = if snapshot.is_loading { "starting" } else { "ok" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        loaded: snapshot.last_updated.is_some(),
        visible: state.engine.gate().current_value(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
