pub mod dashboard;
pub mod health;
pub mod rollouts;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /dashboard                       latest snapshot (GET)
/// /dashboard/refresh               refresh every resource (POST, 202)
/// /dashboard/visibility            open or close the polling gate (PUT)
/// /rollouts/{id}/groups            groups of one rollout (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/dashboard/refresh", post(dashboard::refresh))
        .route("/dashboard/visibility", put(dashboard::set_visibility))
        .route("/rollouts/{id}/groups", get(rollouts::list_groups))
}
