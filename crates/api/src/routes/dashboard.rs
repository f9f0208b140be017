//! Dashboard snapshot, manual refresh and the visibility gate.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use fleetwatch_core::ResourceKind;
use fleetwatch_engine::DashboardSnapshot;

use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
) -> Json<DataResponse<Arc<DashboardSnapshot>>> {
    Json(DataResponse {
        data: state.engine.latest(),
    })
}

#[derive(Debug, Serialize)]
pub struct RefreshAccepted {
    pub resources: Vec<ResourceKind>,
}

/// POST /api/v1/dashboard/refresh
///
/// Queues a fetch of every resource and returns without waiting for it.
pub async fn refresh(
    State(state): State<AppState>,
) -> (StatusCode, Json<DataResponse<RefreshAccepted>>) {
    state.engine.refetch();
    (
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: RefreshAccepted {
                resources: ResourceKind::ALL.to_vec(),
            },
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

#[derive(Debug, Serialize)]
pub struct VisibilityResponse {
    pub visible: bool,
}

/// PUT /api/v1/dashboard/visibility
pub async fn set_visibility(
    State(state): State<AppState>,
    Json(body): Json<VisibilityRequest>,
) -> Json<DataResponse<VisibilityResponse>> {
    state.engine.set_visible(body.visible);
    Json(DataResponse {
        data: VisibilityResponse {
            visible: state.engine.gate().current_value(),
        },
    })
}
