use axum::extract::{Path, State};
use axum::Json;

use fleetwatch_core::correlator::CorrelatedGroups;
use fleetwatch_core::types::EntityId;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/rollouts/{id}/groups
///
/// Fetched on demand; the parent rollout comes from the latest snapshot.
pub async fn list_groups(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DataResponse<CorrelatedGroups>>> {
    if id <= 0 {
        return Err(AppError::BadRequest(format!("invalid rollout id {id}")));
    }
    let groups = state.engine.rollout_groups(id).await?;
    Ok(Json(DataResponse { data: groups }))
}
