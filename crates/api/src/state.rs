use std::sync::Arc;

use fleetwatch_engine::DashboardEngine;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// The running dashboard engine.
    pub engine: Arc<DashboardEngine>,
}
