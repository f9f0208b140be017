use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use fleetwatch_client::ClientError;
use fleetwatch_core::CoreError;
use fleetwatch_engine::EngineError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent `{error, code}` JSON
/// error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// An error from the dashboard engine or the backend behind it.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        Self::Engine(EngineError::Client(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Engine(EngineError::Core(CoreError::Validation(msg))) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }

            AppError::Engine(EngineError::Client(err)) => classify_client_error(err),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a management API failure into an HTTP status, error code, and
/// message.
///
/// - A 404 from the backend stays a 404.
/// - Everything else is the backend's fault and maps to 502.
fn classify_client_error(err: &ClientError) -> (StatusCode, &'static str, String) {
    match err {
        ClientError::Api { status: 404, .. } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        ClientError::Config(msg) => {
            tracing::error!(error = %msg, "Management client misconfigured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::warn!(error = %other, transient = other.is_transient(), "Management API error");
            (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "The management backend request failed".to_string(),
            )
        }
    }
}
