use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use synth_core::error::CoreError;
use synth_core::synthesis::BackendFault;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`BackendFault`] for failures
/// relayed from the synthesis backend. Implements [`IntoResponse`] to
/// produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `synth_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A backend fault, either from a job's terminal record or from a
    /// pass-through call.
    #[error(transparent)]
    Backend(#[from] BackendFault),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::InvalidPayload(msg) => {
                    (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Backend faults ---
            AppError::Backend(fault) => classify_backend_fault(fault),

            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a backend fault into an HTTP status, error code, and message.
///
/// - Protocol faults relay the backend's status and body verbatim.
/// - Transport and timeout faults are 500 with a descriptive detail.
/// - Internal faults are 500 with a sanitized message.
fn classify_backend_fault(fault: &BackendFault) -> (StatusCode, &'static str, String) {
    match fault {
        BackendFault::Protocol { status, body } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            "BACKEND_ERROR",
            body.clone(),
        ),
        BackendFault::Transport(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "BACKEND_UNAVAILABLE",
            fault.detail(),
        ),
        BackendFault::Timeout { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "BACKEND_TIMEOUT",
            fault.detail(),
        ),
        BackendFault::Internal(msg) => {
            tracing::error!(error = %msg, "Job failed inside the gateway");
            internal()
        }
    }
}
