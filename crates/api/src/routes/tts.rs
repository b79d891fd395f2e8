use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tts;
use crate::state::AppState;

/// Routes mounted at `/api/tts`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/synthesize", post(tts::submit))
        .route("/status/{id}", get(tts::status))
        .route("/models", get(tts::list_models))
        .route("/queue", get(tts::queue_stats))
}
