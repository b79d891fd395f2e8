pub mod health;
pub mod tts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /tts/synthesize                 submit a job (POST)
/// /tts/status/{id}                poll a job (GET, terminal results consumed)
/// /tts/models                     backend model list, passed through (GET)
/// /tts/queue                      broker occupancy snapshot (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/tts", tts::router())
}
