//! Router and middleware for the gateway. Used by `main.rs` and by the
//! integration tests, so both exercise the same stack.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

/// Build the gateway [`Router`]: `/health` at the root, the TTS endpoints
/// under `/api/tts`, and the HTTP middleware around both.
///
/// Layers, innermost first:
///
/// 1. Panic recovery. A panicking handler becomes a 500; job panics are
///    already caught inside the broker.
/// 2. Request timeout. An immediately admitted submit holds the request
///    open for the whole backend call, so this must exceed the backend
///    timeout or the client sees a 408 for a job that still completes.
/// 3. Request id propagated back to the client.
/// 4. Request tracing, with the id in the span.
/// 5. Request id generation.
/// 6. CORS for the browser frontend.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let cors = build_cors_layer(config);
    let request_id_header = HeaderName::from_static("x-request-id");
    let request_timeout = Duration::from_secs(config.request_timeout_secs);

    Router::new()
        .merge(routes::health::router())
        .nest("/api", routes::api_routes())
        .layer(CatchPanicLayer::new())
        // A timed-out submit has already taken its slot; the job still
        // finishes and its result stays pollable until retention evicts it.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// CORS for the frontend: `GET` for status, models and queue, `POST` for
/// submit, JSON bodies only.
///
/// `*` allows any origin without credentials; tower-http refuses a wildcard
/// origin combined with credentials. Listed origins get credentials.
/// Panics at startup on an unparseable origin.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    layer.allow_origin(origins).allow_credentials(true)
}
