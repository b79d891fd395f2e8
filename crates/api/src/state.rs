use std::sync::Arc;

use synth_broker::Broker;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Server configuration is consumed while building the router and is not
/// needed per request.
#[derive(Clone)]
pub struct AppState {
    /// The admission-controlled job broker.
    pub broker: Arc<Broker>,
}
