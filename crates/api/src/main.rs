use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use synth_api::config::ServerConfig;
use synth_api::router::build_app_router;
use synth_api::state::AppState;
use synth_backend::TtsApi;
use synth_broker::{retention, Broker, Dispatcher};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "synth_api=debug,synth_broker=debug,synth_backend=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = %config.backend_api_url,
        concurrency = config.broker.concurrency,
        "Loaded server configuration",
    );

    // --- Backend client ---
    let backend = TtsApi::new(config.backend_api_url.clone())
        .with_timeout(config.broker.backend_timeout);

    // --- Broker ---
    let broker = Broker::new(Arc::new(backend), config.broker.clone());

    let cancel = CancellationToken::new();
    let dispatcher_handle = Dispatcher::spawn(Arc::clone(&broker), cancel.clone());
    let retention_handle = tokio::spawn(retention::run(Arc::clone(&broker), cancel.clone()));
    tracing::info!("Broker services started (dispatcher, result retention)");

    // --- App state ---
    let state = AppState {
        broker: Arc::clone(&broker),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let wait = Duration::from_secs(config.shutdown_timeout_secs);
    let _ = tokio::time::timeout(wait, dispatcher_handle).await;
    let _ = tokio::time::timeout(wait, retention_handle).await;

    let stats = broker.stats().await;
    if stats.queued > 0 || stats.in_flight > 0 || stats.retained > 0 {
        // Jobs are not persisted across restarts.
        tracing::warn!(
            queued = stats.queued,
            in_flight = stats.in_flight,
            retained = stats.retained,
            "Discarding unfinished and unpolled jobs",
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
