//! Periodic eviction of terminal results nobody polled.
//!
//! Without this, a client that submits and never polls leaks its result
//! for the life of the process. Runs on a fixed interval using
//! `tokio::time::interval`.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::broker::Broker;

/// Run the result retention loop until `cancel` is triggered.
///
/// Each tick evicts terminal records older than the broker's
/// `result_ttl`. Queued and processing jobs are never evicted.
pub async fn run(broker: Arc<Broker>, cancel: CancellationToken) {
    let config = broker.config();
    tracing::info!(
        ttl_secs = config.result_ttl.as_secs(),
        interval_secs = config.sweep_interval.as_secs(),
        "Result retention job started"
    );

    let mut interval = tokio::time::interval(config.sweep_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Result retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = broker.purge_expired(Utc::now()).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Result retention: evicted unpolled results");
                } else {
                    tracing::debug!("Result retention: nothing to evict");
                }
            }
        }
    }
}
