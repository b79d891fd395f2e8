//! Background dispatcher.
//!
//! A single long-lived Tokio task that promotes backlog jobs into free
//! slots. It is woken by the broker on every enqueue and every slot
//! release; `dispatch_idle` is only a fallback tick.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::broker::Broker;

pub struct Dispatcher {
    broker: Arc<Broker>,
    idle_interval: Duration,
}

impl Dispatcher {
    /// Create a dispatcher using the broker's configured idle interval.
    pub fn new(broker: Arc<Broker>) -> Self {
        let idle_interval = broker.config().dispatch_idle;
        Self {
            broker,
            idle_interval,
        }
    }

    /// Spawn [`Dispatcher::run`] on the current runtime.
    pub fn spawn(broker: Arc<Broker>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let dispatcher = Self::new(broker);
        tokio::spawn(async move { dispatcher.run(cancel).await })
    }

    /// Run the dispatcher loop until the cancellation token is triggered.
    ///
    /// A job's failure is recorded on that job and never reaches this loop,
    /// so the loop only stops on cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            idle_interval_ms = self.idle_interval.as_millis() as u64,
            "Job dispatcher started",
        );

        loop {
            let started = self.broker.dispatch_ready().await;
            if started > 0 {
                tracing::debug!(
                    started,
                    in_flight = self.broker.in_flight(),
                    "Dispatch cycle promoted queued jobs",
                );
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job dispatcher shutting down");
                    break;
                }
                _ = self.broker.woken() => {}
                _ = tokio::time::sleep(self.idle_interval) => {}
            }
        }
    }
}
