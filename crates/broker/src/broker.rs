//! Submission and status façade over the gate, backlog, and store.
//!
//! Lock order is always backlog, then store. Both the submit path and the
//! dispatcher move a job into the store while still holding the backlog
//! lock, so a status poll never sees a job in neither place.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use synth_backend::SynthesisBackend;
use synth_core::error::CoreError;
use synth_core::job::{JobState, Submission};
use synth_core::synthesis::{validate_request, BackendFault, SynthesisOutput, SynthesisRequest};
use synth_core::types::{JobId, Timestamp};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::backlog::{Backlog, QueuedJob};
use crate::config::BrokerConfig;
use crate::gate::AdmissionGate;
use crate::store::{JobOutcome, Lookup, ResultStore};

/// What a status poll returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobView {
    /// Waiting in the backlog at this 1-based position.
    Queued { position: usize },
    /// Holding a slot; backend call still running.
    Processing,
    /// Backend output. The record is gone once this is returned.
    Completed(SynthesisOutput),
    /// Backend fault. The record is gone once this is returned.
    Errored(BackendFault),
}

impl JobView {
    pub fn state(&self) -> JobState {
        match self {
            Self::Queued { .. } => JobState::Queued,
            Self::Processing => JobState::Processing,
            Self::Completed(_) => JobState::Completed,
            Self::Errored(_) => JobState::Errored,
        }
    }
}

/// Point-in-time snapshot of broker occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BrokerStats {
    pub capacity: usize,
    pub in_flight: usize,
    pub queued: usize,
    /// Terminal results waiting to be polled.
    pub retained: usize,
}

/// The admission-controlled job broker.
///
/// Created once at startup via [`Broker::new`]; the returned `Arc` is
/// cheap to clone into request handlers and background tasks.
pub struct Broker {
    gate: AdmissionGate,
    backlog: Mutex<Backlog>,
    store: Mutex<ResultStore>,
    backend: Arc<dyn SynthesisBackend>,
    config: BrokerConfig,
    /// Fired on every enqueue and every slot release.
    wake: Notify,
}

/// Holds one admission slot for the lifetime of a job's execution.
///
/// Dropping it releases the slot and wakes the dispatcher, whether the job
/// finished, failed, or its task was torn down.
struct SlotGuard {
    broker: Arc<Broker>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.broker.gate.release();
        self.broker.wake.notify_one();
    }
}

impl Broker {
    pub fn new(backend: Arc<dyn SynthesisBackend>, config: BrokerConfig) -> Arc<Self> {
        tracing::info!(
            concurrency = config.concurrency,
            backend_timeout_ms = config.backend_timeout.as_millis() as u64,
            "Broker created",
        );
        Arc::new(Self {
            gate: AdmissionGate::new(config.concurrency),
            backlog: Mutex::new(Backlog::new()),
            store: Mutex::new(ResultStore::new()),
            backend,
            config,
            wake: Notify::new(),
        })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// The backend jobs are run against. Also used for pass-through calls
    /// that bypass admission, such as listing models.
    pub fn backend(&self) -> &Arc<dyn SynthesisBackend> {
        &self.backend
    }

    /// Number of jobs currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.gate.in_flight()
    }

    pub async fn stats(&self) -> BrokerStats {
        let queued = self.backlog.lock().await.len();
        let retained = self.store.lock().await.finished_count();
        BrokerStats {
            capacity: self.gate.capacity(),
            in_flight: self.gate.in_flight(),
            queued,
            retained,
        }
    }

    // -----------------------------------------------------------------------
    // Submit
    // -----------------------------------------------------------------------

    /// Accept a synthesis job.
    ///
    /// When the backlog is empty and a slot is free the backend call runs
    /// before this returns, and the receipt carries the terminal state. The
    /// output is still only available through [`Broker::status`].
    /// Otherwise the job is queued and the receipt carries its position.
    ///
    /// Invalid requests are rejected before any admission decision.
    pub async fn submit(self: &Arc<Self>, request: SynthesisRequest) -> Result<Submission, CoreError> {
        validate_request(&request)?;
        let id = uuid::Uuid::new_v4();

        let mut backlog = self.backlog.lock().await;
        let admitted = backlog.is_empty() && self.gate.try_admit();
        if !admitted {
            let position = backlog.enqueue(QueuedJob::new(id, request));
            drop(backlog);
            self.wake.notify_one();

            tracing::info!(job_id = %id, position, "Job queued");
            return Ok(Submission {
                id,
                state: JobState::Queued,
                position: Some(position),
            });
        }

        // Guard first: the store lock below is a suspension point.
        let slot = SlotGuard {
            broker: Arc::clone(self),
        };
        self.store.lock().await.mark_processing(id, Utc::now());
        drop(backlog);

        tracing::info!(job_id = %id, in_flight = self.gate.in_flight(), "Job admitted immediately");

        // Run in its own task so a dropped request cannot abandon a job
        // that holds a slot.
        let state = match self.launch(id, request, slot).await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Job task failed to complete");
                JobState::Errored
            }
        };

        Ok(Submission {
            id,
            state,
            position: None,
        })
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Poll a job.
    ///
    /// Queued jobs report their current position (linear scan). Terminal
    /// records are removed by this call, so a second poll returns
    /// `NotFound`, as does an id that never existed or was evicted.
    pub async fn status(&self, id: JobId) -> Result<JobView, CoreError> {
        if let Some(position) = self.backlog.lock().await.position(id) {
            return Ok(JobView::Queued { position });
        }

        match self.store.lock().await.take(id) {
            Some(Lookup::Processing) => Ok(JobView::Processing),
            Some(Lookup::Finished(Ok(output))) => {
                tracing::debug!(job_id = %id, bytes = output.body.len(), "Result consumed");
                Ok(JobView::Completed(output))
            }
            Some(Lookup::Finished(Err(fault))) => {
                tracing::debug!(job_id = %id, status = fault.status_code(), "Fault consumed");
                Ok(JobView::Errored(fault))
            }
            None => Err(CoreError::NotFound {
                entity: "Job",
                id: id.to_string(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Promote queued jobs while slots are free. Returns how many were
    /// started. Never waits on a backend call.
    pub(crate) async fn dispatch_ready(self: &Arc<Self>) -> usize {
        let mut started = 0;
        loop {
            let mut backlog = self.backlog.lock().await;
            if backlog.is_empty() || !self.gate.try_admit() {
                break;
            }
            let Some(job) = backlog.dequeue_if_nonempty() else {
                self.gate.release();
                break;
            };
            let slot = SlotGuard {
                broker: Arc::clone(self),
            };
            self.store.lock().await.mark_processing(job.id, Utc::now());
            drop(backlog);

            let waited_ms = (Utc::now() - job.enqueued_at).num_milliseconds();
            tracing::info!(
                job_id = %job.id,
                waited_ms,
                in_flight = self.gate.in_flight(),
                "Job dispatched from backlog",
            );

            // Detached: the job records its own outcome and frees its slot.
            drop(self.launch(job.id, job.request, slot));
            started += 1;
        }
        started
    }

    /// Wait until something may be dispatchable.
    pub(crate) async fn woken(&self) {
        self.wake.notified().await;
    }

    // -----------------------------------------------------------------------
    // Retention
    // -----------------------------------------------------------------------

    /// Evict terminal records that finished more than `result_ttl` before
    /// `now`. Returns the number evicted.
    pub async fn purge_expired(&self, now: Timestamp) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(self.config.result_ttl) else {
            return 0;
        };
        let Some(cutoff) = now.checked_sub_signed(ttl) else {
            return 0;
        };
        self.store.lock().await.purge_finished_before(cutoff)
    }

    // ---- private helpers ----

    /// Run one job to completion on its own task: call the backend, store
    /// the outcome, then release the slot.
    fn launch(
        self: &Arc<Self>,
        id: JobId,
        request: SynthesisRequest,
        slot: SlotGuard,
    ) -> JoinHandle<JobState> {
        let broker = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = broker.call_backend(id, &request).await;
            let done = broker.store.lock().await.finish(id, outcome, Utc::now());
            drop(slot);
            if let Some(ran_for) = done.ran_for {
                tracing::debug!(
                    job_id = %id,
                    state = %done.state,
                    ran_ms = ran_for.num_milliseconds(),
                    "Slot released",
                );
            }
            done.state
        })
    }

    /// One bounded backend call. Timeouts and panics become faults so the
    /// job always reaches a terminal state.
    async fn call_backend(&self, id: JobId, request: &SynthesisRequest) -> JobOutcome {
        let timeout = self.config.backend_timeout;
        let call = AssertUnwindSafe(self.backend.synthesize(request)).catch_unwind();

        let outcome = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(BackendFault::Internal(
                "backend call panicked".to_string(),
            )),
            Err(_) => Err(BackendFault::Timeout {
                after_ms: timeout.as_millis() as u64,
            }),
        };

        match &outcome {
            Ok(output) => tracing::info!(
                job_id = %id,
                bytes = output.body.len(),
                content_type = %output.content_type,
                "Job completed",
            ),
            Err(fault) => tracing::warn!(
                job_id = %id,
                status = fault.status_code(),
                error = %fault,
                "Job errored",
            ),
        }
        outcome
    }
}
