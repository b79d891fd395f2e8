//! FIFO backlog of jobs waiting for a free slot.
//!
//! Unbounded, no priority, no cancellation. The broker keeps it behind a
//! mutex; this type itself is plain data.

use std::collections::VecDeque;

use synth_core::synthesis::SynthesisRequest;
use synth_core::types::{JobId, Timestamp};

/// A job that has been accepted but not yet admitted.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: JobId,
    pub request: SynthesisRequest,
    pub enqueued_at: Timestamp,
}

impl QueuedJob {
    pub fn new(id: JobId, request: SynthesisRequest) -> Self {
        Self {
            id,
            request,
            enqueued_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Backlog {
    jobs: VecDeque<QueuedJob>,
}

impl Backlog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job and return the 1-based depth observed right after the
    /// append. The value is a point-in-time estimate for the client.
    pub fn enqueue(&mut self, job: QueuedJob) -> usize {
        self.jobs.push_back(job);
        self.jobs.len()
    }

    /// Remove and return the head job, if any. Never blocks.
    pub fn dequeue_if_nonempty(&mut self) -> Option<QueuedJob> {
        self.jobs.pop_front()
    }

    /// 1-based position of `id`, found by linear scan.
    pub fn position(&self, id: JobId) -> Option<usize> {
        self.jobs.iter().position(|job| job.id == id).map(|i| i + 1)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
