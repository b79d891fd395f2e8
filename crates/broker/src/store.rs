//! Per-job record store with single-consumption reads.
//!
//! Holds jobs from the moment they are admitted. A terminal record is
//! removed by the first [`ResultStore::take`] that sees it, or by the
//! retention sweeper once it is older than the configured TTL.

use std::collections::HashMap;

use synth_core::job::JobState;
use synth_core::synthesis::{BackendFault, SynthesisOutput};
use synth_core::types::{JobId, Timestamp};

/// Result of one backend call.
pub type JobOutcome = Result<SynthesisOutput, BackendFault>;

#[derive(Debug, Clone)]
pub enum JobRecord {
    /// Admitted and waiting on the backend.
    Processing { started_at: Timestamp },
    /// Backend call finished; waiting to be polled.
    Finished {
        outcome: JobOutcome,
        finished_at: Timestamp,
    },
}

impl JobRecord {
    pub fn state(&self) -> JobState {
        match self {
            Self::Processing { .. } => JobState::Processing,
            Self::Finished { outcome: Ok(_), .. } => JobState::Completed,
            Self::Finished { outcome: Err(_), .. } => JobState::Errored,
        }
    }
}

/// What [`ResultStore::finish`] recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub state: JobState,
    /// Time from admission to finish; `None` if the job was never marked
    /// processing.
    pub ran_for: Option<chrono::Duration>,
}

/// What a status poll found in the store.
#[derive(Debug, Clone)]
pub enum Lookup {
    Processing,
    Finished(JobOutcome),
}

#[derive(Debug, Default)]
pub struct ResultStore {
    records: HashMap<JobId, JobRecord>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `id` has been admitted.
    pub fn mark_processing(&mut self, id: JobId, now: Timestamp) {
        self.records
            .insert(id, JobRecord::Processing { started_at: now });
    }

    /// Store the terminal outcome for `id`, replacing its processing
    /// record.
    pub fn finish(&mut self, id: JobId, outcome: JobOutcome, now: Timestamp) -> Completion {
        let record = JobRecord::Finished {
            outcome,
            finished_at: now,
        };
        let state = record.state();
        let started_at = match self.records.insert(id, record) {
            Some(JobRecord::Processing { started_at }) => Some(started_at),
            _ => None,
        };
        Completion {
            state,
            ran_for: started_at.map(|started| now - started),
        }
    }

    /// Look up `id`. Terminal records are removed by this call; a
    /// processing record is left in place.
    pub fn take(&mut self, id: JobId) -> Option<Lookup> {
        match self.records.get(&id)? {
            JobRecord::Processing { .. } => Some(Lookup::Processing),
            JobRecord::Finished { .. } => match self.records.remove(&id)? {
                JobRecord::Finished { outcome, .. } => Some(Lookup::Finished(outcome)),
                JobRecord::Processing { .. } => None,
            },
        }
    }

    /// Drop terminal records that finished before `cutoff`. Processing
    /// records are never touched. Returns the number of records removed.
    pub fn purge_finished_before(&mut self, cutoff: Timestamp) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| match record {
            JobRecord::Processing { .. } => true,
            JobRecord::Finished { finished_at, .. } => *finished_at >= cutoff,
        });
        before - self.records.len()
    }

    /// Number of terminal records waiting to be polled.
    pub fn finished_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| matches!(r, JobRecord::Finished { .. }))
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn audio() -> SynthesisOutput {
        SynthesisOutput {
            content_type: "audio/wav".to_string(),
            body: vec![1, 2, 3],
        }
    }

    #[test]
    fn terminal_record_is_consumed_once() {
        let mut store = ResultStore::new();
        let id = uuid::Uuid::new_v4();
        let now = Utc::now();

        store.mark_processing(id, now);
        assert_eq!(store.finish(id, Ok(audio()), now).state, JobState::Completed);

        assert!(matches!(store.take(id), Some(Lookup::Finished(Ok(out))) if out == audio()));
        assert!(store.take(id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn processing_record_survives_polls() {
        let mut store = ResultStore::new();
        let id = uuid::Uuid::new_v4();
        store.mark_processing(id, Utc::now());

        assert!(matches!(store.take(id), Some(Lookup::Processing)));
        assert!(matches!(store.take(id), Some(Lookup::Processing)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn errored_outcome_reports_errored_state() {
        let mut store = ResultStore::new();
        let id = uuid::Uuid::new_v4();
        let fault = BackendFault::Transport("refused".to_string());

        assert_eq!(
            store.finish(id, Err(fault.clone()), Utc::now()).state,
            JobState::Errored
        );
        assert!(matches!(store.take(id), Some(Lookup::Finished(Err(f))) if f == fault));
    }

    #[test]
    fn finish_reports_time_since_admission() {
        let mut store = ResultStore::new();
        let id = uuid::Uuid::new_v4();
        let started = Utc::now();
        store.mark_processing(id, started);

        let done = store.finish(id, Ok(audio()), started + Duration::milliseconds(1500));
        assert_eq!(done.ran_for, Some(Duration::milliseconds(1500)));

        let never_started = store.finish(uuid::Uuid::new_v4(), Ok(audio()), started);
        assert_eq!(never_started.ran_for, None);
    }

    #[test]
    fn unknown_id_is_none() {
        let mut store = ResultStore::new();
        assert!(store.take(uuid::Uuid::new_v4()).is_none());
    }

    #[test]
    fn purge_only_drops_old_terminal_records() {
        let mut store = ResultStore::new();
        let now = Utc::now();
        let old = uuid::Uuid::new_v4();
        let fresh = uuid::Uuid::new_v4();
        let running = uuid::Uuid::new_v4();

        store.finish(old, Ok(audio()), now - Duration::hours(2));
        store.finish(fresh, Ok(audio()), now);
        store.mark_processing(running, now - Duration::hours(5));

        let purged = store.purge_finished_before(now - Duration::hours(1));

        assert_eq!(purged, 1);
        assert!(store.take(old).is_none());
        assert!(matches!(store.take(running), Some(Lookup::Processing)));
        assert!(matches!(store.take(fresh), Some(Lookup::Finished(Ok(_)))));
    }

    #[test]
    fn finished_count_ignores_processing() {
        let mut store = ResultStore::new();
        let now = Utc::now();
        store.mark_processing(uuid::Uuid::new_v4(), now);
        store.finish(uuid::Uuid::new_v4(), Ok(audio()), now);
        assert_eq!(store.finished_count(), 1);
        assert_eq!(store.len(), 2);
    }
}
