//! Job lifecycle states and the views returned to clients.
//!
//! A job moves `Queued -> Processing -> {Completed, Errored}`. `Processing`
//! is skipped from the client's point of view when a slot is free at
//! submission time, because the submit call only returns once the backend
//! call has finished.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::JobId;

/// Externally observable job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Errored,
}

impl JobState {
    /// Return the wire name of this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Errored => "errored",
        }
    }

    /// Terminal states are consumed by the first status poll.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Errored)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receipt returned by `submit`.
///
/// `position` is only present for queued jobs. It is the 1-based backlog
/// depth observed at enqueue time and is advisory: it may be stale by the
/// time the client polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub id: JobId,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

/// Parse a client-supplied job id.
///
/// Anything that is not a UUID cannot name a job, so it is reported as
/// `NotFound` rather than as a malformed request.
pub fn parse_job_id(raw: &str) -> Result<JobId, CoreError> {
    uuid::Uuid::parse_str(raw.trim()).map_err(|_| CoreError::NotFound {
        entity: "Job",
        id: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_wire_names() {
        assert_eq!(JobState::Queued.as_str(), "queued");
        assert_eq!(JobState::Processing.as_str(), "processing");
        assert_eq!(JobState::Completed.as_str(), "completed");
        assert_eq!(JobState::Errored.as_str(), "errored");
        assert_eq!(
            serde_json::to_value(JobState::Errored).unwrap(),
            serde_json::json!("errored")
        );
    }

    #[test]
    fn only_completed_and_errored_are_terminal() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Processing.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Errored.is_terminal());
    }

    #[test]
    fn submission_omits_position_when_absent() {
        let id = uuid::Uuid::new_v4();
        let receipt = Submission {
            id,
            state: JobState::Completed,
            position: None,
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["state"], "completed");
        assert!(json.get("position").is_none());
    }

    #[test]
    fn parse_job_id_accepts_uuid() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(parse_job_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn parse_job_id_rejects_garbage_as_not_found() {
        let err = parse_job_id("nonexistent-id").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "Job", .. }));
    }
}
