//! Handlers for the `/tts` resource.
//!
//! Submission and status go through the broker. Model listing is a plain
//! pass-through to the backend and does not take an admission slot.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use synth_broker::JobView;
use synth_core::error::CoreError;
use synth_core::job::{parse_job_id, JobState};
use synth_core::synthesis::{SynthesisRequest, DEFAULT_CONTENT_TYPE};
use synth_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Header carrying the job id on a raw result response.
pub const JOB_ID_HEADER: &str = "x-job-id";

/// Body for non-terminal status polls.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub id: JobId,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/tts/synthesize
///
/// Submit a synthesis job. Returns 202 with `{id, state: "queued", position}`
/// when the job was queued, or 200 with the terminal state when a slot was
/// free and the backend call already ran. The audio itself is always
/// fetched from the status endpoint.
pub async fn submit(
    State(state): State<AppState>,
    payload: Result<Json<SynthesisRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) =
        payload.map_err(|e| AppError::Core(CoreError::InvalidPayload(e.body_text())))?;

    let receipt = state.broker.submit(request).await?;

    let status = if receipt.state.is_terminal() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };

    Ok((status, Json(DataResponse { data: receipt })))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/tts/status/{id}
///
/// Queued and processing jobs return a JSON status. A completed job returns
/// the backend's bytes with its content type; an errored job returns the
/// backend fault. Either terminal response consumes the record, so the next
/// poll for the same id is a 404.
pub async fn status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Response> {
    let id = parse_job_id(&raw_id)?;

    let view = state.broker.status(id).await?;
    let job_state = view.state();

    match view {
        JobView::Queued { position } => Ok(pending(id, job_state, Some(position))),
        JobView::Processing => Ok(pending(id, job_state, None)),
        JobView::Completed(output) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_str(&output.content_type)
                    .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
            );
            if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                headers.insert(HeaderName::from_static(JOB_ID_HEADER), value);
            }
            Ok((StatusCode::OK, headers, output.body).into_response())
        }
        JobView::Errored(fault) => Err(AppError::Backend(fault)),
    }
}

/// JSON body for a job that has not reached a terminal state.
fn pending(id: JobId, state: JobState, position: Option<usize>) -> Response {
    Json(DataResponse {
        data: JobStatusResponse {
            id,
            state,
            position,
        },
    })
    .into_response()
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// GET /api/tts/models
///
/// Forward to the backend's model listing and return its JSON verbatim.
pub async fn list_models(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let models = state.broker.backend().list_models().await?;
    Ok(Json(models))
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// GET /api/tts/queue
///
/// Point-in-time occupancy: capacity, in-flight, queued, and retained
/// (terminal but unpolled) counts.
pub async fn queue_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = state.broker.stats().await;
    Ok(Json(DataResponse { data: stats }))
}
