//! Synthesis request shape, backend output, and backend fault taxonomy.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of characters accepted in `gen_text`.
pub const MAX_GEN_TEXT_LEN: usize = 10_000;

/// Maximum length of a model name.
const MAX_MODEL_NAME_LEN: usize = 256;

/// Status code synthesized for faults that never reached the backend.
pub const TRANSPORT_FAULT_STATUS: u16 = 500;

/// Content type assumed when the backend omits the header.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

type JsonObject = serde_json::Map<String, serde_json::Value>;

/// A text-to-speech synthesis request, kept as the JSON object the client
/// sent.
///
/// The gateway never rebuilds the body: explicit `null`s, non-string
/// optional fields, and fields it does not know about all reach the backend
/// as submitted. Only `model_name` and `gen_text` are read, through
/// [`SynthesisRequest::view`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynthesisRequest {
    body: JsonObject,
}

/// Borrowed view of the fields the gateway checks before admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestView<'a> {
    pub model_name: &'a str,
    pub gen_text: &'a str,
}

impl SynthesisRequest {
    /// Minimal request with only the required fields set.
    pub fn new(model_name: impl Into<String>, gen_text: impl Into<String>) -> Self {
        let mut body = JsonObject::new();
        body.insert("model_name".to_string(), serde_json::Value::String(model_name.into()));
        body.insert("gen_text".to_string(), serde_json::Value::String(gen_text.into()));
        Self { body }
    }

    /// Set an additional field, e.g. `language` or `ref_audio`.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// The object exactly as it will be forwarded.
    pub fn body(&self) -> &JsonObject {
        &self.body
    }

    pub fn model_name(&self) -> Option<&str> {
        self.str_field("model_name")
    }

    pub fn gen_text(&self) -> Option<&str> {
        self.str_field("gen_text")
    }

    /// Borrow the required fields, failing if either is absent or not a
    /// string.
    pub fn view(&self) -> Result<RequestView<'_>, CoreError> {
        Ok(RequestView {
            model_name: self.required("model_name")?,
            gen_text: self.required("gen_text")?,
        })
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(serde_json::Value::as_str)
    }

    fn required(&self, key: &str) -> Result<&str, CoreError> {
        self.str_field(key)
            .ok_or_else(|| CoreError::InvalidPayload(format!("{key} must be a string")))
    }
}

impl From<JsonObject> for SynthesisRequest {
    fn from(body: JsonObject) -> Self {
        Self { body }
    }
}

/// Validate a synthesis request before any admission decision is taken.
///
/// Rules:
/// - `model_name` must be a string, not blank, at most `MAX_MODEL_NAME_LEN` bytes.
/// - `gen_text` must be a string, not blank, at most `MAX_GEN_TEXT_LEN` characters.
///
/// Other fields are not inspected.
pub fn validate_request(request: &SynthesisRequest) -> Result<RequestView<'_>, CoreError> {
    let view = request.view()?;

    let model = view.model_name.trim();
    if model.is_empty() {
        return Err(CoreError::InvalidPayload(
            "model_name must not be empty".to_string(),
        ));
    }
    if model.len() > MAX_MODEL_NAME_LEN {
        return Err(CoreError::InvalidPayload(format!(
            "model_name must not exceed {MAX_MODEL_NAME_LEN} characters"
        )));
    }
    if view.gen_text.trim().is_empty() {
        return Err(CoreError::InvalidPayload(
            "gen_text must not be empty".to_string(),
        ));
    }
    if view.gen_text.chars().count() > MAX_GEN_TEXT_LEN {
        return Err(CoreError::InvalidPayload(format!(
            "gen_text must not exceed {MAX_GEN_TEXT_LEN} characters"
        )));
    }
    Ok(view)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Raw bytes and content type returned by a successful backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOutput {
    pub content_type: String,
    pub body: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

/// Why a backend call did not produce output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendFault {
    /// The request never got a response (unreachable, reset, bad body).
    #[error("Error forwarding request to backend: {0}")]
    Transport(String),

    /// The call exceeded the configured upper bound.
    #[error("Backend call timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// The backend answered with a non-success status.
    #[error("Backend responded with status {status}: {body}")]
    Protocol { status: u16, body: String },

    /// The job failed inside the gateway itself.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackendFault {
    /// Status code reported to the client for this fault.
    ///
    /// Protocol faults relay the backend's own status; everything else is
    /// synthesized as `500`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Protocol { status, .. } => *status,
            _ => TRANSPORT_FAULT_STATUS,
        }
    }

    /// Human-readable detail. Protocol faults relay the backend body as-is.
    pub fn detail(&self) -> String {
        match self {
            Self::Protocol { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}
