//! Abstraction over the synthesis backend.

use async_trait::async_trait;
use synth_core::synthesis::{BackendFault, SynthesisOutput, SynthesisRequest};

/// One downstream compute service.
///
/// Implementations perform a single request/response exchange per call and
/// classify the outcome. They do not retry and do not enforce the per-job
/// time bound; the caller wraps [`SynthesisBackend::synthesize`] in its own
/// timeout so the bound is the same for every implementation.
#[async_trait]
pub trait SynthesisBackend: Send + Sync + 'static {
    /// Run one synthesis request. On success the response bytes and their
    /// content type are returned verbatim.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisOutput, BackendFault>;

    /// List the model identifiers the backend advertises, as the raw JSON
    /// document it returns.
    async fn list_models(&self) -> Result<serde_json::Value, BackendFault>;
}
