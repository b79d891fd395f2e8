//! REST client for the text-to-speech backend HTTP endpoints.
//!
//! Wraps `POST /tts/synthesize` and `GET /tts/models` using [`reqwest`]
//! and classifies every outcome into a [`BackendFault`] or a successful
//! [`SynthesisOutput`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use synth_core::synthesis::{
    BackendFault, SynthesisOutput, SynthesisRequest, DEFAULT_CONTENT_TYPE,
};

use crate::backend::SynthesisBackend;

/// HTTP client for a single backend instance.
#[derive(Debug, Clone)]
pub struct TtsApi {
    client: reqwest::Client,
    api_url: String,
    /// Per-request upper bound enforced by reqwest. `None` means unbounded
    /// at this layer.
    request_timeout: Option<Duration>,
}

impl TtsApi {
    /// Create a new API client for a backend instance.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://127.0.0.1:8000`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            request_timeout: None,
        }
    }

    /// Bound every request issued by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- private helpers ----

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.apply_timeout(self.client.post(format!("{}{path}", self.api_url)))
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.apply_timeout(self.client.get(format!("{}{path}", self.api_url)))
    }

    fn apply_timeout(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.request_timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    /// Map a reqwest error into a fault. Timeouts get their own variant so
    /// clients can tell a slow backend from an unreachable one.
    fn transport_fault(&self, err: reqwest::Error) -> BackendFault {
        if err.is_timeout() {
            let after_ms = self
                .request_timeout
                .map(|t| t.as_millis() as u64)
                .unwrap_or_default();
            BackendFault::Timeout { after_ms }
        } else {
            BackendFault::Transport(err.to_string())
        }
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`BackendFault::Protocol`] carrying the
    /// status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, BackendFault> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(BackendFault::Protocol {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl SynthesisBackend for TtsApi {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisOutput, BackendFault> {
        let response = self
            .post("/tts/synthesize")
            .json(request.body())
            .send()
            .await
            .map_err(|e| self.transport_fault(e))?;

        let response = Self::ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_fault(e))?
            .to_vec();

        tracing::debug!(
            model = request.model_name().unwrap_or_default(),
            bytes = body.len(),
            content_type = %content_type,
            "Backend synthesis succeeded",
        );

        Ok(SynthesisOutput { content_type, body })
    }

    async fn list_models(&self) -> Result<serde_json::Value, BackendFault> {
        let response = self
            .get("/tts/models")
            .send()
            .await
            .map_err(|e| self.transport_fault(e))?;

        let response = Self::ensure_success(response).await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| self.transport_fault(e))
    }
}
