#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use synth_api::config::ServerConfig;
use synth_api::router::build_app_router;
use synth_api::state::AppState;
use synth_backend::SynthesisBackend;
use synth_broker::{Broker, BrokerConfig};
use synth_core::synthesis::{BackendFault, SynthesisOutput, SynthesisRequest};
use tokio::sync::Semaphore;
use tower::ServiceExt;

type JsonObject = serde_json::Map<String, serde_json::Value>;

/// In-memory backend for HTTP tests.
///
/// Returns `audio/wav` bytes equal to the request text. Requests whose text
/// starts with `fail` get a 422 protocol fault. Every body is recorded. When built with a gate, each
/// successful call waits for a permit first.
pub struct FakeBackend {
    gate: Option<Semaphore>,
    models_fault: Option<BackendFault>,
    seen: Mutex<Vec<JsonObject>>,
}

impl FakeBackend {
    pub fn instant() -> Arc<Self> {
        Arc::new(Self {
            gate: None,
            models_fault: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            models_fault: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn with_models_fault(fault: BackendFault) -> Arc<Self> {
        Arc::new(Self {
            gate: None,
            models_fault: Some(fault),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Bodies received by `synthesize`, in call order.
    pub fn seen(&self) -> Vec<JsonObject> {
        self.seen.lock().unwrap().clone()
    }

    /// Let `n` gated calls finish.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }
}

#[async_trait]
impl SynthesisBackend for FakeBackend {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisOutput, BackendFault> {
        self.seen.lock().unwrap().push(request.body().clone());
        let text = request.gen_text().unwrap_or_default();
        if text.starts_with("fail") {
            return Err(BackendFault::Protocol {
                status: 422,
                body: "unsupported language".to_string(),
            });
        }
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        Ok(SynthesisOutput {
            content_type: "audio/wav".to_string(),
            body: text.as_bytes().to_vec(),
        })
    }

    async fn list_models(&self) -> Result<serde_json::Value, BackendFault> {
        match &self.models_fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(serde_json::json!({ "models": ["f5-tts", "xtts-v2"] })),
        }
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(concurrency: usize) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        backend_api_url: "http://127.0.0.1:9".to_string(),
        broker: BrokerConfig {
            concurrency,
            backend_timeout: Duration::from_secs(5),
            dispatch_idle: Duration::from_millis(20),
            ..Default::default()
        },
    }
}

/// Build the full application router around `backend`.
///
/// Returns the broker as well so tests can observe occupancy. No
/// dispatcher is started; use [`build_test_app_with_dispatcher`] when
/// queued jobs must be promoted.
pub fn build_test_app(backend: Arc<dyn SynthesisBackend>, concurrency: usize) -> (Router, Arc<Broker>) {
    let config = test_config(concurrency);
    let broker = Broker::new(backend, config.broker.clone());
    let state = AppState {
        broker: Arc::clone(&broker),
    };
    (build_app_router(state, &config), broker)
}

/// Like [`build_test_app`] but with a running dispatcher.
pub fn build_test_app_with_dispatcher(
    backend: Arc<dyn SynthesisBackend>,
    concurrency: usize,
) -> (Router, Arc<Broker>, tokio_util::sync::CancellationToken) {
    let (app, broker) = build_test_app(backend, concurrency);
    let cancel = tokio_util::sync::CancellationToken::new();
    synth_broker::Dispatcher::spawn(Arc::clone(&broker), cancel.clone());
    (app, broker, cancel)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, serde_json::to_vec(&json).unwrap()).await
}

pub async fn post_raw(app: Router, uri: &str, body: Vec<u8>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Poll `condition` every few milliseconds, failing after five seconds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for: {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
