use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine};
use detection_client::application::dto::{DetectionRequest, RawResponse};
use detection_client::application::ports::{DetectionTransportPort, HealthPort};
use detection_client::domain::errors::{DomainError, DomainResult};
use serde_json::{json, Value};
use tokio::sync::{Notify, Semaphore};

/// Fake backend: answers requests from a queue, optionally holding each answer
/// until the test releases it.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<DomainResult<RawResponse>>>,
    requests: Mutex<Vec<DetectionRequest>>,
    health: Mutex<Option<DomainResult<RawResponse>>>,
    gate: Option<Semaphore>,
    seen: Notify,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            health: Mutex::new(None),
            gate: None,
            seen: Notify::new(),
        }
    }

    /// Every response waits for a matching `release()`.
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn respond(self, response: RawResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail_with(self, err: DomainError) -> Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_health(self, response: DomainResult<RawResponse>) -> Self {
        *self.health.lock().unwrap() = Some(response);
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<DetectionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Resolves once a request has reached the transport.
    pub async fn wait_for_request(&self) {
        self.seen.notified().await;
    }
}

#[async_trait]
impl DetectionTransportPort for ScriptedTransport {
    async fn send(&self, request: DetectionRequest) -> DomainResult<RawResponse> {
        self.requests.lock().unwrap().push(request);
        self.seen.notify_one();
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DomainError::Request("no scripted response".into())))
    }
}

#[async_trait]
impl HealthPort for ScriptedTransport {
    async fn health(&self) -> DomainResult<RawResponse> {
        self.health
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(RawResponse::new(200, r#"{"status":"healthy"}"#)))
    }
}

/// Bytes that start like a JPEG; content beyond the marker is filler.
pub fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(len.max(4), 0x42);
    bytes
}

pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3]
}

pub fn json_body(body: Value) -> RawResponse {
    RawResponse::new(200, body.to_string()).with_header("content-type", "application/json")
}

/// Variant A payload as produced by `/detect-json`.
pub fn structured_response(
    count: u32,
    max_confidence: f64,
    processing_time: f64,
    detections: &[(&str, f64)],
    image: &[u8],
) -> RawResponse {
    json_body(json!({
        "success": true,
        "objects_found": count > 0,
        "detection_count": count,
        "max_confidence": max_confidence,
        "processing_time": processing_time,
        "detections": detections
            .iter()
            .map(|(class, confidence)| json!({"class": class, "confidence": confidence}))
            .collect::<Vec<_>>(),
        "image_base64": BASE64_STANDARD.encode(image),
    }))
}

/// Variant B payload as produced by `/detect`.
pub fn binary_response(
    found: bool,
    count: u32,
    confidence: &str,
    processing_time: &str,
    body: Vec<u8>,
) -> RawResponse {
    RawResponse::new(200, body)
        .with_header("content-type", "image/png")
        .with_header("X-Coyote-Found", if found { "true" } else { "false" })
        .with_header("X-Detection-Count", count.to_string())
        .with_header("X-Confidence-Score", confidence)
        .with_header("X-Processing-Time", processing_time)
}
