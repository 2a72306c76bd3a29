use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub const MULTIPART_FIELD: &str = "file";

/// Everything a transport needs to issue `POST {path}?{query}` with a single
/// multipart file field.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
    pub field: &'static str,
    pub file_name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

/// HTTP response as seen at the network boundary. Header names are lowercase.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    /// Media type without parameters, lowercased:
    /// "application/json; charset=utf-8" -> "application/json".
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of `GET /health` on the reference backend. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub status: Option<String>,
    pub model_loaded: Option<bool>,
    pub device: Option<String>,
    pub cuda_available: Option<bool>,
}
