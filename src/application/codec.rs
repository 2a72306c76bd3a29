use std::str::FromStr;

use base64::{prelude::BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::dto::{DetectionRequest, RawResponse, MULTIPART_FIELD};
use crate::domain::{
    detection::{non_negative, unit_interval, Detection, DetectionResult},
    errors::{DomainError, DomainResult},
    image::SelectedImage,
    settings::ConfidenceThreshold,
};

pub const DETECT_PATH: &str = "/detect";
pub const DETECT_JSON_PATH: &str = "/detect-json";
pub const HEALTH_PATH: &str = "/health";

pub const HEADER_FOUND: &str = "x-coyote-found";
pub const HEADER_CONFIDENCE: &str = "x-confidence-score";
pub const HEADER_PROCESSING_TIME: &str = "x-processing-time";
pub const HEADER_COUNT: &str = "x-detection-count";

const GENERIC_BACKEND_FAILURE: &str = "the backend could not process the image";
const MAX_ERROR_TEXT: usize = 200;

/// Which endpoint requests go to. Decoding never depends on this: the
/// response's content type decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseProtocol {
    /// `POST /detect`, annotated image body plus sidecar headers.
    #[default]
    Binary,
    /// `POST /detect-json`, JSON body with an embedded base64 image.
    Json,
}

impl ResponseProtocol {
    pub fn path(self) -> &'static str {
        match self {
            ResponseProtocol::Binary => DETECT_PATH,
            ResponseProtocol::Json => DETECT_JSON_PATH,
        }
    }
}

impl FromStr for ResponseProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" | "image" => Ok(ResponseProtocol::Binary),
            "json" => Ok(ResponseProtocol::Json),
            other => Err(format!("unknown protocol '{other}', expected 'binary' or 'json'")),
        }
    }
}

/// The image to show as the result.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultImage {
    Annotated { bytes: Vec<u8>, media_type: String },
    /// The backend sent nothing renderable; show the uploaded image instead.
    Original,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDetection {
    pub result: DetectionResult,
    pub image: ResultImage,
}

/// The two response shapes the backend may answer with.
enum WireResponse {
    Structured(Value),
    Binary {
        sidecar: Sidecar,
        media_type: String,
        body: Vec<u8>,
    },
}

struct Sidecar {
    found: bool,
    count: Option<u32>,
    top_confidence: f32,
    processing_time: f32,
}

impl WireResponse {
    fn classify(raw: &RawResponse) -> DomainResult<Self> {
        let content_type = raw
            .content_type()
            .ok_or_else(|| DomainError::Decode("response has no content type".into()))?;

        if is_json(&content_type) {
            let body: Value = serde_json::from_slice(&raw.body)
                .map_err(|e| DomainError::Decode(format!("invalid JSON body: {e}")))?;
            if !body.is_object() {
                return Err(DomainError::Decode("JSON body is not an object".into()));
            }
            return Ok(WireResponse::Structured(body));
        }

        if content_type.starts_with("image/") {
            let sidecar = Sidecar {
                found: raw.header(HEADER_FOUND).map(lenient_flag).unwrap_or(false),
                count: raw.header(HEADER_COUNT).and_then(|v| v.trim().parse().ok()),
                top_confidence: unit_interval(
                    raw.header(HEADER_CONFIDENCE).map(lenient_str_number).unwrap_or(0.0),
                ),
                processing_time: non_negative(
                    raw.header(HEADER_PROCESSING_TIME).map(lenient_str_number).unwrap_or(0.0),
                ),
            };
            return Ok(WireResponse::Binary {
                sidecar,
                media_type: content_type,
                body: raw.body.clone(),
            });
        }

        Err(DomainError::Decode(format!("unexpected content type '{content_type}'")))
    }

    fn decode(self) -> DomainResult<DecodedDetection> {
        match self {
            WireResponse::Structured(body) => decode_structured(&body),
            WireResponse::Binary {
                sidecar,
                media_type,
                body,
            } => {
                let count = sidecar.count.unwrap_or(u32::from(sidecar.found));
                let result = DetectionResult {
                    found: sidecar.found,
                    count,
                    top_confidence: sidecar.top_confidence,
                    processing_time_seconds: sidecar.processing_time,
                    detections: Vec::new(),
                };
                let image = if body.is_empty() {
                    ResultImage::Original
                } else {
                    ResultImage::Annotated {
                        bytes: body,
                        media_type,
                    }
                };
                Ok(DecodedDetection { result, image })
            }
        }
    }
}

fn decode_structured(body: &Value) -> DomainResult<DecodedDetection> {
    if !body["success"].as_bool().unwrap_or(false) {
        let message = backend_message(body).unwrap_or_else(|| GENERIC_BACKEND_FAILURE.to_string());
        return Err(DomainError::Decode(message));
    }

    let detections: Vec<Detection> = body["detections"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|d| Detection {
                    label: d["class"]
                        .as_str()
                        .or_else(|| d["label"].as_str())
                        .unwrap_or("object")
                        .to_string(),
                    confidence: unit_interval(lenient_number(&d["confidence"])),
                })
                .collect()
        })
        .unwrap_or_default();

    let count = lenient_count(&body["detection_count"]).unwrap_or(detections.len() as u32);
    let result = DetectionResult {
        found: lenient_value_flag(&body["objects_found"]).unwrap_or(count > 0),
        count,
        top_confidence: unit_interval(lenient_number(&body["max_confidence"])),
        processing_time_seconds: non_negative(lenient_number(&body["processing_time"])),
        detections,
    };

    let image = match body["image_base64"].as_str().map(str::trim) {
        Some(encoded) if !encoded.is_empty() => decode_embedded_image(encoded)?,
        _ => ResultImage::Original,
    };

    Ok(DecodedDetection { result, image })
}

/// Accepts bare base64 or a `data:<mime>;base64,<payload>` URL.
fn decode_embedded_image(encoded: &str) -> DomainResult<ResultImage> {
    let (declared, payload) = match encoded.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| DomainError::Decode("malformed data URL in image_base64".into()))?;
            let mime = meta.split(';').next().unwrap_or_default().trim();
            (Some(mime.to_ascii_lowercase()).filter(|m| !m.is_empty()), payload)
        }
        None => (None, encoded),
    };

    let bytes = BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|e| DomainError::Decode(format!("image_base64 is not valid base64: {e}")))?;
    if bytes.is_empty() {
        return Ok(ResultImage::Original);
    }

    let media_type = declared.unwrap_or_else(|| sniff_media_type(&bytes));
    Ok(ResultImage::Annotated { bytes, media_type })
}

fn sniff_media_type(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| "image/png".to_string())
}

fn is_json(content_type: &str) -> bool {
    content_type == "application/json" || content_type.ends_with("+json")
}

fn backend_message(body: &Value) -> Option<String> {
    ["detail", "error", "message"].iter().find_map(|key| match &body[*key] {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Null => None,
        Value::String(_) => None,
        other => Some(other.to_string()),
    })
}

fn lenient_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => lenient_str_number(s),
        _ => 0.0,
    }
}

fn lenient_str_number(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(0.0)
}

fn lenient_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n.min(u64::from(u32::MAX)) as u32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_flag(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn lenient_value_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => Some(lenient_flag(s)),
        Value::Number(n) => Some(n.as_f64().unwrap_or(0.0) != 0.0),
        _ => None,
    }
}

/// Human readable reason for a non-2xx response.
fn failure_message(raw: &RawResponse) -> String {
    let from_body = serde_json::from_slice::<Value>(&raw.body)
        .ok()
        .and_then(|body| backend_message(&body))
        .or_else(|| {
            let text = String::from_utf8_lossy(&raw.body).trim().to_string();
            (!text.is_empty()).then(|| text.chars().take(MAX_ERROR_TEXT).collect())
        });

    match (from_body, raw.reason.as_deref()) {
        (Some(msg), _) => format!("HTTP {}: {}", raw.status, msg),
        (None, Some(reason)) => format!("HTTP {} {}", raw.status, reason),
        (None, None) => format!("HTTP {}", raw.status),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionCodec {
    protocol: ResponseProtocol,
}

impl DetectionCodec {
    pub fn new(protocol: ResponseProtocol) -> Self {
        Self { protocol }
    }

    pub fn protocol(&self) -> ResponseProtocol {
        self.protocol
    }

    pub fn encode_request(
        &self,
        image: &SelectedImage,
        threshold: ConfidenceThreshold,
    ) -> DetectionRequest {
        DetectionRequest {
            path: self.protocol.path(),
            query: vec![("confidence", threshold.as_query_value())],
            field: MULTIPART_FIELD,
            file_name: image.file_name().to_string(),
            media_type: image.media_type().to_string(),
            bytes: image.shared_bytes(),
        }
    }

    /// Non-2xx statuses become `Request` errors; anything that is neither of the
    /// two known shapes, or a JSON body with `success: false`, is a `Decode` error.
    pub fn decode_response(&self, raw: &RawResponse) -> DomainResult<DecodedDetection> {
        if !raw.is_success() {
            return Err(DomainError::Request(failure_message(raw)));
        }
        WireResponse::classify(raw)?.decode()
    }
}
