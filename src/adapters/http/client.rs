use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::application::codec::HEALTH_PATH;
use crate::application::dto::{DetectionRequest, RawResponse};
use crate::application::ports::{DetectionTransportPort, HealthPort};
use crate::domain::errors::{DomainError, DomainResult};

use super::config::ClientConfig;

/// reqwest-backed transport for both the detect endpoints and `/health`.
#[derive(Clone)]
pub struct ReqwestDetectionClient {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestDetectionClient {
    pub fn new(config: &ClientConfig) -> DomainResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| DomainError::Request(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn into_raw(res: reqwest::Response) -> DomainResult<RawResponse> {
    let status = res.status();
    let headers: HashMap<String, String> = res
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();
    let body = res
        .bytes()
        .await
        .map_err(|e| DomainError::Request(format!("error reading response body: {e}")))?;

    Ok(RawResponse {
        status: status.as_u16(),
        reason: status.canonical_reason().map(str::to_string),
        headers,
        body: body.to_vec(),
    })
}

#[async_trait]
impl DetectionTransportPort for ReqwestDetectionClient {
    async fn send(&self, request: DetectionRequest) -> DomainResult<RawResponse> {
        let url = self.url(request.path);
        let part = Part::bytes(request.bytes.to_vec())
            .file_name(request.file_name)
            .mime_str(&request.media_type)
            .map_err(|e| DomainError::Request(format!("invalid media type: {e}")))?;
        let form = Form::new().part(request.field, part);

        debug!(%url, "POST detect");
        let res = self
            .client
            .post(&url)
            .query(&request.query)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DomainError::Request(format!("cannot reach {url}: {e}")))?;

        into_raw(res).await
    }
}

#[async_trait]
impl HealthPort for ReqwestDetectionClient {
    async fn health(&self) -> DomainResult<RawResponse> {
        let url = self.url(HEALTH_PATH);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DomainError::Request(format!("cannot reach {url}: {e}")))?;
        into_raw(res).await
    }
}
