use std::sync::Arc;

use tracing::{info, warn};

use crate::application::{dto::BackendHealth, ports::HealthPort};
use crate::domain::errors::{DomainError, DomainResult};

/// One-shot availability check used to gate submission.
#[derive(Clone)]
pub struct HealthProbe {
    port: Arc<dyn HealthPort>,
}

impl HealthProbe {
    pub fn new(port: Arc<dyn HealthPort>) -> Self {
        Self { port }
    }

    /// `Err(BackendUnavailable)` on network errors, non-2xx statuses, or a body
    /// that reports the model as not loaded. An unparsable 2xx body still counts
    /// as online.
    pub async fn probe(&self) -> DomainResult<BackendHealth> {
        let raw = self.port.health().await.map_err(|e| {
            warn!("Backend health check failed: {e}");
            DomainError::BackendUnavailable(e.to_string())
        })?;

        if !raw.is_success() {
            warn!(status = raw.status, "Backend health check returned an error status");
            return Err(DomainError::BackendUnavailable(format!("HTTP {}", raw.status)));
        }

        let health: BackendHealth = serde_json::from_slice(&raw.body).unwrap_or_default();
        if health.model_loaded == Some(false) {
            warn!("Backend is up but its model is not loaded");
            return Err(DomainError::BackendUnavailable("model not loaded".into()));
        }

        info!(
            status = health.status.as_deref().unwrap_or("unknown"),
            device = health.device.as_deref().unwrap_or("unknown"),
            cuda = health.cuda_available.unwrap_or(false),
            "Backend online"
        );
        Ok(health)
    }
}
