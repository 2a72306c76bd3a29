use serde::{Deserialize, Serialize};

use super::detection::DetectionResult;
use super::image::ImageHandle;
use super::settings::ConfidenceThreshold;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    FileSelected,
    Submitting,
    Succeeded,
    Failed,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub preview_handle: Option<ImageHandle>,
    pub result_handle: Option<ImageHandle>,
    pub result: Option<DetectionResult>,
    pub error_message: Option<String>,
    /// Last rejected selection; cleared by the next accepted selection or a reset.
    pub validation_message: Option<String>,
    pub threshold: ConfidenceThreshold,
    /// `None` until a health probe has run.
    pub backend_online: Option<bool>,
}

impl SessionSnapshot {
    pub fn can_submit(&self) -> bool {
        self.preview_handle.is_some()
            && self.state != SessionState::Submitting
            && self.backend_online != Some(false)
    }
}

/// What a call to `submit` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was sent.
    Skipped(SkipReason),
    /// The response was applied; the session is now `Succeeded` or `Failed`.
    Applied(SessionState),
    /// The response belonged to a superseded request and was dropped.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoFileSelected,
    AlreadySubmitting,
    BackendOffline,
}
