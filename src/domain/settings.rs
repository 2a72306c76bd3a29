use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Detection sensitivity sent with every request. Always within [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThreshold(f32);

impl ConfidenceThreshold {
    /// Clamps into [0, 1]. NaN falls back to the default.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Plain decimal form used as the `confidence` query parameter, e.g. "0.25".
    pub fn as_query_value(self) -> String {
        // Display for f32 never switches to exponent notation
        format!("{}", self.0)
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self(DEFAULT_CONFIDENCE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub max_upload_bytes: u64,
    pub initial_threshold: ConfidenceThreshold,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            initial_threshold: ConfidenceThreshold::default(),
        }
    }
}
