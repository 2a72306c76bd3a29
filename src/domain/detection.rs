use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32, // 0..1
}

/// Canonical outcome of one detection request, independent of the wire shape
/// the backend answered with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub found: bool,
    pub count: u32,
    /// Only meaningful when `found` is set.
    pub top_confidence: f32,
    pub processing_time_seconds: f32,
    /// May be empty even when `found` is true; the binary variant carries no labels.
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn summary(&self) -> String {
        if !self.found {
            return format!("nothing found ({:.2}s)", self.processing_time_seconds);
        }
        let labels = summarize_labels(&self.detections);
        let mut out = format!(
            "{} detection(s), top confidence {:.2} ({:.2}s)",
            self.count, self.top_confidence, self.processing_time_seconds
        );
        if !labels.is_empty() {
            out.push_str(": ");
            out.push_str(&labels);
        }
        out
    }
}

/// Groups detections by label, keeping first-seen order: "2 coyote, 1 dog".
pub fn summarize_labels(detections: &[Detection]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for det in detections {
        match counts.iter_mut().find(|(label, _)| *label == det.label) {
            Some((_, n)) => *n += 1,
            None => counts.push((det.label.as_str(), 1)),
        }
    }
    counts
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Clamps a raw score into [0, 1]; NaN becomes 0.
pub fn unit_interval(value: f64) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0) as f32
    }
}

/// Non-negative seconds; NaN and negatives become 0.
pub fn non_negative(value: f64) -> f32 {
    if !value.is_finite() || value < 0.0 {
        0.0
    } else {
        value as f32
    }
}
