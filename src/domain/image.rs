use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};

const DEFAULT_FILE_NAME: &str = "upload";

/// The image the user picked. Replaced wholesale on every selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedImage {
    bytes: Arc<[u8]>,
    media_type: String,
    size: u64,
    file_name: String,
}

impl SelectedImage {
    /// Validates the declared media type and size against `max_bytes`.
    pub fn new(
        bytes: Vec<u8>,
        media_type: impl Into<String>,
        size: u64,
        max_bytes: u64,
    ) -> DomainResult<Self> {
        let media_type = media_type.into().trim().to_ascii_lowercase();
        if !is_image_media_type(&media_type) {
            return Err(DomainError::Validation(format!(
                "unsupported type '{}', expected an image",
                media_type
            )));
        }
        if bytes.is_empty() || size == 0 {
            return Err(DomainError::Validation("file is empty".into()));
        }
        if size > max_bytes || bytes.len() as u64 > max_bytes {
            return Err(DomainError::Validation(format!(
                "file is {} bytes, limit is {} bytes",
                size.max(bytes.len() as u64),
                max_bytes
            )));
        }
        Ok(Self {
            bytes: bytes.into(),
            media_type,
            size,
            file_name: DEFAULT_FILE_NAME.into(),
        })
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.file_name = name;
        }
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        self.bytes.clone()
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

pub fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
        && media_type.len() > 6
}

/// Which renderable slot a handle occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleSlot {
    Preview,
    Result,
}

impl HandleSlot {
    pub const ALL: [HandleSlot; 2] = [HandleSlot::Preview, HandleSlot::Result];

    pub fn as_str(self) -> &'static str {
        match self {
            HandleSlot::Preview => "preview",
            HandleSlot::Result => "result",
        }
    }
}

/// Opaque, revocable reference to renderable image data. `uri` is whatever the
/// handle store hands out (a `mem://` key, a file path, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle {
    pub id: u64,
    pub slot: HandleSlot,
    pub uri: String,
    pub media_type: String,
    pub len: usize,
}
