use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::application::ports::HandleStorePort;
use crate::domain::{
    errors::{DomainError, DomainResult},
    image::{HandleSlot, ImageHandle},
};

/// Materializes each handle as a file under `dir`; releasing deletes the file.
/// The handle URI is the file path, so any viewer can open it.
pub struct FileHandleStore {
    dir: PathBuf,
    next_id: AtomicU64,
}

impl FileHandleStore {
    pub fn new(dir: impl Into<PathBuf>) -> DomainResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            DomainError::Handle(format!("cannot create handle directory {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            next_id: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn extension_for(media_type: &str) -> &str {
    match media_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "img",
    }
}

impl HandleStorePort for FileHandleStore {
    fn create(
        &self,
        slot: HandleSlot,
        bytes: &[u8],
        media_type: &str,
    ) -> DomainResult<ImageHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self.dir.join(format!(
            "{}-{}-{}.{}",
            slot.as_str(),
            std::process::id(),
            id,
            extension_for(media_type)
        ));
        fs::write(&path, bytes)
            .map_err(|e| DomainError::Handle(format!("cannot write {}: {e}", path.display())))?;

        Ok(ImageHandle {
            id,
            slot,
            uri: path.to_string_lossy().to_string(),
            media_type: media_type.to_string(),
            len: bytes.len(),
        })
    }

    fn release(&self, handle: &ImageHandle) {
        match fs::remove_file(&handle.uri) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(uri = %handle.uri, "handle file already gone");
            }
            Err(e) => warn!(uri = %handle.uri, "could not remove handle file: {e}"),
        }
    }
}
