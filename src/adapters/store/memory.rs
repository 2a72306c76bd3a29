use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::application::ports::HandleStorePort;
use crate::domain::{
    errors::DomainResult,
    image::{HandleSlot, ImageHandle},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub created: u64,
    pub released: u64,
    /// Releases of handles that were not live (double release or foreign handle).
    pub stray_releases: u64,
}

#[derive(Default)]
struct Inner {
    images: HashMap<u64, Arc<[u8]>>,
    stats: StoreStats,
}

/// Keeps handle bytes in process memory under `mem://<slot>/<id>` URIs.
#[derive(Default)]
pub struct MemoryHandleStore {
    next_id: AtomicU64,
    inner: Mutex<Inner>,
}

impl MemoryHandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.lock().images.len()
    }

    pub fn stats(&self) -> StoreStats {
        self.lock().stats
    }

    pub fn bytes(&self, handle: &ImageHandle) -> Option<Arc<[u8]>> {
        self.lock().images.get(&handle.id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HandleStorePort for MemoryHandleStore {
    fn create(
        &self,
        slot: HandleSlot,
        bytes: &[u8],
        media_type: &str,
    ) -> DomainResult<ImageHandle> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut inner = self.lock();
        inner.images.insert(id, Arc::from(bytes));
        inner.stats.created += 1;
        Ok(ImageHandle {
            id,
            slot,
            uri: format!("mem://{}/{}", slot.as_str(), id),
            media_type: media_type.to_string(),
            len: bytes.len(),
        })
    }

    fn release(&self, handle: &ImageHandle) {
        let mut inner = self.lock();
        if inner.images.remove(&handle.id).is_some() {
            inner.stats.released += 1;
        } else {
            inner.stats.stray_releases += 1;
        }
    }
}
