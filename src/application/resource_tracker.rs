use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::application::ports::HandleStorePort;
use crate::domain::{
    errors::DomainResult,
    image::{HandleSlot, ImageHandle},
};

/// Owns the preview/result handles and releases each one exactly once: when the
/// slot is overwritten, cleared, or when the tracker is dropped.
pub struct ResourceTracker {
    store: Arc<dyn HandleStorePort>,
    slots: HashMap<HandleSlot, ImageHandle>,
}

impl ResourceTracker {
    pub fn new(store: Arc<dyn HandleStorePort>) -> Self {
        Self {
            store,
            slots: HashMap::new(),
        }
    }

    /// Releases the slot's current handle before creating the new one, so a slot
    /// never has two live handles. If creation fails the slot stays empty.
    pub fn set(
        &mut self,
        slot: HandleSlot,
        bytes: &[u8],
        media_type: &str,
    ) -> DomainResult<ImageHandle> {
        self.release(slot);
        let handle = self.store.create(slot, bytes, media_type)?;
        debug!(slot = slot.as_str(), uri = %handle.uri, "handle installed");
        self.slots.insert(slot, handle.clone());
        Ok(handle)
    }

    pub fn release(&mut self, slot: HandleSlot) {
        if let Some(handle) = self.slots.remove(&slot) {
            debug!(slot = slot.as_str(), uri = %handle.uri, "handle released");
            self.store.release(&handle);
        }
    }

    pub fn release_all(&mut self) {
        for slot in HandleSlot::ALL {
            self.release(slot);
        }
    }

    pub fn get(&self, slot: HandleSlot) -> Option<&ImageHandle> {
        self.slots.get(&slot)
    }

    pub fn live(&self) -> usize {
        self.slots.len()
    }
}

impl Drop for ResourceTracker {
    fn drop(&mut self) {
        self.release_all();
    }
}
