#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

pub use detection_client::adapters::store::memory::MemoryHandleStore;
pub use detection_client::application::dto::{DetectionRequest, RawResponse};
pub use detection_client::domain::session::{SessionState, SkipReason, SubmitOutcome};
pub use detection_client::domain::settings::SessionSettings;
pub use detection_client::{DetectionCodec, DetectionSession, DomainError, ResponseProtocol};

use std::sync::Arc;

/// Session wired to a fake transport and an in-memory handle store.
pub fn session_with(
    transport: Arc<ScriptedTransport>,
) -> (DetectionSession, Arc<MemoryHandleStore>) {
    let store = Arc::new(MemoryHandleStore::new());
    let session = DetectionSession::new(
        DetectionCodec::default(),
        transport,
        store.clone(),
        SessionSettings::default(),
    );
    (session, store)
}
