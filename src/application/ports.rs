use async_trait::async_trait;

use crate::application::dto::{DetectionRequest, RawResponse};
use crate::domain::{
    errors::DomainResult,
    image::{HandleSlot, ImageHandle},
};

/// Network boundary towards the detection backend.
#[async_trait]
pub trait DetectionTransportPort: Send + Sync {
    /// Sends the encoded request. Any HTTP status comes back as a `RawResponse`;
    /// only transport-level failures are errors.
    async fn send(&self, request: DetectionRequest) -> DomainResult<RawResponse>;
}

#[async_trait]
pub trait HealthPort: Send + Sync {
    async fn health(&self) -> DomainResult<RawResponse>;
}

/// Host capability that turns bytes into renderable handles and revokes them.
pub trait HandleStorePort: Send + Sync {
    fn create(
        &self,
        slot: HandleSlot,
        bytes: &[u8],
        media_type: &str,
    ) -> DomainResult<ImageHandle>;
    fn release(&self, handle: &ImageHandle);
}
