use async_trait::async_trait;

use crate::Result;
use crate::credentials::Credentials;
use crate::providers::ProviderId;
use crate::types::{GeneratedImage, ImageRequest};

/// One image-generation backend behind a uniform adapter surface.
///
/// Adapters translate the common request shape into their backend's API
/// call and translate the response back. A backend that produces no
/// usable image must return an error, never an empty result; the router
/// treats both identically for fallback purposes.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Whether the credentials carry the key this backend requires.
    /// Unconfigured providers are skipped at routing time, never called.
    fn is_configured(&self, credentials: &Credentials) -> bool;

    async fn generate(
        &self,
        request: &ImageRequest,
        credentials: &Credentials,
    ) -> Result<GeneratedImage>;
}
