use std::sync::Arc;

use crate::credentials::Credentials;
use crate::image::ImageProvider;
use crate::providers::{GeminiImage, Ideogram, Imagen, ProviderId};
use crate::routing::RoutingTable;
use crate::types::{GeneratedImage, ImageRequest};
use crate::{Error, Result};

/// Walks the routing table's candidate chain for an action and returns
/// the first successful generation. Stateless across calls; candidates
/// are tried sequentially, never in parallel.
pub struct ImageRouter {
    table: RoutingTable,
    providers: Vec<Arc<dyn ImageProvider>>,
}

impl ImageRouter {
    pub fn new(table: RoutingTable, providers: Vec<Arc<dyn ImageProvider>>) -> Result<Self> {
        let registered: Vec<ProviderId> = providers.iter().map(|provider| provider.id()).collect();
        table.validate(&registered)?;
        Ok(Self { table, providers })
    }

    /// The three supported backends wired to their live endpoints.
    pub fn with_default_providers(table: RoutingTable) -> Result<Self> {
        Self::new(
            table,
            vec![
                Arc::new(GeminiImage::new()),
                Arc::new(Imagen::new()),
                Arc::new(Ideogram::new()),
            ],
        )
    }

    fn provider(&self, id: ProviderId) -> Option<&Arc<dyn ImageProvider>> {
        self.providers.iter().find(|provider| provider.id() == id)
    }

    /// Tries each candidate in priority order. Providers lacking
    /// credentials are skipped without counting as failures; a provider
    /// failure triggers fallback to the next candidate; only exhaustion
    /// of the whole chain is fatal.
    pub async fn generate(
        &self,
        request: &ImageRequest,
        credentials: &Credentials,
    ) -> Result<GeneratedImage> {
        if request.prompt.trim().is_empty() {
            return Err(Error::InvalidRequest("prompt must not be empty".to_string()));
        }

        let mut attempted = 0usize;
        let mut skipped = 0usize;
        let mut last_error: Option<Error> = None;

        for id in self.table.candidates(request.action) {
            // Table validation at construction guarantees the lookup.
            let Some(provider) = self.provider(*id) else {
                continue;
            };
            if !provider.is_configured(credentials) {
                skipped += 1;
                tracing::debug!(provider = %id, action = %request.action, "skipping unconfigured provider");
                continue;
            }

            attempted += 1;
            match provider.generate(request, credentials).await {
                Ok(image) => {
                    tracing::info!(provider = %id, action = %request.action, attempt = attempted, "image generated");
                    return Ok(image);
                }
                Err(err) => {
                    tracing::warn!(provider = %id, action = %request.action, error = %err, "provider failed, falling back");
                    last_error = Some(err);
                }
            }
        }

        let last = match last_error {
            Some(err) => err.to_string(),
            None => "no provider has credentials for this action".to_string(),
        };
        Err(Error::ProvidersExhausted {
            action: request.action.to_string(),
            attempted,
            skipped,
            last,
        })
    }
}
