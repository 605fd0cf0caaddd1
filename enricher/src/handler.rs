use crate::attributes::extract;
use crate::errors::{EnricherError, Result};
use crate::event::{EnrichmentEvent, EnrichmentResponse};
use crate::metrics_defs::{INVOCATION_DURATION, INVOCATION_FAILURE, INVOCATION_SUCCESS};
use crate::publisher::Publisher;
use sharepoint::PermissionResolver;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use stores::BlobStore;

/// Enriches one document per call: derive tags, read the source document,
/// look up its permissions, publish both.
pub struct Enricher {
    store: Arc<dyn BlobStore>,
    resolver: PermissionResolver,
    publisher: Publisher,
}

impl Enricher {
    pub fn new(store: Arc<dyn BlobStore>, resolver: PermissionResolver, publisher: Publisher) -> Self {
        Enricher {
            store,
            resolver,
            publisher,
        }
    }

    pub async fn handle(&self, event: &EnrichmentEvent) -> Result<EnrichmentResponse> {
        let start = Instant::now();
        let result = self.enrich(event).await;
        histogram!(INVOCATION_DURATION).record(start.elapsed().as_secs_f64());

        match &result {
            Ok(response) => {
                counter!(INVOCATION_SUCCESS).increment(1);
                tracing::info!(key = %response.s3_object_key, "Document enriched");
            }
            Err(e) => {
                counter!(INVOCATION_FAILURE, "kind" => e.kind()).increment(1);
                tracing::error!(
                    error = %e,
                    kind = e.kind(),
                    bucket = %event.s3_bucket,
                    key = %event.s3_object_key,
                    "Enrichment failed"
                );
            }
        }
        result
    }

    async fn enrich(&self, event: &EnrichmentEvent) -> Result<EnrichmentResponse> {
        match serde_json::to_string(event) {
            Ok(json) => tracing::info!(event = %json, "Received event"),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize event for logging"),
        }

        // nothing is read before the title is known to be present
        let (tags, identity) = extract(&event.metadata.attributes)?;

        let payload = self
            .store
            .get(&event.s3_bucket, &event.s3_object_key)
            .await?;
        let document: serde_json::Value =
            serde_json::from_slice(&payload).map_err(|source| EnricherError::InvalidDocument {
                key: event.s3_object_key.clone(),
                source,
            })?;

        let permissions = self
            .resolver
            .resolve(&identity.origin_uri, &identity.content_fingerprint)
            .await?;

        let key = self
            .publisher
            .publish(&tags, &identity, &document, &permissions)
            .await?;
        Ok(EnrichmentResponse::new(key))
    }
}
