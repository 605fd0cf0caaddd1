//! Document enrichment: tags derived from extracted attributes, permissions
//! looked up in SharePoint, both published next to the document.

pub mod attributes;
pub mod config;
pub mod errors;
pub mod event;
pub mod handler;
pub mod metrics_defs;
pub mod publisher;
pub mod service;

use config::Config;
use service::InvokeService;
use shared::http::run_http_service;
use std::sync::Arc;

pub use errors::EnricherError;
pub use event::{EnrichmentEvent, EnrichmentResponse};
pub use handler::Enricher;

#[derive(thiserror::Error, Debug)]
pub enum ServeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serves `POST /invoke` on the configured listener until the process exits.
pub async fn run(config: &Config) -> Result<(), ServeError> {
    let enricher = Arc::new(config.build_enricher().await);
    let service = InvokeService::new(enricher);
    run_http_service(&config.listener.host, config.listener.port, service).await
}
