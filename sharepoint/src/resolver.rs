use crate::auth::{TokenClient, fetch_credentials};
use crate::config::Config;
use crate::errors::{PermissionError, Result};
use crate::graph::GraphClient;
use crate::metrics_defs::PERMISSIONS_PER_DOCUMENT;
use crate::permission::PermissionEntry;
use shared::histogram;
use std::sync::Arc;
use stores::SecretStore;

/// Looks up who has access to a SharePoint document.
///
/// Each call runs the whole chain from scratch: credentials, token, site,
/// drive item, permissions. Nothing is cached between calls and nothing is
/// retried.
pub struct PermissionResolver {
    secrets: Arc<dyn SecretStore>,
    secret_id: String,
    tokens: TokenClient,
    graph: GraphClient,
}

impl PermissionResolver {
    pub fn new(config: &Config, secrets: Arc<dyn SecretStore>) -> Self {
        let client = reqwest::Client::new();

        PermissionResolver {
            secrets,
            secret_id: config.secret_id.clone(),
            tokens: TokenClient::new(
                client.clone(),
                config.authority_url.clone(),
                config.scope.clone(),
            ),
            graph: GraphClient::new(client, config.graph_url.clone()),
        }
    }

    /// Resolves the permissions of the document at `origin_uri` whose drive
    /// item etag contains `fingerprint`, in the order Graph lists them.
    pub async fn resolve(&self, origin_uri: &str, fingerprint: &str) -> Result<Vec<PermissionEntry>> {
        let site_name = site_name_from_uri(origin_uri)?;
        if fingerprint.is_empty() {
            return Err(PermissionError::MissingFingerprint);
        }

        let credentials = fetch_credentials(self.secrets.as_ref(), &self.secret_id).await?;
        let token = self.tokens.acquire(&credentials).await?;

        let sites = self.graph.search_sites(&token, site_name).await?;
        let site = first_match("site", site_name, sites)
            .ok_or_else(|| PermissionError::SiteNotFound(site_name.to_string()))?;

        let items = self
            .graph
            .find_items_by_etag(&token, &site.id, fingerprint)
            .await?;
        let item = first_match("item", fingerprint, items)
            .ok_or_else(|| PermissionError::ItemNotFound(fingerprint.to_string()))?;

        let permissions = self
            .graph
            .list_permissions(&token, &site.id, &item.id)
            .await?;
        let entries: Vec<PermissionEntry> = permissions.into_iter().map(Into::into).collect();

        histogram!(PERMISSIONS_PER_DOCUMENT).record(entries.len() as f64);
        match serde_json::to_string(&entries) {
            Ok(json) => tracing::info!(site_id = %site.id, item_id = %item.id, permissions = %json, "Item permissions list"),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize permissions for logging"),
        }

        Ok(entries)
    }
}

/// The site name is the fifth `/`-separated segment of the document uri, as
/// in `https://<tenant>.sharepoint.com/sites/<site>/...`.
pub fn site_name_from_uri(origin_uri: &str) -> Result<&str> {
    origin_uri
        .split('/')
        .nth(4)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| PermissionError::InvalidSourceUri(origin_uri.to_string()))
}

/// Searches are expected to be unambiguous. When they are not, the first
/// candidate in response order wins.
fn first_match<T>(kind: &'static str, query: &str, candidates: Vec<T>) -> Option<T> {
    if candidates.len() > 1 {
        tracing::warn!(
            kind,
            query,
            candidates = candidates.len(),
            "Search returned several candidates, using the first"
        );
    }
    candidates.into_iter().next()
}
