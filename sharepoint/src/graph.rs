use crate::auth::AccessToken;
use crate::errors::{PermissionError, Result};
use crate::metrics_defs::GRAPH_REQUEST_DURATION;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use shared::histogram;
use std::time::Instant;
use url::Url;

/// The `{"value": [...]}` envelope of Graph collection responses.
#[derive(Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

#[derive(Deserialize)]
struct GraphErrorBody {
    error: GraphErrorDetail,
}

#[derive(Deserialize)]
struct GraphErrorDetail {
    code: String,
    message: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    #[serde(default)]
    pub web_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DriveItem {
    pub id: String,
    #[serde(rename = "eTag", default)]
    pub e_tag: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A permission as returned by Graph, reduced to the fields anything here
/// reads.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphPermission {
    pub id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub granted_to_v2: Option<serde_json::Value>,
    #[serde(default)]
    pub granted_to: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    base_url: Url,
}

impl GraphClient {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        GraphClient { client, base_url }
    }

    fn endpoint(&self, endpoint: &'static str, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PermissionError::upstream(endpoint, "graph url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET /sites?search=<name>`
    pub async fn search_sites(&self, token: &AccessToken, name: &str) -> Result<Vec<Site>> {
        let mut url = self.endpoint("sites", &["sites"])?;
        url.query_pairs_mut().append_pair("search", name);
        self.get_collection("sites", token, url).await
    }

    /// `GET /sites/{site}/drive/items?$filter=contains(eTag, '<etag>')`
    pub async fn find_items_by_etag(
        &self,
        token: &AccessToken,
        site_id: &str,
        etag: &str,
    ) -> Result<Vec<DriveItem>> {
        let mut url = self.endpoint("items", &["sites", site_id, "drive", "items"])?;
        // OData string literals escape a quote by doubling it
        let filter = format!("contains(eTag, '{}')", etag.replace('\'', "''"));
        url.query_pairs_mut().append_pair("$filter", &filter);
        self.get_collection("items", token, url).await
    }

    /// `GET /sites/{site}/drive/items/{item}/permissions`
    pub async fn list_permissions(
        &self,
        token: &AccessToken,
        site_id: &str,
        item_id: &str,
    ) -> Result<Vec<GraphPermission>> {
        let url = self.endpoint(
            "permissions",
            &["sites", site_id, "drive", "items", item_id, "permissions"],
        )?;
        self.get_collection("permissions", token, url).await
    }

    async fn get_collection<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        token: &AccessToken,
        url: Url,
    ) -> Result<Vec<T>> {
        let start = Instant::now();
        let result = self.send(endpoint, token, url).await;
        histogram!(GRAPH_REQUEST_DURATION).record(start.elapsed().as_secs_f64());
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        token: &AccessToken,
        url: Url,
    ) -> Result<Vec<T>> {
        tracing::debug!(endpoint, url = %url, "Calling Graph");

        let response = self
            .client
            .get(url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| PermissionError::upstream(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let reason = match response.json::<GraphErrorBody>().await {
                Ok(body) => format!("{status}: {} {}", body.error.code, body.error.message),
                Err(_) => status.to_string(),
            };
            return Err(PermissionError::upstream(endpoint, reason));
        }

        let collection: Collection<T> = response
            .json()
            .await
            .map_err(|e| PermissionError::upstream(endpoint, e))?;
        Ok(collection.value)
    }
}
