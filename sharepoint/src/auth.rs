//! App-only authentication: client credentials from the secret store are
//! exchanged for a bearer token with the client credentials grant.
use crate::errors::{PermissionError, Result};
use crate::metrics_defs::TOKEN_REQUEST_FAILED;
use serde::Deserialize;
use shared::counter;
use std::fmt;
use stores::SecretStore;
use url::Url;

#[derive(Clone, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

pub async fn fetch_credentials(
    store: &dyn SecretStore,
    secret_id: &str,
) -> Result<ClientCredentials> {
    let secret = match store.get_secret(secret_id).await {
        Ok(secret) => secret,
        Err(e) => {
            tracing::error!(secret_id, error = %e, "Failed to retrieve credentials");
            return Err(e.into());
        }
    };

    serde_json::from_str(&secret).map_err(PermissionError::MalformedCredentials)
}

pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    correlation_id: Option<String>,
}

#[derive(Clone)]
pub struct TokenClient {
    client: reqwest::Client,
    authority_url: Url,
    scope: String,
}

impl TokenClient {
    pub fn new(client: reqwest::Client, authority_url: Url, scope: String) -> Self {
        TokenClient {
            client,
            authority_url,
            scope,
        }
    }

    fn token_url(&self, tenant_id: &str) -> Result<Url> {
        let mut url = self.authority_url.clone();
        url.path_segments_mut()
            .map_err(|_| PermissionError::upstream("token", "authority url cannot be a base"))?
            .pop_if_empty()
            .extend([tenant_id, "oauth2", "v2.0", "token"]);
        Ok(url)
    }

    /// Exchanges `credentials` for a bearer token.
    ///
    /// The identity provider reports failures in the body, so the body is
    /// decoded whatever the status and the absence of `access_token` is what
    /// counts as a failure.
    pub async fn acquire(&self, credentials: &ClientCredentials) -> Result<AccessToken> {
        let url = self.token_url(&credentials.tenant_id)?;
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PermissionError::upstream("token", e))?;
        let status = response.status();
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| PermissionError::upstream("token", format!("{status}: {e}")))?;

        match body.access_token {
            Some(token) if !token.is_empty() => Ok(AccessToken::new(token)),
            _ => {
                let error = body.error.unwrap_or_else(|| status.to_string());
                let description = body.error_description.unwrap_or_default();
                counter!(TOKEN_REQUEST_FAILED).increment(1);
                tracing::error!(
                    error = %error,
                    error_description = %description,
                    correlation_id = ?body.correlation_id,
                    "Token request did not return an access token"
                );
                Err(PermissionError::AuthenticationFailed {
                    error,
                    description,
                    correlation_id: body.correlation_id,
                })
            }
        }
    }
}
