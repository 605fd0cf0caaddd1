use stores::SecretError;
use thiserror::Error;

/// Result type alias for permission lookups
pub type Result<T, E = PermissionError> = std::result::Result<T, E>;

/// Errors that can occur while resolving the permissions of a document
#[derive(Error, Debug)]
pub enum PermissionError {
    #[error("source uri has no site segment: {0:?}")]
    InvalidSourceUri(String),

    #[error("document has no etag to look it up by")]
    MissingFingerprint,

    #[error("credentials unavailable: {0}")]
    CredentialUnavailable(#[from] SecretError),

    #[error("credentials secret is malformed: {0}")]
    MalformedCredentials(#[source] serde_json::Error),

    #[error("authentication failed: {error} ({description})")]
    AuthenticationFailed {
        error: String,
        description: String,
        correlation_id: Option<String>,
    },

    #[error("no site found for {0:?}")]
    SiteNotFound(String),

    #[error("no drive item found with etag {0:?}")]
    ItemNotFound(String),

    #[error("upstream call to {endpoint} failed: {reason}")]
    UpstreamCallFailed {
        endpoint: &'static str,
        reason: String,
    },
}

impl PermissionError {
    pub(crate) fn upstream(endpoint: &'static str, reason: impl ToString) -> Self {
        PermissionError::UpstreamCallFailed {
            endpoint,
            reason: reason.to_string(),
        }
    }
}
