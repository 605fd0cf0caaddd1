use sharepoint::PermissionError;
use stores::StoreError;
use thiserror::Error;

/// Result type alias for enrichment operations
pub type Result<T, E = EnricherError> = std::result::Result<T, E>;

/// Errors that can occur while enriching a document
#[derive(Error, Debug)]
pub enum EnricherError {
    #[error("missing required attribute {0}")]
    MissingRequiredField(&'static str),

    #[error("invalid event: {0}")]
    InvalidEvent(#[source] serde_json::Error),

    #[error("document {key} is not valid JSON: {source}")]
    InvalidDocument {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("permission lookup failed: {0}")]
    Permissions(#[from] PermissionError),

    #[error("storage call failed: {0}")]
    UpstreamCallFailed(#[from] StoreError),

    #[error("failed to stage output: {0}")]
    Staging(#[from] std::io::Error),

    #[error("failed to serialize output: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl EnricherError {
    /// Short stable name used as a metric tag and in error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            EnricherError::MissingRequiredField(_) => "missing_required_field",
            EnricherError::InvalidEvent(_) => "invalid_event",
            EnricherError::InvalidDocument { .. } => "invalid_document",
            EnricherError::Permissions(e) => match e {
                PermissionError::InvalidSourceUri(_) => "invalid_source_uri",
                PermissionError::MissingFingerprint => "missing_fingerprint",
                PermissionError::CredentialUnavailable(_) => "credential_unavailable",
                PermissionError::MalformedCredentials(_) => "malformed_credentials",
                PermissionError::AuthenticationFailed { .. } => "authentication_failed",
                PermissionError::SiteNotFound(_) => "site_not_found",
                PermissionError::ItemNotFound(_) => "item_not_found",
                PermissionError::UpstreamCallFailed { .. } => "upstream_call_failed",
            },
            EnricherError::UpstreamCallFailed(_) => "upstream_call_failed",
            EnricherError::Staging(_) => "staging",
            EnricherError::Serialization(_) => "serialization",
        }
    }
}
