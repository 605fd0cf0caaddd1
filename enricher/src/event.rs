//! Invocation payloads.
use crate::attributes::Attribute;
use serde::{Deserialize, Serialize};

/// Points at a document in the source bucket and carries the attributes
/// extracted from it.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentEvent {
    pub s3_bucket: String,
    pub s3_object_key: String,
    #[serde(default)]
    pub metadata: EventMetadata,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct EventMetadata {
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// Reply to the invoking pipeline. Attributes are never rewritten in place,
/// so `metadata_updates` is always empty.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResponse {
    pub version: String,
    pub s3_object_key: String,
    pub metadata_updates: Vec<Attribute>,
}

pub const RESPONSE_VERSION: &str = "v0";

impl EnrichmentResponse {
    pub fn new(s3_object_key: String) -> Self {
        EnrichmentResponse {
            version: RESPONSE_VERSION.to_string(),
            s3_object_key,
            metadata_updates: Vec::new(),
        }
    }
}
