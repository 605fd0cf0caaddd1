use crate::handler::Enricher;
use crate::publisher::Publisher;
use serde::Deserialize;
use sharepoint::PermissionResolver;
use std::path::PathBuf;
use std::sync::Arc;
use stores::blob::{FilesystemBlobStore, S3BlobStore};
use stores::secrets::{FileSecretStore, SecretsManagerStore};
use stores::{BlobStore, SecretStore, load_sdk_config};
use thiserror::Error;
use url::Url;

pub const DEFAULT_OUTPUT_BUCKET: &str = "kendra-cde-data-bucket";
pub const DEFAULT_OUTPUT_PREFIX: &str = "sp_cde_output";

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Empty output bucket")]
    EmptyOutputBucket,

    #[error("Empty output prefix")]
    EmptyOutputPrefix,

    #[error("Empty {0}")]
    EmptyStoreSetting(&'static str),

    #[error("Invalid {0}: {1}")]
    InvalidEndpoint(&'static str, url::ParseError),

    #[error("sharepoint: {0}")]
    Sharepoint(#[from] sharepoint::config::ValidationError),
}

/// Enricher configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for `serve` mode
    #[serde(default)]
    pub listener: Listener,
    /// Bucket the enriched document and its sidecar are written to
    #[serde(default = "default_output_bucket")]
    pub output_bucket: String,
    /// Key prefix under the output bucket
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    /// Where artifacts are staged before upload. The system temp dir if unset.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
    pub blob_store: BlobStoreConfig,
    pub secret_store: SecretStoreConfig,
    #[serde(default)]
    pub sharepoint: sharepoint::config::Config,
}

fn default_output_bucket() -> String {
    DEFAULT_OUTPUT_BUCKET.to_string()
}

fn default_output_prefix() -> String {
    DEFAULT_OUTPUT_PREFIX.to_string()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlobStoreConfig {
    /// S3 or an S3-compatible endpoint
    S3 {
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
    },
    Filesystem { base_dir: PathBuf },
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretStoreConfig {
    SecretsManager {
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// One `<secret_id>.json` file per secret
    File { dir: PathBuf },
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        if self.output_bucket.is_empty() {
            return Err(ValidationError::EmptyOutputBucket);
        }
        if self.output_prefix.is_empty() {
            return Err(ValidationError::EmptyOutputPrefix);
        }
        if let BlobStoreConfig::S3 { region, endpoint } = &self.blob_store {
            validate_aws_store(
                ("blob_store.region", "blob_store.endpoint"),
                region,
                endpoint.as_deref(),
            )?;
        }
        if let SecretStoreConfig::SecretsManager { region, endpoint } = &self.secret_store {
            validate_aws_store(
                ("secret_store.region", "secret_store.endpoint"),
                region,
                endpoint.as_deref(),
            )?;
        }
        self.sharepoint.validate()?;
        Ok(())
    }

    /// Constructs the enricher and its stores. The AWS configuration is only
    /// loaded when an AWS-backed store is configured.
    pub async fn build_enricher(&self) -> Enricher {
        let blob_store: Arc<dyn BlobStore> = match &self.blob_store {
            BlobStoreConfig::S3 { region, endpoint } => Arc::new(S3BlobStore::from_sdk_config(
                &load_sdk_config(region).await,
                endpoint.as_deref(),
            )),
            BlobStoreConfig::Filesystem { base_dir } => {
                Arc::new(FilesystemBlobStore::new(base_dir.clone()))
            }
        };

        let secret_store: Arc<dyn SecretStore> = match &self.secret_store {
            SecretStoreConfig::SecretsManager { region, endpoint } => {
                Arc::new(SecretsManagerStore::from_sdk_config(
                    &load_sdk_config(region).await,
                    endpoint.as_deref(),
                ))
            }
            SecretStoreConfig::File { dir } => Arc::new(FileSecretStore::new(dir.clone())),
        };

        let resolver = PermissionResolver::new(&self.sharepoint, secret_store);
        let publisher = Publisher::new(
            blob_store.clone(),
            self.output_bucket.clone(),
            self.output_prefix.clone(),
            self.scratch_dir.clone(),
        );
        Enricher::new(blob_store, resolver, publisher)
    }
}

fn validate_aws_store(
    (region_key, endpoint_key): (&'static str, &'static str),
    region: &str,
    endpoint: Option<&str>,
) -> Result<(), ValidationError> {
    if region.is_empty() {
        return Err(ValidationError::EmptyStoreSetting(region_key));
    }
    if let Some(endpoint) = endpoint {
        Url::parse(endpoint).map_err(|e| ValidationError::InvalidEndpoint(endpoint_key, e))?;
    }
    Ok(())
}
