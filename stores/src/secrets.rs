/// Secret retrieval. Secrets are opaque strings; callers parse them.
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum SecretError {
    #[error("secret {0} not found")]
    NotFound(String),

    #[error("secret {0} has no string value")]
    NotAString(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("secrets manager error: {0}")]
    Service(String),
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, secret_id: &str) -> Result<String, SecretError>;
}

/// AWS Secrets Manager.
pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    pub fn new(client: Client) -> Self {
        SecretsManagerStore { client }
    }

    pub fn from_sdk_config(config: &SdkConfig, endpoint: Option<&str>) -> Self {
        let mut builder = aws_sdk_secretsmanager::config::Builder::from(config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        SecretsManagerStore::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn get_secret(&self, secret_id: &str) -> Result<String, SecretError> {
        match self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
        {
            Ok(output) => output
                .secret_string()
                .map(str::to_string)
                .ok_or_else(|| SecretError::NotAString(secret_id.to_string())),
            Err(e)
                if e.as_service_error()
                    .is_some_and(GetSecretValueError::is_resource_not_found_exception) =>
            {
                Err(SecretError::NotFound(secret_id.to_string()))
            }
            Err(e) => Err(SecretError::Service(DisplayErrorContext(&e).to_string())),
        }
    }
}

/// Reads `<dir>/<secret_id>.json`.
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileSecretStore { dir: dir.into() }
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_secret(&self, secret_id: &str) -> Result<String, SecretError> {
        if secret_id.is_empty() || secret_id.contains(['/', '\\']) || secret_id.starts_with('.') {
            return Err(SecretError::NotFound(secret_id.to_string()));
        }

        let path = self.dir.join(format!("{secret_id}.json"));
        match tokio::fs::read_to_string(&path).await {
            Ok(secret) => Ok(secret),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(SecretError::NotFound(secret_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemorySecretStore {
    secrets: HashMap<String, String>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, secret_id: &str, secret: &str) -> Self {
        self.secrets.insert(secret_id.to_string(), secret.to_string());
        self
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(&self, secret_id: &str) -> Result<String, SecretError> {
        self.secrets
            .get(secret_id)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(secret_id.to_string()))
    }
}
