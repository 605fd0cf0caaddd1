/// Blob storage for source documents and enriched output.
///
/// Objects are addressed by bucket and key and written together with a set
/// of tags and a content type.
use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

pub use crate::s3::S3BlobStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("storage request for {key} failed: {message}")]
    Request { key: String, message: String },

    #[error("object metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Insertion-ordered object tags.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectTags(IndexMap<String, String>);

impl ObjectTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, keeping the position of an earlier value for the same key.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// URL form encoding (`k1=v1&k2=v2`) as used by the S3 tagging header.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for ObjectTags
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ObjectTags(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        tags: &ObjectTags,
        content_type: &str,
    ) -> Result<(), StoreError>;
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ObjectMetadata {
    content_type: String,
    tags: ObjectTags,
}

/// Stores objects as files under `<base_dir>/<bucket>/<key>`. Tags and content
/// type go into a `<key>.meta.json` file next to the object.
pub struct FilesystemBlobStore {
    base_dir: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FilesystemBlobStore {
            base_dir: base_dir.into(),
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(bucket).join(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if bucket.is_empty() || key.is_empty() || escapes {
            return Err(StoreError::InvalidKey(format!("{bucket}/{key}")));
        }
        Ok(self.base_dir.join(relative))
    }

    fn metadata_path(object_path: &Path) -> PathBuf {
        let mut name = object_path.as_os_str().to_owned();
        name.push(".meta.json");
        PathBuf::from(name)
    }

    pub async fn tags(&self, bucket: &str, key: &str) -> Result<ObjectTags, StoreError> {
        let path = Self::metadata_path(&self.object_path(bucket, key)?);
        let raw = tokio::fs::read(path).await?;
        let metadata: ObjectMetadata = serde_json::from_slice(&raw)?;
        Ok(metadata.tags)
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        tags: &ObjectTags,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let metadata = ObjectMetadata {
            content_type: content_type.to_string(),
            tags: tags.clone(),
        };
        tokio::fs::write(&path, &body).await?;
        tokio::fs::write(
            Self::metadata_path(&path),
            serde_json::to_vec_pretty(&metadata)?,
        )
        .await?;

        tracing::debug!(path = %path.display(), bytes = body.len(), "Stored object");
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredObject {
    pub body: Bytes,
    pub tags: ObjectTags,
    pub content_type: String,
}

/// In-process store. Records the order of writes and can be told to fail
/// writes to particular keys.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    writes: Mutex<Vec<String>>,
    reads: Mutex<Vec<String>>,
    failing_keys: Mutex<Vec<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        self.objects.lock().unwrap_or_else(|e| e.into_inner()).insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.into(),
                tags: ObjectTags::new(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys written so far, oldest first, as `bucket/key`.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Keys read so far, oldest first, as `bucket/key`.
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn fail_writes_to(&self, key: &str) {
        self.failing_keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(key.to_string());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.reads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{bucket}/{key}"));

        self.object(bucket, key)
            .map(|o| o.body)
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        tags: &ObjectTags,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let failing = self
            .failing_keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|k| k == key);
        if failing {
            return Err(StoreError::Io(io::Error::other(format!(
                "injected failure for {key}"
            ))));
        }

        self.objects.lock().unwrap_or_else(|e| e.into_inner()).insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                tags: tags.clone(),
                content_type: content_type.to_string(),
            },
        );
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{bucket}/{key}"));
        Ok(())
    }
}
