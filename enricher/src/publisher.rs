use crate::attributes::DocumentIdentity;
use crate::errors::{EnricherError, Result};
use crate::metrics_defs::PUBLISHED_BYTES;
use bytes::Bytes;
use serde::Serialize;
use sharepoint::PermissionEntry;
use shared::histogram;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stores::{BlobStore, ObjectTags};
use tempfile::NamedTempFile;

const CONTENT_TYPE: &str = "application/json";
const PERMISSIONS_SUFFIX: &str = "_permissions.json";

/// Where a document and its permissions sidecar are filed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputKeys {
    pub document: String,
    pub permissions: String,
}

impl OutputKeys {
    /// `<prefix>/<category>/<title>` and the same with `_permissions.json`
    /// appended. No escaping is applied: an empty category yields
    /// `<prefix>//<title>`, and a `/` in the title adds a level.
    pub fn new(prefix: &str, category: &str, title: &str) -> Self {
        let document = format!("{prefix}/{category}/{title}");
        let permissions = format!("{document}{PERMISSIONS_SUFFIX}");
        OutputKeys {
            document,
            permissions,
        }
    }
}

#[derive(Serialize)]
struct Sidecar<'a> {
    #[serde(flatten)]
    tags: &'a ObjectTags,
    permissions: &'a [PermissionEntry],
}

/// Writes enriched documents to the output bucket.
pub struct Publisher {
    store: Arc<dyn BlobStore>,
    bucket: String,
    prefix: String,
    scratch_dir: Option<PathBuf>,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        scratch_dir: Option<PathBuf>,
    ) -> Self {
        Publisher {
            store,
            bucket: bucket.into(),
            prefix: prefix.into(),
            scratch_dir,
        }
    }

    /// Writes the permissions sidecar, then the document, and returns the
    /// document key.
    ///
    /// The two writes are independent. If the document write fails the
    /// sidecar stays in place.
    pub async fn publish(
        &self,
        tags: &ObjectTags,
        identity: &DocumentIdentity,
        document: &serde_json::Value,
        permissions: &[PermissionEntry],
    ) -> Result<String> {
        let keys = OutputKeys::new(&self.prefix, &identity.category, &identity.title);

        let sidecar = serde_json::to_vec_pretty(&Sidecar { tags, permissions })
            .map_err(EnricherError::Serialization)?;
        self.upload(&keys.permissions, sidecar, tags).await?;

        let body = serde_json::to_vec_pretty(document).map_err(EnricherError::Serialization)?;
        self.upload(&keys.document, body, tags).await?;

        Ok(keys.document)
    }

    async fn upload(&self, key: &str, body: Vec<u8>, tags: &ObjectTags) -> Result<()> {
        // removed when dropped, whichever way this returns
        let staged = self.stage(body).await?;
        let staged_body = tokio::fs::read(staged.path()).await?;

        histogram!(PUBLISHED_BYTES).record(staged_body.len() as f64);
        self.store
            .put(&self.bucket, key, Bytes::from(staged_body), tags, CONTENT_TYPE)
            .await?;

        tracing::info!(bucket = %self.bucket, key, "Published object");
        Ok(())
    }

    /// Writes `body` to a temp file under the scratch dir on the blocking
    /// pool.
    async fn stage(&self, body: Vec<u8>) -> Result<NamedTempFile> {
        let dir = self.scratch_dir.clone();
        let staged = tokio::task::spawn_blocking(move || stage_file(dir.as_deref(), &body))
            .await
            .map_err(|e| EnricherError::Staging(std::io::Error::other(e)))??;
        Ok(staged)
    }
}

fn stage_file(dir: Option<&Path>, body: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("sp-cde-");
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(body)?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stores::blob::MemoryBlobStore;

    const BUCKET: &str = "kendra-cde-data-bucket";

    fn test_tags() -> ObjectTags {
        ObjectTags::from_iter([("category", "HR"), ("language", "en")])
    }

    fn test_identity() -> DocumentIdentity {
        DocumentIdentity {
            title: "Policy".into(),
            category: "HR".into(),
            origin_uri: "https://tenant.sharepoint.com/sites/hr/Doc.docx".into(),
            content_fingerprint: "abc123".into(),
        }
    }

    fn test_permissions() -> Vec<PermissionEntry> {
        vec![PermissionEntry {
            id: "1".into(),
            roles: vec!["read".into()],
            granted_to: Some(json!({"user": {"displayName": "Ada"}})),
        }]
    }

    fn scratch_entries(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[test]
    fn test_output_keys() {
        let keys = OutputKeys::new("sp_cde_output", "HR", "Policy");
        assert_eq!(keys.document, "sp_cde_output/HR/Policy");
        assert_eq!(keys.permissions, "sp_cde_output/HR/Policy_permissions.json");

        // same inputs, same keys
        assert_eq!(keys, OutputKeys::new("sp_cde_output", "HR", "Policy"));

        assert_eq!(OutputKeys::new("out", "", "Policy").document, "out//Policy");
        assert_eq!(OutputKeys::new("out", "HR", "a/b").document, "out/HR/a/b");
    }

    #[tokio::test]
    async fn test_publish() {
        let store = Arc::new(MemoryBlobStore::new());
        let scratch = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(
            store.clone(),
            BUCKET,
            "sp_cde_output",
            Some(scratch.path().to_path_buf()),
        );

        let key = publisher
            .publish(
                &test_tags(),
                &test_identity(),
                &json!({"body": "text", "n": 1}),
                &test_permissions(),
            )
            .await
            .unwrap();

        assert_eq!(key, "sp_cde_output/HR/Policy");
        assert_eq!(
            store.writes(),
            vec![
                "kendra-cde-data-bucket/sp_cde_output/HR/Policy_permissions.json",
                "kendra-cde-data-bucket/sp_cde_output/HR/Policy",
            ]
        );

        let sidecar = store
            .object(BUCKET, "sp_cde_output/HR/Policy_permissions.json")
            .unwrap();
        assert_eq!(sidecar.content_type, "application/json");
        assert_eq!(sidecar.tags, test_tags());
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&sidecar.body).unwrap(),
            json!({
                "category": "HR",
                "language": "en",
                "permissions": [
                    {"id": "1", "roles": ["read"], "grantedTo": {"user": {"displayName": "Ada"}}}
                ]
            })
        );
        // pretty printed, tags first
        assert!(
            std::str::from_utf8(&sidecar.body)
                .unwrap()
                .starts_with("{\n  \"category\": \"HR\",\n  \"language\": \"en\",\n  \"permissions\"")
        );

        let document = store.object(BUCKET, "sp_cde_output/HR/Policy").unwrap();
        assert_eq!(document.tags, test_tags());
        assert_eq!(
            std::str::from_utf8(&document.body).unwrap(),
            "{\n  \"body\": \"text\",\n  \"n\": 1\n}"
        );

        assert_eq!(scratch_entries(&scratch), 0);
    }

    #[tokio::test]
    async fn test_publish_keeps_sidecar_when_document_write_fails() {
        let store = Arc::new(MemoryBlobStore::new());
        store.fail_writes_to("out/HR/Policy");
        let scratch = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(
            store.clone(),
            BUCKET,
            "out",
            Some(scratch.path().to_path_buf()),
        );

        let err = publisher
            .publish(&test_tags(), &test_identity(), &json!({}), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, EnricherError::UpstreamCallFailed(_)));
        assert_eq!(
            store.writes(),
            vec!["kendra-cde-data-bucket/out/HR/Policy_permissions.json"]
        );
        assert!(store.object(BUCKET, "out/HR/Policy").is_none());
        assert_eq!(scratch_entries(&scratch), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_stage_on_current_thread_runtime() {
        let scratch = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(
            Arc::new(MemoryBlobStore::new()),
            BUCKET,
            "out",
            Some(scratch.path().to_path_buf()),
        );

        let staged = publisher.stage(b"{\"a\": 1}".to_vec()).await.unwrap();
        assert_eq!(staged.path().parent(), Some(scratch.path()));
        assert_eq!(
            tokio::fs::read(staged.path()).await.unwrap(),
            b"{\"a\": 1}"
        );
        assert_eq!(scratch_entries(&scratch), 1);

        drop(staged);
        assert_eq!(scratch_entries(&scratch), 0);
    }

    #[tokio::test]
    async fn test_publish_missing_scratch_dir() {
        let store = Arc::new(MemoryBlobStore::new());
        let scratch = tempfile::tempdir().unwrap();
        let publisher = Publisher::new(
            store.clone(),
            BUCKET,
            "out",
            Some(scratch.path().join("missing")),
        );

        let err = publisher
            .publish(&test_tags(), &test_identity(), &json!({}), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, EnricherError::Staging(_)));
        assert!(store.is_empty());
    }
}
