use crate::blob::{BlobStore, ObjectTags, StoreError};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::RequestChecksumCalculation;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use std::error::Error;
use std::fmt::Debug;

/// S3 or an S3-compatible service.
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    pub fn new(client: Client) -> Self {
        S3BlobStore { client }
    }

    /// With `endpoint` set, requests go to that S3-compatible service using
    /// path-style addressing, and checksums are only sent where an operation
    /// requires them.
    pub fn from_sdk_config(config: &SdkConfig, endpoint: Option<&str>) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(config);
        if let Some(endpoint) = endpoint {
            builder = builder
                .endpoint_url(endpoint)
                .force_path_style(true)
                .request_checksum_calculation(RequestChecksumCalculation::WhenRequired);
        }
        S3BlobStore::new(Client::from_conf(builder.build()))
    }
}

fn request_error<E, R>(key: &str, error: SdkError<E, R>) -> StoreError
where
    E: Error + 'static,
    R: Debug,
{
    StoreError::Request {
        key: key.to_string(),
        message: DisplayErrorContext(&error).to_string(),
    }
}

fn is_not_found(error: &SdkError<GetObjectError>) -> bool {
    error
        .as_service_error()
        .is_some_and(GetObjectError::is_no_such_key)
        || error
            .raw_response()
            .is_some_and(|response| response.status().as_u16() == 404)
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) if is_not_found(&e) => {
                return Err(StoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                });
            }
            Err(e) => return Err(request_error(key, e)),
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Request {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(bucket, key, "Fetched object");
        Ok(body.into_bytes())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        tags: &ObjectTags,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .set_tagging((!tags.is_empty()).then(|| tags.encode()))
            .send()
            .await
            .map_err(|e| request_error(key, e))?;

        tracing::debug!(bucket, key, size, "Stored object");
        Ok(())
    }
}
