//! Object storage and secret storage used by the enricher.
//!
//! Both are consumed through traits so that the AWS-backed adapters can be
//! swapped for the filesystem or in-memory ones in local runs and tests.

pub mod aws;
pub mod blob;
pub mod secrets;
mod s3;

pub use aws::load_sdk_config;
pub use blob::{BlobStore, ObjectTags, StoreError};
pub use secrets::{SecretError, SecretStore};
