//! Object storage abstraction.
//!
//! The pipeline only ever talks to storage through [`ObjectStore`]; bytes are
//! never cached in-process. `s3` carries the production implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

#[cfg(test)]
pub mod memory;
pub mod s3;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Bucket + key pair addressing a single object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn s3_uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectHead {
    pub size: u64,
    pub content_type: Option<String>,
    /// User metadata, keys without the `x-amz-meta-` prefix.
    pub metadata: HashMap<String, String>,
}

/// Replaces the destination's content type and user metadata on copy.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object under `prefix`, following continuation tokens.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectSummary>>;

    /// Returns `None` when the object does not exist.
    async fn head_object(&self, location: &ObjectLocation) -> StorageResult<Option<ObjectHead>>;

    async fn copy_object(
        &self,
        source: &ObjectLocation,
        destination: &ObjectLocation,
        options: Option<CopyOptions>,
    ) -> StorageResult<()>;

    /// Deleting a missing key succeeds.
    async fn delete_object(&self, location: &ObjectLocation) -> StorageResult<()>;
}
