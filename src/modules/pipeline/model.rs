use super::detector::ALWAYS_CONVERT;
use super::error::PipelineError;
use super::events::{JobStateChangeEvent, ObjectCreatedEvent};
use crate::infrastructure::storage::ObjectLocation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use utoipa::ToSchema;

/// Job metadata keys. The metadata is the only link between a job and the
/// object it was created for.
pub const META_ORIGINAL_KEY: &str = "OriginalKey";
pub const META_BUCKET: &str = "Bucket";
pub const META_SOURCE_BUCKET: &str = "SourceBucket";
pub const META_CONVERSION_TYPE: &str = "ConversionType";
pub const CONVERSION_TYPE: &str = "Universal_to_MP4";

/// User metadata written on every relocated object, holding the URL-encoded original key.
pub const PROVENANCE_KEY: &str = "source-key";

pub const CANONICAL_CONTENT_TYPE: &str = "video/mp4";

pub fn provenance_tag(original_key: &str) -> String {
    urlencoding::encode(original_key).into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Video,
    Other,
}

impl AssetKind {
    /// Guessed from the extension; containers MIME tables do not list as
    /// video (`.ts`, `.rm`) are matched directly.
    pub fn from_key(key: &str) -> Self {
        let guessed = mime_guess::from_path(key)
            .iter()
            .any(|mime| mime.type_() == mime::VIDEO);
        let extension = Path::new(key)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let known = extension
            .as_deref()
            .is_some_and(|e| e == "mp4" || ALWAYS_CONVERT.contains(&e));

        if guessed || known {
            AssetKind::Video
        } else {
            AssetKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Asset {
    pub location: ObjectLocation,
    /// Directory part of the key, slash-terminated (`videos/trip/`).
    pub namespace: String,
    pub filename: String,
    pub size_bytes: u64,
    pub kind: AssetKind,
}

impl Asset {
    pub fn new(location: ObjectLocation, size_bytes: u64) -> Self {
        let (namespace, filename) = match location.key.rfind('/') {
            Some(idx) => (
                location.key[..=idx].to_string(),
                location.key[idx + 1..].to_string(),
            ),
            None => (String::new(), location.key.clone()),
        };
        let kind = AssetKind::from_key(&location.key);
        Self {
            location,
            namespace,
            filename,
            size_bytes,
            kind,
        }
    }
}

impl From<&ObjectCreatedEvent> for Asset {
    fn from(event: &ObjectCreatedEvent) -> Self {
        Asset::new(ObjectLocation::new(&event.bucket, &event.key), event.size_bytes)
    }
}

/// Engine job status. MediaConvert's own vocabulary is accepted through aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[serde(alias = "SUBMITTED")]
    Pending,
    #[serde(
        alias = "PROGRESSING",
        alias = "STATUS_UPDATE",
        alias = "INPUT_INFORMATION",
        alias = "NEW_WARNING",
        alias = "QUEUE_HOP"
    )]
    Running,
    Complete,
    Error,
    #[serde(alias = "CANCELLED")]
    Canceled,
}

/// One outstanding transcode request, rebuilt from each state-change event.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    pub job_id: String,
    pub status: JobStatus,
    pub metadata: HashMap<String, String>,
}

impl ConversionJob {
    /// The original object this job was dispatched for.
    pub fn source(&self) -> Result<ObjectLocation, PipelineError> {
        let key = self
            .metadata
            .get(META_ORIGINAL_KEY)
            .filter(|k| !k.is_empty())
            .ok_or(PipelineError::MissingMetadata(META_ORIGINAL_KEY))?;
        let bucket = self
            .metadata
            .get(META_BUCKET)
            .or_else(|| self.metadata.get(META_SOURCE_BUCKET))
            .filter(|b| !b.is_empty())
            .ok_or(PipelineError::MissingMetadata(META_BUCKET))?;
        Ok(ObjectLocation::new(bucket, key))
    }
}

impl From<JobStateChangeEvent> for ConversionJob {
    fn from(event: JobStateChangeEvent) -> Self {
        Self {
            job_id: event.job_id,
            status: event.status,
            metadata: event.metadata,
        }
    }
}
