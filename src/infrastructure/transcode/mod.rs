//! External transcode engine seam.
//!
//! [`TranscodeJobSpec`] is engine-neutral; `mediaconvert` translates it into
//! an AWS Elemental MediaConvert `CreateJob` call.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub mod mediaconvert;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Failed to resolve transcode endpoint: {0}")]
    EndpointResolution(String),

    #[error("Job submission failed: {0}")]
    Submission(String),

    #[error("Engine accepted the job but returned no job id")]
    MissingJobId,
}

/// Output profile: H.264 video, AAC audio, MP4 container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodecProfile {
    pub qvbr_quality_level: i32,
    pub video_max_bitrate: i32,
    pub audio_bitrate: i32,
    pub audio_sample_rate: i32,
}

impl Default for CodecProfile {
    fn default() -> Self {
        Self {
            qvbr_quality_level: 7,
            video_max_bitrate: 5_000_000,
            audio_bitrate: 128_000,
            audio_sample_rate: 48_000,
        }
    }
}

/// Everything the engine needs to run one conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscodeJobSpec {
    /// `s3://bucket/key` of the source object.
    pub input_uri: String,
    /// `s3://bucket/prefix/`; the engine appends `<basename><name_modifier>.mp4`.
    pub destination_uri: String,
    pub name_modifier: String,
    pub profile: CodecProfile,
    /// Free-form job metadata echoed back in every state-change event.
    pub metadata: BTreeMap<String, String>,
}

#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Submits the job and returns the engine-assigned id without waiting for it.
    async fn create_job(&self, spec: &TranscodeJobSpec) -> Result<String, TranscodeError>;
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records submitted jobs and hands out sequential ids.
    #[derive(Clone, Default)]
    pub struct RecordingEngine {
        submitted: Arc<Mutex<Vec<TranscodeJobSpec>>>,
        reject: bool,
    }

    impl RecordingEngine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn rejecting() -> Self {
            Self {
                reject: true,
                ..Self::default()
            }
        }

        pub fn submitted(&self) -> Vec<TranscodeJobSpec> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TranscodeEngine for RecordingEngine {
        async fn create_job(&self, spec: &TranscodeJobSpec) -> Result<String, TranscodeError> {
            if self.reject {
                return Err(TranscodeError::Submission("queue is paused".to_string()));
            }
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(spec.clone());
            Ok(format!("job-{}", submitted.len()))
        }
    }
}
