use crate::infrastructure::storage::{ObjectLocation, StorageError};
use crate::infrastructure::transcode::TranscodeError;
use crate::common::response::ApiError;
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Submission(#[from] TranscodeError),

    #[error("Job metadata is missing `{0}`")]
    MissingMetadata(&'static str),

    #[error("Converted output not found at {0}")]
    ConvertedOutputMissing(ObjectLocation),

    #[error("Replacement at {location} could not be verified: {reason}")]
    ReplacementUnverified {
        location: ObjectLocation,
        reason: String,
    },

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

impl PipelineError {
    /// Whether redelivering the same event may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Storage(_)
            | PipelineError::Submission(_)
            | PipelineError::ConvertedOutputMissing(_) => true,
            PipelineError::MissingMetadata(_)
            | PipelineError::ReplacementUnverified { .. }
            | PipelineError::InvalidEvent(_) => false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::Storage(_) | PipelineError::Submission(_) => StatusCode::BAD_GATEWAY,
            PipelineError::ConvertedOutputMissing(_) => StatusCode::NOT_FOUND,
            PipelineError::ReplacementUnverified { .. } => StatusCode::CONFLICT,
            PipelineError::MissingMetadata(_) | PipelineError::InvalidEvent(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::new(err.status_code(), err.to_string()).with_retryable(err.is_retryable())
    }
}
