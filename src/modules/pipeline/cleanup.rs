use super::error::PipelineError;
use super::model::{provenance_tag, PROVENANCE_KEY};
use crate::infrastructure::storage::{ObjectHead, ObjectLocation, ObjectStore};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireOutcome {
    Deleted,
    AlreadyAbsent,
    /// The replacement overwrote the original's key.
    InPlace,
}

/// Deletes originals, but only after an independent check of the replacement.
#[derive(Clone)]
pub struct CleanupCoordinator {
    store: Arc<dyn ObjectStore>,
}

impl CleanupCoordinator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Heads `location` and checks it is the pipeline's output for `original_key`.
    pub async fn verify_replacement(
        &self,
        location: &ObjectLocation,
        original_key: &str,
        expected_size: Option<u64>,
    ) -> Result<ObjectHead, PipelineError> {
        let unverified = |reason: String| PipelineError::ReplacementUnverified {
            location: location.clone(),
            reason,
        };

        let head = self
            .store
            .head_object(location)
            .await?
            .ok_or_else(|| unverified("object does not exist".to_string()))?;

        let expected_tag = provenance_tag(original_key);
        match head.metadata.get(PROVENANCE_KEY) {
            Some(tag) if *tag == expected_tag => {}
            Some(tag) => {
                return Err(unverified(format!(
                    "{} is {:?}, expected {:?}",
                    PROVENANCE_KEY, tag, expected_tag
                )))
            }
            None => return Err(unverified(format!("{} tag missing", PROVENANCE_KEY))),
        }

        if let Some(expected) = expected_size {
            if head.size != expected {
                return Err(unverified(format!(
                    "size {} does not match staged size {}",
                    head.size, expected
                )));
            }
        }

        Ok(head)
    }

    /// Verifies `replacement` and then removes `original`.
    pub async fn retire_original(
        &self,
        original: &ObjectLocation,
        replacement: &ObjectLocation,
        expected_size: Option<u64>,
    ) -> Result<RetireOutcome, PipelineError> {
        self.verify_replacement(replacement, &original.key, expected_size)
            .await?;

        if original == replacement {
            tracing::info!(bucket = %original.bucket, key = %original.key, "Original replaced in place");
            return Ok(RetireOutcome::InPlace);
        }

        if self.store.head_object(original).await?.is_none() {
            tracing::debug!(bucket = %original.bucket, key = %original.key, "Original already removed");
            return Ok(RetireOutcome::AlreadyAbsent);
        }

        self.store.delete_object(original).await?;
        tracing::info!(
            bucket = %original.bucket,
            key = %original.key,
            replacement = %replacement.key,
            "Original deleted"
        );
        Ok(RetireOutcome::Deleted)
    }
}
