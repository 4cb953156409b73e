use super::cleanup::{CleanupCoordinator, RetireOutcome};
use super::error::PipelineError;
use super::model::{provenance_tag, ConversionJob, JobStatus, CANONICAL_CONTENT_TYPE, PROVENANCE_KEY};
use super::naming::OutputNaming;
use crate::infrastructure::storage::{CopyOptions, ObjectLocation, ObjectStore};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// Interim status, nothing to do yet.
    Ignored { job_id: String, status: JobStatus },
    JobFailed { job_id: String, status: JobStatus },
    Relocated {
        job_id: String,
        canonical: ObjectLocation,
        original_removed: bool,
    },
    /// A previous delivery already moved the output; only cleanup ran.
    AlreadyRelocated {
        job_id: String,
        canonical: ObjectLocation,
        original_removed: bool,
    },
}

/// Moves finished output to its canonical key and retires the original.
#[derive(Clone)]
pub struct CompletionHandler {
    store: Arc<dyn ObjectStore>,
    naming: OutputNaming,
    cleanup: CleanupCoordinator,
}

impl CompletionHandler {
    pub fn new(store: Arc<dyn ObjectStore>, naming: OutputNaming) -> Self {
        let cleanup = CleanupCoordinator::new(store.clone());
        Self {
            store,
            naming,
            cleanup,
        }
    }

    pub async fn handle(&self, job: &ConversionJob) -> Result<CompletionOutcome, PipelineError> {
        match job.status {
            JobStatus::Pending | JobStatus::Running => {
                tracing::debug!(job_id = %job.job_id, status = ?job.status, "Interim job status");
                Ok(CompletionOutcome::Ignored {
                    job_id: job.job_id.clone(),
                    status: job.status,
                })
            }
            JobStatus::Error | JobStatus::Canceled => {
                let source = job.source().ok();
                tracing::error!(
                    job_id = %job.job_id,
                    status = ?job.status,
                    bucket = source.as_ref().map(|s| s.bucket.as_str()).unwrap_or("-"),
                    key = source.as_ref().map(|s| s.key.as_str()).unwrap_or("-"),
                    "Transcode job did not complete, original left in place"
                );
                Ok(CompletionOutcome::JobFailed {
                    job_id: job.job_id.clone(),
                    status: job.status,
                })
            }
            JobStatus::Complete => {
                let original = job.source()?;
                self.relocate(&job.job_id, &original).await
            }
        }
    }

    /// Copies the staged output of `original` to its canonical key, then
    /// deletes the staged copy and the original. Safe to repeat.
    pub async fn relocate(
        &self,
        job_id: &str,
        original: &ObjectLocation,
    ) -> Result<CompletionOutcome, PipelineError> {
        let started = Instant::now();
        let staged = self.naming.staged_location(&original.key);
        let canonical = ObjectLocation::new(&original.bucket, self.naming.canonical_key(&original.key));

        let staged_head = match self.store.head_object(&staged).await? {
            Some(head) => head,
            None => return self.resume_cleanup(job_id, original, &staged, canonical).await,
        };

        if canonical != *original {
            self.ensure_canonical_free(&canonical, &original.key).await?;
        }

        let options = CopyOptions {
            content_type: Some(CANONICAL_CONTENT_TYPE.to_string()),
            metadata: HashMap::from([(PROVENANCE_KEY.to_string(), provenance_tag(&original.key))]),
        };
        self.store
            .copy_object(&staged, &canonical, Some(options))
            .await?;

        self.cleanup
            .verify_replacement(&canonical, &original.key, Some(staged_head.size))
            .await?;
        self.store.delete_object(&staged).await?;

        let retired = self
            .cleanup
            .retire_original(original, &canonical, Some(staged_head.size))
            .await?;

        tracing::info!(
            job_id = %job_id,
            bucket = %original.bucket,
            key = %original.key,
            canonical = %canonical.key,
            size_bytes = staged_head.size,
            duration_ms = started.elapsed().as_millis() as u64,
            "✅ Converted output relocated"
        );

        Ok(CompletionOutcome::Relocated {
            job_id: job_id.to_string(),
            canonical,
            original_removed: retired == RetireOutcome::Deleted,
        })
    }

    /// Refuses to overwrite an object at `canonical` that this pipeline did
    /// not write for `original_key`.
    async fn ensure_canonical_free(
        &self,
        canonical: &ObjectLocation,
        original_key: &str,
    ) -> Result<(), PipelineError> {
        let Some(existing) = self.store.head_object(canonical).await? else {
            return Ok(());
        };
        if existing.metadata.get(PROVENANCE_KEY) == Some(&provenance_tag(original_key)) {
            return Ok(());
        }

        tracing::warn!(
            bucket = %canonical.bucket,
            key = %canonical.key,
            original = %original_key,
            size_bytes = existing.size,
            "Canonical key holds an unrelated object, relocation refused"
        );
        Err(PipelineError::ReplacementUnverified {
            location: canonical.clone(),
            reason: "an unrelated object already occupies the key".to_string(),
        })
    }

    async fn resume_cleanup(
        &self,
        job_id: &str,
        original: &ObjectLocation,
        staged: &ObjectLocation,
        canonical: ObjectLocation,
    ) -> Result<CompletionOutcome, PipelineError> {
        match self.cleanup.retire_original(original, &canonical, None).await {
            Ok(retired) => {
                tracing::info!(
                    job_id = %job_id,
                    bucket = %original.bucket,
                    key = %original.key,
                    canonical = %canonical.key,
                    "Output already relocated, cleanup finished"
                );
                Ok(CompletionOutcome::AlreadyRelocated {
                    job_id: job_id.to_string(),
                    canonical,
                    original_removed: retired == RetireOutcome::Deleted,
                })
            }
            Err(PipelineError::ReplacementUnverified { .. }) => {
                tracing::warn!(
                    job_id = %job_id,
                    bucket = %staged.bucket,
                    key = %staged.key,
                    "Converted output not found"
                );
                Err(PipelineError::ConvertedOutputMissing(staged.clone()))
            }
            Err(e) => Err(e),
        }
    }
}
