use super::error::PipelineError;
use super::model::{CONVERSION_TYPE, META_BUCKET, META_CONVERSION_TYPE, META_ORIGINAL_KEY};
use super::naming::OutputNaming;
use crate::infrastructure::storage::ObjectLocation;
use crate::infrastructure::transcode::{CodecProfile, TranscodeEngine, TranscodeJobSpec};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct TranscodeDispatcher {
    engine: Arc<dyn TranscodeEngine>,
    naming: OutputNaming,
    profile: CodecProfile,
}

impl TranscodeDispatcher {
    pub fn new(engine: Arc<dyn TranscodeEngine>, naming: OutputNaming, profile: CodecProfile) -> Self {
        Self {
            engine,
            naming,
            profile,
        }
    }

    pub fn build_job(&self, source: &ObjectLocation) -> TranscodeJobSpec {
        let mut metadata = BTreeMap::new();
        metadata.insert(META_ORIGINAL_KEY.to_string(), source.key.clone());
        metadata.insert(META_BUCKET.to_string(), source.bucket.clone());
        metadata.insert(META_CONVERSION_TYPE.to_string(), CONVERSION_TYPE.to_string());

        TranscodeJobSpec {
            input_uri: source.s3_uri(),
            destination_uri: self.naming.destination_uri(&source.key),
            name_modifier: self.naming.name_modifier().to_string(),
            profile: self.profile.clone(),
            metadata,
        }
    }

    /// Submits a conversion job and returns the engine job id. Does not wait
    /// for the job and does not retry.
    pub async fn dispatch(&self, source: &ObjectLocation) -> Result<String, PipelineError> {
        let spec = self.build_job(source);
        let started = Instant::now();

        let job_id = self.engine.create_job(&spec).await?;

        tracing::info!(
            job_id = %job_id,
            bucket = %source.bucket,
            key = %source.key,
            destination = %spec.destination_uri,
            duration_ms = started.elapsed().as_millis() as u64,
            "Transcode job submitted"
        );
        Ok(job_id)
    }
}
