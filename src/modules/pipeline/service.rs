use super::completion::{CompletionHandler, CompletionOutcome};
use super::detector::{ConvertReason, IngestionDetector, SkipReason, Verdict};
use super::dispatcher::TranscodeDispatcher;
use super::error::PipelineError;
use super::events::{JobStateChangeEvent, ObjectCreatedEvent};
use super::model::{Asset, ConversionJob, PROVENANCE_KEY};
use super::naming::OutputNaming;
use crate::config::settings::PipelineSettings;
use crate::infrastructure::storage::{ObjectHead, ObjectLocation, ObjectStore, ObjectSummary};
use crate::infrastructure::transcode::TranscodeEngine;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Skipped { key: String, reason: SkipReason },
    Dispatched { key: String, job_id: String },
}

/// Objects the pipeline has not finished with.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct PendingReport {
    /// Originals under the videos root that still need conversion.
    pub awaiting_conversion: Vec<ObjectSummary>,
    /// Engine output that was never relocated.
    pub staging_leftovers: Vec<ObjectSummary>,
}

#[derive(Clone)]
pub struct PipelineService {
    store: Arc<dyn ObjectStore>,
    settings: Arc<PipelineSettings>,
    detector: IngestionDetector,
    dispatcher: TranscodeDispatcher,
    completion: CompletionHandler,
}

impl PipelineService {
    pub fn new(
        settings: &PipelineSettings,
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn TranscodeEngine>,
    ) -> Self {
        let naming = OutputNaming::new(settings);
        Self {
            detector: IngestionDetector::new(settings),
            dispatcher: TranscodeDispatcher::new(engine, naming.clone(), settings.profile.clone()),
            completion: CompletionHandler::new(store.clone(), naming),
            settings: Arc::new(settings.clone()),
            store,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn on_object_created(
        &self,
        event: &ObjectCreatedEvent,
    ) -> Result<IngestOutcome, PipelineError> {
        let mut asset = Asset::from(event);

        if asset.location.bucket != self.settings.media_bucket {
            tracing::debug!(bucket = %asset.location.bucket, key = %asset.location.key, "Event from foreign bucket");
            return Ok(IngestOutcome::Skipped {
                key: asset.location.key,
                reason: SkipReason::OutsideVideos,
            });
        }

        // Some event sources omit the size; mp4 decisions depend on it.
        let mut head = None;
        if asset.size_bytes == 0 && asset.filename.to_ascii_lowercase().ends_with(".mp4") {
            head = self.store.head_object(&asset.location).await?;
            if let Some(head) = &head {
                asset.size_bytes = head.size;
            }
        }

        let mut verdict = self.detector.classify(&asset.location.key, asset.size_bytes);
        if matches!(verdict, Verdict::Convert(ConvertReason::LargeMp4 { .. }))
            && self.is_relocated_output(&asset.location, head).await?
        {
            verdict = Verdict::Skip(SkipReason::AlreadyConverted);
        }

        match verdict {
            Verdict::Skip(reason) => {
                tracing::info!(
                    bucket = %asset.location.bucket,
                    key = %asset.location.key,
                    size_bytes = asset.size_bytes,
                    reason = %reason,
                    "No conversion needed"
                );
                Ok(IngestOutcome::Skipped {
                    key: asset.location.key,
                    reason,
                })
            }
            Verdict::Convert(reason) => {
                tracing::info!(
                    bucket = %asset.location.bucket,
                    key = %asset.location.key,
                    namespace = %asset.namespace,
                    size_bytes = asset.size_bytes,
                    reason = ?reason,
                    "Conversion needed"
                );
                let job_id = self.dispatcher.dispatch(&asset.location).await?;
                Ok(IngestOutcome::Dispatched {
                    key: asset.location.key,
                    job_id,
                })
            }
        }
    }

    /// Whether `location` was written by a relocation. A large mp4 carrying
    /// the provenance tag is this pipeline's own output.
    async fn is_relocated_output(
        &self,
        location: &ObjectLocation,
        known: Option<ObjectHead>,
    ) -> Result<bool, PipelineError> {
        let head = match known {
            Some(head) => Some(head),
            None => self.store.head_object(location).await?,
        };
        Ok(head.is_some_and(|h| h.metadata.contains_key(PROVENANCE_KEY)))
    }

    pub async fn on_job_state_change(
        &self,
        event: JobStateChangeEvent,
    ) -> Result<CompletionOutcome, PipelineError> {
        let job = ConversionJob::from(event);
        self.completion.handle(&job).await
    }

    /// Re-runs relocation for one original, as if its job had just completed.
    pub async fn reconcile(
        &self,
        original: &ObjectLocation,
    ) -> Result<CompletionOutcome, PipelineError> {
        tracing::info!(bucket = %original.bucket, key = %original.key, "Manual reconcile");
        self.completion.relocate("manual", original).await
    }

    /// Lists work that is older than `older_than` and not finished.
    /// `None` or a zero duration reports everything regardless of age.
    pub async fn pending_conversions(
        &self,
        older_than: Option<Duration>,
    ) -> Result<PendingReport, PipelineError> {
        let cutoff = older_than
            .filter(|d| !d.is_zero())
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() - d);
        let is_stale = |summary: &ObjectSummary| match (cutoff, summary.last_modified) {
            (Some(cutoff), Some(modified)) => modified <= cutoff,
            (Some(_), None) => true,
            (None, _) => true,
        };

        let mut awaiting_conversion = Vec::new();
        let listed = self
            .store
            .list_objects(&self.settings.media_bucket, &self.settings.videos_prefix)
            .await?;
        for summary in listed {
            if !is_stale(&summary) || !self.detector.needs_conversion(&summary.key, summary.size) {
                continue;
            }
            if summary.key.to_ascii_lowercase().ends_with(".mp4") {
                let location = ObjectLocation::new(&self.settings.media_bucket, &summary.key);
                if self.is_relocated_output(&location, None).await? {
                    continue;
                }
            }
            awaiting_conversion.push(summary);
        }

        let staging_leftovers = self
            .store
            .list_objects(&self.settings.staging_bucket, &self.settings.staging_prefix)
            .await?
            .into_iter()
            .filter(|o| is_stale(o))
            .collect();

        Ok(PendingReport {
            awaiting_conversion,
            staging_leftovers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::sanitizer::sanitize_filename;
    use crate::infrastructure::storage::memory::InMemoryObjectStore;
    use crate::infrastructure::transcode::fake::RecordingEngine;
    use crate::modules::pipeline::model::JobStatus;
    use std::collections::HashMap;

    const MB: u64 = 1024 * 1024;

    fn setup() -> (InMemoryObjectStore, RecordingEngine, PipelineService) {
        let store = InMemoryObjectStore::new();
        let engine = RecordingEngine::new();
        let service = PipelineService::new(
            &PipelineSettings::for_bucket("media"),
            Arc::new(store.clone()),
            Arc::new(engine.clone()),
        );
        (store, engine, service)
    }

    fn created(key: &str, size_bytes: u64) -> ObjectCreatedEvent {
        ObjectCreatedEvent {
            bucket: "media".to_string(),
            key: key.to_string(),
            size_bytes,
        }
    }

    fn completed(job_id: &str, metadata: &std::collections::BTreeMap<String, String>) -> JobStateChangeEvent {
        JobStateChangeEvent {
            job_id: job_id.to_string(),
            status: JobStatus::Complete,
            metadata: metadata.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<HashMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn accented_ts_upload_ends_as_single_mp4() {
        let (store, engine, service) = setup();

        // upload surface sanitizes the name before it reaches the bucket
        let key = format!("videos/{}", sanitize_filename("meu vídeo ção.ts"));
        assert_eq!(key, "videos/meu_video_cao.ts");
        store.put("media", &key, 37);

        let outcome = service.on_object_created(&created(&key, 37)).await.unwrap();
        let job_id = match outcome {
            IngestOutcome::Dispatched { job_id, .. } => job_id,
            other => panic!("expected dispatch, got {:?}", other),
        };
        let spec = engine.submitted().remove(0);
        assert_eq!(spec.destination_uri, "s3://media/staging/");

        // the engine writes its output
        store.put("media", "staging/meu_video_cao_converted.mp4", 21);

        let outcome = service
            .on_job_state_change(completed(&job_id, &spec.metadata))
            .await
            .unwrap();
        assert!(matches!(outcome, CompletionOutcome::Relocated { .. }));
        assert_eq!(store.keys("media"), vec!["videos/meu_video_cao.mp4".to_string()]);
    }

    #[tokio::test]
    async fn small_mp4_and_pipeline_output_are_skipped() {
        let (_, engine, service) = setup();

        for (key, size) in [
            ("videos/a.mp4", 10 * MB),
            ("converted/a.ts", 1),
            ("staging/a_converted.mp4", 900 * MB),
            ("videos/readme.txt", 1),
        ] {
            let outcome = service.on_object_created(&created(key, size)).await.unwrap();
            assert!(matches!(outcome, IngestOutcome::Skipped { .. }), "{}", key);
        }
        assert!(engine.submitted().is_empty());
    }

    #[tokio::test]
    async fn missing_size_is_read_from_storage() {
        let (store, engine, service) = setup();
        store.put("media", "videos/big.mp4", 600 * MB);

        let outcome = service.on_object_created(&created("videos/big.mp4", 0)).await.unwrap();
        assert!(matches!(outcome, IngestOutcome::Dispatched { .. }));
        assert_eq!(engine.submitted().len(), 1);
    }

    #[tokio::test]
    async fn foreign_bucket_is_skipped() {
        let (_, engine, service) = setup();
        let mut event = created("videos/a.ts", 1);
        event.bucket = "elsewhere".to_string();

        let outcome = service.on_object_created(&event).await.unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Skipped {
                key: "videos/a.ts".to_string(),
                reason: SkipReason::OutsideVideos
            }
        );
        assert!(engine.submitted().is_empty());
    }

    #[tokio::test]
    async fn rejected_submission_is_retryable() {
        let store = InMemoryObjectStore::new();
        let service = PipelineService::new(
            &PipelineSettings::for_bucket("media"),
            Arc::new(store),
            Arc::new(RecordingEngine::rejecting()),
        );

        let err = service
            .on_object_created(&created("videos/a.ts", 1))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn reconcile_finishes_a_stuck_relocation() {
        let (store, _, service) = setup();
        store.put("media", "videos/a.mkv", 10);
        store.put("media", "staging/a_converted.mp4", 8);

        let outcome = service
            .reconcile(&ObjectLocation::new("media", "videos/a.mkv"))
            .await
            .unwrap();

        assert!(matches!(outcome, CompletionOutcome::Relocated { .. }));
        assert_eq!(store.keys("media"), vec!["videos/a.mp4".to_string()]);
    }

    #[tokio::test]
    async fn large_relocated_output_does_not_trigger_another_job() {
        let (store, engine, service) = setup();
        store.put("media", "videos/movie.mkv", 2000 * MB);

        let outcome = service
            .on_object_created(&created("videos/movie.mkv", 2000 * MB))
            .await
            .unwrap();
        let job_id = match outcome {
            IngestOutcome::Dispatched { job_id, .. } => job_id,
            other => panic!("expected dispatch, got {:?}", other),
        };
        let spec = engine.submitted().remove(0);

        store.put("media", "staging/movie_converted.mp4", 700 * MB);
        service
            .on_job_state_change(completed(&job_id, &spec.metadata))
            .await
            .unwrap();
        assert_eq!(store.keys("media"), vec!["videos/movie.mp4".to_string()]);

        // the relocation copy raises its own object-created event
        for size in [700 * MB, 0] {
            let outcome = service
                .on_object_created(&created("videos/movie.mp4", size))
                .await
                .unwrap();
            assert_eq!(
                outcome,
                IngestOutcome::Skipped {
                    key: "videos/movie.mp4".to_string(),
                    reason: SkipReason::AlreadyConverted
                }
            );
        }
        assert_eq!(engine.submitted().len(), 1);

        let report = service.pending_conversions(None).await.unwrap();
        assert!(report.awaiting_conversion.is_empty());
        assert!(report.staging_leftovers.is_empty());
    }

    #[tokio::test]
    async fn pending_report_still_lists_untagged_large_mp4() {
        let (store, _, service) = setup();
        store.put("media", "videos/raw.mp4", 900 * MB);

        let report = service.pending_conversions(None).await.unwrap();
        let awaiting: Vec<_> = report.awaiting_conversion.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(awaiting, vec!["videos/raw.mp4"]);
    }

    #[tokio::test]
    async fn pending_report_lists_unfinished_work() {
        let (store, _, service) = setup();
        store.put("media", "videos/a.ts", 1);
        store.put("media", "videos/done.mp4", 10 * MB);
        store.put("media", "staging/b_converted.mp4", 3);

        let report = service.pending_conversions(None).await.unwrap();
        let awaiting: Vec<_> = report.awaiting_conversion.iter().map(|o| o.key.as_str()).collect();
        let leftovers: Vec<_> = report.staging_leftovers.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(awaiting, vec!["videos/a.ts"]);
        assert_eq!(leftovers, vec!["staging/b_converted.mp4"]);

        // everything was just written, nothing is older than an hour
        let report = service
            .pending_conversions(Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert!(report.awaiting_conversion.is_empty());
        assert!(report.staging_leftovers.is_empty());
    }
}
