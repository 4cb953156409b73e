use crate::infrastructure::storage::{ObjectLocation, ObjectSummary};
use crate::modules::files::dto::UploadResponse;
use crate::modules::pipeline::completion::CompletionOutcome;
use crate::modules::pipeline::detector::SkipReason;
use crate::modules::pipeline::dto::ReconcileRequest;
use crate::modules::pipeline::events::{JobStateChangeEvent, ObjectCreatedEvent};
use crate::modules::pipeline::model::{AssetKind, JobStatus};
use crate::modules::pipeline::service::{IngestOutcome, PendingReport};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::modules::pipeline::handler::object_created,
        crate::modules::pipeline::handler::job_state,
        crate::modules::pipeline::handler::reconcile,
        crate::modules::pipeline::handler::pending,
        crate::modules::files::handler::upload_file,
        crate::modules::files::handler::list_files,
        crate::modules::files::handler::stream_file,
    ),
    components(
        schemas(
            ObjectCreatedEvent, JobStateChangeEvent, JobStatus,
            IngestOutcome, SkipReason, CompletionOutcome, PendingReport,
            ReconcileRequest, ObjectLocation, ObjectSummary,
            UploadResponse, AssetKind,
        )
    ),
    tags(
        (name = "Pipeline", description = "Video conversion events and operator endpoints"),
        (name = "Files", description = "Upload, list and stream stored files"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;
