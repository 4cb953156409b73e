use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::infrastructure::storage::ObjectLocation;
use crate::modules::pipeline::completion::CompletionOutcome;
use crate::modules::pipeline::dto::{PendingQuery, ReconcileRequest};
use crate::modules::pipeline::events::{parse_job_state_change, parse_object_created};
use crate::modules::pipeline::service::{IngestOutcome, PendingReport, PipelineService};
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use std::time::Duration;
use validator::Validate;

/// Object-created webhook
/// Accepts an S3/MinIO bucket notification or a single `{bucket, key, sizeBytes}` event.
#[utoipa::path(
    post,
    path = "/api/v1/pipeline/events/object-created",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Events processed", body = ApiResponse<Vec<IngestOutcome>>),
        (status = 400, description = "Malformed event"),
        (status = 502, description = "Transcode submission failed")
    ),
    tag = "Pipeline"
)]
pub async fn object_created(
    State(service): State<PipelineService>,
    body: Bytes,
) -> impl IntoResponse {
    let events = match parse_object_created(&body) {
        Ok(events) => events,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let mut outcomes = Vec::with_capacity(events.len());
    for event in &events {
        match service.on_object_created(event).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::error!(bucket = %event.bucket, key = %event.key, error = %e, "Ingest failed");
                return ApiError::from(e).into_response();
            }
        }
    }

    ApiSuccess::ok(outcomes, "Events processed").into_response()
}

/// Job-state-change webhook
/// Accepts the EventBridge envelope or a flat `{jobId, status, metadata}` event.
/// A 404 means the converted output is not visible yet and the event should be redelivered.
#[utoipa::path(
    post,
    path = "/api/v1/pipeline/events/job-state",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event handled", body = ApiResponse<CompletionOutcome>),
        (status = 400, description = "Malformed event or missing job metadata"),
        (status = 404, description = "Converted output not found"),
        (status = 409, description = "Replacement could not be verified"),
        (status = 502, description = "Storage failure")
    ),
    tag = "Pipeline"
)]
pub async fn job_state(
    State(service): State<PipelineService>,
    body: Bytes,
) -> impl IntoResponse {
    let event = match parse_job_state_change(&body) {
        Ok(event) => event,
        Err(e) => return ApiError::from(e).into_response(),
    };
    let job_id = event.job_id.clone();

    match service.on_job_state_change(event).await {
        Ok(outcome) => ApiSuccess::ok(outcome, "Job event handled").into_response(),
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Job event failed");
            ApiError::from(e).into_response()
        }
    }
}

/// Re-run relocation and cleanup for one original
#[utoipa::path(
    post,
    path = "/api/v1/pipeline/reconcile",
    request_body = ReconcileRequest,
    responses(
        (status = 200, description = "Reconciled", body = ApiResponse<CompletionOutcome>),
        (status = 400, description = "Bad Request"),
        (status = 404, description = "Converted output not found"),
        (status = 409, description = "Replacement could not be verified")
    ),
    tag = "Pipeline"
)]
pub async fn reconcile(
    State(service): State<PipelineService>,
    Json(req): Json<ReconcileRequest>,
) -> impl IntoResponse {
    if let Err(e) = req.validate() {
        return ApiError::bad_request(e.to_string()).into_response();
    }
    let bucket = req
        .bucket
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| service.settings().media_bucket.clone());

    match service.reconcile(&ObjectLocation::new(bucket, req.key)).await {
        Ok(outcome) => ApiSuccess::ok(outcome, "Reconciled").into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// List unfinished conversions and staging leftovers
#[utoipa::path(
    get,
    path = "/api/v1/pipeline/pending",
    params(PendingQuery),
    responses(
        (status = 200, description = "Pending work", body = ApiResponse<PendingReport>),
        (status = 502, description = "Storage failure")
    ),
    tag = "Pipeline"
)]
pub async fn pending(
    State(service): State<PipelineService>,
    Query(query): Query<PendingQuery>,
) -> impl IntoResponse {
    let older_than = query
        .older_than_secs
        .map(Duration::from_secs)
        .unwrap_or(service.settings().reconcile_grace);

    match service.pending_conversions(Some(older_than)).await {
        Ok(report) => ApiSuccess::ok(report, "Pending work retrieved").into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
