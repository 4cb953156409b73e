//! Video conversion pipeline: ingest detection, transcode dispatch,
//! completion relocation and verified cleanup.

use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::Router;

pub mod cleanup;
pub mod completion;
pub mod detector;
pub mod dispatcher;
pub mod dto;
pub mod error;
pub mod events;
pub mod handler;
pub mod model;
pub mod naming;
pub mod service;

use service::PipelineService;

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    PipelineService: FromRef<S>,
{
    Router::new()
        .route("/events/object-created", post(handler::object_created))
        .route("/events/job-state", post(handler::job_state))
        .route("/reconcile", post(handler::reconcile))
        .route("/pending", get(handler::pending))
}
