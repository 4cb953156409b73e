use crate::state::AppState;
use axum::routing::get;
use axum::Router;

pub mod dto;
pub mod handler;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list_files).post(handler::upload_file))
        .route("/stream/{*key}", get(handler::stream_file))
}
