use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReconcileRequest {
    /// Defaults to the media bucket.
    pub bucket: Option<String>,
    #[validate(length(min = 1, message = "Original key is required"))]
    pub key: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PendingQuery {
    /// Only report objects last modified at least this many seconds ago.
    /// Defaults to the configured reconcile grace period.
    pub older_than_secs: Option<u64>,
}
