use crate::modules::pipeline::model::AssetKind;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub bucket: String,
    pub key: String,
    pub size_bytes: u64,
    pub kind: AssetKind,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Key prefix to list under, e.g. `videos/trip/`.
    pub prefix: Option<String>,
}
