use crate::config::settings::AppConfig;
use crate::infrastructure::storage::s3::StorageService;
use crate::modules::pipeline::service::PipelineService;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub storage: StorageService,
    pub pipeline: PipelineService,
}

impl AppState {
    pub fn new(config: AppConfig, storage: StorageService, pipeline: PipelineService) -> Self {
        Self {
            config,
            storage,
            pipeline,
        }
    }
}

impl FromRef<AppState> for PipelineService {
    fn from_ref(state: &AppState) -> Self {
        state.pipeline.clone()
    }
}
