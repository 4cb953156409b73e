use crate::config::settings::AppConfig;
use crate::infrastructure::aws::load_sdk_config;
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::infrastructure::storage::s3::StorageService;
use crate::infrastructure::transcode::mediaconvert::MediaConvertEngine;
use crate::modules::pipeline::service::PipelineService;
use crate::state::AppState;
use crate::workers::{ingest, reconciler};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = AppConfig::new()?;
    let sdk_config = load_sdk_config(&config).await;

    let storage = StorageService::new(
        &sdk_config,
        config.s3_endpoint.as_deref(),
        &config.pipeline.media_bucket,
    );
    let engine = MediaConvertEngine::new(
        &sdk_config,
        &config.mediaconvert_role_arn,
        &config.mediaconvert_queue,
        config.mediaconvert_endpoint.clone(),
    );
    let pipeline = PipelineService::new(&config.pipeline, Arc::new(storage.clone()), Arc::new(engine));

    let schedule = reconciler::parse_schedule(&config.reconcile_schedule)?;
    let queue = RabbitMqService::new(&config.rabbitmq_url).await?;

    tokio::spawn(ingest::start_ingest_worker(
        queue,
        pipeline.clone(),
        config.object_created_queue.clone(),
        config.dead_letter_exchange.clone(),
    ));
    tokio::spawn(reconciler::start_reconciler(
        pipeline.clone(),
        schedule,
        config.pipeline.reconcile_grace,
    ));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let app = app::create_app(AppState::new(config, storage, pipeline));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
