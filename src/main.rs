mod app;
mod chunker;
mod completion;
mod config;
mod database;
mod embedding;
mod errors;
mod ingestion;
mod models;
mod parser;
mod retrieval;
mod routes;
mod tutor;
mod vector_store;

use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::AppState;
use crate::completion::dashscope::DashScopeCompletionModel;
use crate::database::sqlite::SqliteDatabase;
use crate::database::Database;
use crate::embedding::dashscope::DashScopeEmbeddingModel;
use crate::ingestion::IngestionPipeline;
use crate::retrieval::RetrievalService;
use crate::tutor::TutorResponder;
use crate::vector_store::embedded::EmbeddedVectorStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("EDUGENIUS_CONFIG").unwrap_or_else(|_| "edugenius.toml".to_string());
    let settings = config::load_settings(&config_path)?;

    let database = Arc::new(
        SqliteDatabase::new(&settings.database_path, settings.database_pool_size).await?,
    );
    database.initialize().await?;

    let vector_store = Arc::new(EmbeddedVectorStore::new());
    let embedding_model = Arc::new(DashScopeEmbeddingModel::new(
        &settings.embedding_model,
        &settings.dashscope_api_key,
        settings.embedding_dimensions,
        settings.embedding_batch_size,
        settings.embedding_timeout,
    ));
    let completion = Arc::new(DashScopeCompletionModel::new(
        settings.completion_model.clone(),
        settings.dashscope_api_key.clone(),
        settings.completion_timeout,
    )?);
    let fast_completion = Arc::new(DashScopeCompletionModel::new(
        settings.completion_fast_model.clone(),
        settings.dashscope_api_key.clone(),
        settings.completion_timeout,
    )?);

    let pipeline = Arc::new(IngestionPipeline::new(
        database.clone() as Arc<dyn Database>,
        vector_store.clone(),
        embedding_model.clone(),
        settings.chunk_size,
        settings.chunk_overlap,
    ));
    let retrieval = Arc::new(RetrievalService::new(
        embedding_model,
        vector_store.clone(),
        settings.retrieval_timeout,
    ));
    let tutor = Arc::new(TutorResponder::new(
        completion,
        fast_completion,
        settings.max_context_chars,
        settings.completion_max_tokens,
        settings.completion_temperature,
    ));

    let addr = format!("{}:{}", settings.host, settings.port);
    let state = Arc::new(AppState {
        settings,
        database,
        vector_store,
        pipeline,
        retrieval,
        tutor,
    });

    let app = routes::build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!("EduGenius core listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down");
}
