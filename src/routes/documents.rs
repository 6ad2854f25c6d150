use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{info, warn};

use super::error_response;
use crate::app::AppState;
use crate::errors::PipelineError;
use crate::models::api::{DeleteResponse, HealthResponse};
use crate::models::document::DocumentRecord;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/documents", get(list_documents))
        .route("/api/documents/{content_hash}", get(get_document))
        .route("/api/documents/{content_hash}", delete(delete_document))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "edugenius-core".to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

fn default_limit() -> u32 {
    100
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<DocumentRecord>>, (StatusCode, String)> {
    let documents = state
        .database
        .list_documents(i64::from(params.limit), i64::from(params.offset))
        .await
        .map_err(|e| error_response(PipelineError::database(e)))?;
    Ok(Json(documents))
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(content_hash): Path<String>,
) -> Result<Json<DocumentRecord>, (StatusCode, String)> {
    let record = state
        .database
        .get_document(&content_hash)
        .await
        .map_err(|e| error_response(PipelineError::database(e)))?;
    record
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("document {content_hash} not found")))
}

/// Remove a document's record and its vector collection. Idempotent:
/// deleting an unknown hash still succeeds.
async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(content_hash): Path<String>,
) -> Result<Json<DeleteResponse>, (StatusCode, String)> {
    let removed_record = state
        .database
        .delete_document(&content_hash)
        .await
        .map_err(|e| error_response(PipelineError::database(e)))?;
    let removed_vectors = state
        .vector_store
        .delete(&content_hash)
        .await
        .map_err(error_response)?;

    if removed_record || removed_vectors {
        info!("Deleted document {content_hash}");
    } else {
        warn!("Delete requested for unknown document {content_hash}");
    }
    Ok(Json(DeleteResponse {
        success: true,
        content_hash,
    }))
}
