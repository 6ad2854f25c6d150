use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info};

use super::error_response;
use crate::app::AppState;
use crate::errors::PipelineError;
use crate::models::api::{StatusResponse, UploadResponse};
use crate::models::document::DocumentStatus;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/documents", post(upload_document))
        .route("/api/documents/{content_hash}/status", get(document_status))
}

/// Accept a multipart upload (`file` part required, `title` optional) and
/// run it through the full ingestion pipeline before responding.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, String)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .ok_or((StatusCode::BAD_REQUEST, "file part needs a filename".to_string()))?
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("failed to read file: {e}")))?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("title") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("failed to read title: {e}")))?;
                if !text.trim().is_empty() {
                    title = Some(text);
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or((StatusCode::BAD_REQUEST, "missing file part".to_string()))?;
    info!("Upload received: {filename} ({} bytes)", bytes.len());

    match state.pipeline.ingest(&bytes, &filename, title).await {
        Ok(receipt) => Ok(Json(UploadResponse {
            content_hash: receipt.content_hash,
            duplicate: false,
            status: receipt.status,
            chunk_count: receipt.chunk_count,
        })),
        // Re-uploading known content is not a failure; report the existing
        // document so the client can use it directly.
        Err(PipelineError::DuplicateDocument { content_hash }) => {
            let record = state
                .database
                .get_document(&content_hash)
                .await
                .map_err(|e| {
                    error!("Failed to load duplicate record: {e}");
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                })?;
            let chunk_count = record.map(|r| r.chunk_count).unwrap_or(0);
            Ok(Json(UploadResponse {
                content_hash,
                duplicate: true,
                status: DocumentStatus::Completed,
                chunk_count,
            }))
        }
        Err(err) => Err(error_response(err)),
    }
}

async fn document_status(
    State(state): State<Arc<AppState>>,
    Path(content_hash): Path<String>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    let status = state
        .pipeline
        .status(&content_hash)
        .await
        .map_err(error_response)?;
    match status {
        Some((status, failure_reason)) => Ok(Json(StatusResponse {
            content_hash,
            status,
            failure_reason,
        })),
        None => Err((StatusCode::NOT_FOUND, format!("document {content_hash} not found"))),
    }
}
