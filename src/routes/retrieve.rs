use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tracing::debug;

use super::error_response;
use crate::app::AppState;
use crate::models::api::{RetrieveRequest, RetrieveResponse};
use crate::vector_store::SectionFilter;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/retrieve", post(retrieve_chunks))
}

async fn retrieve_chunks(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, (StatusCode, String)> {
    if request.query.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query must not be empty".to_string()));
    }

    let filter = SectionFilter {
        chapter: request.chapter.clone(),
        subsection: request.subsection.clone(),
    };
    let filter = (!filter.is_empty()).then_some(filter);

    let results = state
        .retrieval
        .retrieve(
            &request.content_hash,
            &request.query,
            request.k,
            request.min_score,
            filter.as_ref(),
        )
        .await
        .map_err(error_response)?;

    debug!(
        "Retrieve returned {} results for {}",
        results.len(),
        request.content_hash
    );
    Ok(Json(RetrieveResponse { results }))
}
