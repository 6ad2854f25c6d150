pub mod chat;
pub mod documents;
pub mod ingest;
pub mod retrieve;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;

use crate::app::AppState;
use crate::errors::PipelineError;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(ingest::router())
        .merge(retrieve::router())
        .merge(chat::router())
        .merge(documents::router())
        .with_state(state)
}

/// Map a pipeline error to an HTTP response. `DuplicateDocument` never
/// reaches this; the upload route handles it as a success.
pub fn error_response(err: PipelineError) -> (StatusCode, String) {
    let status = match &err {
        PipelineError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        PipelineError::EmptyDocument | PipelineError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::RetrievalTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::EmbeddingService(_) | PipelineError::CompletionService(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let (status, _) = error_response(PipelineError::UnsupportedFormat("docx".into()));
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let (status, _) = error_response(PipelineError::EmptyDocument);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) =
            error_response(PipelineError::RetrievalTimeout(Duration::from_secs(10)));
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

        let (status, _) = error_response(PipelineError::Database("locked".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
