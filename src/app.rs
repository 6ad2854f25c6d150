use std::sync::Arc;

use crate::config::Settings;
use crate::database::Database;
use crate::ingestion::IngestionPipeline;
use crate::retrieval::RetrievalService;
use crate::tutor::TutorResponder;
use crate::vector_store::VectorStore;

/// Shared state handed to every route handler.
pub struct AppState {
    pub settings: Settings,
    pub database: Arc<dyn Database>,
    pub vector_store: Arc<dyn VectorStore>,
    pub pipeline: Arc<IngestionPipeline>,
    pub retrieval: Arc<RetrievalService>,
    pub tutor: Arc<TutorResponder>,
}
