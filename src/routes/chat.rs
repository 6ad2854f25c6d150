use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::info;

use super::error_response;
use crate::app::AppState;
use crate::models::api::{ChatEvent, ChatRequest};
use crate::tutor::{AnswerFragment, StudentLevel};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/chat", post(chat))
}

/// Answer a question about one document as a server-sent event stream:
/// `delta` events while the model generates, then `sources`, then `done`.
/// Failures after the stream starts arrive as a terminal `error` event.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    if request.question.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "question must not be empty".to_string()));
    }

    let level = request
        .student_level
        .map(StudentLevel::new)
        .unwrap_or_else(|| StudentLevel::new(state.settings.default_student_level));

    let context = state
        .retrieval
        .retrieve(
            &request.content_hash,
            &request.question,
            request.k,
            request.min_score,
            None,
        )
        .await
        .map_err(error_response)?;

    info!(
        "Chat: level {} question against {} ({} context chunks)",
        level.value(),
        request.content_hash,
        context.len()
    );

    let rx = state
        .tutor
        .respond(&request.question, &context, level)
        .await
        .map_err(error_response)?;

    let stream = ReceiverStream::new(rx).map(|fragment| {
        let event = match fragment {
            AnswerFragment::Delta(content) => ChatEvent::Delta { content },
            AnswerFragment::Sources(sources) => ChatEvent::Sources { sources },
            AnswerFragment::Done => ChatEvent::Done,
            AnswerFragment::Error(message) => ChatEvent::Error { message },
        };
        // ChatEvent is a plain serializable enum; encoding cannot fail.
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
