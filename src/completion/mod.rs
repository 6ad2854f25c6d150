pub mod dashscope;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::errors::PipelineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One event in a streamed completion. `Done` always terminates a healthy
/// stream; `Error` terminates a broken one.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Delta(String),
    Done,
    Error(String),
}

/// Chat completion provider that streams tokens as they are generated.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete_stream(
        &self,
        messages: &[Message],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<mpsc::Receiver<StreamEvent>, PipelineError>;
}
