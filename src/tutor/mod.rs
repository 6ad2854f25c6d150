pub mod prompts;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::completion::{CompletionModel, Message, StreamEvent};
use crate::errors::PipelineError;
use crate::models::chunk::{Citation, RetrievalResult};

/// Student level on a 1 (primary school) to 5 (expert) scale. Values
/// outside the range clamp rather than error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentLevel(u8);

impl StudentLevel {
    pub const DEFAULT: StudentLevel = StudentLevel(3);

    pub fn new(level: u8) -> Self {
        Self(level.clamp(1, 5))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Levels 1 and 2 want short simple answers; a smaller, faster model
    /// serves them well and cuts latency.
    pub fn prefers_fast_model(self) -> bool {
        self.0 <= 2
    }
}

impl Default for StudentLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One piece of a streamed tutoring answer. `Sources` arrives once, after
/// the final `Delta` and before `Done`, so clients render the answer first
/// and the citations under it.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerFragment {
    Delta(String),
    Sources(Vec<Citation>),
    Done,
    Error(String),
}

/// Builds level-adapted, source-grounded prompts and streams answers.
pub struct TutorResponder {
    completion: Arc<dyn CompletionModel>,
    fast_completion: Arc<dyn CompletionModel>,
    max_context_chars: usize,
    max_tokens: u32,
    temperature: f32,
}

impl TutorResponder {
    pub fn new(
        completion: Arc<dyn CompletionModel>,
        fast_completion: Arc<dyn CompletionModel>,
        max_context_chars: usize,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            completion,
            fast_completion,
            max_context_chars,
            max_tokens,
            temperature,
        }
    }

    /// Stream an answer to `question` grounded in the retrieved chunks.
    /// With no retrieved context the model is told to say so and answer
    /// from general knowledge, and no `Sources` fragment is sent.
    pub async fn respond(
        &self,
        question: &str,
        context: &[RetrievalResult],
        level: StudentLevel,
    ) -> Result<mpsc::Receiver<AnswerFragment>, PipelineError> {
        let messages = self.build_messages(question, context, level);
        let model = if level.prefers_fast_model() {
            &self.fast_completion
        } else {
            &self.completion
        };
        debug!(
            "Tutoring level {} with {} context chunks",
            level.value(),
            context.len()
        );
        let mut upstream = model
            .complete_stream(&messages, self.max_tokens, self.temperature)
            .await?;

        let citations: Vec<Citation> = context.iter().map(Citation::from_result).collect();
        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            while let Some(event) = upstream.recv().await {
                match event {
                    StreamEvent::Delta(text) => {
                        if tx.send(AnswerFragment::Delta(text)).await.is_err() {
                            return;
                        }
                    }
                    StreamEvent::Done => {
                        if !citations.is_empty() {
                            let _ = tx.send(AnswerFragment::Sources(citations)).await;
                        }
                        let _ = tx.send(AnswerFragment::Done).await;
                        return;
                    }
                    StreamEvent::Error(message) => {
                        let _ = tx.send(AnswerFragment::Error(message)).await;
                        return;
                    }
                }
            }
            // Upstream closed without Done; treat it as a broken stream.
            let _ = tx
                .send(AnswerFragment::Error("completion stream ended early".to_string()))
                .await;
        });

        Ok(rx)
    }

    fn build_messages(
        &self,
        question: &str,
        context: &[RetrievalResult],
        level: StudentLevel,
    ) -> Vec<Message> {
        let system = prompts::system_prompt(level.value());
        let user = if context.is_empty() {
            format!(
                "No source material was found for this question. Say so briefly, \
                 then answer from your general knowledge.\n\nQuestion: {question}"
            )
        } else {
            format!(
                "Answer using the source material below. Cite pages where the \
                 material supports your answer.\n\n{}\n\nQuestion: {question}",
                self.context_block(context)
            )
        };
        vec![Message::system(system), Message::user(user)]
    }

    /// Chunks in rank order, each labeled with its page, truncated as a
    /// whole once the character budget is spent.
    fn context_block(&self, context: &[RetrievalResult]) -> String {
        let mut block = String::from("Source material:");
        let mut used = 0usize;
        for result in context {
            let label = match result.page {
                Some(page) => format!("\n\n[page {page}] "),
                None => "\n\n[source] ".to_string(),
            };
            let cost = label.chars().count() + result.content.chars().count();
            if used + cost > self.max_context_chars && used > 0 {
                break;
            }
            block.push_str(&label);
            block.push_str(&result.content);
            used += cost;
        }
        block
    }
}
