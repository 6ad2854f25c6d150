use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{CompletionModel, Message, StreamEvent};
use crate::errors::PipelineError;

const COMPLETIONS_URL: &str =
    "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";

/// DashScope chat completion over its OpenAI-compatible endpoint.
pub struct DashScopeCompletionModel {
    model_name: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

impl DashScopeCompletionModel {
    pub fn new(
        model_name: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        // Connect timeout only: a whole-request timeout would abort long
        // streamed generations mid-answer.
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            model_name,
            api_key,
            client,
        })
    }
}

/// Extract the text delta from one SSE data payload, if any. Returns
/// `None` for `[DONE]`, keep-alive chunks, and chunks without content.
fn parse_delta(payload: &str) -> Option<String> {
    if payload == "[DONE]" {
        return None;
    }
    let chunk: StreamChunk = serde_json::from_str(payload).ok()?;
    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl CompletionModel for DashScopeCompletionModel {
    async fn complete_stream(
        &self,
        messages: &[Message],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<mpsc::Receiver<StreamEvent>, PipelineError> {
        let request = CompletionRequest {
            model: &self.model_name,
            messages,
            max_tokens,
            temperature,
            stream: true,
        };

        let response = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::CompletionService(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::CompletionService(format!(
                "completion API returned {status}: {body}"
            )));
        }

        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(item) = stream.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Completion stream broke: {e}");
                        let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // SSE frames are newline-delimited; a partial line stays in
                // the buffer until the next network chunk completes it.
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);
                    let Some(payload) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if payload == "[DONE]" {
                        let _ = tx.send(StreamEvent::Done).await;
                        return;
                    }
                    if let Some(delta) = parse_delta(payload) {
                        // Receiver dropped means the client went away; stop
                        // pulling from the upstream response.
                        if tx.send(StreamEvent::Delta(delta)).await.is_err() {
                            debug!("Completion receiver dropped, aborting stream");
                            return;
                        }
                    }
                }
            }
            let _ = tx.send(StreamEvent::Done).await;
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let messages = vec![Message::system("Be helpful."), Message::user("Why is the sky blue?")];
        let request = CompletionRequest {
            model: "qwen-max",
            messages: &messages,
            max_tokens: 2000,
            temperature: 0.7,
            stream: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "qwen-max");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn test_parse_delta_content() {
        let payload =
            r#"{"choices":[{"delta":{"content":"Rayleigh scattering"},"index":0}]}"#;
        assert_eq!(parse_delta(payload), Some("Rayleigh scattering".to_string()));
    }

    #[test]
    fn test_parse_delta_skips_empty_and_done() {
        assert_eq!(parse_delta("[DONE]"), None);
        assert_eq!(parse_delta(r#"{"choices":[{"delta":{}}]}"#), None);
        assert_eq!(parse_delta(r#"{"choices":[{"delta":{"content":""}}]}"#), None);
        assert_eq!(parse_delta("not json"), None);
    }
}
