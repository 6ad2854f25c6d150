use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{EmbeddingMode, EmbeddingModel};
use crate::errors::PipelineError;

const EMBEDDING_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/embeddings/text-embedding/text-embedding";

/// DashScope text embedding model (text-embedding-v2 family).
pub struct DashScopeEmbeddingModel {
    model_name: String,
    api_key: String,
    dimensions: u32,
    batch_size: usize,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: EmbeddingInput,
    parameters: EmbeddingParameters,
}

#[derive(Serialize)]
struct EmbeddingInput {
    texts: Vec<String>,
}

#[derive(Serialize)]
struct EmbeddingParameters {
    text_type: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    output: EmbeddingOutput,
}

#[derive(Deserialize)]
struct EmbeddingOutput {
    embeddings: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    text_index: usize,
    embedding: Vec<f32>,
}

impl DashScopeEmbeddingModel {
    pub fn new(
        model_name: &str,
        api_key: &str,
        dimensions: u32,
        batch_size: usize,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            model_name: model_name.to_string(),
            api_key: api_key.to_string(),
            dimensions,
            batch_size: batch_size.max(1),
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        mode: EmbeddingMode,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        let request = EmbeddingRequest {
            model: self.model_name.clone(),
            input: EmbeddingInput {
                texts: texts.to_vec(),
            },
            parameters: EmbeddingParameters {
                text_type: mode.as_str().to_string(),
            },
        };

        let resp = self
            .http_client
            .post(EMBEDDING_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::EmbeddingService("embedding request timed out".to_string())
                } else {
                    PipelineError::EmbeddingService(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::EmbeddingService(format!(
                "DashScope embedding API error ({status}): {body}"
            )));
        }

        let response: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| PipelineError::EmbeddingService(e.to_string()))?;

        let mut items = response.output.embeddings;
        if items.len() != texts.len() {
            return Err(PipelineError::EmbeddingService(format!(
                "expected {} embeddings, received {}",
                texts.len(),
                items.len()
            )));
        }
        // The API reports positions explicitly; restore input order.
        items.sort_by_key(|item| item.text_index);

        let mut vectors = Vec::with_capacity(items.len());
        for item in items {
            if item.embedding.len() != self.dimensions as usize {
                return Err(PipelineError::EmbeddingDimensionMismatch {
                    expected: self.dimensions,
                    got: item.embedding.len(),
                });
            }
            vectors.push(item.embedding);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingModel for DashScopeEmbeddingModel {
    async fn embed(
        &self,
        texts: &[String],
        mode: EmbeddingMode,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.embed_batch(batch, mode).await?;
            all_vectors.extend(vectors);
        }
        Ok(all_vectors)
    }

    fn dimensions(&self) -> u32 {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> DashScopeEmbeddingModel {
        DashScopeEmbeddingModel::new(
            "text-embedding-v2",
            "sk-test",
            1536,
            25,
            std::time::Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn test_embed_empty_makes_no_network_call() {
        // No server is reachable from this test; an attempted request
        // would surface as an error rather than Ok.
        let vectors = model().embed(&[], EmbeddingMode::Document).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[test]
    fn test_request_serialization() {
        let req = EmbeddingRequest {
            model: "text-embedding-v2".to_string(),
            input: EmbeddingInput {
                texts: vec!["hello".to_string()],
            },
            parameters: EmbeddingParameters {
                text_type: EmbeddingMode::Query.as_str().to_string(),
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "text-embedding-v2");
        assert_eq!(json["input"]["texts"][0], "hello");
        assert_eq!(json["parameters"]["text_type"], "query");
    }

    #[test]
    fn test_response_deserialization_out_of_order() {
        let json = r#"{
            "output": {
                "embeddings": [
                    {"text_index": 1, "embedding": [0.4, 0.5]},
                    {"text_index": 0, "embedding": [0.1, 0.2]}
                ]
            },
            "usage": {"total_tokens": 4},
            "request_id": "abc"
        }"#;
        let mut resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        resp.output.embeddings.sort_by_key(|i| i.text_index);
        assert_eq!(resp.output.embeddings[0].embedding, vec![0.1, 0.2]);
    }
}
