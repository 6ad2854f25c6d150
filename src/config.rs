use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct TomlConfig {
    api: ApiConfig,
    database: DatabaseConfig,
    embedding: EmbeddingConfig,
    completion: CompletionConfig,
    chunker: ChunkerConfig,
    retrieval: RetrievalConfig,
    tutor: TutorConfig,
}

#[derive(Debug, Deserialize)]
struct ApiConfig {
    host: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
    path: String,
    #[serde(default = "default_pool_size")]
    pool_size: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingConfig {
    model: String,
    dimensions: u32,
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct CompletionConfig {
    model: String,
    fast_model: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ChunkerConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

#[derive(Debug, Deserialize)]
struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default = "default_retrieval_timeout_secs")]
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct TutorConfig {
    #[serde(default = "default_max_context_chars")]
    max_context_chars: usize,
    #[serde(default = "default_student_level")]
    default_student_level: u8,
}

fn default_pool_size() -> u32 {
    5
}
fn default_batch_size() -> usize {
    25
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_k() -> usize {
    5
}
fn default_retrieval_timeout_secs() -> u64 {
    10
}
fn default_max_context_chars() -> usize {
    6000
}
fn default_student_level() -> u8 {
    3
}

/// Flattened runtime settings, resolved from the TOML file plus the
/// environment. The DashScope key comes only from `DASHSCOPE_API_KEY`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub database_pool_size: u32,
    pub dashscope_api_key: String,
    pub embedding_model: String,
    pub embedding_dimensions: u32,
    pub embedding_batch_size: usize,
    pub embedding_timeout: Duration,
    pub completion_model: String,
    pub completion_fast_model: String,
    pub completion_max_tokens: u32,
    pub completion_temperature: f32,
    pub completion_timeout: Duration,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_top_k: usize,
    pub retrieval_timeout: Duration,
    pub max_context_chars: usize,
    pub default_student_level: u8,
}

/// Load settings from `path`, with `.env` loaded first so the API key can
/// live there during development.
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings> {
    dotenvy::dotenv().ok();

    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: TomlConfig =
        toml::from_str(&raw).with_context(|| format!("invalid config in {}", path.display()))?;

    if config.chunker.chunk_overlap >= config.chunker.chunk_size {
        bail!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            config.chunker.chunk_overlap,
            config.chunker.chunk_size
        );
    }

    let dashscope_api_key = std::env::var("DASHSCOPE_API_KEY")
        .context("DASHSCOPE_API_KEY environment variable is required")?;

    info!("Loaded configuration from {}", path.display());
    Ok(Settings {
        host: config.api.host,
        port: config.api.port,
        database_path: config.database.path,
        database_pool_size: config.database.pool_size,
        dashscope_api_key,
        embedding_model: config.embedding.model,
        embedding_dimensions: config.embedding.dimensions,
        embedding_batch_size: config.embedding.batch_size,
        embedding_timeout: Duration::from_secs(config.embedding.timeout_secs),
        completion_model: config.completion.model,
        completion_fast_model: config.completion.fast_model,
        completion_max_tokens: config.completion.max_tokens,
        completion_temperature: config.completion.temperature,
        completion_timeout: Duration::from_secs(config.completion.timeout_secs),
        chunk_size: config.chunker.chunk_size,
        chunk_overlap: config.chunker.chunk_overlap,
        retrieval_top_k: config.retrieval.top_k,
        retrieval_timeout: Duration::from_secs(config.retrieval.timeout_secs),
        max_context_chars: config.tutor.max_context_chars,
        default_student_level: config.tutor.default_student_level,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
[api]
host = "127.0.0.1"
port = 8080

[database]
path = "edugenius.db"

[embedding]
model = "text-embedding-v3"
dimensions = 1024

[completion]
model = "qwen-max"
fast_model = "qwen-plus"

[chunker]
chunk_size = 1000
chunk_overlap = 200

[retrieval]

[tutor]
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_settings_with_defaults() {
        unsafe { std::env::set_var("DASHSCOPE_API_KEY", "sk-test") };
        let file = write_config(SAMPLE);

        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.embedding_batch_size, 25);
        assert_eq!(settings.retrieval_top_k, 5);
        assert_eq!(settings.retrieval_timeout, Duration::from_secs(10));
        assert_eq!(settings.default_student_level, 3);
        assert_eq!(settings.completion_fast_model, "qwen-plus");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        unsafe { std::env::set_var("DASHSCOPE_API_KEY", "sk-test") };
        let bad = SAMPLE.replace("chunk_overlap = 200", "chunk_overlap = 1000");
        let file = write_config(&bad);

        let err = load_settings(file.path()).unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_missing_config_file_errors() {
        unsafe { std::env::set_var("DASHSCOPE_API_KEY", "sk-test") };
        let err = load_settings("/nonexistent/edugenius.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
