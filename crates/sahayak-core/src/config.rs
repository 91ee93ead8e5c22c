//! Service configuration.
//!
//! YAML file with serde defaults for every field, so a minimal config (or
//! none at all) still yields a runnable service. API keys may be placed in
//! the file directly or resolved from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sahayak_memory::chunker::ChunkerConfig;
use sahayak_provider::{openai::GROQ_API_BASE, RetryPolicy};
use sahayak_schema::LanguageCode;

use crate::generator::GeneratorConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Index database file; `None` keeps the index in memory.
    #[serde(default = "default_index_db")]
    pub index_db: Option<PathBuf>,
    #[serde(default)]
    pub default_language: LanguageCode,
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

impl ServiceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            index_db: default_index_db(),
            default_language: LanguageCode::default(),
            retrieval_k: default_retrieval_k(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            retry: RetryConfig::default(),
            chunking: ChunkingConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_index_db() -> Option<PathBuf> {
    Some(PathBuf::from("./sahayak-index.db"))
}

fn default_retrieval_k() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LlmConfig {
    /// Key from the file, else from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }

    pub fn to_generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_key_env: default_llm_key_env(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_llm_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_llm_base_url() -> String {
    GROQ_API_BASE.to_string()
}

fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `"openai"` for the hosted endpoint, anything else selects the local
    /// hashed stub (useful offline and in tests).
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

impl EmbeddingConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: String::new(),
            api_key_env: default_embedding_key_env(),
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
        }
    }
}

fn default_embedding_provider() -> String {
    "stub".to_string()
}

fn default_embedding_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_target_size")]
    pub target_size: usize,
    #[serde(default = "default_overlap_size")]
    pub overlap_size: usize,
}

impl ChunkingConfig {
    pub fn to_chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            target_size: self.target_size,
            overlap_size: self.overlap_size,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            overlap_size: default_overlap_size(),
        }
    }
}

fn default_target_size() -> usize {
    500
}

fn default_overlap_size() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = ServiceConfig::default();
        assert_eq!(config.retrieval_k, 3);
        assert_eq!(config.default_language, LanguageCode::En);
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert!((config.llm.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.chunking.target_size, 500);
        assert_eq!(config.chunking.overlap_size, 50);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn minimal_yaml_fills_in_defaults() {
        let config: ServiceConfig = serde_yaml::from_str("data_dir: ./kb\n").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./kb"));
        assert_eq!(config.retrieval_k, 3);
        assert_eq!(config.embedding.provider, "stub");
    }

    #[test]
    fn full_yaml_overrides() {
        let raw = r#"
data_dir: /srv/kb
index_db: /srv/index.db
default_language: hi
retrieval_k: 5
llm:
  model: llama-3.1-8b-instant
  temperature: 0.1
embedding:
  provider: openai
  dimensions: 256
retry:
  max_attempts: 5
  delay_ms: 200
chunking:
  target_size: 800
  overlap_size: 100
"#;
        let config: ServiceConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.default_language, LanguageCode::Hi);
        assert_eq!(config.retrieval_k, 5);
        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.dimensions, 256);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.chunking.target_size, 800);
    }

    #[test]
    fn inline_api_key_wins_over_env() {
        let mut llm = LlmConfig::default();
        llm.api_key = "inline-key".into();
        llm.api_key_env = "SAHAYAK_TEST_KEY_THAT_DOES_NOT_EXIST".into();
        assert_eq!(llm.resolve_api_key().as_deref(), Some("inline-key"));
    }

    #[test]
    fn env_api_key_used_when_file_key_absent() {
        let mut llm = LlmConfig::default();
        llm.api_key_env = "SAHAYAK_CONFIG_TEST_KEY".into();
        std::env::set_var("SAHAYAK_CONFIG_TEST_KEY", "from-env");
        assert_eq!(llm.resolve_api_key().as_deref(), Some("from-env"));
        std::env::remove_var("SAHAYAK_CONFIG_TEST_KEY");
    }

    #[test]
    fn missing_key_everywhere_is_none() {
        let mut llm = LlmConfig::default();
        llm.api_key_env = "SAHAYAK_TEST_NO_SUCH_VAR".into();
        assert_eq!(llm.resolve_api_key(), None);
    }
}
