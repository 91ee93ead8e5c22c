pub mod detect;
pub mod embedding;
pub mod openai;
pub mod retry;
pub mod translate;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use detect::{LanguageDetector, ScriptDetector, StubDetector};
pub use embedding::{EmbeddingProvider, OpenAiEmbeddingProvider, StubEmbeddingProvider};
pub use openai::OpenAiChatProvider;
pub use retry::RetryPolicy;
pub use translate::{GoogleTranslator, StubTranslator, Translation, Translator};

/// One message in a chat-completion conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Single-turn request with the factual-tone defaults used across the
    /// service (low temperature, bounded output).
    pub fn simple(model: String, system: Option<String>, user: String) -> Self {
        Self {
            model,
            system,
            messages: vec![ChatMessage::user(user)],
            temperature: 0.3,
            top_p: 0.9,
            max_tokens: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub finish_reason: Option<String>,
}

/// Chat-completion backend. The generator treats any error from `chat` as a
/// signal to degrade to its fallback answer, so implementations are free to
/// fail loudly.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}

/// Echo provider for tests and offline runs.
pub struct StubLlmProvider;

#[async_trait]
impl LlmProvider for StubLlmProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let user_text = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatResponse {
            text: format!("[stub:{}] {}", request.model, user_text),
            input_tokens: None,
            output_tokens: None,
            finish_reason: Some("stop".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_provider_echoes_last_message() {
        let provider = StubLlmProvider;
        let req = ChatRequest::simple("test-model".into(), None, "ping".into());
        let resp = provider.chat(req).await.unwrap();
        assert!(resp.text.contains("stub:test-model"));
        assert!(resp.text.contains("ping"));
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn simple_request_uses_factual_defaults() {
        let req = ChatRequest::simple("m".into(), Some("sys".into()), "q".into());
        assert!((req.temperature - 0.3).abs() < f32::EPSILON);
        assert!((req.top_p - 0.9).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, 500);
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, "user");
    }

    #[test]
    fn message_helpers_set_roles() {
        assert_eq!(ChatMessage::user("a").role, "user");
        assert_eq!(ChatMessage::assistant("b").role, "assistant");
    }
}
