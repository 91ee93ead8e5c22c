//! Grounded answer generation.
//!
//! Assembles one prompt out of the retrieved chunks, the recent conversation
//! and the current query, and asks the completion provider for an answer in
//! a deliberately factual register (low temperature, bounded length). A
//! provider failure never reaches the caller: the generator degrades to a
//! fixed apologetic answer flagged for human handoff.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use sahayak_memory::RetrievedChunk;
use sahayak_provider::{ChatRequest, LlmProvider};
use sahayak_schema::{AnswerResult, ConversationTurn, SourceKind, SourceRef};

use crate::confidence;

/// Turns of history included in the prompt.
const HISTORY_TURNS: usize = 3;

const SYSTEM_PROMPT: &str = "You are a helpful and knowledgeable campus assistant. \
     Provide accurate, friendly responses based on the given context.";

const FALLBACK_RESPONSE: &str = "I apologize, but I'm having trouble generating a response \
     right now. Please try again or contact the university office for assistance.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.3,
            top_p: 0.9,
            max_tokens: 500,
        }
    }
}

pub struct AnswerGenerator {
    provider: Arc<dyn LlmProvider>,
    config: GeneratorConfig,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: GeneratorConfig) -> Self {
        Self { provider, config }
    }

    /// Produce a grounded answer. Infallible by design: completion errors
    /// collapse into the fallback result (confidence 0, handoff set).
    pub async fn generate(
        &self,
        query: &str,
        retrieved: &[RetrievedChunk],
        history: &[ConversationTurn],
    ) -> AnswerResult {
        let score = confidence::confidence(retrieved);
        let prompt = build_prompt(query, retrieved, history);
        debug!(
            chunks = retrieved.len(),
            confidence = score,
            "generating answer"
        );

        let request = ChatRequest {
            model: self.config.model.clone(),
            system: Some(SYSTEM_PROMPT.to_string()),
            messages: vec![sahayak_provider::ChatMessage::user(prompt)],
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            max_tokens: self.config.max_tokens,
        };

        match self.provider.chat(request).await {
            Ok(response) => AnswerResult {
                response_text: response.text,
                confidence: score,
                needs_human_handoff: confidence::needs_handoff(score),
                sources: retrieved
                    .iter()
                    .map(|r| SourceRef {
                        kind: r.chunk.kind,
                        category: r.chunk.category.clone(),
                        origin: r.chunk.origin.clone(),
                    })
                    .collect(),
                generated_at: Utc::now(),
            },
            Err(error) => {
                error!(%error, "completion provider failed, returning fallback answer");
                fallback_answer()
            }
        }
    }
}

fn fallback_answer() -> AnswerResult {
    AnswerResult {
        response_text: FALLBACK_RESPONSE.to_string(),
        confidence: 0.0,
        needs_human_handoff: true,
        sources: Vec::new(),
        generated_at: Utc::now(),
    }
}

fn kind_label(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Faq => "FAQ",
        SourceKind::Circular => "Circular",
    }
}

fn build_prompt(query: &str, retrieved: &[RetrievedChunk], history: &[ConversationTurn]) -> String {
    let mut history_text = String::new();
    let start = history.len().saturating_sub(HISTORY_TURNS);
    for turn in &history[start..] {
        history_text.push_str(&format!(
            "User: {}\nAssistant: {}\n\n",
            turn.user_text, turn.assistant_text
        ));
    }
    if history_text.is_empty() {
        history_text.push_str("None");
    }

    let context = retrieved
        .iter()
        .map(|r| {
            format!(
                "[Source: {} - {}]\n{}",
                kind_label(r.chunk.kind),
                r.chunk.category,
                r.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a helpful campus assistant chatbot. Your role is to provide accurate, \
friendly, and concise information to students.\n\n\
Previous Conversation:\n{history}\n\n\
Relevant Information from the University Knowledge Base:\n{context}\n\n\
Current Student Query: {query}\n\n\
Instructions:\n\
1. Answer based ONLY on the provided information above\n\
2. Be friendly, helpful, and concise\n\
3. If the information is not in the context, politely say you don't have that \
information and suggest contacting the relevant department\n\
4. Include specific details like dates, fees, deadlines when available\n\
5. If asked about processes, break them down into clear steps\n\
6. For contact information, provide it if available in the context\n\n\
Answer:",
        history = history_text.trim_end(),
        context = context,
        query = query
    )
}
