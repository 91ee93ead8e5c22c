//! The composed query pipeline.
//!
//! Owns the knowledge index (behind an `ArcSwap` so a reload publishes a
//! fully built replacement atomically), the conversation memory, the answer
//! generator and the translation orchestrator. The HTTP layer talks only to
//! this type.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use tracing::info;

use sahayak_memory::{ConversationMemory, IndexConfig, KnowledgeIndex};
use sahayak_provider::{
    EmbeddingProvider, GoogleTranslator, LlmProvider, OpenAiChatProvider,
    OpenAiEmbeddingProvider, ScriptDetector, StubEmbeddingProvider,
};
use sahayak_schema::{AnswerResult, ChatOutcome, ConversationTurn, LanguageCode, TranslationOutcome};

use crate::config::ServiceConfig;
use crate::generator::AnswerGenerator;
use crate::translation::{TranslationOrchestrator, WORKING_LANGUAGE};

pub struct QueryPipeline {
    index: ArcSwap<KnowledgeIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: AnswerGenerator,
    translation: TranslationOrchestrator,
    memory: ConversationMemory,
    retrieval_k: usize,
}

impl QueryPipeline {
    pub fn new(
        index: KnowledgeIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: AnswerGenerator,
        translation: TranslationOrchestrator,
        retrieval_k: usize,
    ) -> Self {
        Self {
            index: ArcSwap::from_pointee(index),
            embedder,
            generator,
            translation,
            memory: ConversationMemory::new(),
            retrieval_k: retrieval_k.max(1),
        }
    }

    /// Wire up the production providers and open (or build) the index.
    /// Fails fast when the knowledge base is empty or the LLM key is
    /// missing — a service that cannot answer should not start.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> = match config.embedding.provider.as_str() {
            "openai" => Arc::new(
                OpenAiEmbeddingProvider::new(
                    config
                        .embedding
                        .resolve_api_key()
                        .context("embedding api key not configured")?,
                    config.embedding.model.clone(),
                    config.embedding.dimensions,
                )
                .with_base_url(config.embedding.base_url.clone()),
            ),
            _ => Arc::new(StubEmbeddingProvider::new(config.embedding.dimensions)),
        };

        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiChatProvider::new(
            config
                .llm
                .resolve_api_key()
                .context("llm api key not configured")?,
            config.llm.base_url.clone(),
        ));

        let index_config = IndexConfig {
            data_dir: config.data_dir.clone(),
            db_path: config.index_db.clone(),
            chunking: config.chunking.to_chunker_config(),
        };
        let index = KnowledgeIndex::open(index_config, embedder.as_ref())
            .await
            .context("knowledge index unavailable")?;

        let translation = TranslationOrchestrator::new(
            Arc::new(ScriptDetector),
            Arc::new(GoogleTranslator::new()),
            config.retry.to_policy(),
            config.default_language,
        );

        Ok(Self::new(
            index,
            embedder,
            AnswerGenerator::new(llm, config.llm.to_generator_config()),
            translation,
            config.retrieval_k,
        ))
    }

    /// One RAG step in the working language: retrieve, generate, remember.
    /// Retrieval failures propagate; generation failures already degraded
    /// inside the generator.
    pub async fn query(
        &self,
        user_query: &str,
        session_id: &str,
        k: Option<usize>,
    ) -> Result<AnswerResult> {
        let k = k.unwrap_or(self.retrieval_k);
        let index = self.index.load_full();
        let retrieved = index
            .search(self.embedder.as_ref(), user_query, k, None)
            .await
            .context("knowledge base retrieval failed")?;

        let history = self.memory.get(session_id);
        let result = self.generator.generate(user_query, &retrieved, &history).await;

        self.memory.append(
            session_id,
            ConversationTurn {
                user_text: user_query.to_string(),
                assistant_text: result.response_text.clone(),
                created_at: result.generated_at,
            },
        );

        Ok(result)
    }

    /// The full multilingual flow: detect, translate in, answer, translate
    /// out. Translation is best-effort throughout; only retrieval failures
    /// surface as errors.
    pub async fn chat(
        &self,
        user_query: &str,
        session_id: &str,
        target_language: Option<LanguageCode>,
    ) -> Result<ChatOutcome> {
        let detected = self.translation.detect_language(user_query).await;
        let (english_query, detected) = self
            .translation
            .translate(user_query, Some(detected), WORKING_LANGUAGE)
            .await;

        let answer = self.query(&english_query, session_id, None).await?;

        let response_language = target_language.unwrap_or(detected);
        let (response, _) = self
            .translation
            .translate(&answer.response_text, Some(WORKING_LANGUAGE), response_language)
            .await;

        Ok(ChatOutcome {
            original_query: user_query.to_string(),
            detected_language: detected,
            language_name: detected.display_name().to_string(),
            english_query,
            response,
            english_response: answer.response_text,
            response_language,
            confidence: answer.confidence,
            needs_human_handoff: answer.needs_human_handoff,
            sources: answer.sources,
            generated_at: answer.generated_at,
        })
    }

    pub async fn translate_query_response(
        &self,
        user_query: &str,
        bot_response: &str,
        target_language: Option<LanguageCode>,
    ) -> TranslationOutcome {
        self.translation
            .translate_query_response(user_query, bot_response, target_language)
            .await
    }

    /// Drop one session's conversation memory. No-op for unknown sessions.
    pub fn clear_conversation(&self, session_id: &str) -> bool {
        self.memory.clear(session_id)
    }

    /// The most recent `limit` turns of a session, oldest first.
    pub fn conversation_history(&self, session_id: &str, limit: usize) -> Vec<ConversationTurn> {
        self.memory.recent(session_id, limit)
    }

    pub fn supported_languages() -> BTreeMap<&'static str, &'static str> {
        TranslationOrchestrator::supported_languages()
    }

    pub fn clear_translation_cache(&self) {
        self.translation.clear_cache()
    }

    /// Rebuild the index from the documents on disk and swap it in. Queries
    /// already running keep the previous index until they finish.
    pub async fn reload_index(&self) -> Result<()> {
        let config = self.index.load().config().clone();
        let fresh = KnowledgeIndex::rebuild(config, self.embedder.as_ref())
            .await
            .context("knowledge base reload failed")?;
        self.index.store(Arc::new(fresh));
        info!("knowledge index reloaded");
        Ok(())
    }

    pub async fn index_chunk_count(&self) -> Result<i64> {
        self.index.load_full().chunk_count().await
    }
}
