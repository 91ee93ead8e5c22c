//! Translation orchestration around the English-language pipeline.
//!
//! Detection and translation are both best-effort: a failed detection falls
//! back to the default language, and a translation that still fails after
//! the bounded retry passes the original text through. Neither ever aborts
//! the user-facing answer.
//!
//! Successful translations land in a process-lifetime cache keyed by
//! `(text, requested source, destination)`. The cache is unbounded — FAQ
//! traffic repeats heavily and entries are small — which is a deliberate,
//! documented trade-off.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use sahayak_provider::{LanguageDetector, RetryPolicy, Translator};
use sahayak_schema::{LanguageCode, TranslationOutcome};

/// Retrieval and generation always run in English.
pub const WORKING_LANGUAGE: LanguageCode = LanguageCode::En;

type CacheKey = (String, Option<LanguageCode>, LanguageCode);
type CacheValue = (String, LanguageCode);

pub struct TranslationOrchestrator {
    detector: Arc<dyn LanguageDetector>,
    translator: Arc<dyn Translator>,
    retry: RetryPolicy,
    default_language: LanguageCode,
    cache: Mutex<HashMap<CacheKey, CacheValue>>,
}

impl TranslationOrchestrator {
    pub fn new(
        detector: Arc<dyn LanguageDetector>,
        translator: Arc<dyn Translator>,
        retry: RetryPolicy,
        default_language: LanguageCode,
    ) -> Self {
        Self {
            detector,
            translator,
            retry,
            default_language,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Identify the language of `text`. Unsupported and undetectable inputs
    /// resolve to the default language; this never fails.
    pub async fn detect_language(&self, text: &str) -> LanguageCode {
        match self.detector.detect(text).await {
            Ok(code) => match LanguageCode::parse(&code) {
                Some(lang) => lang,
                None => {
                    warn!(
                        code,
                        fallback = %self.default_language,
                        "detected language not supported, using default"
                    );
                    self.default_language
                }
            },
            Err(error) => {
                warn!(%error, fallback = %self.default_language, "language detection failed");
                self.default_language
            }
        }
    }

    /// Translate `text` into `dest`, auto-detecting the source when `src` is
    /// `None`. Returns the translated text and the resolved source language.
    ///
    /// Same-language requests pass through without touching the provider.
    /// Provider failures are retried; after exhaustion the original text is
    /// returned untranslated.
    pub async fn translate(
        &self,
        text: &str,
        src: Option<LanguageCode>,
        dest: LanguageCode,
    ) -> (String, LanguageCode) {
        let key: CacheKey = (text.to_string(), src, dest);
        if let Some(hit) = self.cache.lock().expect("translation cache poisoned").get(&key) {
            debug!(dest = %dest, "translation cache hit");
            return hit.clone();
        }

        let src_lang = match src {
            Some(lang) => lang,
            None => self.detect_language(text).await,
        };

        if text.trim().is_empty() || src_lang == dest {
            return (text.to_string(), src_lang);
        }

        let outcome = self
            .retry
            .run(|_attempt| async {
                self.translator.translate(text, Some(src_lang), dest).await
            })
            .await;

        match outcome {
            Ok(translation) => {
                let resolved = translation.detected_source.unwrap_or(src_lang);
                let value: CacheValue = (translation.text, resolved);
                self.cache
                    .lock()
                    .expect("translation cache poisoned")
                    .insert(key, value.clone());
                value
            }
            Err(error) => {
                warn!(%error, src = %src_lang, dest = %dest, "translation failed, passing original text through");
                (text.to_string(), src_lang)
            }
        }
    }

    /// The full query/response workflow: detect the user's language,
    /// translate the query into English, and translate the response into the
    /// requested (or detected) language.
    pub async fn translate_query_response(
        &self,
        user_query: &str,
        bot_response: &str,
        target_language: Option<LanguageCode>,
    ) -> TranslationOutcome {
        let user_language = self.detect_language(user_query).await;
        let (english_query, detected) = self
            .translate(user_query, Some(user_language), WORKING_LANGUAGE)
            .await;

        let response_language = target_language.unwrap_or(user_language);
        let (translated_response, _) = self
            .translate(bot_response, Some(WORKING_LANGUAGE), response_language)
            .await;

        info!(
            detected = %detected,
            response = %response_language,
            "translation workflow complete"
        );

        TranslationOutcome {
            original_query: user_query.to_string(),
            english_query,
            detected_language: detected,
            language_name: detected.display_name().to_string(),
            english_response: bot_response.to_string(),
            translated_response,
            response_language,
        }
    }

    pub fn supported_languages() -> BTreeMap<&'static str, &'static str> {
        LanguageCode::all()
            .into_iter()
            .map(|code| (code.as_str(), code.display_name()))
            .collect()
    }

    pub fn is_supported(code: &str) -> bool {
        LanguageCode::parse(code).is_some()
    }

    pub fn clear_cache(&self) {
        self.cache
            .lock()
            .expect("translation cache poisoned")
            .clear();
        info!("translation cache cleared");
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().expect("translation cache poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use sahayak_provider::{StubDetector, Translation};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Counts calls; fails the first `fail_first` of them.
    struct CountingTranslator {
        calls: AtomicU32,
        fail_first: u32,
    }

    impl CountingTranslator {
        fn new(fail_first: u32) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail_first,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Translator for CountingTranslator {
        async fn translate(
            &self,
            text: &str,
            src: Option<LanguageCode>,
            dest: LanguageCode,
        ) -> Result<Translation> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_first {
                return Err(anyhow!("provider unavailable (call {call})"));
            }
            Ok(Translation {
                text: format!("[{}] {}", dest.as_str(), text),
                detected_source: src,
            })
        }
    }

    fn orchestrator(
        detector_code: Option<&str>,
        translator: Arc<CountingTranslator>,
    ) -> TranslationOrchestrator {
        let detector: Arc<dyn LanguageDetector> = match detector_code {
            Some(code) => Arc::new(StubDetector::new(code)),
            None => Arc::new(StubDetector::failing()),
        };
        TranslationOrchestrator::new(
            detector,
            translator,
            RetryPolicy::new(3, Duration::ZERO),
            LanguageCode::En,
        )
    }

    #[tokio::test]
    async fn same_language_passes_through_without_provider_call() {
        let translator = CountingTranslator::new(0);
        let orch = orchestrator(Some("en"), translator.clone());

        let (text, lang) = orch
            .translate("hello", Some(LanguageCode::En), LanguageCode::En)
            .await;
        assert_eq!(text, "hello");
        assert_eq!(lang, LanguageCode::En);
        assert_eq!(translator.calls(), 0);
    }

    #[tokio::test]
    async fn empty_text_passes_through() {
        let translator = CountingTranslator::new(0);
        let orch = orchestrator(Some("hi"), translator.clone());
        let (text, _) = orch
            .translate("   ", Some(LanguageCode::En), LanguageCode::Hi)
            .await;
        assert_eq!(text, "   ");
        assert_eq!(translator.calls(), 0);
    }

    #[tokio::test]
    async fn fails_twice_then_succeeds() {
        let translator = CountingTranslator::new(2);
        let orch = orchestrator(Some("hi"), translator.clone());

        let (text, lang) = orch
            .translate("नमस्ते", Some(LanguageCode::Hi), LanguageCode::En)
            .await;
        assert_eq!(text, "[en] नमस्ते");
        assert_eq!(lang, LanguageCode::Hi);
        assert_eq!(translator.calls(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_return_original_text() {
        let translator = CountingTranslator::new(u32::MAX);
        let orch = orchestrator(Some("hi"), translator.clone());

        let (text, lang) = orch
            .translate("नमस्ते", Some(LanguageCode::Hi), LanguageCode::En)
            .await;
        assert_eq!(text, "नमस्ते");
        assert_eq!(lang, LanguageCode::Hi);
        assert_eq!(translator.calls(), 3);
        // Failures are not cached; a later call tries the provider again.
        orch.translate("नमस्ते", Some(LanguageCode::Hi), LanguageCode::En)
            .await;
        assert_eq!(translator.calls(), 6);
    }

    #[tokio::test]
    async fn successful_translation_is_cached() {
        let translator = CountingTranslator::new(0);
        let orch = orchestrator(Some("hi"), translator.clone());

        let first = orch
            .translate("fee deadline", Some(LanguageCode::En), LanguageCode::Hi)
            .await;
        let second = orch
            .translate("fee deadline", Some(LanguageCode::En), LanguageCode::Hi)
            .await;
        assert_eq!(first, second);
        assert_eq!(translator.calls(), 1);
        assert_eq!(orch.cache_len(), 1);
    }

    #[tokio::test]
    async fn clear_cache_forces_fresh_translation() {
        let translator = CountingTranslator::new(0);
        let orch = orchestrator(Some("hi"), translator.clone());

        orch.translate("text", Some(LanguageCode::En), LanguageCode::Gu)
            .await;
        orch.clear_cache();
        assert_eq!(orch.cache_len(), 0);
        orch.translate("text", Some(LanguageCode::En), LanguageCode::Gu)
            .await;
        assert_eq!(translator.calls(), 2);
    }

    #[tokio::test]
    async fn detection_failure_falls_back_to_default() {
        let orch = orchestrator(None, CountingTranslator::new(0));
        assert_eq!(orch.detect_language("whatever").await, LanguageCode::En);
    }

    #[tokio::test]
    async fn unsupported_detected_code_falls_back_to_default() {
        let orch = orchestrator(Some("fr"), CountingTranslator::new(0));
        assert_eq!(orch.detect_language("bonjour").await, LanguageCode::En);
    }

    #[tokio::test]
    async fn query_response_workflow_round_trips() {
        let translator = CountingTranslator::new(0);
        let orch = orchestrator(Some("hi"), translator.clone());

        let outcome = orch
            .translate_query_response(
                "मुझे छात्रवृत्ति के बारे में बताओ",
                "Scholarships close March 31st.",
                None,
            )
            .await;

        assert_eq!(outcome.detected_language, LanguageCode::Hi);
        assert_eq!(outcome.language_name, "Hindi");
        assert_eq!(outcome.response_language, LanguageCode::Hi);
        assert!(outcome.english_query.starts_with("[en] "));
        assert_eq!(outcome.translated_response, "[hi] Scholarships close March 31st.");
        assert_ne!(outcome.translated_response, outcome.english_response);
        assert_eq!(translator.calls(), 2);
    }

    #[tokio::test]
    async fn explicit_target_language_overrides_detected() {
        let translator = CountingTranslator::new(0);
        let orch = orchestrator(Some("hi"), translator.clone());

        let outcome = orch
            .translate_query_response("नमस्ते", "Hello.", Some(LanguageCode::Gu))
            .await;
        assert_eq!(outcome.response_language, LanguageCode::Gu);
        assert_eq!(outcome.translated_response, "[gu] Hello.");
    }

    #[tokio::test]
    async fn english_query_and_target_skip_all_translation() {
        let translator = CountingTranslator::new(0);
        let orch = orchestrator(Some("en"), translator.clone());

        let outcome = orch
            .translate_query_response(
                "What are the hostel facilities?",
                "Hostels have wifi and a mess.",
                Some(LanguageCode::En),
            )
            .await;

        assert_eq!(outcome.english_query, "What are the hostel facilities?");
        assert_eq!(outcome.translated_response, "Hostels have wifi and a mess.");
        assert_eq!(translator.calls(), 0);
    }

    #[test]
    fn supported_languages_lists_all_ten() {
        let langs = TranslationOrchestrator::supported_languages();
        assert_eq!(langs.len(), 10);
        assert_eq!(langs.get("hi"), Some(&"Hindi"));
        assert!(TranslationOrchestrator::is_supported("ta"));
        assert!(!TranslationOrchestrator::is_supported("fr"));
    }
}
