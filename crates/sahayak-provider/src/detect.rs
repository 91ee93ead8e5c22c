//! Language identification.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// Identifies the language of a text, returning an ISO 639-1 code where one
/// exists. The orchestrator maps anything outside the supported set (and any
/// error) to the configured default language, so implementations report what
/// they see without second-guessing.
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, text: &str) -> Result<String>;
}

/// Local detector built on whatlang (script analysis + trigrams). All ten
/// supported languages use distinct scripts or well-separated trigram
/// profiles, so no network call is needed.
pub struct ScriptDetector;

#[async_trait]
impl LanguageDetector for ScriptDetector {
    async fn detect(&self, text: &str) -> Result<String> {
        let info = whatlang::detect(text)
            .ok_or_else(|| anyhow!("language detection produced no result"))?;
        Ok(iso_639_1(info.lang()).to_string())
    }
}

/// whatlang reports ISO 639-3; collapse the supported languages to their
/// 639-1 codes and pass everything else through as-is (the orchestrator will
/// treat unknown codes as unsupported).
fn iso_639_1(lang: whatlang::Lang) -> &'static str {
    use whatlang::Lang;
    match lang {
        Lang::Eng => "en",
        Lang::Hin => "hi",
        Lang::Guj => "gu",
        Lang::Mar => "mr",
        Lang::Tam => "ta",
        Lang::Tel => "te",
        Lang::Ben => "bn",
        Lang::Kan => "kn",
        Lang::Mal => "ml",
        Lang::Pan => "pa",
        other => other.code(),
    }
}

/// Fixed-answer detector for tests. `None` simulates a detection failure.
pub struct StubDetector {
    code: Option<String>,
}

impl StubDetector {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
        }
    }

    pub fn failing() -> Self {
        Self { code: None }
    }
}

#[async_trait]
impl LanguageDetector for StubDetector {
    async fn detect(&self, _text: &str) -> Result<String> {
        self.code
            .clone()
            .ok_or_else(|| anyhow!("stub detector configured to fail"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detects_hindi() {
        let code = ScriptDetector
            .detect("मुझे छात्रवृत्ति के बारे में बताओ")
            .await
            .unwrap();
        assert_eq!(code, "hi");
    }

    #[tokio::test]
    async fn detects_english() {
        let code = ScriptDetector
            .detect("What are the hostel facilities available on campus?")
            .await
            .unwrap();
        assert_eq!(code, "en");
    }

    #[tokio::test]
    async fn detects_gujarati() {
        let code = ScriptDetector
            .detect("ફી ભરવાની છેલ્લી તારીખ ક્યારે છે?")
            .await
            .unwrap();
        assert_eq!(code, "gu");
    }

    #[tokio::test]
    async fn detects_tamil() {
        let code = ScriptDetector
            .detect("விடுதி வசதிகள் பற்றி சொல்லுங்கள்")
            .await
            .unwrap();
        assert_eq!(code, "ta");
    }

    #[tokio::test]
    async fn stub_detector_fixed_and_failing() {
        assert_eq!(StubDetector::new("gu").detect("x").await.unwrap(), "gu");
        assert!(StubDetector::failing().detect("x").await.is_err());
    }
}
