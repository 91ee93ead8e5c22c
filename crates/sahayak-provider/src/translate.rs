//! Machine-translation backends.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use sahayak_schema::LanguageCode;

/// Result of a single translation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub text: String,
    /// Source language the provider resolved, when it reports one
    /// (e.g. after auto-detection).
    pub detected_source: Option<LanguageCode>,
}

/// Translation backend. `src = None` asks the provider to auto-detect.
///
/// Implementations may fail; the orchestrator wraps calls in a bounded retry
/// and degrades to the untranslated text on exhaustion.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        src: Option<LanguageCode>,
        dest: LanguageCode,
    ) -> Result<Translation>;
}

// ---------------------------------------------------------------------------
// Google web endpoint
// ---------------------------------------------------------------------------

/// Client for the public Google translate web endpoint
/// (`/translate_a/single?client=gtx`). No API key; the endpoint is
/// best-effort and rate-limited, which is why callers retry.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslator {
    pub fn new() -> Self {
        Self::with_base_url("https://translate.googleapis.com".to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        src: Option<LanguageCode>,
        dest: LanguageCode,
    ) -> Result<Translation> {
        let sl = src.map(|l| l.as_str()).unwrap_or("auto");
        let url = format!("{}/translate_a/single", self.base_url);

        let response = self
            .client
            .get(url)
            .query(&[
                ("client", "gtx"),
                ("sl", sl),
                ("tl", dest.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        parse_gtx_response(&body, src)
    }
}

/// The gtx endpoint answers with a nested array:
/// `[[["translated","original",..],..], _, "detected-lang", ..]`.
fn parse_gtx_response(
    body: &serde_json::Value,
    requested_src: Option<LanguageCode>,
) -> Result<Translation> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("unexpected translate response shape"))?;

    let mut text = String::new();
    for segment in segments {
        if let Some(part) = segment.get(0).and_then(|v| v.as_str()) {
            text.push_str(part);
        }
    }

    if text.is_empty() {
        return Err(anyhow!("translate response contained no text"));
    }

    let detected_source = body
        .get(2)
        .and_then(|v| v.as_str())
        .and_then(LanguageCode::parse)
        .or(requested_src);

    Ok(Translation {
        text,
        detected_source,
    })
}

// ---------------------------------------------------------------------------
// Stub translator
// ---------------------------------------------------------------------------

/// Marks translated text with the destination code so tests can assert that
/// a round trip actually happened.
pub struct StubTranslator;

#[async_trait]
impl Translator for StubTranslator {
    async fn translate(
        &self,
        text: &str,
        src: Option<LanguageCode>,
        dest: LanguageCode,
    ) -> Result<Translation> {
        Ok(Translation {
            text: format!("[{}] {}", dest.as_str(), text),
            detected_source: src,
        })
    }
}
