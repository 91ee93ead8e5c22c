use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The ten languages the service understands. Anything detected outside this
/// set is mapped to the configured default before it is stored anywhere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    #[default]
    En,
    Hi,
    Gu,
    Mr,
    Ta,
    Te,
    Bn,
    Kn,
    Ml,
    Pa,
}

impl LanguageCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Gu => "gu",
            Self::Mr => "mr",
            Self::Ta => "ta",
            Self::Te => "te",
            Self::Bn => "bn",
            Self::Kn => "kn",
            Self::Ml => "ml",
            Self::Pa => "pa",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi",
            Self::Gu => "Gujarati",
            Self::Mr => "Marathi",
            Self::Ta => "Tamil",
            Self::Te => "Telugu",
            Self::Bn => "Bengali",
            Self::Kn => "Kannada",
            Self::Ml => "Malayalam",
            Self::Pa => "Punjabi",
        }
    }

    /// Parse an ISO 639-1 code. Returns None for anything outside the
    /// supported set.
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Self::En),
            "hi" => Some(Self::Hi),
            "gu" => Some(Self::Gu),
            "mr" => Some(Self::Mr),
            "ta" => Some(Self::Ta),
            "te" => Some(Self::Te),
            "bn" => Some(Self::Bn),
            "kn" => Some(Self::Kn),
            "ml" => Some(Self::Ml),
            "pa" => Some(Self::Pa),
            _ => None,
        }
    }

    pub fn all() -> [Self; 10] {
        [
            Self::En,
            Self::Hi,
            Self::Gu,
            Self::Mr,
            Self::Ta,
            Self::Te,
            Self::Bn,
            Self::Kn,
            Self::Ml,
            Self::Pa,
        ]
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an indexed chunk came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Faq,
    Circular,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Faq => "faq",
            Self::Circular => "circular",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "faq" => Some(Self::Faq),
            "circular" => Some(Self::Circular),
            _ => None,
        }
    }
}

/// Provenance of one retrieved chunk, surfaced to the caller alongside the
/// generated answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub kind: SourceKind,
    pub category: String,
    pub origin: String,
}

/// One question/answer exchange held in session memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_text: String,
    pub assistant_text: String,
    pub created_at: DateTime<Utc>,
}

/// The grounded answer produced by one RAG step (English side).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub response_text: String,
    /// Heuristic score in [0, 1]; not a calibrated probability.
    pub confidence: f32,
    pub needs_human_handoff: bool,
    pub sources: Vec<SourceRef>,
    pub generated_at: DateTime<Utc>,
}

/// Result of the full query/response translation workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationOutcome {
    pub original_query: String,
    pub english_query: String,
    pub detected_language: LanguageCode,
    pub language_name: String,
    pub english_response: String,
    pub translated_response: String,
    pub response_language: LanguageCode,
}

/// Everything the composed chat flow hands back to the API layer: the RAG
/// answer plus both sides of the translation round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub original_query: String,
    pub detected_language: LanguageCode,
    pub language_name: String,
    pub english_query: String,
    pub response: String,
    pub english_response: String,
    pub response_language: LanguageCode,
    pub confidence: f32,
    pub needs_human_handoff: bool,
    pub sources: Vec<SourceRef>,
    pub generated_at: DateTime<Utc>,
}
