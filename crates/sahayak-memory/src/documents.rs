//! Knowledge-base document loading.
//!
//! Two source shapes feed the index:
//! - `faqs.json` — structured FAQ records. Each record becomes one section
//!   whose text carries the question, answer, category and keywords together,
//!   so a single retrieved chunk is self-contained for generation.
//! - `circulars/*.txt` — free-form institutional circulars, one section per
//!   file; the chunker windows them later.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use sahayak_schema::SourceKind;

#[derive(Debug, Error)]
pub enum DocumentError {
    /// Building an index with nothing in it would silently answer every query
    /// with "I don't know"; refuse instead.
    #[error("no documents found under {dir}: expected faqs.json or circulars/*.txt")]
    NoDocuments { dir: PathBuf },
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A loadable unit of knowledge-base text, pre-chunking.
#[derive(Debug, Clone)]
pub struct DocSection {
    pub text: String,
    pub kind: SourceKind,
    pub category: String,
    pub origin: String,
}

#[derive(Debug, Deserialize)]
struct FaqFile {
    #[serde(default)]
    faqs: Vec<FaqRecord>,
}

#[derive(Debug, Deserialize)]
struct FaqRecord {
    id: String,
    question: String,
    answer: String,
    category: String,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Load every FAQ record and circular file under `data_dir`, in a stable
/// order (FAQs as listed, circulars sorted by filename).
pub fn load_documents(data_dir: &Path) -> Result<Vec<DocSection>, DocumentError> {
    let mut sections = Vec::new();

    let faq_path = data_dir.join("faqs.json");
    if faq_path.exists() {
        let raw = std::fs::read_to_string(&faq_path).map_err(|source| DocumentError::Io {
            path: faq_path.clone(),
            source,
        })?;
        let file: FaqFile = serde_json::from_str(&raw).map_err(|source| DocumentError::Parse {
            path: faq_path.clone(),
            source,
        })?;

        let count = file.faqs.len();
        for faq in file.faqs {
            sections.push(DocSection {
                text: render_faq(&faq),
                kind: SourceKind::Faq,
                category: faq.category,
                origin: faq.id,
            });
        }
        info!(count, path = %faq_path.display(), "loaded FAQ records");
    }

    let circulars_dir = data_dir.join("circulars");
    if circulars_dir.is_dir() {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&circulars_dir)
            .map_err(|source| DocumentError::Io {
                path: circulars_dir.clone(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("txt"))
            .collect();
        paths.sort();

        let count = paths.len();
        for path in paths {
            let body = std::fs::read_to_string(&path).map_err(|source| DocumentError::Io {
                path: path.clone(),
                source,
            })?;
            let origin = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("circular.txt")
                .to_string();
            sections.push(DocSection {
                text: body,
                kind: SourceKind::Circular,
                category: "General".to_string(),
                origin,
            });
        }
        info!(count, path = %circulars_dir.display(), "loaded circulars");
    }

    if sections.is_empty() {
        return Err(DocumentError::NoDocuments {
            dir: data_dir.to_path_buf(),
        });
    }

    Ok(sections)
}

fn render_faq(faq: &FaqRecord) -> String {
    format!(
        "Question: {}\nAnswer: {}\nCategory: {}\nKeywords: {}",
        faq.question,
        faq.answer,
        faq.category,
        faq.keywords.join(", ")
    )
}
