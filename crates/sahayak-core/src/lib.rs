//! Core pipeline: retrieval-augmented answering with translation wrapping.
//!
//! The flow for one multilingual chat request:
//!
//! ```text
//! query ──▶ detect ──▶ translate-in ──▶ retrieve ──▶ generate ──▶ translate-out
//!              │            │         (KnowledgeIndex)  (LLM)          │
//!              └────────────┴──── TranslationOrchestrator ─────────────┘
//! ```
//!
//! [`QueryPipeline`] composes the pieces; everything else is usable on its
//! own.

pub mod confidence;
pub mod config;
pub mod generator;
pub mod pipeline;
pub mod translation;

pub use config::ServiceConfig;
pub use generator::{AnswerGenerator, GeneratorConfig};
pub use pipeline::QueryPipeline;
pub use translation::TranslationOrchestrator;
