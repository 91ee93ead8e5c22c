//! Retrieval confidence heuristic.
//!
//! A hand-tuned score over the retrieved chunk set, NOT a calibrated
//! probability: it only encodes "more sources and more authoritative source
//! kinds deserve more trust". Kept free of I/O so it stays trivially
//! testable.

use sahayak_memory::RetrievedChunk;
use sahayak_schema::SourceKind;

/// Starting score once anything at all was retrieved.
pub const BASE_SCORE: f32 = 0.5;
/// Added when at least two chunks back the answer.
pub const MULTI_SOURCE_BONUS: f32 = 0.2;
/// Added when any FAQ chunk is present (FAQs answer directly).
pub const FAQ_BONUS: f32 = 0.2;
/// Added when any circular chunk is present (official but less targeted).
pub const CIRCULAR_BONUS: f32 = 0.1;
/// Below this the answer should be escalated to a human.
pub const HANDOFF_THRESHOLD: f32 = 0.5;

pub fn confidence(chunks: &[RetrievedChunk]) -> f32 {
    if chunks.is_empty() {
        return 0.0;
    }

    let mut score = BASE_SCORE;
    if chunks.len() >= 2 {
        score += MULTI_SOURCE_BONUS;
    }
    if chunks.iter().any(|c| c.chunk.kind == SourceKind::Faq) {
        score += FAQ_BONUS;
    }
    if chunks.iter().any(|c| c.chunk.kind == SourceKind::Circular) {
        score += CIRCULAR_BONUS;
    }

    score.min(1.0)
}

pub fn needs_handoff(confidence: f32) -> bool {
    confidence < HANDOFF_THRESHOLD
}
