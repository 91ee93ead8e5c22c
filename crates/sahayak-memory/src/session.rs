//! Per-session conversation memory.
//!
//! A bounded ring of recent turns per session key, shared across concurrent
//! requests behind one mutex (session counts are small; per-key locking is
//! not worth the machinery).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sahayak_schema::ConversationTurn;

/// Turns kept per session; oldest dropped first on overflow.
const MAX_TURNS: usize = 10;

#[derive(Clone, Default)]
pub struct ConversationMemory {
    inner: Arc<Mutex<HashMap<String, Vec<ConversationTurn>>>>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a turn, creating the session lazily and truncating to the most
    /// recent [`MAX_TURNS`].
    pub fn append(&self, session_id: &str, turn: ConversationTurn) {
        let mut inner = self.inner.lock().expect("conversation memory poisoned");
        let turns = inner.entry(session_id.to_string()).or_default();
        turns.push(turn);
        if turns.len() > MAX_TURNS {
            let excess = turns.len() - MAX_TURNS;
            turns.drain(..excess);
        }
    }

    /// All remembered turns for a session, oldest first. Unknown sessions
    /// yield an empty vec, never an error.
    pub fn get(&self, session_id: &str) -> Vec<ConversationTurn> {
        self.inner
            .lock()
            .expect("conversation memory poisoned")
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The most recent `limit` turns, oldest first.
    pub fn recent(&self, session_id: &str, limit: usize) -> Vec<ConversationTurn> {
        let mut turns = self.get(session_id);
        if turns.len() > limit {
            turns.drain(..turns.len() - limit);
        }
        turns
    }

    /// Drop a session's history. No-op when the session is unknown.
    pub fn clear(&self, session_id: &str) -> bool {
        self.inner
            .lock()
            .expect("conversation memory poisoned")
            .remove(session_id)
            .is_some()
    }

    pub fn session_count(&self) -> usize {
        self.inner
            .lock()
            .expect("conversation memory poisoned")
            .len()
    }
}
