//! Overlapping window splitter for knowledge-base text.
//!
//! Windows aim for `target_size` characters and prefer to end on a semantic
//! boundary, trying separators in priority order: paragraph break, line
//! break, space, hard cut. Adjacent windows overlap by `overlap_size`
//! characters so a fact straddling a boundary stays retrievable.

/// Separators in preference order. A hard cut is the fallback.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Target window size in characters.
    pub target_size: usize,
    /// Characters of overlap carried into the next window.
    pub overlap_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_size: 500,
            overlap_size: 50,
        }
    }
}

/// Split `text` into overlapping windows. Deterministic; returns an empty
/// vec for blank input and a single chunk when the text already fits.
pub fn split_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let target = config.target_size.max(1);
    let overlap = config.overlap_size.min(target.saturating_sub(1));

    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= target {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let window_end = floor_char_boundary(text, (start + target).min(text.len()));
        let end = if window_end == text.len() {
            window_end
        } else {
            best_split(&text[start..window_end])
                .map(|pos| start + pos)
                .unwrap_or(window_end)
        };

        let piece = text[start..end].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if end >= text.len() {
            break;
        }

        // Step back by the overlap, but always make forward progress.
        let next = floor_char_boundary(text, end.saturating_sub(overlap));
        start = if next > start { next } else { end };
    }

    chunks
}

/// Last boundary-respecting split position inside the window, trying each
/// separator in priority order. Positions at the very start of the window
/// are useless and skipped.
fn best_split(window: &str) -> Option<usize> {
    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            if pos > 0 {
                return Some(pos + sep.len());
            }
        }
    }
    None
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(target_size: usize, overlap_size: usize) -> ChunkerConfig {
        ChunkerConfig {
            target_size,
            overlap_size,
        }
    }

    #[test]
    fn blank_input_returns_empty() {
        assert!(split_text("", &cfg(100, 10)).is_empty());
        assert!(split_text("   \n\n  ", &cfg(100, 10)).is_empty());
    }

    #[test]
    fn short_text_single_chunk() {
        let chunks = split_text("Fee deadline is January 31st.", &cfg(500, 50));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "Fee deadline is January 31st.");
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let text = "First paragraph about fees.\n\nSecond paragraph about hostels.";
        let chunks = split_text(text, &cfg(40, 5));
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0], "First paragraph about fees.");
    }

    #[test]
    fn falls_back_to_line_breaks() {
        let text = "line one about exams\nline two about results\nline three about marks";
        let chunks = split_text(text, &cfg(45, 5));
        assert!(chunks.len() >= 2);
        assert!(chunks[0].ends_with("exams") || chunks[0].ends_with("results"));
    }

    #[test]
    fn falls_back_to_spaces() {
        let text = "word ".repeat(100);
        let chunks = split_text(&text, &cfg(30, 5));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 30);
        }
    }

    #[test]
    fn hard_cut_when_no_separator() {
        let text = "x".repeat(120);
        let chunks = split_text(&text, &cfg(50, 10));
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].len(), 50);
    }

    #[test]
    fn adjacent_windows_overlap() {
        let text = "alpha ".repeat(40);
        let chunks = split_text(&text, &cfg(60, 20));
        assert!(chunks.len() >= 2);
        // The tail of chunk 0 reappears at the head of chunk 1.
        let tail: String = chunks[0].chars().rev().take(10).collect::<String>();
        let tail: String = tail.chars().rev().collect();
        assert!(chunks[1].contains(tail.trim()));
    }

    #[test]
    fn deterministic() {
        let text = "section one\n\nsection two\n\nsection three".repeat(20);
        let a = split_text(&text, &cfg(80, 15));
        let b = split_text(&text, &cfg(80, 15));
        assert_eq!(a, b);
    }

    #[test]
    fn multibyte_text_never_panics() {
        let text = "छात्रवृत्ति की अंतिम तिथि मार्च में है। ".repeat(30);
        let chunks = split_text(&text, &cfg(90, 20));
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn default_config_matches_knowledge_base_tuning() {
        let config = ChunkerConfig::default();
        assert_eq!(config.target_size, 500);
        assert_eq!(config.overlap_size, 50);
    }
}
