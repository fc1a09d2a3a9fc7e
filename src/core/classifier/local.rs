//! Local heuristic completeness classifier
//!
//! Zero-latency fallback transport: judges completeness from surface cues
//! of the transcript alone. Biased toward "complete" so that a wrong guess
//! costs an early response, never a stalled one.

use async_trait::async_trait;

use super::{ClassifierError, CompletenessClassifier};

/// Trailing words that strongly suggest the speaker is mid-sentence.
const CONTINUATION_WORDS: &[&str] = &[
    "and", "but", "or", "so", "because", "although", "however", "with", "the", "a", "an", "to",
    "um", "uh", "like", "also",
];

pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletenessClassifier for HeuristicClassifier {
    async fn is_utterance_complete(&self, utterance: &str) -> Result<bool, ClassifierError> {
        let trimmed = utterance.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }

        if trimmed.ends_with("...") || trimmed.ends_with('…') {
            return Ok(false);
        }
        if trimmed.ends_with(',') || trimmed.ends_with('-') || trimmed.ends_with(':') {
            return Ok(false);
        }
        if trimmed.ends_with('.') || trimmed.ends_with('!') || trimmed.ends_with('?') {
            return Ok(true);
        }

        let last_word = trimmed
            .rsplit(|c: char| c.is_whitespace())
            .next()
            .unwrap_or("")
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if CONTINUATION_WORDS.contains(&last_word.as_str()) {
            return Ok(false);
        }

        Ok(true)
    }

    fn provider_info(&self) -> &'static str {
        "HeuristicClassifier (local)"
    }
}
