//! Stimulus record, the bounded history ring, and message-content
//! extraction.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A classified emotional event applied (or about to be applied) to state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub intensity: f64,
    pub reason: String,
    pub confidence: f64,
}

impl Stimulus {
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        intensity: f64,
        reason: impl Into<String>,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now,
            label: label.into(),
            intensity: intensity.clamp(0.0, 1.0),
            reason: reason.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Newest-first bounded ring of recently applied stimuli. §3 invariant 3:
/// bounded by `max_history`, ordered newest-first by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentStimuli(VecDeque<Stimulus>);

impl RecentStimuli {
    #[must_use]
    pub fn new() -> Self {
        Self(VecDeque::new())
    }

    /// Push a stimulus to the front, trimming from the back if the ring
    /// now exceeds `max_history`.
    pub fn push(&mut self, stimulus: Stimulus, max_history: usize) {
        self.0.push_front(stimulus);
        while self.0.len() > max_history.max(1) {
            self.0.pop_back();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Stimulus> {
        self.0.iter()
    }

    /// The `n` most recent stimuli (already newest-first).
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<Stimulus> {
        self.0.iter().take(n).cloned().collect()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Stimulus> {
        self.0.front()
    }
}

/// A single content block as seen in common LLM message wire formats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Message content: either a plain string, or an array of content blocks.
/// Rearchitects the "duck-typed message content" of the original system
/// into a closed sum type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Blocks(Vec<Block>),
}

/// Extract plain text from `content`: trims, concatenates text blocks with
/// a single space separator, ignores non-text blocks, and returns an empty
/// string for neither-shape input (handled naturally since `Content` is a
/// closed sum -- there is no third shape to reject at this layer).
#[must_use]
pub fn extract_text(content: &Content) -> String {
    match content {
        Content::Text(s) => s.trim().to_string(),
        Content::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| match b {
                Block::Text { text } => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        Some(trimmed)
                    }
                }
                Block::Other => None,
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn ring_is_bounded_and_newest_first() {
        let mut ring = RecentStimuli::new();
        for i in 0..5 {
            ring.push(Stimulus::new(format!("label{i}"), 0.5, "t", 0.9, now()), 3);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.latest().unwrap().label, "label4");
    }

    #[test]
    fn extract_text_from_plain_string() {
        let c = Content::Text("  hello world  ".to_string());
        assert_eq!(extract_text(&c), "hello world");
    }

    #[test]
    fn extract_text_joins_text_blocks_with_single_space() {
        let c = Content::Blocks(vec![
            Block::Text { text: "hello".into() },
            Block::Other,
            Block::Text { text: "world".into() },
        ]);
        assert_eq!(extract_text(&c), "hello world");
    }

    #[test]
    fn extract_text_of_empty_blocks_is_empty() {
        let c = Content::Blocks(vec![]);
        assert_eq!(extract_text(&c), "");
    }
}
