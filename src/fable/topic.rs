// SPDX-License-Identifier: MIT

//! Topic classification
//!
//! The collector answers either with a free-text restatement or with the
//! canonical form `STORY: [topic: ..., theme: ...]`. Completeness is decided
//! by the literal prefix alone; topic and theme are extracted best-effort for
//! display and never change the classification.

use serde::Serialize;
use std::fmt;

/// Prefix marking a fully specified topic
pub const TOPIC_MARKER: &str = "STORY:";

const THEME_KEY: &str = ", theme:";
const TOPIC_KEY: &str = "topic:";

/// A canonical topic string with its parsed parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalTopic {
    raw: String,
    topic: Option<String>,
    theme: Option<String>,
}

impl CanonicalTopic {
    /// Build the canonical form from a topic and a theme
    pub fn format(topic: &str, theme: &str) -> Self {
        Self {
            raw: format!("{} [topic: {}, theme: {}]", TOPIC_MARKER, topic, theme),
            topic: Some(topic.to_string()),
            theme: Some(theme.to_string()),
        }
    }

    fn from_marked(raw: &str) -> Self {
        let (topic, theme) = match parse_fields(raw) {
            Some((topic, theme)) => (Some(topic), Some(theme)),
            None => (None, None),
        };
        Self {
            raw: raw.to_string(),
            topic,
            theme,
        }
    }

    /// The canonical string exactly as produced
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn theme(&self) -> Option<&str> {
        self.theme.as_deref()
    }
}

impl fmt::Display for CanonicalTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Classification of the collector's latest output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicStatus {
    /// Nothing usable was produced
    Empty,
    /// Provisional restatement; more user input is needed
    Incomplete(String),
    /// Canonical topic; collection is done
    Complete(CanonicalTopic),
}

impl TopicStatus {
    pub fn parse(text: &str) -> Self {
        if text.trim().is_empty() {
            TopicStatus::Empty
        } else if text.starts_with(TOPIC_MARKER) {
            TopicStatus::Complete(CanonicalTopic::from_marked(text))
        } else {
            TopicStatus::Incomplete(text.to_string())
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, TopicStatus::Complete(_))
    }
}

/// Extract `(topic, theme)` from `STORY: [topic: X, theme: Y]`
fn parse_fields(raw: &str) -> Option<(String, String)> {
    let body = raw.strip_prefix(TOPIC_MARKER)?.trim();
    let inner = body.strip_prefix('[')?.strip_suffix(']')?;

    let split = inner.rfind(THEME_KEY)?;
    let topic = inner[..split].trim().strip_prefix(TOPIC_KEY)?;
    let theme = &inner[split + THEME_KEY.len()..];

    let topic = unbracket(topic.trim());
    let theme = unbracket(theme.trim());
    if topic.is_empty() || theme.is_empty() {
        return None;
    }
    Some((topic.to_string(), theme.to_string()))
}

/// Drop one pair of enclosing brackets, as in `topic: [a robot]`
fn unbracket(s: &str) -> &str {
    s.strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .map(str::trim)
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_topic_parses() {
        let status = TopicStatus::parse("STORY: [topic: a robot who learns to paint, theme: comedy]");
        let TopicStatus::Complete(topic) = status else {
            panic!("expected complete topic");
        };
        assert_eq!(topic.topic(), Some("a robot who learns to paint"));
        assert_eq!(topic.theme(), Some("comedy"));
        assert_eq!(
            topic.as_str(),
            "STORY: [topic: a robot who learns to paint, theme: comedy]"
        );
    }

    #[test]
    fn test_topic_containing_commas() {
        let status = TopicStatus::parse("STORY: [topic: a cat, a dog, and a mouse, theme: horror]");
        let TopicStatus::Complete(topic) = status else {
            panic!("expected complete topic");
        };
        assert_eq!(topic.topic(), Some("a cat, a dog, and a mouse"));
        assert_eq!(topic.theme(), Some("horror"));
    }

    #[test]
    fn test_bracketed_parts_are_unwrapped() {
        let status = TopicStatus::parse("STORY: [topic: [a lost astronaut], theme: [science fiction]]");
        let TopicStatus::Complete(topic) = status else {
            panic!("expected complete topic");
        };
        assert_eq!(topic.topic(), Some("a lost astronaut"));
        assert_eq!(topic.theme(), Some("science fiction"));
    }

    #[test]
    fn test_marker_without_fields_is_still_complete() {
        let status = TopicStatus::parse("STORY: something odd");
        let TopicStatus::Complete(topic) = status else {
            panic!("expected complete topic");
        };
        assert_eq!(topic.topic(), None);
        assert_eq!(topic.theme(), None);
        assert_eq!(topic.as_str(), "STORY: something odd");
    }

    #[test]
    fn test_restatement_is_incomplete() {
        assert_eq!(
            TopicStatus::parse("Original input: a robot"),
            TopicStatus::Incomplete("Original input: a robot".to_string())
        );
    }

    #[test]
    fn test_prefix_check_is_strict() {
        assert!(!TopicStatus::parse(" STORY: [topic: a, theme: b]").is_complete());
        assert!(!TopicStatus::parse("story: [topic: a, theme: b]").is_complete());
        assert!(!TopicStatus::parse("Here it is: STORY: [topic: a, theme: b]").is_complete());
    }

    #[test]
    fn test_empty_and_blank_are_empty() {
        assert_eq!(TopicStatus::parse(""), TopicStatus::Empty);
        assert_eq!(TopicStatus::parse("  \n"), TopicStatus::Empty);
    }

    #[test]
    fn test_format_round_trips() {
        let topic = CanonicalTopic::format("a haunted lighthouse", "mystery");
        assert_eq!(
            topic.as_str(),
            "STORY: [topic: a haunted lighthouse, theme: mystery]"
        );
        assert_eq!(
            TopicStatus::parse(topic.as_str()),
            TopicStatus::Complete(topic)
        );
    }
}
