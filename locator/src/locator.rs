//! The comment locator seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A span proposed for one comment, delimited by its first and last words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedSpan {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

impl LocatedSpan {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// No span was proposed.
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }

    /// Accept the span only if both ends are non-empty, exact substrings of
    /// `paragraph_text` and `end` occurs at or after the first `start`.
    pub fn validate(&self, paragraph_text: &str) -> Option<(String, String)> {
        if self.start.is_empty() || self.end.is_empty() {
            return None;
        }
        let from = paragraph_text.find(self.start.as_str())?;
        paragraph_text[from..].find(self.end.as_str())?;
        Some((self.start.clone(), self.end.clone()))
    }
}

/// Proposes where in a paragraph each comment belongs.
#[async_trait]
pub trait CommentLocator: Send + Sync {
    /// Get the name of this locator.
    fn name(&self) -> &str;

    /// Propose one span per comment body, in order. Empty spans mean the
    /// comment could not be placed.
    async fn locate(&self, paragraph_text: &str, comments: &[String]) -> Result<Vec<LocatedSpan>>;

    /// Check if the locator can be used (API key set, etc.).
    fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_requires_exact_substrings() {
        let text = "The Supplier shall deliver the Goods within 30 days.";
        assert_eq!(
            LocatedSpan::new("deliver", "30 days").validate(text),
            Some(("deliver".to_string(), "30 days".to_string()))
        );
        assert_eq!(LocatedSpan::new("Deliver", "30 days").validate(text), None);
        assert_eq!(LocatedSpan::new("", "30 days").validate(text), None);
        assert_eq!(LocatedSpan::new("deliver", "").validate(text), None);
        assert_eq!(LocatedSpan::new("deliver", "60 days").validate(text), None);
    }

    #[test]
    fn test_validate_requires_end_after_start() {
        let text = "The Supplier shall deliver the Goods within 30 days.";
        assert_eq!(LocatedSpan::new("30 days", "Supplier").validate(text), None);
        assert_eq!(
            LocatedSpan::new("Goods", "Goods").validate(text),
            Some(("Goods".to_string(), "Goods".to_string()))
        );
    }

    #[test]
    fn test_missing_fields_deserialize_empty() {
        let span: LocatedSpan = serde_json::from_str(r#"{"start":"a"}"#).unwrap();
        assert_eq!(span, LocatedSpan::new("a", ""));
        assert!(LocatedSpan::default().is_empty());
    }
}
