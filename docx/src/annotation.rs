//! Parsing of free-text review feedback into paragraph annotations.
//!
//! Review text comes from a text generator whose formatting cannot be fully
//! controlled, so the grammar is permissive: a line counts when, after list
//! and emphasis decoration, it starts with a bracketed paragraph marker such
//! as `[paragraph 5]`. Everything else is ignored.

use std::collections::BTreeMap;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Default marker label, as in `[paragraph 5]`.
pub const DEFAULT_LABEL: &str = "paragraph";

/// Quote pairs accepted around a literal target.
const QUOTES: &[(&str, &str)] = &[("\"", "\""), ("\u{201C}", "\u{201D}")];

/// What part of a paragraph an annotation is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CommentTarget {
    /// The whole paragraph.
    Paragraph,
    /// A literal phrase quoted by the reviewer.
    Literal { text: String },
    /// A span from the first `start` to the first following `end`.
    Range { start: String, end: String },
}

/// One parsed annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAnnotation {
    /// Zero-based paragraph index.
    pub paragraph: usize,

    pub target: CommentTarget,

    /// Text after the paragraph marker, decoration and quotes preserved.
    pub body: String,
}

impl ReviewAnnotation {
    pub fn new(paragraph: usize, target: CommentTarget, body: impl Into<String>) -> Self {
        Self {
            paragraph,
            target,
            body: body.into(),
        }
    }

    /// Whether the annotation still targets its whole paragraph.
    pub fn is_unresolved(&self) -> bool {
        self.target == CommentTarget::Paragraph
    }

    /// The body without its leading quoted target.
    ///
    /// Once the comment is anchored on the quoted phrase, repeating it in
    /// the comment adds nothing. A leading emphasis marker left over from
    /// the line decoration is dropped too. Falls back to the full body when
    /// nothing else remains.
    pub fn comment_text(&self) -> &str {
        let rest = strip_emphasis(&self.body);
        let remark = match &self.target {
            CommentTarget::Literal { text: quoted } => strip_quoted(rest, quoted).unwrap_or(rest),
            _ => rest,
        };
        if remark.is_empty() { &self.body } else { remark }
    }
}

fn strip_emphasis(text: &str) -> &str {
    let text = text.trim_start();
    text.strip_prefix("**")
        .or_else(|| text.strip_prefix("__"))
        .map_or(text, str::trim_start)
}

/// The text after a leading `"quoted"` phrase and its separator.
fn strip_quoted<'a>(text: &'a str, quoted: &str) -> Option<&'a str> {
    QUOTES.iter().find_map(|(open, close)| {
        let after = text.strip_prefix(open)?.strip_prefix(quoted)?.strip_prefix(close)?;
        Some(
            after
                .trim_start_matches(|c: char| {
                    c.is_whitespace() || matches!(c, '*' | '_' | ':' | '-' | '\u{2013}' | '\u{2014}')
                })
                .trim_end(),
        )
    })
}

/// Parser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Word used inside the marker, e.g. `paragraph` or `段落`.
    pub label: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl ParserConfig {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Extracts annotations from review text.
#[derive(Debug, Clone)]
pub struct AnnotationParser {
    line: Regex,
    quote: Regex,
}

impl AnnotationParser {
    /// Build a parser for the configured marker label.
    pub fn new(config: &ParserConfig) -> Result<Self> {
        let label = regex_lite::escape(config.label.trim());
        let line = Regex::new(&format!(
            r"^[-*+\d.)\s]*(?:[*_]{{2}})?\s*\[(?i:{label})\s*(\d+)\s*\]\s*(.+)$"
        ))?;
        let quote = Regex::new("^\\s*(?:[*_]{2})?\\s*(?:\"([^\"]+)\"|\u{201C}([^\u{201D}]+)\u{201D})")?;
        Ok(Self { line, quote })
    }

    /// Parser for the default `[paragraph N]` marker.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&ParserConfig::default())
    }

    /// Parse review text. Lines that do not carry a marker are skipped.
    pub fn parse(&self, review: &str) -> Vec<ReviewAnnotation> {
        let annotations: Vec<_> = review.lines().filter_map(|line| self.parse_line(line)).collect();
        debug!("Parsed {} annotations from review text", annotations.len());
        annotations
    }

    /// Parse a single line.
    pub fn parse_line(&self, line: &str) -> Option<ReviewAnnotation> {
        let caps = self.line.captures(line.trim())?;
        let paragraph = caps.get(1)?.as_str().parse::<usize>().ok()?;
        let body = caps.get(2)?.as_str().trim().to_string();
        if body.is_empty() {
            return None;
        }
        let target = self
            .quote
            .captures(&body)
            .and_then(|q| q.get(1).or_else(|| q.get(2)))
            .map(|m| CommentTarget::Literal {
                text: m.as_str().to_string(),
            })
            .unwrap_or(CommentTarget::Paragraph);
        Some(ReviewAnnotation {
            paragraph,
            target,
            body,
        })
    }
}

/// Group annotations by paragraph, keeping encounter order within each.
pub fn group_by_paragraph(
    annotations: impl IntoIterator<Item = ReviewAnnotation>,
) -> BTreeMap<usize, Vec<ReviewAnnotation>> {
    let mut grouped: BTreeMap<usize, Vec<ReviewAnnotation>> = BTreeMap::new();
    for annotation in annotations {
        grouped.entry(annotation.paragraph).or_default().push(annotation);
    }
    grouped
}
