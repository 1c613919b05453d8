//! The reconstructed document model.
//!
//! `DocumentAnalysis` is the unit handed to review generation: ordered
//! paragraphs with their final text, list membership and the tracked
//! changes and comments attached to them.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Tracked insertion.
    Insert,
    /// Tracked deletion.
    Delete,
    /// Source side of a tracked move.
    MoveFrom,
    /// Destination side of a tracked move.
    MoveTo,
    /// A comment range.
    Comment,
}

/// A tracked revision or comment found in a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,

    /// The literal text the event spans.
    pub text: String,

    pub author: Option<String>,

    /// ISO-8601 timestamp as written in the document.
    pub date: Option<String>,

    /// Comment id (comments only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<String>,

    /// Resolved comment body (comments only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_text: Option<String>,
}

impl ChangeEvent {
    /// A revision event (insert, delete or move).
    pub fn revision(
        kind: ChangeKind,
        text: impl Into<String>,
        author: Option<String>,
        date: Option<String>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            author,
            date,
            comment_id: None,
            comment_text: None,
        }
    }

    /// A comment event.
    pub fn comment(
        comment_id: impl Into<String>,
        text: impl Into<String>,
        comment_text: impl Into<String>,
        author: Option<String>,
        date: Option<String>,
    ) -> Self {
        Self {
            kind: ChangeKind::Comment,
            text: text.into(),
            author,
            date,
            comment_id: Some(comment_id.into()),
            comment_text: Some(comment_text.into()),
        }
    }

    /// Parsed timestamp, if the date is present and well formed.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.date.as_deref().and_then(parse_timestamp)
    }

    /// The date, unless it is absent or blank.
    fn sort_date(&self) -> Option<&str> {
        self.date.as_deref().filter(|date| !date.trim().is_empty())
    }
}

/// Parse the timestamp forms found in revision markup.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Order events by ascending date.
///
/// Undated events, including those with a blank date, come first. Dated events compare by parsed timestamp, then
/// by the raw string; a date that does not parse sorts before parsed ones.
/// The sort is stable, so ties keep emission order.
pub fn sort_events(events: &mut [ChangeEvent]) {
    events.sort_by(compare_dates);
}

fn compare_dates(a: &ChangeEvent, b: &ChangeEvent) -> Ordering {
    match (a.sort_date(), b.sort_date()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(da), Some(db)) => a.timestamp().cmp(&b.timestamp()).then_with(|| da.cmp(db)),
    }
}

/// Numbering attached to a list paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMembership {
    /// Numbering instance id (`w:numId`).
    pub num_id: String,

    /// Indent level (`w:ilvl`), zero-based.
    pub level: u8,

    /// Level format from the numbering part, e.g. `bullet` or `decimal`.
    pub format: Option<String>,
}

/// One reconstructed paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Zero-based position among the body's paragraphs.
    pub index: usize,

    /// Final text: deletions excluded, insertions included, trimmed.
    pub text: String,

    /// List membership, if the paragraph is numbered.
    pub list: Option<ListMembership>,

    /// Tracked changes and comments, ordered by date.
    pub events: Vec<ChangeEvent>,
}

impl Paragraph {
    /// Events of one kind, in order.
    pub fn events_of(&self, kind: ChangeKind) -> impl Iterator<Item = &ChangeEvent> {
        self.events.iter().filter(move |ev| ev.kind == kind)
    }
}

/// The analysis of a whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    /// Identifier of the analyzed package (usually its path).
    pub source: String,

    pub paragraphs: Vec<Paragraph>,
}

impl DocumentAnalysis {
    /// Total number of change events across the document.
    pub fn event_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.events.len()).sum()
    }

    /// Canonical JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
