//! Comment directory built from the comments part.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::markup::XmlDocument;
use crate::package::DocxPackage;

/// A comment as stored in the comments part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Comment id, unique within the document.
    pub id: String,

    /// Comment body, one line per comment paragraph.
    pub body: String,

    /// When the comment was written (ISO-8601).
    pub date: Option<String>,

    pub author: Option<String>,

    pub initials: Option<String>,
}

/// Mapping from comment id to its record, loaded once per document.
#[derive(Debug, Clone, Default)]
pub struct CommentDirectory {
    records: HashMap<String, CommentRecord>,
}

impl CommentDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the directory from a package. A package without a comments
    /// part yields an empty directory.
    pub fn load(package: &DocxPackage) -> Result<Self> {
        let Some(part) = package.comments_part_name()? else {
            debug!("No comments part, comment directory is empty");
            return Ok(Self::new());
        };
        match package.part(&part) {
            Some(bytes) => Self::parse(&part, bytes),
            None => Ok(Self::new()),
        }
    }

    /// Parse a comments part.
    pub fn parse(part: &str, bytes: &[u8]) -> Result<Self> {
        let doc = XmlDocument::parse(part, bytes)?;
        let mut records = HashMap::new();
        for comment in doc.root.descendants("comment") {
            let Some(id) = comment.attr("id") else {
                continue;
            };
            let paragraphs = comment.descendants("p");
            let body = if paragraphs.is_empty() {
                comment.leaf_text(&["t"])
            } else {
                paragraphs
                    .iter()
                    .map(|p| p.leaf_text(&["t"]))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            records.insert(
                id.clone(),
                CommentRecord {
                    id,
                    body,
                    date: comment.attr("date"),
                    author: comment.attr("author"),
                    initials: comment.attr("initials"),
                },
            );
        }
        debug!("Loaded {} comments from {part}", records.len());
        Ok(Self { records })
    }

    /// Look up a comment by id.
    pub fn get(&self, id: &str) -> Option<&CommentRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
