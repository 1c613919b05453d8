//! Package relationships and content-type registrations.

use crate::error::Result;
use crate::markup::{Element, XmlDocument};

/// Relationship type of the main document part.
pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// Relationship type of the comments part.
pub const REL_COMMENTS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";

/// Relationship type of the numbering part.
pub const REL_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";

/// Content type of the comments part.
pub const CT_COMMENTS: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml";

const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// A single relationship entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// `External` targets do not point into the package.
    pub external: bool,
}

/// The relationships of one source part.
#[derive(Debug, Clone)]
pub struct Relationships {
    doc: XmlDocument,
}

impl Relationships {
    /// An empty relationships part.
    pub fn new() -> Self {
        Self {
            doc: XmlDocument::with_root(Element::new("Relationships").with_attr("xmlns", RELS_NS)),
        }
    }

    /// Parse a `.rels` part.
    pub fn parse(part: &str, bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            doc: XmlDocument::parse(part, bytes)?,
        })
    }

    /// All relationships in order.
    pub fn entries(&self) -> Vec<Relationship> {
        self.doc
            .root
            .elements()
            .filter(|el| el.is("Relationship"))
            .filter_map(|el| {
                Some(Relationship {
                    id: el.attr("Id")?,
                    rel_type: el.attr("Type")?,
                    target: el.attr("Target")?,
                    external: el.attr("TargetMode").is_some_and(|m| m == "External"),
                })
            })
            .collect()
    }

    /// First internal relationship of the given type.
    pub fn find(&self, rel_type: &str) -> Option<Relationship> {
        self.entries()
            .into_iter()
            .find(|rel| rel.rel_type == rel_type && !rel.external)
    }

    /// Add a relationship with a fresh id and return that id.
    pub fn add(&mut self, rel_type: &str, target: &str) -> String {
        let taken: Vec<String> = self.entries().into_iter().map(|rel| rel.id).collect();
        let id = (1..)
            .map(|n| format!("rId{n}"))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_default();
        let prefix = self.doc.root.prefix();
        self.doc.root.children.push(
            Element::prefixed(prefix.as_deref(), "Relationship")
                .with_attr("Id", &id)
                .with_attr("Type", rel_type)
                .with_attr("Target", target)
                .into(),
        );
        id
    }

    pub fn to_bytes(&self, part: &str) -> Result<Vec<u8>> {
        self.doc.to_bytes(part)
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new()
    }
}

/// Name of the relationships part belonging to `part`
/// (`word/document.xml` → `word/_rels/document.xml.rels`).
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, name)) => format!("{dir}/_rels/{name}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target relative to its source part.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Register a part override in `[Content_Types].xml` unless one exists.
///
/// Returns `true` when the content types were changed.
pub fn ensure_override(content_types: &mut XmlDocument, part: &str, content_type: &str) -> bool {
    let part_name = format!("/{}", part.trim_start_matches('/'));
    let exists = content_types
        .root
        .elements()
        .filter(|el| el.is("Override"))
        .any(|el| el.attr("PartName").is_some_and(|name| name.eq_ignore_ascii_case(&part_name)));
    if exists {
        return false;
    }
    let prefix = content_types.root.prefix();
    content_types.root.children.push(
        Element::prefixed(prefix.as_deref(), "Override")
            .with_attr("PartName", &part_name)
            .with_attr("ContentType", content_type)
            .into(),
    );
    true
}
