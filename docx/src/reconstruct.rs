//! Revision-aware text reconstruction.
//!
//! Each paragraph is walked recursively with an explicit visibility mode.
//! `w:t` feeds the paragraph's visible text only while the mode is visible;
//! `w:delText` never does. Both feed every open comment range regardless of
//! mode.
//! Revision wrappers switch the mode for their subtree and record one event
//! each; comment range markers open and close per-id buffers that are local
//! to the paragraph being walked.

use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::body::{self, TEXT_LEAVES};
use crate::comments::CommentDirectory;
use crate::error::{DocxError, Result};
use crate::markup::{Element, XmlDocument};
use crate::model::{ChangeEvent, ChangeKind, DocumentAnalysis, ListMembership, Paragraph, sort_events};
use crate::numbering::NumberingDefinitions;
use crate::package::DocxPackage;

/// Whether text met during the walk is part of the final paragraph text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Visible,
    Deleted,
}

/// Map a revision wrapper to its event kind and the mode of its subtree.
fn revision_wrapper(el: &Element) -> Option<(ChangeKind, Visibility)> {
    if el.is("ins") {
        Some((ChangeKind::Insert, Visibility::Visible))
    } else if el.is("del") {
        Some((ChangeKind::Delete, Visibility::Deleted))
    } else if el.is("moveFrom") {
        Some((ChangeKind::MoveFrom, Visibility::Deleted))
    } else if el.is("moveTo") {
        Some((ChangeKind::MoveTo, Visibility::Visible))
    } else {
        None
    }
}

/// Reconstructs single paragraphs against a document's comment directory
/// and numbering definitions.
pub struct ParagraphReconstructor<'a> {
    comments: &'a CommentDirectory,
    numbering: &'a NumberingDefinitions,
}

impl<'a> ParagraphReconstructor<'a> {
    pub fn new(comments: &'a CommentDirectory, numbering: &'a NumberingDefinitions) -> Self {
        Self {
            comments,
            numbering,
        }
    }

    /// Reconstruct the paragraph at `index` from its `w:p` element.
    pub fn reconstruct(&self, index: usize, paragraph: &Element) -> Paragraph {
        let mut walk = Walk {
            comments: self.comments,
            visible: String::new(),
            events: Vec::new(),
            open_ranges: IndexMap::new(),
        };
        walk.visit(paragraph, Visibility::Visible);

        // Ranges that never closed inside this paragraph still count.
        let unterminated: Vec<_> = walk.open_ranges.drain(..).collect();
        for (id, text) in unterminated {
            walk.emit_comment(id, text);
        }

        let Walk {
            visible,
            mut events,
            ..
        } = walk;
        sort_events(&mut events);

        Paragraph {
            index,
            text: visible.trim().to_string(),
            list: self.list_membership(paragraph),
            events,
        }
    }

    fn list_membership(&self, paragraph: &Element) -> Option<ListMembership> {
        let num_pr = paragraph.child("pPr")?.child("numPr")?;
        let num_id = num_pr.child("numId")?.attr("val")?;
        // numId 0 removes numbering inherited from a style.
        if num_id == "0" {
            return None;
        }
        let level = num_pr
            .child("ilvl")
            .and_then(|el| el.attr("val"))
            .and_then(|val| val.parse::<u8>().ok())
            .unwrap_or(0);
        let format = self.numbering.format(&num_id, level).map(str::to_string);
        Some(ListMembership {
            num_id,
            level,
            format,
        })
    }
}

struct Walk<'a> {
    comments: &'a CommentDirectory,
    visible: String,
    events: Vec<ChangeEvent>,
    /// Open comment ranges: id → accumulated text, in opening order.
    open_ranges: IndexMap<String, String>,
}

impl Walk<'_> {
    fn visit(&mut self, node: &Element, mode: Visibility) {
        for child in node.elements() {
            if child.is("delText") {
                // Deleted characters, even under a nested insertion.
                self.contribute(&child.own_text(), Visibility::Deleted);
            } else if TEXT_LEAVES.iter().any(|leaf| child.is(leaf)) {
                self.contribute(&child.own_text(), mode);
            } else if child.is("pPr") || child.is("rPr") {
                // Property subtrees, including paragraph-mark revisions.
            } else if let Some((kind, inner)) = revision_wrapper(child) {
                self.events.push(ChangeEvent::revision(
                    kind,
                    child.leaf_text(TEXT_LEAVES),
                    child.attr("author"),
                    child.attr("date"),
                ));
                self.visit(child, inner);
            } else if child.is("commentRangeStart") {
                if let Some(id) = child.attr("id") {
                    self.open_ranges.insert(id, String::new());
                }
            } else if child.is("commentRangeEnd") {
                let closed = child
                    .attr("id")
                    .and_then(|id| self.open_ranges.shift_remove_entry(&id));
                if let Some((id, text)) = closed {
                    self.emit_comment(id, text);
                }
            } else {
                self.visit(child, mode);
            }
        }
    }

    fn contribute(&mut self, text: &str, mode: Visibility) {
        if text.is_empty() {
            return;
        }
        if mode == Visibility::Visible {
            self.visible.push_str(text);
        }
        for buffer in self.open_ranges.values_mut() {
            buffer.push_str(text);
        }
    }

    fn emit_comment(&mut self, id: String, text: String) {
        let event = match self.comments.get(&id) {
            Some(record) => ChangeEvent::comment(
                &id,
                text,
                record.body.clone(),
                record.author.clone(),
                record.date.clone(),
            ),
            None => {
                debug!("Comment {id} is not in the comment directory");
                ChangeEvent::comment(&id, text, String::new(), None, None)
            }
        };
        self.events.push(event);
    }
}

/// Reads a package into a `DocumentAnalysis`.
pub struct DocumentAnalyzer {
    package: DocxPackage,
    source: String,
    comments: CommentDirectory,
    numbering: NumberingDefinitions,
}

impl DocumentAnalyzer {
    /// Open a package from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let package = DocxPackage::open(path)?;
        Self::new(package, path.display().to_string())
    }

    /// Wrap an already loaded package. `source` identifies it in the output.
    pub fn new(package: DocxPackage, source: impl Into<String>) -> Result<Self> {
        let comments = CommentDirectory::load(&package).unwrap_or_else(|e| {
            warn!("Ignoring unreadable comments part: {e}");
            CommentDirectory::new()
        });
        let numbering = NumberingDefinitions::load(&package).unwrap_or_else(|e| {
            warn!("Ignoring unreadable numbering part: {e}");
            NumberingDefinitions::default()
        });
        Ok(Self {
            package,
            source: source.into(),
            comments,
            numbering,
        })
    }

    pub fn comments(&self) -> &CommentDirectory {
        &self.comments
    }

    pub fn package(&self) -> &DocxPackage {
        &self.package
    }

    /// Reconstruct every body paragraph.
    ///
    /// Unparseable body markup fails the whole document; no partial
    /// analysis is returned.
    pub fn analyze(&self) -> Result<DocumentAnalysis> {
        let part = self.package.main_part_name().to_string();
        let doc = XmlDocument::parse(&part, self.package.main_part()?)?;
        let body = body::body(&doc.root).ok_or_else(|| DocxError::malformed(&part, "no w:body element"))?;

        let reconstructor = ParagraphReconstructor::new(&self.comments, &self.numbering);
        let paragraphs: Vec<Paragraph> = body::paragraphs(body)
            .into_iter()
            .enumerate()
            .map(|(index, p)| reconstructor.reconstruct(index, p))
            .collect();

        let analysis = DocumentAnalysis {
            source: self.source.clone(),
            paragraphs,
        };
        info!(
            "Analyzed {}: {} paragraphs, {} events",
            analysis.source,
            analysis.paragraphs.len(),
            analysis.event_count()
        );
        Ok(analysis)
    }
}

/// Open and analyze a package in one step.
pub fn load_analysis(path: impl AsRef<Path>) -> Result<DocumentAnalysis> {
    DocumentAnalyzer::open(path)?.analyze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    fn reconstruct_with(inner: &str, comments: &CommentDirectory) -> Paragraph {
        let xml = format!(r#"<w:p xmlns:w="{W}">{inner}</w:p>"#);
        let p = XmlDocument::parse("p.xml", xml.as_bytes()).unwrap().root;
        let numbering = NumberingDefinitions::default();
        ParagraphReconstructor::new(comments, &numbering).reconstruct(0, &p)
    }

    fn reconstruct(inner: &str) -> Paragraph {
        reconstruct_with(inner, &CommentDirectory::new())
    }

    fn kinds(p: &Paragraph) -> Vec<ChangeKind> {
        p.events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_insertions_join_plain_runs() {
        let p = reconstruct(concat!(
            r#"<w:r><w:t xml:space="preserve">The fee is 100</w:t></w:r>"#,
            r#"<w:ins w:id="1" w:author="A" w:date="2024-01-01"><w:r><w:t xml:space="preserve"> USD</w:t></w:r></w:ins>"#,
            r#"<w:r><w:t>.</w:t></w:r>"#,
        ));
        assert_eq!(p.text, "The fee is 100 USD.");
        assert_eq!(
            p.events,
            vec![ChangeEvent::revision(
                ChangeKind::Insert,
                " USD",
                Some("A".to_string()),
                Some("2024-01-01".to_string()),
            )]
        );
    }

    #[test]
    fn test_deleted_text_is_excluded() {
        let p = reconstruct(concat!(
            r#"<w:r><w:t xml:space="preserve">Pay within </w:t></w:r>"#,
            r#"<w:del w:id="2" w:author="B"><w:r><w:delText>thirty</w:delText></w:r></w:del>"#,
            r#"<w:ins w:id="3" w:author="B"><w:r><w:t>sixty</w:t></w:r></w:ins>"#,
            r#"<w:r><w:t xml:space="preserve"> days</w:t></w:r>"#,
        ));
        assert_eq!(p.text, "Pay within sixty days");
        assert!(!p.text.contains("thirty"));
        assert_eq!(kinds(&p), vec![ChangeKind::Delete, ChangeKind::Insert]);
        assert_eq!(p.events[0].text, "thirty");
    }

    #[test]
    fn test_move_from_is_hidden_move_to_is_visible() {
        let source = reconstruct(
            r#"<w:r><w:t>Keep. </w:t></w:r><w:moveFrom w:id="4"><w:r><w:t>Moved clause.</w:t></w:r></w:moveFrom>"#,
        );
        let destination = reconstruct(
            r#"<w:moveTo w:id="5"><w:r><w:t>Moved clause.</w:t></w:r></w:moveTo>"#,
        );
        assert_eq!(source.text, "Keep.");
        assert_eq!(kinds(&source), vec![ChangeKind::MoveFrom]);
        assert_eq!(destination.text, "Moved clause.");
        assert_eq!(kinds(&destination), vec![ChangeKind::MoveTo]);
    }

    #[test]
    fn test_insertion_containing_deletion() {
        // The insertion event records the full literal text of its subtree,
        // while the paragraph text drops the nested deletion.
        let p = reconstruct(concat!(
            r#"<w:ins w:id="6" w:author="A" w:date="2024-01-01T00:00:00Z">"#,
            r#"<w:r><w:t xml:space="preserve">new </w:t></w:r>"#,
            r#"<w:del w:id="7" w:author="B" w:date="2024-01-02T00:00:00Z"><w:r><w:delText>old</w:delText></w:r></w:del>"#,
            r#"</w:ins>"#,
        ));
        assert_eq!(p.text, "new");
        assert_eq!(kinds(&p), vec![ChangeKind::Insert, ChangeKind::Delete]);
        assert_eq!(p.events[0].text, "new old");
        assert_eq!(p.events[1].text, "old");
    }

    #[test]
    fn test_deletion_wrapping_insertion_stays_hidden() {
        let p = reconstruct(concat!(
            r#"<w:r><w:t xml:space="preserve">Keep </w:t></w:r>"#,
            r#"<w:del w:id="1"><w:ins w:id="2"><w:r><w:delText>gone</w:delText></w:r></w:ins></w:del>"#,
        ));
        assert_eq!(p.text, "Keep");
        assert!(!p.text.contains("gone"));
        assert_eq!(kinds(&p), vec![ChangeKind::Delete, ChangeKind::Insert]);
    }

    #[test]
    fn test_comment_range_collects_deleted_text_too() {
        let mut comments_xml = String::from(r#"<w:comments xmlns:w=""#);
        comments_xml.push_str(W);
        comments_xml.push_str(r#""><w:comment w:id="9" w:author="R" w:date="2024-05-01T00:00:00Z"><w:p><w:r><w:t>Why drop this?</w:t></w:r></w:p></w:comment></w:comments>"#);
        let directory = CommentDirectory::parse("word/comments.xml", comments_xml.as_bytes()).unwrap();

        let p = reconstruct_with(
            concat!(
                r#"<w:commentRangeStart w:id="9"/>"#,
                r#"<w:r><w:t xml:space="preserve">Net </w:t></w:r>"#,
                r#"<w:del w:id="1"><w:r><w:delText>ninety</w:delText></w:r></w:del>"#,
                r#"<w:commentRangeEnd w:id="9"/>"#,
                r#"<w:r><w:commentReference w:id="9"/></w:r>"#,
            ),
            &directory,
        );
        assert_eq!(p.text, "Net");
        let comment = p.events_of(ChangeKind::Comment).next().unwrap();
        assert_eq!(comment.text, "Net ninety");
        assert_eq!(comment.comment_id.as_deref(), Some("9"));
        assert_eq!(comment.comment_text.as_deref(), Some("Why drop this?"));
        assert_eq!(comment.author.as_deref(), Some("R"));
        assert_eq!(comment.date.as_deref(), Some("2024-05-01T00:00:00Z"));
    }

    #[test]
    fn test_overlapping_and_unterminated_ranges() {
        let p = reconstruct(concat!(
            r#"<w:commentRangeStart w:id="1"/>"#,
            r#"<w:r><w:t>one </w:t></w:r>"#,
            r#"<w:commentRangeStart w:id="2"/>"#,
            r#"<w:r><w:t>two </w:t></w:r>"#,
            r#"<w:commentRangeEnd w:id="1"/>"#,
            r#"<w:r><w:t>three</w:t></w:r>"#,
        ));
        assert_eq!(p.text, "one two three");
        let comments: Vec<_> = p
            .events_of(ChangeKind::Comment)
            .map(|e| (e.comment_id.clone().unwrap(), e.text.clone()))
            .collect();
        assert_eq!(
            comments,
            vec![
                ("1".to_string(), "one two ".to_string()),
                ("2".to_string(), "two three".to_string()),
            ]
        );
        // Unknown ids still emit, with an empty body and no date.
        let unterminated = &p.events[1];
        assert_eq!(unterminated.comment_text.as_deref(), Some(""));
        assert_eq!(unterminated.date, None);
    }

    #[test]
    fn test_end_marker_without_start_is_ignored() {
        let p = reconstruct(r#"<w:r><w:t>x</w:t></w:r><w:commentRangeEnd w:id="3"/>"#);
        assert!(p.events.is_empty());
    }

    #[test]
    fn test_events_sorted_by_date_with_undated_first() {
        let p = reconstruct(concat!(
            r#"<w:ins w:id="1" w:date="2024-02-01T00:00:00Z"><w:r><w:t>b</w:t></w:r></w:ins>"#,
            r#"<w:ins w:id="2" w:date="2024-01-01T00:00:00Z"><w:r><w:t>a</w:t></w:r></w:ins>"#,
            r#"<w:ins w:id="3"><w:r><w:t>c</w:t></w:r></w:ins>"#,
        ));
        let order: Vec<_> = p.events.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_hyperlink_text_counted_once() {
        let p = reconstruct(
            r#"<w:r><w:t xml:space="preserve">See </w:t></w:r><w:hyperlink w:anchor="s1"><w:r><w:t>section 1</w:t></w:r></w:hyperlink>"#,
        );
        assert_eq!(p.text, "See section 1");
    }

    #[test]
    fn test_paragraph_mark_revisions_are_not_events() {
        let p = reconstruct(
            r#"<w:pPr><w:rPr><w:ins w:id="1" w:author="A"/></w:rPr></w:pPr><w:r><w:t>Body</w:t></w:r>"#,
        );
        assert_eq!(p.text, "Body");
        assert!(p.events.is_empty());
    }

    #[test]
    fn test_empty_paragraph() {
        let p = reconstruct("");
        assert_eq!(p.text, "");
        assert!(p.events.is_empty());
        assert!(p.list.is_none());
    }

    #[test]
    fn test_list_membership() {
        let p = reconstruct(
            r#"<w:pPr><w:numPr><w:ilvl w:val="1"/><w:numId w:val="3"/></w:numPr></w:pPr><w:r><w:t>item</w:t></w:r>"#,
        );
        let list = p.list.unwrap();
        assert_eq!(list.num_id, "3");
        assert_eq!(list.level, 1);
        assert_eq!(list.format, None);

        let removed = reconstruct(r#"<w:pPr><w:numPr><w:numId w:val="0"/></w:numPr></w:pPr>"#);
        assert!(removed.list.is_none());
    }
}
