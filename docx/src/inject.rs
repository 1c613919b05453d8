//! Writing review comments into a package.
//!
//! Every comment is anchored on a contiguous run range of an existing body
//! paragraph:
//!
//! ```text
//! <w:p>
//!   <w:commentRangeStart w:id="N"/>   before the first run
//!   <w:r>...</w:r> ... <w:r>...</w:r>
//!   <w:commentRangeEnd w:id="N"/>     after the last run
//!   <w:r><w:commentReference w:id="N"/></w:r>
//! </w:p>
//! ```
//!
//! and its body is appended to the comments part. Paragraphs are never
//! added, removed or reordered.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::annotation::ReviewAnnotation;
use crate::body::{self, RunRef};
use crate::error::{DocxError, InjectionError, Result};
use crate::markup::{Element, Node, WORDML_NS, XmlDocument, qualify};
use crate::package::{CONTENT_TYPES_PART, DocxPackage};
use crate::rels::{self, CT_COMMENTS, REL_COMMENTS};
use crate::resolver::{self, RunSpan};

/// Default author label on injected comments.
pub const DEFAULT_AUTHOR: &str = "AI Reviewer";

/// Default initials on injected comments.
pub const DEFAULT_INITIALS: &str = "AI";

/// How injected comments are labelled.
#[derive(Debug, Clone)]
pub struct InjectionOptions {
    pub author: String,
    pub initials: String,
    /// Timestamp written on every comment; the current time when unset.
    pub date: Option<DateTime<Utc>>,
    /// Write the annotation body verbatim, including a leading quoted target.
    pub keep_quoted_target: bool,
}

impl Default for InjectionOptions {
    fn default() -> Self {
        Self {
            author: DEFAULT_AUTHOR.to_string(),
            initials: DEFAULT_INITIALS.to_string(),
            date: None,
            keep_quoted_target: false,
        }
    }
}

impl InjectionOptions {
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_initials(mut self, initials: impl Into<String>) -> Self {
        self.initials = initials.into();
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_keep_quoted_target(mut self, keep: bool) -> Self {
        self.keep_quoted_target = keep;
        self
    }
}

/// An annotation that was not written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAnnotation {
    pub paragraph: usize,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: InjectionError,
}

fn serialize_reason<S: serde::Serializer>(
    reason: &InjectionError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

/// Outcome of an injection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InjectionReport {
    /// Ids of the comments written, in annotation order.
    pub injected: Vec<String>,

    pub skipped: Vec<SkippedAnnotation>,
}

impl InjectionReport {
    pub fn injected_count(&self) -> usize {
        self.injected.len()
    }

    /// Whether every annotation was written.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Writes comments into an in-memory copy of a package.
///
/// Edits are applied to parsed parts and only serialized by
/// [`CommentInjector::finish`]; the source package is not touched.
pub struct CommentInjector {
    package: DocxPackage,
    document: XmlDocument,
    comments: XmlDocument,
    comments_part: String,
    /// Whether the package had no comments part before this injector.
    comments_created: bool,
    next_id: u64,
    date: String,
    options: InjectionOptions,
    written: usize,
}

impl CommentInjector {
    /// Prepare a package for injection.
    ///
    /// Fails when the body part or an existing comments part cannot be
    /// parsed; comments are appended to that part, so it cannot be skipped.
    pub fn new(package: DocxPackage, options: InjectionOptions) -> Result<Self> {
        let main = package.main_part_name().to_string();
        let document = XmlDocument::parse(&main, package.main_part()?)?;
        if body::body(&document.root).is_none() {
            return Err(DocxError::malformed(&main, "no w:body element"));
        }

        let existing = match package.comments_part_name()? {
            Some(name) => package
                .part(&name)
                .map(|bytes| XmlDocument::parse(&name, bytes).map(|doc| (name.clone(), doc)))
                .transpose()?,
            None => None,
        };
        let comments_created = existing.is_none();
        let (comments_part, comments) = match existing {
            Some(found) => found,
            None => {
                // A dangling comments relationship names where the new part goes.
                let name = package
                    .main_relationships()?
                    .find(REL_COMMENTS)
                    .map(|rel| rels::resolve_target(&main, &rel.target))
                    .unwrap_or_else(|| rels::resolve_target(&main, "comments.xml"));
                let root = Element::new("w:comments").with_attr("xmlns:w", WORDML_NS);
                (name, XmlDocument::with_root(root))
            }
        };

        let next_id = next_comment_id(&document.root, &comments.root);
        let date = options
            .date
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        debug!("Injecting into {main}, comments part {comments_part}, next comment id {next_id}");

        Ok(Self {
            package,
            document,
            comments,
            comments_part,
            comments_created,
            next_id,
            date,
            options,
            written: 0,
        })
    }

    /// Number of body paragraphs.
    pub fn paragraph_count(&self) -> usize {
        body::body(&self.document.root)
            .map(|body| body::paragraph_slots(body).len())
            .unwrap_or(0)
    }

    /// Concatenated text of a paragraph's targetable runs.
    pub fn paragraph_text(&self, index: usize) -> Option<String> {
        let body = body::body(&self.document.root)?;
        let paragraph = body::paragraphs(body).into_iter().nth(index)?;
        Some(body::run_text(&body::collect_runs(paragraph)))
    }

    /// Write every annotation that can be anchored.
    ///
    /// Annotations that cannot be written are logged and reported; they
    /// never stop the remaining ones.
    pub fn inject(&mut self, annotations: &[ReviewAnnotation]) -> InjectionReport {
        let mut report = InjectionReport::default();
        for annotation in annotations {
            match self.inject_one(annotation) {
                Ok(id) => report.injected.push(id),
                Err(reason) => {
                    warn!("Skipping comment on paragraph {}: {reason}", annotation.paragraph);
                    report.skipped.push(SkippedAnnotation {
                        paragraph: annotation.paragraph,
                        reason,
                    });
                }
            }
        }
        report
    }

    /// Write a single annotation and return the new comment id.
    pub fn inject_one(&mut self, annotation: &ReviewAnnotation) -> std::result::Result<String, InjectionError> {
        let index = annotation.paragraph;
        let count = self.paragraph_count();
        let prefix = body::body(&self.document.root).and_then(Element::prefix);
        let paragraph = body::body_mut(&mut self.document.root)
            .and_then(|body| {
                let slot = *body::paragraph_slots(body).get(index)?;
                body.children.get_mut(slot)?.as_element_mut()
            })
            .ok_or(InjectionError::ParagraphOutOfRange { index, count })?;

        let runs = body::collect_runs(paragraph);
        let texts: Vec<&str> = runs.iter().map(|run| run.text.as_str()).collect();
        let span = resolver::resolve(&texts, &annotation.target).ok_or(InjectionError::NoRuns(index))?;

        let id = self.next_id.to_string();
        anchor(paragraph, &runs, span, prefix.as_deref(), &id).ok_or(InjectionError::NoRuns(index))?;

        let text = if self.options.keep_quoted_target {
            annotation.body.as_str()
        } else {
            annotation.comment_text()
        };
        let comment = self.comment_element(&id, text);
        self.comments.root.children.push(comment.into());

        self.next_id += 1;
        self.written += 1;
        debug!(
            "Comment {id} anchored on runs {}..={} of paragraph {index}",
            span.first_run, span.last_run
        );
        Ok(id)
    }

    fn comment_element(&self, id: &str, text: &str) -> Element {
        let prefix = self.comments.root.prefix();
        let w = |local: &str| Element::prefixed(prefix.as_deref(), local);
        let attr = |local: &str| qualify(prefix.as_deref(), local);

        let mut comment = w("comment")
            .with_attr(&attr("id"), id)
            .with_attr(&attr("author"), &self.options.author)
            .with_attr(&attr("date"), &self.date)
            .with_attr(&attr("initials"), &self.options.initials);

        for (i, line) in text.split('\n').enumerate() {
            let mut paragraph = w("p").with_child(
                w("pPr").with_child(w("pStyle").with_attr(&attr("val"), "CommentText")),
            );
            if i == 0 {
                paragraph = paragraph.with_child(
                    w("r")
                        .with_child(w("rPr").with_child(w("rStyle").with_attr(&attr("val"), "CommentReference")))
                        .with_child(w("annotationRef")),
                );
            }
            paragraph = paragraph.with_child(
                w("r").with_child(
                    w("t")
                        .with_attr("xml:space", "preserve")
                        .with_child(Node::text(line.trim_end_matches('\r'))),
                ),
            );
            comment = comment.with_child(paragraph);
        }
        comment
    }

    /// Serialize the edited parts into the package.
    ///
    /// The comments part, its relationship and its content-type override
    /// are created when missing. A package with no injected comments is
    /// returned unchanged.
    pub fn finish(self) -> Result<DocxPackage> {
        let mut package = self.package;
        if self.written == 0 {
            debug!("No comments written, package left unchanged");
            return Ok(package);
        }

        let main = package.main_part_name().to_string();
        package.set_part(&main, self.document.to_bytes(&main)?);
        package.set_part(&self.comments_part, self.comments.to_bytes(&self.comments_part)?);

        let mut relationships = package.main_relationships()?;
        if relationships.find(REL_COMMENTS).is_none() {
            let target = relative_target(&main, &self.comments_part);
            let rel_id = relationships.add(REL_COMMENTS, &target);
            let rels_part = rels::rels_part_for(&main);
            package.set_part(&rels_part, relationships.to_bytes(&rels_part)?);
            debug!("Added comments relationship {rel_id} to {rels_part}");
        }

        match package.part(CONTENT_TYPES_PART) {
            Some(bytes) => {
                let mut types = XmlDocument::parse(CONTENT_TYPES_PART, bytes)?;
                if rels::ensure_override(&mut types, &self.comments_part, CT_COMMENTS) {
                    package.set_part(CONTENT_TYPES_PART, types.to_bytes(CONTENT_TYPES_PART)?);
                }
            }
            None => warn!("Package has no {CONTENT_TYPES_PART}, comments part is not registered"),
        }

        info!(
            "Wrote {} comments to {}{}",
            self.written,
            self.comments_part,
            if self.comments_created { " (new part)" } else { "" }
        );
        Ok(package)
    }
}

/// Insert the range markers and the reference run for comment `id`.
///
/// Markers are inserted back to front so the paths in `runs` stay valid:
/// the end marker and reference run both sit after the first run.
fn anchor(paragraph: &mut Element, runs: &[RunRef], span: RunSpan, prefix: Option<&str>, id: &str) -> Option<()> {
    let first = &runs.get(span.first_run)?.path;
    let last = &runs.get(span.last_run)?.path;
    let (&first_pos, first_parent) = first.split_last()?;
    let (&last_pos, last_parent) = last.split_last()?;
    let id_attr = qualify(prefix, "id");
    let marker = |local: &str| Element::prefixed(prefix, local).with_attr(&id_attr, id);

    body::element_at_mut(paragraph, last_parent)?
        .children
        .insert(last_pos + 1, marker("commentRangeEnd").into());

    // The end marker shares the paragraph level when the last run is a
    // direct child, so the reference run goes one slot further.
    let top = last[0];
    let reference_pos = if last_parent.is_empty() { top + 2 } else { top + 1 };
    let reference = Element::prefixed(prefix, "r")
        .with_child(
            Element::prefixed(prefix, "rPr").with_child(
                Element::prefixed(prefix, "rStyle").with_attr(&qualify(prefix, "val"), "CommentReference"),
            ),
        )
        .with_child(marker("commentReference"));
    paragraph.children.insert(reference_pos, reference.into());

    body::element_at_mut(paragraph, first_parent)?
        .children
        .insert(first_pos, marker("commentRangeStart").into());
    Some(())
}

/// Next free comment id: one past the largest numeric id in either part.
fn next_comment_id(document: &Element, comments: &Element) -> u64 {
    let used = comments
        .descendants("comment")
        .into_iter()
        .chain(document.descendants("commentRangeStart"))
        .chain(document.descendants("commentReference"))
        .filter_map(|el| el.attr("id")?.parse::<u64>().ok());
    used.max().map_or(0, |max| max + 1)
}

/// Relationship target for `part`, relative to `source` when they share a
/// directory.
fn relative_target(source: &str, part: &str) -> String {
    let dir = source.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    match part.strip_prefix(dir).and_then(|rest| rest.strip_prefix('/')) {
        Some(relative) if !dir.is_empty() => relative.to_string(),
        _ if dir.is_empty() => part.to_string(),
        _ => format!("/{part}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::CommentTarget;
    use crate::comments::CommentDirectory;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn document(body: &str) -> String {
        format!(r#"<w:document xmlns:w="{WORDML_NS}"><w:body>{body}</w:body></w:document>"#)
    }

    fn injector(body: &str) -> CommentInjector {
        let package = DocxPackage::from_parts([("word/document.xml", document(body))]).unwrap();
        let options = InjectionOptions::default().with_date(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap());
        CommentInjector::new(package, options).unwrap()
    }

    fn child_names(el: &Element) -> Vec<String> {
        el.elements().map(Element::local_name).collect()
    }

    fn first_paragraph(package: &DocxPackage) -> Element {
        let doc = XmlDocument::parse("word/document.xml", package.main_part().unwrap()).unwrap();
        body::paragraphs(body::body(&doc.root).unwrap())[0].clone()
    }

    fn literal(paragraph: usize, text: &str, body: &str) -> ReviewAnnotation {
        ReviewAnnotation::new(
            paragraph,
            CommentTarget::Literal {
                text: text.to_string(),
            },
            body,
        )
    }

    #[test]
    fn test_literal_target_anchors_single_run() {
        let mut injector = injector(
            r#"<w:p><w:pPr/><w:r><w:t>The </w:t></w:r><w:r><w:t>cap</w:t></w:r><w:r><w:t> applies.</w:t></w:r></w:p>"#,
        );
        let report = injector.inject(&[literal(0, "cap", r#""cap" too low"#)]);
        assert_eq!(report.injected, vec!["0".to_string()]);

        let package = injector.finish().unwrap();
        let p = first_paragraph(&package);
        assert_eq!(
            child_names(&p),
            vec!["pPr", "r", "commentRangeStart", "r", "commentRangeEnd", "r", "r"]
        );
        let reference = p.elements().nth(5).unwrap();
        assert!(reference.contains("commentReference"));

        let comments = CommentDirectory::load(&package).unwrap();
        let record = comments.get("0").unwrap();
        assert_eq!(record.body, "too low");
        assert_eq!(record.author.as_deref(), Some(DEFAULT_AUTHOR));
        assert_eq!(record.initials.as_deref(), Some(DEFAULT_INITIALS));
        assert_eq!(record.date.as_deref(), Some("2024-05-01T09:30:00Z"));
    }

    #[test]
    fn test_whole_paragraph_through_hyperlink() {
        let mut injector = injector(
            r#"<w:p><w:r><w:t>See </w:t></w:r><w:hyperlink><w:r><w:t>terms</w:t></w:r></w:hyperlink></w:p>"#,
        );
        injector.inject(&[ReviewAnnotation::new(0, CommentTarget::Paragraph, "check link")]);
        let p = first_paragraph(&injector.finish().unwrap());

        assert_eq!(child_names(&p), vec!["commentRangeStart", "r", "hyperlink", "r"]);
        let link = p.child("hyperlink").unwrap();
        assert_eq!(child_names(link), vec!["r", "commentRangeEnd"]);
    }

    #[test]
    fn test_out_of_range_is_skipped() {
        let mut injector = injector(r#"<w:p><w:r><w:t>Only</w:t></w:r></w:p>"#);
        let report = injector.inject(&[ReviewAnnotation::new(3, CommentTarget::Paragraph, "nope")]);
        assert_eq!(report.injected_count(), 0);
        assert_eq!(
            report.skipped[0].reason,
            InjectionError::ParagraphOutOfRange { index: 3, count: 1 }
        );

        let package = injector.finish().unwrap();
        assert!(package.comments_part_name().unwrap().is_none());
    }

    #[test]
    fn test_paragraph_without_runs_is_skipped() {
        let mut injector = injector(r#"<w:p/><w:p><w:r><w:t>Text</w:t></w:r></w:p>"#);
        let report = injector.inject(&[
            ReviewAnnotation::new(0, CommentTarget::Paragraph, "empty"),
            ReviewAnnotation::new(1, CommentTarget::Paragraph, "fine"),
        ]);
        assert_eq!(report.skipped[0].reason, InjectionError::NoRuns(0));
        assert_eq!(report.injected, vec!["0".to_string()]);
        assert_eq!(injector.paragraph_count(), 2);
    }

    #[test]
    fn test_ids_continue_after_existing_comments() {
        let comments = format!(
            r#"<w:comments xmlns:w="{WORDML_NS}"><w:comment w:id="4"><w:p><w:r><w:t>old</w:t></w:r></w:p></w:comment></w:comments>"#
        );
        let package = DocxPackage::from_parts([
            ("word/document.xml", document(r#"<w:p><w:r><w:t>Text</w:t></w:r></w:p>"#)),
            ("word/comments.xml", comments),
        ])
        .unwrap();
        let mut injector = CommentInjector::new(package, InjectionOptions::default()).unwrap();
        let report = injector.inject(&[
            ReviewAnnotation::new(0, CommentTarget::Paragraph, "a"),
            ReviewAnnotation::new(0, CommentTarget::Paragraph, "b"),
        ]);
        assert_eq!(report.injected, vec!["5".to_string(), "6".to_string()]);

        let directory = CommentDirectory::load(&injector.finish().unwrap()).unwrap();
        assert_eq!(directory.len(), 3);
        assert_eq!(directory.get("4").unwrap().body, "old");
    }

    #[test]
    fn test_dangling_comments_relationship_names_new_part() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="review/notes.xml"/></Relationships>"#;
        let package = DocxPackage::from_parts([
            ("word/document.xml", document(r#"<w:p><w:r><w:t>Text</w:t></w:r></w:p>"#)),
            ("word/_rels/document.xml.rels", rels.to_string()),
        ])
        .unwrap();
        let mut injector = CommentInjector::new(package, InjectionOptions::default()).unwrap();
        injector.inject(&[ReviewAnnotation::new(0, CommentTarget::Paragraph, "reachable")]);
        let package = injector.finish().unwrap();

        assert!(package.part("word/review/notes.xml").is_some());
        assert!(package.part("word/comments.xml").is_none());
        let relationships = package.main_relationships().unwrap();
        let comment_rels: Vec<_> = relationships
            .entries()
            .into_iter()
            .filter(|rel| rel.rel_type == REL_COMMENTS)
            .collect();
        assert_eq!(comment_rels.len(), 1);
        assert_eq!(
            package.comments_part_name().unwrap().as_deref(),
            Some("word/review/notes.xml")
        );
        let directory = CommentDirectory::load(&package).unwrap();
        assert_eq!(directory.get("0").unwrap().body, "reachable");
    }

    #[test]
    fn test_multiline_body_becomes_paragraphs() {
        let mut injector = injector(r#"<w:p><w:r><w:t>Text</w:t></w:r></w:p>"#);
        injector.inject(&[ReviewAnnotation::new(0, CommentTarget::Paragraph, "first\nsecond")]);
        let directory = CommentDirectory::load(&injector.finish().unwrap()).unwrap();
        assert_eq!(directory.get("0").unwrap().body, "first\nsecond");
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(relative_target("word/document.xml", "word/comments.xml"), "comments.xml");
        assert_eq!(relative_target("word/document.xml", "other/comments.xml"), "/other/comments.xml");
        assert_eq!(relative_target("document.xml", "comments.xml"), "comments.xml");
    }
}
