//! Fixture packages and fake locators.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use redline_docx::DocxPackage;
use redline_locator::{CommentLocator, LocatedSpan, LocatorError};

const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// The "fee" paragraph with a tracked insertion of " USD".
pub const FEE_PARAGRAPH: &str = concat!(
    r#"<w:p><w:r><w:t xml:space="preserve">The fee is 100</w:t></w:r>"#,
    r#"<w:ins w:id="1" w:author="A" w:date="2024-01-01"><w:r><w:t xml:space="preserve"> USD</w:t></w:r></w:ins>"#,
    r#"<w:r><w:t>.</w:t></w:r></w:p>"#,
);

/// A delivery clause split over three runs.
pub const DELIVERY_PARAGRAPH: &str = concat!(
    r#"<w:p><w:r><w:t xml:space="preserve">The Supplier shall </w:t></w:r>"#,
    r#"<w:r><w:rPr><w:b/></w:rPr><w:t>deliver the Goods</w:t></w:r>"#,
    r#"<w:r><w:t xml:space="preserve"> within 30 days.</w:t></w:r></w:p>"#,
);

/// Write a package with the given body paragraphs to `dir/name`.
pub fn write_docx(dir: &Path, name: &str, paragraphs: &str) -> PathBuf {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W}"><w:body>{paragraphs}<w:sectPr/></w:body></w:document>"#
    );
    let package = DocxPackage::from_parts([
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("word/document.xml", document),
    ])
    .unwrap();
    let path = dir.join(name);
    package.save(&path).unwrap();
    path
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Answers every call with fixed spans and records what it was asked.
#[derive(Default)]
pub struct FixedLocator {
    pub spans: Vec<LocatedSpan>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<(String, Vec<String>)>>,
}

impl FixedLocator {
    pub fn new(spans: Vec<LocatedSpan>) -> Self {
        Self {
            spans,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommentLocator for FixedLocator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn locate(&self, paragraph_text: &str, comments: &[String]) -> redline_locator::Result<Vec<LocatedSpan>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((paragraph_text.to_string(), comments.to_vec()));
        }
        Ok(self.spans.clone())
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Fails every call.
pub struct FailingLocator;

#[async_trait]
impl CommentLocator for FailingLocator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn locate(&self, _paragraph_text: &str, _comments: &[String]) -> redline_locator::Result<Vec<LocatedSpan>> {
        Err(LocatorError::ApiRequest {
            status: 500,
            message: "unavailable".to_string(),
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
