//! Builders for minimal but complete DOCX packages.

#![allow(dead_code)]

use redline_docx::DocxPackage;

pub const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// A document part whose body holds `paragraphs` verbatim.
pub fn document_xml(paragraphs: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W}"><w:body>{paragraphs}<w:sectPr/></w:body></w:document>"#
    )
}

/// Archive bytes of a package with the given body paragraphs.
pub fn docx_bytes(paragraphs: &str) -> Vec<u8> {
    package(paragraphs).to_bytes().unwrap()
}

/// A package with content types, relationships and a styles part.
pub fn package(paragraphs: &str) -> DocxPackage {
    DocxPackage::from_parts([
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("word/document.xml", document_xml(paragraphs)),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
        ("word/styles.xml", format!(r#"<w:styles xmlns:w="{W}"/>"#)),
    ])
    .unwrap()
}

/// The "fee" paragraph with a tracked insertion of " USD".
pub const FEE_PARAGRAPH: &str = concat!(
    r#"<w:p><w:r><w:t xml:space="preserve">The fee is 100</w:t></w:r>"#,
    r#"<w:ins w:id="1" w:author="A" w:date="2024-01-01"><w:r><w:t xml:space="preserve"> USD</w:t></w:r></w:ins>"#,
    r#"<w:r><w:t>.</w:t></w:r></w:p>"#,
);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
