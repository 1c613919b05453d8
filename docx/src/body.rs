//! Paragraph and run addressing inside the body part.
//!
//! Both the reconstructor and the injector address paragraphs the same way:
//! the direct `w:p` children of `w:body`, in order. Keeping that in one place
//! keeps paragraph indices stable between the read and write paths.

use crate::markup::{Element, Node};

/// Leaves that carry document text. `delText` only occurs inside deletions.
pub const TEXT_LEAVES: &[&str] = &["t", "delText"];

/// Containers whose runs are part of a paragraph's visible run sequence.
const RUN_CONTAINERS: &[&str] = &[
    "hyperlink",
    "ins",
    "moveTo",
    "smartTag",
    "sdt",
    "sdtContent",
    "customXml",
    "fldSimple",
];

/// The `w:body` element of a document root.
pub fn body(root: &Element) -> Option<&Element> {
    root.child("body")
}

/// Mutable access to the `w:body` element.
pub fn body_mut(root: &mut Element) -> Option<&mut Element> {
    root.children
        .iter_mut()
        .filter_map(Node::as_element_mut)
        .find(|el| el.is("body"))
}

/// Positions of the paragraphs within `body.children`.
pub fn paragraph_slots(body: &Element) -> Vec<usize> {
    body.children
        .iter()
        .enumerate()
        .filter(|(_, node)| node.as_element().is_some_and(|el| el.is("p")))
        .map(|(i, _)| i)
        .collect()
}

/// The body's paragraphs in document order.
pub fn paragraphs(body: &Element) -> Vec<&Element> {
    body.elements().filter(|el| el.is("p")).collect()
}

/// A run inside a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRef {
    /// Child indices from the paragraph element down to the run.
    pub path: Vec<usize>,

    /// The run's own text.
    pub text: String,
}

/// Collect the targetable runs of a paragraph.
///
/// Runs inside deletions and move sources are not part of the visible text
/// and cannot carry a new comment; comment reference runs carry no text and
/// are skipped so repeated injections see the same run sequence.
pub fn collect_runs(paragraph: &Element) -> Vec<RunRef> {
    let mut runs = Vec::new();
    let mut path = Vec::new();
    collect_into(paragraph, &mut path, &mut runs);
    runs
}

fn collect_into(parent: &Element, path: &mut Vec<usize>, runs: &mut Vec<RunRef>) {
    for (i, node) in parent.children.iter().enumerate() {
        let Some(el) = node.as_element() else {
            continue;
        };
        path.push(i);
        if el.is("r") {
            if !el.contains("commentReference") {
                runs.push(RunRef {
                    path: path.clone(),
                    text: el.leaf_text(&["t"]),
                });
            }
        } else if RUN_CONTAINERS.iter().any(|name| el.is(name)) {
            collect_into(el, path, runs);
        }
        path.pop();
    }
}

/// Concatenated text of a run sequence.
pub fn run_text(runs: &[RunRef]) -> String {
    runs.iter().map(|run| run.text.as_str()).collect()
}

/// Follow a child-index path down from `root`.
pub fn element_at_mut<'a>(root: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    let mut current = root;
    for &i in path {
        current = current.children.get_mut(i)?.as_element_mut()?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::XmlDocument;
    use pretty_assertions::assert_eq;

    fn paragraph(inner: &str) -> Element {
        let xml = format!(
            r#"<w:p xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">{inner}</w:p>"#
        );
        XmlDocument::parse("p.xml", xml.as_bytes()).unwrap().root
    }

    #[test]
    fn test_collect_runs_skips_deleted_and_reference_runs() {
        let p = paragraph(concat!(
            r#"<w:pPr><w:jc w:val="left"/></w:pPr>"#,
            r#"<w:r><w:t>Alpha </w:t></w:r>"#,
            r#"<w:del><w:r><w:delText>gone </w:delText></w:r></w:del>"#,
            r#"<w:ins><w:r><w:t>beta </w:t></w:r></w:ins>"#,
            r#"<w:hyperlink><w:r><w:t>link</w:t></w:r></w:hyperlink>"#,
            r#"<w:r><w:commentReference w:id="0"/></w:r>"#,
        ));
        let runs = collect_runs(&p);
        let texts: Vec<_> = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Alpha ", "beta ", "link"]);
        assert_eq!(runs[1].path, vec![3, 0]);
        assert_eq!(run_text(&runs), "Alpha beta link");
    }

    #[test]
    fn test_paragraph_slots_ignore_tables() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p/><w:tbl/><w:p/><w:sectPr/></w:body></w:document>"#;
        let doc = XmlDocument::parse("word/document.xml", xml.as_bytes()).unwrap();
        let body = body(&doc.root).unwrap();
        assert_eq!(paragraph_slots(body), vec![0, 2]);
        assert_eq!(paragraphs(body).len(), 2);
    }
}
