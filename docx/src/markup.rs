//! Lossless XML tree for package parts.
//!
//! Parts are parsed into a small owned tree that keeps every event as it was
//! read, so a part that is parsed and written back without edits is
//! reproduced verbatim (attribute order, entity escapes, whitespace).
//! Element matching is done on local names; namespace prefixes are kept
//! only so new elements can reuse the prefix a part already declares.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesStart, BytesText, Event};

use crate::error::{DocxError, Result};

/// WordprocessingML main namespace.
pub const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// A parsed XML part.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    prolog: Vec<Event<'static>>,
    /// The document element.
    pub root: Element,
    epilog: Vec<Event<'static>>,
}

/// A node in the tree.
#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(BytesText<'static>),
    CData(BytesCData<'static>),
    /// Comments, processing instructions and anything else kept for round-trips.
    Other(Event<'static>),
}

impl Node {
    /// Create an escaped text node.
    pub fn text(content: &str) -> Self {
        Node::Text(BytesText::new(content).into_owned())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

/// An element with its original start tag and children.
#[derive(Debug, Clone)]
pub struct Element {
    start: BytesStart<'static>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
    self_closing: bool,
}

impl Element {
    /// Create a new element with a qualified name such as `w:commentRangeStart`.
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            start: BytesStart::new(qualified_name.into()),
            children: Vec::new(),
            self_closing: true,
        }
    }

    /// Create an element named `local`, prefixed with `prefix` when given.
    pub fn prefixed(prefix: Option<&str>, local: &str) -> Self {
        Self::new(qualify(prefix, local))
    }

    /// Add an attribute (the value is escaped on write).
    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.start.push_attribute((key, value));
        self
    }

    /// Append a child node.
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Local name of the element, without its prefix.
    pub fn local_name(&self) -> String {
        String::from_utf8_lossy(self.start.local_name().as_ref()).into_owned()
    }

    /// Whether the element's local name is `local`.
    pub fn is(&self, local: &str) -> bool {
        self.start.local_name().as_ref() == local.as_bytes()
    }

    /// The namespace prefix of the element name, if any.
    pub fn prefix(&self) -> Option<String> {
        self.start
            .name()
            .prefix()
            .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
    }

    /// Look up an attribute value by local name, ignoring its prefix.
    pub fn attr(&self, local: &str) -> Option<String> {
        self.start
            .attributes()
            .with_checks(false)
            .flatten()
            .find(|a| a.key.local_name().as_ref() == local.as_bytes())
            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
    }

    /// Iterate over child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.elements().find(|el| el.is(local))
    }

    /// All descendant elements with the given local name, in document order.
    pub fn descendants(&self, local: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_descendants(local, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, local: &str, found: &mut Vec<&'a Element>) {
        for el in self.elements() {
            if el.is(local) {
                found.push(el);
            }
            el.collect_descendants(local, found);
        }
    }

    /// Whether any descendant has the given local name.
    pub fn contains(&self, local: &str) -> bool {
        self.elements().any(|el| el.is(local) || el.contains(local))
    }

    /// Concatenate the character data of every descendant leaf whose local
    /// name is in `leaves`.
    pub fn leaf_text(&self, leaves: &[&str]) -> String {
        let mut out = String::new();
        self.append_leaf_text(leaves, &mut out);
        out
    }

    fn append_leaf_text(&self, leaves: &[&str], out: &mut String) {
        for el in self.elements() {
            if leaves.iter().any(|leaf| el.is(leaf)) {
                out.push_str(&el.own_text());
            } else {
                el.append_leaf_text(leaves, out);
            }
        }
    }

    /// Character data of the element's direct text children.
    pub fn own_text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(text) => match text.unescape() {
                    Ok(value) => out.push_str(&value),
                    Err(_) => out.push_str(&String::from_utf8_lossy(text)),
                },
                Node::CData(data) => out.push_str(&String::from_utf8_lossy(data)),
                _ => {}
            }
        }
        out
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> std::result::Result<(), quick_xml::Error> {
        if self.children.is_empty() && self.self_closing {
            return writer.write_event(Event::Empty(self.start.borrow()));
        }
        writer.write_event(Event::Start(self.start.borrow()))?;
        for child in &self.children {
            match child {
                Node::Element(el) => el.write(writer)?,
                Node::Text(text) => writer.write_event(Event::Text(text.borrow()))?,
                Node::CData(data) => writer.write_event(Event::CData(data.clone()))?,
                Node::Other(event) => writer.write_event(event)?,
            }
        }
        writer.write_event(Event::End(self.start.to_end()))
    }
}

/// Join a prefix and a local name.
pub fn qualify(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}:{local}"),
        _ => local.to_string(),
    }
}

impl XmlDocument {
    /// Create a document with a standalone declaration and the given root.
    pub fn with_root(root: Element) -> Self {
        let decl = quick_xml::events::BytesDecl::new("1.0", Some("UTF-8"), Some("yes"));
        Self {
            prolog: vec![Event::Decl(decl).into_owned(), Event::Text(BytesText::new("\n")).into_owned()],
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse a part. `part` is only used for diagnostics.
    pub fn parse(part: &str, bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let source = std::str::from_utf8(bytes).map_err(|e| DocxError::malformed(part, e))?;
        let mut reader = Reader::from_str(source);

        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| DocxError::malformed(part, format!("{e} at byte {}", reader.buffer_position())))?;
            match event {
                Event::Start(start) => stack.push(Element {
                    start: start.into_owned(),
                    children: Vec::new(),
                    self_closing: false,
                }),
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| DocxError::malformed(part, "unbalanced end tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(el)),
                        None if root.is_none() => root = Some(el),
                        None => return Err(DocxError::malformed(part, "multiple root elements")),
                    }
                }
                Event::Empty(start) => {
                    let el = Element {
                        start: start.into_owned(),
                        children: Vec::new(),
                        self_closing: true,
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(el)),
                        None if root.is_none() => root = Some(el),
                        None => return Err(DocxError::malformed(part, "multiple root elements")),
                    }
                }
                Event::Eof => break,
                other => {
                    let node = match other {
                        Event::Text(text) => Node::Text(text.into_owned()),
                        Event::CData(data) => Node::CData(data.into_owned()),
                        event => Node::Other(event.into_owned()),
                    };
                    match (stack.last_mut(), root.is_some()) {
                        (Some(parent), _) => parent.children.push(node),
                        (None, false) => prolog.push(node_event(node)),
                        (None, true) => epilog.push(node_event(node)),
                    }
                }
            }
        }

        if !stack.is_empty() {
            return Err(DocxError::malformed(part, "unexpected end of document"));
        }
        let root = root.ok_or_else(|| DocxError::malformed(part, "no root element"))?;
        Ok(Self { prolog, root, epilog })
    }

    /// Serialize back to bytes.
    pub fn to_bytes(&self, part: &str) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        self.write_all(&mut writer)
            .map_err(|e| DocxError::malformed(part, e))?;
        Ok(writer.into_inner())
    }

    fn write_all(&self, writer: &mut Writer<Vec<u8>>) -> std::result::Result<(), quick_xml::Error> {
        for event in &self.prolog {
            writer.write_event(event)?;
        }
        self.root.write(writer)?;
        for event in &self.epilog {
            writer.write_event(event)?;
        }
        Ok(())
    }
}

fn node_event(node: Node) -> Event<'static> {
    match node {
        Node::Text(text) => Event::Text(text),
        Node::CData(data) => Event::CData(data),
        Node::Other(event) => event,
        // Elements never reach the prolog or epilog.
        Node::Element(el) => Event::Empty(el.start),
    }
}
