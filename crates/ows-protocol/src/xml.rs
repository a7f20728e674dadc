//! Minimal XML element tree used by the request models.
//!
//! Documents are read with quick-xml's event reader into [`Element`] values
//! that keep every attribute (including namespace declarations) exactly as
//! written. Element matching is done on local names so clients may use any
//! prefix they like.

use std::collections::BTreeSet;

use quick_xml::escape::escape;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use ows_common::attributes::dedupe;
use ows_common::Attr;

/// Declaration written in front of every request document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Deepest element nesting accepted by [`Element::parse`].
pub const MAX_DEPTH: usize = 128;

/// Errors raised while reading a document.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("Invalid attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("Invalid UTF-8 in element name: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Document has no root element")]
    NoRootElement,

    #[error("Element not closed: {0}")]
    Unclosed(String),

    #[error("Unexpected content outside the root element")]
    ContentOutsideRoot,

    #[error("Elements nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Child of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Pre-serialized XML written verbatim.
    Raw(String),
}

/// An XML element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Name as written, including any prefix.
    pub name: String,
    pub attributes: Vec<Attr>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Element holding a single text node.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.children.push(Node::Text(text.into()));
        element
    }

    pub fn attr(mut self, attr: Attr) -> Self {
        self.attributes.push(attr);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn push_raw(&mut self, xml: impl Into<String>) {
        self.children.push(Node::Raw(xml.into()));
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Value of the attribute with the given local name.
    ///
    /// Namespace declarations never match.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|a| !a.is_namespace_declaration())
            .find(|a| a.local.eq_ignore_ascii_case(local))
            .map(|a| a.value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.local_name() == local)
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements().filter(move |e| e.local_name() == local)
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Text of the first child element named `local`.
    pub fn child_text(&self, local: &str) -> Option<String> {
        self.child(local).map(Element::text)
    }

    /// Namespace declarations written on this element.
    pub fn declarations(&self) -> impl Iterator<Item = &Attr> {
        self.attributes.iter().filter(|a| a.is_namespace_declaration())
    }

    /// Namespace declarations on this element and all its descendants, in
    /// document order.
    pub fn all_declarations(&self) -> Vec<Attr> {
        let mut found = Vec::new();
        self.collect_declarations(&mut found);
        found
    }

    fn collect_declarations(&self, found: &mut Vec<Attr>) {
        found.extend(self.declarations().cloned());
        for child in self.child_elements() {
            child.collect_declarations(found);
        }
    }

    /// Copy that can be written outside its original document.
    ///
    /// Declarations from `scope` (outermost first) are added for every
    /// prefix used in element or attribute names below this element that
    /// the element does not declare itself.
    pub fn detached(&self, scope: &[Attr]) -> Element {
        let used = self.used_prefixes();
        let own: BTreeSet<Option<&str>> = self.declarations().map(Attr::declared_prefix).collect();
        let declarations = scope.iter().filter(|a| a.is_namespace_declaration()).cloned();
        let inherited: Vec<Attr> = dedupe(declarations)
            .into_iter()
            .filter(|decl| {
                let prefix = decl.declared_prefix();
                !own.contains(&prefix) && used.contains(&prefix.map(str::to_string))
            })
            .collect();

        let mut element = self.clone();
        element.attributes = inherited.into_iter().chain(element.attributes).collect();
        element
    }

    /// Prefixes used in element and attribute names at or below this
    /// element; `None` stands for unprefixed element names.
    pub fn used_prefixes(&self) -> BTreeSet<Option<String>> {
        let mut used = BTreeSet::new();
        self.collect_prefixes(&mut used);
        used
    }

    fn collect_prefixes(&self, used: &mut BTreeSet<Option<String>>) {
        used.insert(prefix_part(&self.name).map(str::to_string));
        for attr in &self.attributes {
            match &attr.namespace {
                Some(prefix) if prefix != "xmlns" && prefix != "xml" => {
                    used.insert(Some(prefix.clone()));
                }
                _ => {}
            }
        }
        for child in self.child_elements() {
            child.collect_prefixes(used);
        }
    }

    /// Parse a complete document into its root element.
    ///
    /// Text is kept as written. Whitespace-only text next to child elements
    /// is layout and is dropped.
    pub fn parse(document: &[u8]) -> Result<Element, XmlError> {
        let mut reader = Reader::from_reader(document);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(XmlError::ContentOutsideRoot);
                    }
                    if stack.len() >= MAX_DEPTH {
                        return Err(XmlError::TooDeep(MAX_DEPTH));
                    }
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    if root.is_some() {
                        return Err(XmlError::ContentOutsideRoot);
                    }
                    if stack.len() >= MAX_DEPTH {
                        return Err(XmlError::TooDeep(MAX_DEPTH));
                    }
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    // quick-xml verifies end names match their start tags
                    let mut element = stack.pop().ok_or(XmlError::ContentOutsideRoot)?;
                    element.drop_layout_text();
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    let text = text.unescape()?.into_owned();
                    push_text(&mut stack, text)?;
                }
                Event::CData(cdata) => {
                    let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    push_text(&mut stack, text)?;
                }
                Event::Eof => break,
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::Unclosed(open.name));
        }
        root.ok_or(XmlError::NoRootElement)
    }

    /// Local name of the root element, reading no further than its start tag.
    pub fn root_name(document: &[u8]) -> Result<String, XmlError> {
        let mut reader = Reader::from_reader(document);
        reader.trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(start) | Event::Empty(start) => {
                    let qname = start.name();
                    let name = std::str::from_utf8(qname.as_ref())?;
                    return Ok(local_part(name).to_string());
                }
                Event::Text(_) | Event::CData(_) | Event::End(_) => {
                    return Err(XmlError::ContentOutsideRoot);
                }
                Event::Eof => return Err(XmlError::NoRootElement),
                _ => {}
            }
            buf.clear();
        }
    }

    fn drop_layout_text(&mut self) {
        let has_elements = self
            .children
            .iter()
            .any(|node| matches!(node, Node::Element(_)));
        if has_elements {
            self.children
                .retain(|node| !matches!(node, Node::Text(text) if text.trim().is_empty()));
        }
    }

    /// Serialize without an XML declaration.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    /// Serialize as a standalone document.
    pub fn to_document(&self) -> String {
        let mut out = String::from(XML_DECLARATION);
        out.push('\n');
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attributes {
            out.push(' ');
            out.push_str(&attr.qualified_name());
            out.push_str("=\"");
            out.push_str(&escape(&attr.value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(element) => element.write_to(out),
                Node::Text(text) => out.push_str(&escape(text)),
                Node::Raw(xml) => out.push_str(xml),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn prefix_part(name: &str) -> Option<&str> {
    name.split_once(':').map(|(prefix, _)| prefix)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let qname = start.name();
    let name = std::str::from_utf8(qname.as_ref())?.to_string();

    // Repeated attributes are accepted here and collapsed later by the
    // attribute codec.
    let mut attributes = Vec::new();
    let mut raw = start.attributes();
    raw.with_checks(false);
    for attr in raw {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?;
        let value = attr.unescape_value()?;
        attributes.push(Attr::from_qualified_name(key, value.into_owned()));
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

fn push_text(stack: &mut [Element], text: String) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            if !text.is_empty() {
                parent.children.push(Node::Text(text));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(XmlError::ContentOutsideRoot),
    }
}
