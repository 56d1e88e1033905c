//! XML document handling
//!
//! This module provides the element tree used for exchange documents: it is
//! parsed from XML text with quick-xml and written back out through the
//! quick-xml writer.

use crate::error::{Error, Result};
use crate::limits::Limits;
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// XML Element in the document tree
#[derive(Debug, Clone, Default)]
pub struct Element {
    /// Element name as written, including any prefix
    pub name: String,
    /// Element attributes in document order
    pub attributes: IndexMap<String, String>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Namespace declarations made on this element (prefix, uri); the
    /// default namespace uses an empty prefix
    pub namespaces: IndexMap<String, String>,
}

impl Element {
    /// Create a new element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder-style text setter
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder-style child setter
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Declare a namespace prefix on this element
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Get the prefix of the element name
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Namespace URI of this element, resolved against its own declarations
    pub fn namespace(&self) -> Option<&str> {
        let prefix = self.prefix().unwrap_or("");
        self.namespaces.get(prefix).map(|s| s.as_str())
    }

    /// Get an attribute value by name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Get the text content, empty if none
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append text content
    pub fn push_text(&mut self, text: &str) {
        match self.text.as_mut() {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Find child elements by local name
    pub fn find_children<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children
            .iter()
            .filter(move |e| e.local_name() == local_name)
    }

    /// First child element with the given local name
    pub fn find_child(&self, local_name: &str) -> Option<&Element> {
        self.children.iter().find(|e| e.local_name() == local_name)
    }

    /// Structural equality: names, attribute sets, trimmed text and children
    /// in order. Attribute order and insignificant whitespace are ignored.
    pub fn same_structure(&self, other: &Element) -> bool {
        self.name == other.name
            && self.attributes == other.attributes
            && self.namespaces == other.namespaces
            && self.text().trim() == other.text().trim()
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|(a, b)| a.same_structure(b))
    }

    /// Serialize this element as a standalone XML document
    pub fn to_xml_string(&self, pretty: bool) -> Result<String> {
        let mut writer = if pretty {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_write_error)?;
        self.write_into(&mut writer)?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::Xml(format!("Generated XML is not UTF-8: {}", e)))
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (prefix, uri) in &self.namespaces {
            let key = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{}", prefix)
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        let text = self.text.as_deref().filter(|t| !t.is_empty());
        if text.is_none() && self.children.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(xml_write_error);
        }

        writer
            .write_event(Event::Start(start))
            .map_err(xml_write_error)?;
        if let Some(text) = text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_write_error)?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(xml_write_error)
    }
}

fn xml_write_error(e: quick_xml::Error) -> Error {
    Error::Xml(format!("Failed to write XML: {}", e))
}

/// XML Document representation
#[derive(Debug, Default)]
pub struct Document {
    /// Root element of the document
    pub root: Option<Element>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes(), &Limits::default())
    }

    /// Parse an XML document from bytes
    pub fn parse(xml: &[u8], limits: &Limits) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut doc = Document::new();
        let mut element_stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let element = Self::parse_element(&e)?;
                    element_stack.push(element);
                    limits.check_xml_depth(element_stack.len())?;
                }
                Ok(Event::End(_)) => {
                    if let Some(current) = element_stack.pop() {
                        if let Some(parent) = element_stack.last_mut() {
                            parent.add_child(current);
                        } else {
                            // This is the root element
                            doc.root = Some(current);
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    let element = Self::parse_element(&e)?;
                    if let Some(parent) = element_stack.last_mut() {
                        parent.add_child(element);
                    } else {
                        // Empty root element
                        doc.root = Some(element);
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                        if !text.trim().is_empty() {
                            current.push_text(&text);
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = std::str::from_utf8(&e)
                            .map_err(|e| Error::Xml(format!("Invalid CDATA content: {}", e)))?;
                        current.push_text(text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // Ignore other events (comments, processing instructions, etc.)
            }
            buf.clear();
        }

        if !element_stack.is_empty() {
            return Err(Error::Xml("Unexpected end of document".to_string()));
        }

        Ok(doc)
    }

    /// Parse element from BytesStart event
    fn parse_element(start: &BytesStart) -> Result<Element> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
            .to_string();

        let mut element = Element::new(name);

        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
                .to_string();

            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            // Handle namespace declarations
            if attr_name == "xmlns" {
                element.namespaces.insert(String::new(), attr_value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                element.namespaces.insert(prefix.to_string(), attr_value);
            } else {
                element.attributes.insert(attr_name, attr_value);
            }
        }

        Ok(element)
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// Take the root element, failing on an empty document
    pub fn into_root(self) -> Result<Element> {
        self.root
            .ok_or_else(|| Error::Xml("XML document has no root element".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.local_name(), "root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].local_name(), "child");
        assert_eq!(root.children[0].text.as_deref(), Some("text"));
    }

    #[test]
    fn test_parse_with_attributes() {
        let xml = r#"<section id="abc" label="Courses Taught"><field/></section>"#;
        let doc = Document::from_string(xml).unwrap();

        let root = doc.root.unwrap();
        assert_eq!(root.get_attribute("id"), Some("abc"));
        assert_eq!(root.get_attribute("label"), Some("Courses Taught"));
    }

    #[test]
    fn test_parse_with_namespaces() {
        let xml = r#"<generic-cv:generic-cv xmlns:generic-cv="http://example.com/cv" lang="en"/>"#;
        let root = Document::from_string(xml).unwrap().into_root().unwrap();

        assert_eq!(root.local_name(), "generic-cv");
        assert_eq!(root.prefix(), Some("generic-cv"));
        assert_eq!(root.namespace(), Some("http://example.com/cv"));
        assert_eq!(root.get_attribute("lang"), Some("en"));
    }

    #[test]
    fn test_find_children() {
        let xml = r#"<root><child1/><child2/><child1/></root>"#;
        let root = Document::from_string(xml).unwrap().into_root().unwrap();

        assert_eq!(root.find_children("child1").count(), 2);
        assert!(root.find_child("child2").is_some());
        assert!(root.find_child("child3").is_none());
    }

    #[test]
    fn test_depth_limit() {
        let xml = "<a><a><a><a/></a></a></a>";
        let limits = Limits {
            max_xml_depth: 2,
            ..Limits::default()
        };
        assert!(Document::parse(xml.as_bytes(), &limits).is_err());
    }

    #[test]
    fn test_write_and_reparse() {
        let elem = Element::new("cv:root")
            .with_namespace("cv", "http://example.com/cv")
            .with_attribute("lang", "en")
            .with_child(Element::new("value").with_text("Fish & Chips <3>"))
            .with_child(Element::new("empty"));

        let xml = elem.to_xml_string(true).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("Fish &amp; Chips &lt;3&gt;"));

        let parsed = Document::from_string(&xml).unwrap().into_root().unwrap();
        assert!(parsed.same_structure(&elem));
    }

    #[test]
    fn test_same_structure_ignores_attribute_order() {
        let a = Element::new("field").with_attribute("id", "1").with_attribute("label", "x");
        let b = Element::new("field").with_attribute("label", "x").with_attribute("id", "1");
        assert!(a.same_structure(&b));

        let c = Element::new("field").with_attribute("id", "2").with_attribute("label", "x");
        assert!(!a.same_structure(&c));
    }

    #[test]
    fn test_unclosed_document() {
        assert!(Document::from_string("<root><child>").is_err());
    }
}
