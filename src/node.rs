//! XML element tree used for requests, expectations and responses.
//!
//! Parsing is done with quick-xml, which does not expand external entities.
//! Whitespace-only text between elements is dropped while reading.

use crate::error::{Result, SoapError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// XML that could not be read into an element tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(String);

/// An XML element with its attributes, text and child elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode {
    /// Qualified tag name as written (`prefix:local` or `local`)
    pub name: String,
    /// Attributes in source order
    pub attributes: Vec<(String, String)>,
    /// Text content, only meaningful for leaf elements
    pub text: Option<String>,
    /// Child elements in document order
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add or replace an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Append a child element.
    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Value of the named attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Tag name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// First child element with the given local name.
    pub fn child(&self, local_name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.local_name() == local_name)
    }

    /// Mutable access to the first child element with the given local name.
    pub fn child_mut(&mut self, local_name: &str) -> Option<&mut XmlNode> {
        self.children
            .iter_mut()
            .find(|c| c.local_name() == local_name)
    }

    /// This element and all elements below it, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Parse a document with exactly one root element.
    pub fn parse(xml: &str) -> std::result::Result<XmlNode, ParseError> {
        let mut roots = parse_nodes(xml)?;
        match roots.len() {
            1 => Ok(roots.remove(0)),
            0 => Err(ParseError("document has no root element".to_string())),
            n => Err(ParseError(format!(
                "document has {} root elements, expected one",
                n
            ))),
        }
    }

    /// Parse a fragment of zero or more sibling elements.
    pub fn parse_fragment(xml: &str) -> std::result::Result<Vec<XmlNode>, ParseError> {
        parse_nodes(xml)
    }

    /// Serialize this element without an XML declaration.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_node(&mut writer, self)?;
        into_string(writer)
    }

    /// Serialize this element as a complete document.
    pub fn to_document(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| SoapError::Serialize(e.to_string()))?;
        write_node(&mut writer, self)?;
        into_string(writer)
    }
}

/// Pre-order iterator over an element tree.
pub struct Descendants<'a> {
    stack: Vec<&'a XmlNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

fn parse_nodes(xml: &str) -> std::result::Result<Vec<XmlNode>, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut roots = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(element_from(e)?);
            }

            Ok(Event::Empty(ref e)) => {
                let node = element_from(e)?;
                attach(&mut stack, &mut roots, node);
            }

            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| ParseError("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut roots, node);
            }

            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| ParseError(format!("invalid text: {}", e)))?;
                push_text(&mut stack, &text)?;
            }

            Ok(Event::CData(e)) => {
                let raw = e.into_inner();
                let text = std::str::from_utf8(&raw)
                    .map_err(|e| ParseError(format!("invalid CDATA: {}", e)))?;
                push_text(&mut stack, text)?;
            }

            Ok(Event::Eof) => break,

            Err(e) => {
                return Err(ParseError(format!("XML parse error: {}", e)));
            }

            // Declarations, comments, processing instructions and DOCTYPE
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError(format!("unclosed element <{}>", open.name)));
    }

    Ok(roots)
}

fn element_from(e: &BytesStart<'_>) -> std::result::Result<XmlNode, ParseError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|e| ParseError(format!("invalid tag name: {}", e)))?
        .to_string();

    let mut node = XmlNode::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError(format!("invalid attribute: {}", e)))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| ParseError(format!("invalid attribute name: {}", e)))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError(format!("invalid attribute value: {}", e)))?
            .into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn attach(stack: &mut [XmlNode], roots: &mut Vec<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn push_text(stack: &mut [XmlNode], text: &str) -> std::result::Result<(), ParseError> {
    if text.trim().is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(node) => {
            node.text.get_or_insert_with(String::new).push_str(text);
            Ok(())
        }
        None => Err(ParseError(format!(
            "text outside of any element: {:?}",
            text.trim()
        ))),
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let text = node.text.as_deref().filter(|t| !t.is_empty());
    if node.children.is_empty() && text.is_none() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| SoapError::Serialize(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| SoapError::Serialize(e.to_string()))?;
    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| SoapError::Serialize(e.to_string()))?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name.as_str())))
        .map_err(|e| SoapError::Serialize(e.to_string()))
}

fn into_string(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner()).map_err(|e| SoapError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drops_formatting_whitespace() {
        let node = XmlNode::parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>    <doc> <a a2="2" a1="1" >123</a>  </doc>"#,
        )
        .unwrap();
        assert_eq!(node.name, "doc");
        assert_eq!(node.text, None);
        assert_eq!(node.children.len(), 1);

        let a = &node.children[0];
        assert_eq!(a.attribute("a2"), Some("2"));
        assert_eq!(a.attribute("a1"), Some("1"));
        assert_eq!(a.text.as_deref(), Some("123"));
    }

    #[test]
    fn test_parse_keeps_prefixed_names() {
        let node = XmlNode::parse(
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body/></soapenv:Envelope>"#,
        )
        .unwrap();
        assert_eq!(node.name, "soapenv:Envelope");
        assert_eq!(node.local_name(), "Envelope");
        assert!(node.child("Body").is_some());
        assert!(node.child("Header").is_none());
    }

    #[test]
    fn test_parse_entities_and_cdata() {
        let node = XmlNode::parse("<a>x &amp; y<![CDATA[ <z>]]></a>").unwrap();
        assert_eq!(node.text.as_deref(), Some("x & y <z>"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(XmlNode::parse("<a><b></a>").is_err());
        assert!(XmlNode::parse("<a>").is_err());
        assert!(XmlNode::parse("just text").is_err());
        assert!(XmlNode::parse("").is_err());
        assert!(XmlNode::parse("<a/><b/>").is_err());
    }

    #[test]
    fn test_parse_fragment_siblings() {
        let nodes = XmlNode::parse_fragment("<id>1</id> <name>x</name>").unwrap();
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);
        assert!(XmlNode::parse_fragment("").unwrap().is_empty());
    }

    #[test]
    fn test_serialize() {
        let node = XmlNode::new("item")
            .with_attribute("kind", "a\"b")
            .with_child(XmlNode::new("id").with_text("1 < 2"))
            .with_child(XmlNode::new("empty"));
        assert_eq!(
            node.to_xml().unwrap(),
            r#"<item kind="a&quot;b"><id>1 &lt; 2</id><empty/></item>"#
        );
        assert!(node
            .to_document()
            .unwrap()
            .starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let node = XmlNode::parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<_> = node.descendants().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut node = XmlNode::new("a").with_attribute("x", "1").with_attribute("y", "2");
        node.set_attribute("x", "3");
        assert_eq!(
            node.attributes,
            vec![("x".to_string(), "3".to_string()), ("y".to_string(), "2".to_string())]
        );
    }
}
