//! Fluent construction of expected XML fragments.
//!
//! ```
//! use soap_assert::XmlBuilder;
//!
//! let xml = XmlBuilder::request()
//!     .tag("doc")
//!     .tag("a")
//!     .attr("a2", "2")
//!     .attr("a1", "1")
//!     .val("123")
//!     .serialize()
//!     .unwrap();
//! assert_eq!(xml, r#"<doc><a a2="2" a1="1">123</a></doc>"#);
//! ```

use crate::error::{Result, SoapError};
use crate::node::XmlNode;
use tracing::trace;

/// Builds an element tree through a cursor.
///
/// Every `tag` call appends a new element under the cursor and moves the
/// cursor onto it. Misuse is recorded and reported by [`XmlBuilder::build`]
/// or [`XmlBuilder::serialize`], so calls can be chained freely.
#[derive(Debug, Clone, Default)]
pub struct XmlBuilder {
    root: Option<XmlNode>,
    /// Child indexes from the root down to the cursor
    cursor: Vec<usize>,
    error: Option<String>,
}

impl XmlBuilder {
    /// Start an empty fragment.
    pub fn request() -> Self {
        Self::default()
    }

    /// Append a new element under the cursor and descend into it.
    pub fn tag(mut self, name: impl Into<String>) -> Self {
        let node = XmlNode::new(name);
        match self.root.as_mut() {
            None => self.root = Some(node),
            Some(root) => {
                let current = descend(root, &self.cursor);
                current.children.push(node);
                let index = current.children.len() - 1;
                self.cursor.push(index);
            }
        }
        self
    }

    /// Set an attribute on the cursor element.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        match self.current() {
            Some(node) => node.set_attribute(name, value),
            None => self.fail("attr() called before any tag()"),
        }
        self
    }

    /// Set the text of the cursor element.
    ///
    /// Ignored when the element already has children.
    pub fn val(mut self, text: impl Into<String>) -> Self {
        match self.current() {
            Some(node) if !node.children.is_empty() => {
                trace!(element = %node.name, "Discarding value of element with children");
            }
            Some(node) => node.text = Some(text.into()),
            None => self.fail("val() called before any tag()"),
        }
        self
    }

    /// Move the cursor to the parent element.
    pub fn parent(mut self) -> Self {
        if self.cursor.pop().is_none() {
            self.fail("parent() called at the root element");
        }
        self
    }

    /// Finish and return the element tree.
    pub fn build(self) -> Result<XmlNode> {
        if let Some(error) = self.error {
            return Err(SoapError::InvalidState(error));
        }
        self.root
            .ok_or_else(|| SoapError::InvalidState("no tag() was added".to_string()))
    }

    /// Finish and return the fragment as XML text.
    pub fn serialize(self) -> Result<String> {
        self.build()?.to_xml()
    }

    fn current(&mut self) -> Option<&mut XmlNode> {
        let cursor = &self.cursor;
        self.root.as_mut().map(|root| descend(root, cursor))
    }

    fn fail(&mut self, message: &str) {
        // keep the first misuse, later ones are usually consequences
        if self.error.is_none() {
            self.error = Some(message.to_string());
        }
    }
}

fn descend<'a>(root: &'a mut XmlNode, path: &[usize]) -> &'a mut XmlNode {
    path.iter().fold(root, |node, &i| &mut node.children[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_tags() {
        let node = XmlBuilder::request()
            .tag("doc")
            .tag("a")
            .attr("a2", "2")
            .attr("a1", "1")
            .val("123")
            .build()
            .unwrap();
        assert_eq!(node.name, "doc");
        assert_eq!(node.children[0].name, "a");
        assert_eq!(node.children[0].text.as_deref(), Some("123"));
        assert_eq!(node.children[0].attributes.len(), 2);
    }

    #[test]
    fn test_deep_nesting() {
        let mut builder = XmlBuilder::request();
        for i in 0..64 {
            builder = builder.tag(format!("n{}", i));
        }
        let node = builder.val("leaf").build().unwrap();
        let depth = std::iter::successors(Some(&node), |n| n.children.first()).count();
        assert_eq!(depth, 64);
    }

    #[test]
    fn test_repeated_tags_with_parent() {
        let xml = XmlBuilder::request()
            .tag("list")
            .tag("item")
            .val("1")
            .parent()
            .tag("item")
            .val("2")
            .serialize()
            .unwrap();
        assert_eq!(xml, "<list><item>1</item><item>2</item></list>");
    }

    #[test]
    fn test_attr_before_tag_is_invalid_state() {
        let err = XmlBuilder::request().attr("a", "1").tag("doc").build().unwrap_err();
        assert!(matches!(err, SoapError::InvalidState(_)));
    }

    #[test]
    fn test_empty_builder_is_invalid_state() {
        assert!(matches!(
            XmlBuilder::request().serialize(),
            Err(SoapError::InvalidState(_))
        ));
        assert!(matches!(
            XmlBuilder::request().tag("doc").parent().build(),
            Err(SoapError::InvalidState(_))
        ));
    }

    #[test]
    fn test_val_after_children_is_discarded() {
        let node = XmlBuilder::request()
            .tag("doc")
            .tag("a")
            .parent()
            .val("ignored")
            .build()
            .unwrap();
        assert_eq!(node.text, None);
        assert_eq!(node.children.len(), 1);
    }
}
