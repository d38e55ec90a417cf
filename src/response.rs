//! Assertions against the current SOAP response.
//!
//! The response is parsed twice on load: into an [`XmlNode`] tree for
//! structural comparison, and into an sxd document for XPath 1.0 queries.
//! Both stay read-only until the next response replaces them.

use crate::builder::XmlBuilder;
use crate::canonical;
use crate::error::{Result, SoapError};
use crate::locator::Locator;
use crate::node::XmlNode;
use std::fmt;
use sxd_document::Package;
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Factory, Value};
use tracing::{debug, warn};

/// Anything that can stand for an expected XML fragment.
pub trait AsXmlFragment {
    /// Element tree of the expected fragment.
    fn to_fragment(&self) -> Result<XmlNode>;
}

impl AsXmlFragment for str {
    fn to_fragment(&self) -> Result<XmlNode> {
        XmlNode::parse(self).map_err(|e| SoapError::MalformedExpected(e.to_string()))
    }
}

impl AsXmlFragment for String {
    fn to_fragment(&self) -> Result<XmlNode> {
        self.as_str().to_fragment()
    }
}

impl AsXmlFragment for XmlNode {
    fn to_fragment(&self) -> Result<XmlNode> {
        Ok(self.clone())
    }
}

impl AsXmlFragment for XmlBuilder {
    fn to_fragment(&self) -> Result<XmlNode> {
        self.clone().build()
    }
}

/// A loaded response document.
struct ResponseDocument {
    raw: String,
    root: XmlNode,
    /// XPath view of the document, or why it could not be built
    package: std::result::Result<Package, String>,
    /// Prefixes declared anywhere in the document; the first declaration
    /// of a prefix in document order wins, later rebindings are ignored
    namespaces: Vec<(String, String)>,
}

impl ResponseDocument {
    fn parse(xml: &str) -> Result<Self> {
        let root = XmlNode::parse(xml).map_err(|e| SoapError::MalformedResponse(e.to_string()))?;
        // Well-formed but namespace-invalid XML (an undeclared prefix, for
        // example) still serves structural assertions; only XPath needs it.
        let package = sxd_document::parser::parse(xml).map_err(|e| format!("{:?}", e));
        if let Err(reason) = &package {
            debug!(reason = %reason, "Response is not queryable with XPath");
        }

        let mut namespaces: Vec<(String, String)> = Vec::new();
        for node in root.descendants() {
            for (key, uri) in &node.attributes {
                if let Some(prefix) = key.strip_prefix("xmlns:") {
                    if !namespaces.iter().any(|(p, _)| p == prefix) {
                        namespaces.push((prefix.to_string(), uri.clone()));
                    }
                }
            }
        }

        Ok(Self {
            raw: xml.to_string(),
            root,
            package,
            namespaces,
        })
    }
}

/// Holds the current response and asserts against it.
#[derive(Default)]
pub struct ResponseAssertions {
    current: Option<ResponseDocument>,
    /// Prefixes registered by the caller, on top of the document's own
    namespaces: Vec<(String, String)>,
}

impl fmt::Debug for ResponseAssertions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseAssertions")
            .field("response_len", &self.current.as_ref().map(|d| d.raw.len()))
            .field("namespaces", &self.namespaces)
            .finish()
    }
}

impl ResponseAssertions {
    /// Create an engine with no response loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current response.
    ///
    /// On failure the previous response is discarded as well.
    pub fn load_response(&mut self, xml: &str) -> Result<()> {
        self.current = None;
        let document = ResponseDocument::parse(xml)?;
        debug!(
            bytes = xml.len(),
            root = %document.root.name,
            "Loaded SOAP response"
        );
        self.current = Some(document);
        Ok(())
    }

    /// Forget the current response.
    pub(crate) fn clear(&mut self) {
        self.current = None;
    }

    /// Register a namespace prefix for XPath queries.
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.push((prefix.into(), uri.into()));
        self
    }

    /// Raw text of the current response.
    pub fn raw(&self) -> Result<&str> {
        Ok(self.document()?.raw.as_str())
    }

    /// Element tree of the current response.
    pub fn root(&self) -> Result<&XmlNode> {
        Ok(&self.document()?.root)
    }

    /// Some element of the response equals the expected fragment.
    pub fn assert_includes<F: AsXmlFragment + ?Sized>(&self, expected: &F) -> Result<()> {
        let expected = expected.to_fragment()?;
        let root = self.root()?;
        if canonical::contains(root, &expected) {
            return Ok(());
        }
        Err(mismatch("assert_includes", &expected, root))
    }

    /// No element of the response equals the fragment.
    pub fn assert_not_includes<F: AsXmlFragment + ?Sized>(&self, unexpected: &F) -> Result<()> {
        let unexpected = unexpected.to_fragment()?;
        let root = self.root()?;
        if !canonical::contains(root, &unexpected) {
            return Ok(());
        }
        Err(mismatch("assert_not_includes", &unexpected, root))
    }

    /// The whole response equals the expected document.
    pub fn assert_equals<F: AsXmlFragment + ?Sized>(&self, expected: &F) -> Result<()> {
        let expected = expected.to_fragment()?;
        let root = self.root()?;
        if canonical::structurally_equal(root, &expected) {
            return Ok(());
        }
        Err(mismatch("assert_equals", &expected, root))
    }

    /// The whole response differs from the document.
    pub fn assert_not_equals<F: AsXmlFragment + ?Sized>(&self, unexpected: &F) -> Result<()> {
        let unexpected = unexpected.to_fragment()?;
        let root = self.root()?;
        if !canonical::structurally_equal(root, &unexpected) {
            return Ok(());
        }
        Err(mismatch("assert_not_equals", &unexpected, root))
    }

    /// Some element of the response has the element-name shape of the fragment.
    pub fn assert_contains_structure<F: AsXmlFragment + ?Sized>(&self, expected: &F) -> Result<()> {
        let expected = expected.to_fragment()?;
        let root = self.root()?;
        if canonical::contains_structure(root, &expected) {
            return Ok(());
        }
        Err(mismatch("assert_contains_structure", &expected, root))
    }

    /// No element of the response has the element-name shape of the fragment.
    pub fn assert_not_contains_structure<F: AsXmlFragment + ?Sized>(
        &self,
        unexpected: &F,
    ) -> Result<()> {
        let unexpected = unexpected.to_fragment()?;
        let root = self.root()?;
        if !canonical::contains_structure(root, &unexpected) {
            return Ok(());
        }
        Err(mismatch("assert_not_contains_structure", &unexpected, root))
    }

    /// The XPath expression selects at least one node.
    pub fn assert_xpath_present(&self, expr: &str) -> Result<()> {
        if self.xpath_matches(expr)? {
            return Ok(());
        }
        Err(self.xpath_mismatch("assert_xpath_present", expr)?)
    }

    /// The XPath expression selects nothing.
    pub fn assert_xpath_absent(&self, expr: &str) -> Result<()> {
        if !self.xpath_matches(expr)? {
            return Ok(());
        }
        Err(self.xpath_mismatch("assert_xpath_absent", expr)?)
    }

    /// Text content of the first node the locator matches.
    pub fn grab_text(&self, locator: &str) -> Result<String> {
        let expr = Locator::parse(locator)?.to_xpath();
        self.evaluate(&expr, |value| match value {
            Value::Nodeset(nodes) => nodes
                .document_order()
                .into_iter()
                .next()
                .map(|node| node.string_value())
                .ok_or_else(|| SoapError::NoMatch(locator.to_string())),
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(number_to_string(n)),
            Value::Boolean(b) => Ok(b.to_string()),
        })
    }

    /// Text content of every node the locator matches, in document order.
    pub fn grab_all_text(&self, locator: &str) -> Result<Vec<String>> {
        let expr = Locator::parse(locator)?.to_xpath();
        self.evaluate(&expr, |value| match value {
            Value::Nodeset(nodes) => Ok(nodes
                .document_order()
                .into_iter()
                .map(|node| node.string_value())
                .collect()),
            _ => Err(not_a_nodeset(&expr)),
        })
    }

    /// Attribute value of the first element the locator matches.
    pub fn grab_attribute(&self, locator: &str, attribute: &str) -> Result<String> {
        let expr = Locator::parse(locator)?.to_xpath();
        self.evaluate(&expr, |value| match value {
            Value::Nodeset(nodes) => nodes
                .document_order()
                .into_iter()
                .find_map(|node| match node {
                    Node::Element(element) => {
                        element.attribute_value(attribute).map(str::to_string)
                    }
                    _ => None,
                })
                .ok_or_else(|| SoapError::NoMatch(format!("{}@{}", locator, attribute))),
            _ => Err(not_a_nodeset(&expr)),
        })
    }

    fn document(&self) -> Result<&ResponseDocument> {
        self.current.as_ref().ok_or(SoapError::NoResponse)
    }

    fn xpath_matches(&self, expr: &str) -> Result<bool> {
        self.evaluate(expr, |value| match value {
            Value::Nodeset(nodes) => Ok(nodes.size() > 0),
            Value::Boolean(b) => Ok(b),
            _ => Err(not_a_nodeset(expr)),
        })
    }

    /// Compile and run an XPath expression against the response.
    fn evaluate<T>(&self, expr: &str, extract: impl FnOnce(Value<'_>) -> Result<T>) -> Result<T> {
        let document = self.document()?;
        let invalid = |reason: String| SoapError::InvalidXPath {
            expression: expr.to_string(),
            reason,
        };

        let xpath = Factory::new()
            .build(expr)
            .map_err(|e| invalid(e.to_string()))?
            .ok_or_else(|| invalid("empty expression".to_string()))?;

        let mut context = Context::new();
        for (prefix, uri) in document.namespaces.iter().chain(&self.namespaces) {
            context.set_namespace(prefix, uri);
        }

        let package = document
            .package
            .as_ref()
            .map_err(|reason| {
                invalid(format!("response is not namespace-well-formed: {}", reason))
            })?;
        let doc = package.as_document();
        let value = xpath
            .evaluate(&context, doc.root())
            .map_err(|e| invalid(e.to_string()))?;
        extract(value)
    }

    fn xpath_mismatch(&self, assertion: &'static str, expr: &str) -> Result<SoapError> {
        let actual = canonical::canonical_string(self.root()?)?;
        warn!(assertion, xpath = expr, "SOAP response assertion failed");
        Ok(SoapError::AssertionMismatch {
            assertion,
            expected: expr.to_string(),
            actual,
        })
    }
}

fn mismatch(assertion: &'static str, expected: &XmlNode, actual: &XmlNode) -> SoapError {
    warn!(assertion, "SOAP response assertion failed");
    let render = |node: &XmlNode| {
        canonical::canonical_string(node).unwrap_or_else(|e| format!("<unprintable: {}>", e))
    };
    SoapError::AssertionMismatch {
        assertion,
        expected: render(expected),
        actual: render(actual),
    }
}

/// XPath 1.0 `string()` of a number.
fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        // negative zero prints as 0
        "0".to_string()
    } else {
        n.to_string()
    }
}

fn not_a_nodeset(expr: &str) -> SoapError {
    SoapError::InvalidXPath {
        expression: expr.to_string(),
        reason: "expression does not select nodes".to_string(),
    }
}
