//! SOAP request envelope construction.

use crate::builder::XmlBuilder;
use crate::config::SoapConfig;
use crate::error::{Result, SoapError};
use crate::node::XmlNode;
use std::path::Path;
use tracing::debug;

/// Prefix bound to the configured schema in the standard skeleton.
pub const METHOD_PREFIX: &str = "ns";

/// Prefix of envelope elements in the standard skeleton.
pub const ENVELOPE_PREFIX: &str = "soapenv";

/// The fixed Envelope/Header/Body layout every request starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    root: XmlNode,
    header: usize,
    body: usize,
}

impl Skeleton {
    /// Standard layout for the configured schema and SOAP version.
    pub fn standard(config: &SoapConfig) -> Self {
        let root = XmlNode::new(format!("{}:Envelope", ENVELOPE_PREFIX))
            .with_attribute(format!("xmlns:{}", ENVELOPE_PREFIX), config.version.namespace())
            .with_attribute(format!("xmlns:{}", METHOD_PREFIX), config.schema.as_str())
            .with_child(XmlNode::new(format!("{}:Header", ENVELOPE_PREFIX)))
            .with_child(XmlNode::new(format!("{}:Body", ENVELOPE_PREFIX)));
        Self {
            root,
            header: 0,
            body: 1,
        }
    }

    /// Skeleton named by the configuration, or the standard one.
    pub fn for_config(config: &SoapConfig) -> Result<Self> {
        match &config.skeleton {
            Some(path) => Self::load(path),
            None => Ok(Self::standard(config)),
        }
    }

    /// Load a layout file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|e| {
            SoapError::SkeletonLoadFailure(format!("{}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded envelope skeleton");
        Self::from_xml(&xml)
    }

    /// Read a layout from XML text.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let root = XmlNode::parse(xml).map_err(|e| SoapError::SkeletonLoadFailure(e.to_string()))?;
        Self::from_node(root)
    }

    /// Use an existing tree as the layout.
    pub fn from_node(root: XmlNode) -> Result<Self> {
        if root.local_name() != "Envelope" {
            return Err(SoapError::SkeletonLoadFailure(format!(
                "root element is <{}>, expected Envelope",
                root.name
            )));
        }
        let position = |local: &str| {
            root.children
                .iter()
                .position(|c| c.local_name() == local)
                .ok_or_else(|| {
                    SoapError::SkeletonLoadFailure(format!("Envelope has no {} element", local))
                })
        };
        let header = position("Header")?;
        let body = position("Body")?;
        Ok(Self { root, header, body })
    }

    /// Root element of the layout.
    pub fn root(&self) -> &XmlNode {
        &self.root
    }

    fn instantiate(&self) -> Envelope {
        Envelope {
            root: self.root.clone(),
            header: self.header,
            body: self.body,
        }
    }
}

/// A named header element with one child element per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    /// Header element name
    pub name: String,
    /// Field names and values, in insertion order
    pub fields: Vec<(String, String)>,
}

impl HeaderEntry {
    /// Create a header entry.
    pub fn new<K, V>(name: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Element form of this header.
    pub fn to_node(&self) -> XmlNode {
        self.fields
            .iter()
            .fold(XmlNode::new(self.name.as_str()), |header, (field, value)| {
                header.with_child(XmlNode::new(field.as_str()).with_text(value.as_str()))
            })
    }
}

/// Request body: raw XML text or an already-built element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// XML text of zero or more sibling elements
    Xml(String),
    /// A single element
    Node(XmlNode),
}

impl RequestBody {
    fn into_nodes(self) -> Result<Vec<XmlNode>> {
        match self {
            Self::Xml(text) => {
                XmlNode::parse_fragment(&text).map_err(|e| SoapError::MalformedBody(e.to_string()))
            }
            Self::Node(node) => Ok(vec![node]),
        }
    }
}

impl From<&str> for RequestBody {
    fn from(xml: &str) -> Self {
        Self::Xml(xml.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(xml: String) -> Self {
        Self::Xml(xml)
    }
}

impl From<XmlNode> for RequestBody {
    fn from(node: XmlNode) -> Self {
        Self::Node(node)
    }
}

impl TryFrom<XmlBuilder> for RequestBody {
    type Error = SoapError;

    fn try_from(builder: XmlBuilder) -> Result<Self> {
        Ok(Self::Node(builder.build()?))
    }
}

/// A complete SOAP request document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    root: XmlNode,
    header: usize,
    body: usize,
}

impl Envelope {
    /// Root Envelope element.
    pub fn root(&self) -> &XmlNode {
        &self.root
    }

    /// The Header element.
    pub fn header(&self) -> &XmlNode {
        &self.root.children[self.header]
    }

    /// The Body element.
    pub fn body(&self) -> &XmlNode {
        &self.root.children[self.body]
    }

    /// Append a header element.
    pub fn append_header(&mut self, entry: &HeaderEntry) {
        self.root.children[self.header].children.push(entry.to_node());
    }

    /// Serialize as a complete XML document.
    pub fn to_xml(&self) -> Result<String> {
        self.root.to_document()
    }

    /// Take the root element.
    pub fn into_node(self) -> XmlNode {
        self.root
    }
}

/// Builds request envelopes for one configured service.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    config: SoapConfig,
    skeleton: Skeleton,
    /// Headers waiting for the next build
    pending: Vec<HeaderEntry>,
}

impl EnvelopeBuilder {
    /// Create a builder from a configuration and an explicit skeleton.
    pub fn new(config: SoapConfig, skeleton: Skeleton) -> Self {
        Self {
            config,
            skeleton,
            pending: Vec::new(),
        }
    }

    /// Create a builder, loading the skeleton the configuration names.
    pub fn from_config(config: SoapConfig) -> Result<Self> {
        config.validate()?;
        let skeleton = Skeleton::for_config(&config)?;
        Ok(Self::new(config, skeleton))
    }

    /// Configuration in use.
    pub fn config(&self) -> &SoapConfig {
        &self.config
    }

    /// Queue a header for the next envelope.
    pub fn add_header<K, V>(
        &mut self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.pending.push(HeaderEntry::new(name, fields));
        self
    }

    /// Headers queued for the next envelope.
    pub fn pending_headers(&self) -> &[HeaderEntry] {
        &self.pending
    }

    /// The request as it stands: skeleton plus queued headers, no body yet.
    pub fn current_request(&self) -> Envelope {
        let mut envelope = self.skeleton.instantiate();
        for entry in &self.pending {
            envelope.append_header(entry);
        }
        envelope
    }

    /// Build an envelope with the queued headers, then clear the queue.
    ///
    /// The queue is kept if building fails.
    pub fn build_envelope(
        &mut self,
        method: &str,
        body: impl Into<RequestBody>,
    ) -> Result<Envelope> {
        let envelope = self.build_with_headers(method, body, &self.pending)?;
        self.pending.clear();
        Ok(envelope)
    }

    /// Build an envelope from a fresh skeleton with the given headers.
    pub fn build_with_headers(
        &self,
        method: &str,
        body: impl Into<RequestBody>,
        headers: &[HeaderEntry],
    ) -> Result<Envelope> {
        if !is_valid_method_name(method) {
            return Err(SoapError::InvalidMethodName(method.to_string()));
        }

        let body: RequestBody = body.into();
        let wrapper = XmlNode {
            name: format!("{}:{}", METHOD_PREFIX, method),
            children: body.into_nodes()?,
            ..Default::default()
        };

        let mut envelope = self.skeleton.instantiate();
        envelope.root.children[envelope.body].children.push(wrapper);
        for entry in headers {
            envelope.append_header(entry);
        }

        debug!(
            method = method,
            headers = headers.len(),
            endpoint = %self.config.endpoint,
            "Built SOAP envelope"
        );
        Ok(envelope)
    }
}

/// XML name rules for the local part of the method element.
fn is_valid_method_name(method: &str) -> bool {
    let mut chars = method.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
