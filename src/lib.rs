//! SOAP request building and XML response assertions for acceptance tests.
//!
//! Builds request envelopes from a method name, a body and headers, and
//! checks responses with formatting-insensitive XML comparison and XPath.
//!
//! # Features
//!
//! - Envelope construction from a skeleton (standard or loaded from a file)
//! - Header accumulation per request
//! - Fragment inclusion, full-document equality and structure assertions
//! - XPath presence/absence checks and text/attribute extraction
//! - Tag-path locator shorthand (`"doc node"`)
//! - Fluent builder for expected fragments
//!
//! # Example
//!
//! ```
//! use soap_assert::{SoapConfig, SoapSession, TransportError};
//!
//! let transport = |_envelope: &str| -> Result<String, TransportError> {
//!     Ok("<doc><node>123</node></doc>".to_string())
//! };
//! let config = SoapConfig::new("http://www.w3.org/2001/xml.xsd", "http://localhost/api");
//! let mut session = SoapSession::new(config, transport)?;
//!
//! session
//!     .have_soap_header("AuthHeader", [("username", "davert")])
//!     .send_soap_request("GetNode", "<id>1</id>")?;
//!
//! let response = session.response();
//! response.assert_includes("<node>123</node>")?;
//! assert_eq!(response.grab_text("doc node")?, "123");
//! # Ok::<(), soap_assert::SoapError>(())
//! ```

pub mod builder;
pub mod canonical;
pub mod config;
pub mod envelope;
pub mod error;
pub mod locator;
pub mod node;
pub mod response;
pub mod session;
pub mod transport;

pub use builder::XmlBuilder;
pub use config::{SoapConfig, SoapVersion};
pub use envelope::{Envelope, EnvelopeBuilder, HeaderEntry, RequestBody, Skeleton};
pub use error::{ErrorCode, Result, SoapError, TransportError};
pub use locator::Locator;
pub use node::XmlNode;
pub use response::{AsXmlFragment, ResponseAssertions};
pub use session::SoapSession;
pub use transport::SoapTransport;
