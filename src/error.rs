//! Error types for SOAP request building and response assertions.

use thiserror::Error;

/// Opaque error raised by a transport collaborator.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SoapError>;

/// Errors produced while building envelopes or asserting on responses.
#[derive(Error, Debug)]
pub enum SoapError {
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Malformed expected XML: {0}")]
    MalformedExpected(String),

    #[error("Invalid SOAP method name: {0:?}")]
    InvalidMethodName(String),

    #[error("Failed to load envelope skeleton: {0}")]
    SkeletonLoadFailure(String),

    #[error("{assertion} failed\n--- expected\n{expected}\n+++ actual\n{actual}")]
    AssertionMismatch {
        /// Name of the assertion that failed
        assertion: &'static str,
        /// Canonical form of the expected XML
        expected: String,
        /// Canonical form of the actual XML
        actual: String,
    },

    #[error("Nothing matched {0}")]
    NoMatch(String),

    #[error("Invalid XPath expression {expression:?}: {reason}")]
    InvalidXPath { expression: String, reason: String },

    #[error("Invalid builder state: {0}")]
    InvalidState(String),

    #[error("No response has been loaded")]
    NoResponse,

    #[error("Transport failure: {0}")]
    TransportFailure(#[source] TransportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("XML serialization error: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable codes for every error kind, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MalformedBody,
    MalformedResponse,
    MalformedExpected,
    InvalidMethodName,
    SkeletonLoadFailure,
    AssertionMismatch,
    NoMatch,
    InvalidXPath,
    InvalidState,
    NoResponse,
    TransportFailure,
    Config,
    Serialize,
    Io,
}

impl ErrorCode {
    /// Get the string code for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedBody => "MALFORMED_BODY",
            Self::MalformedResponse => "MALFORMED_RESPONSE",
            Self::MalformedExpected => "MALFORMED_EXPECTED",
            Self::InvalidMethodName => "INVALID_METHOD_NAME",
            Self::SkeletonLoadFailure => "SKELETON_LOAD_FAILURE",
            Self::AssertionMismatch => "ASSERTION_MISMATCH",
            Self::NoMatch => "NO_MATCH",
            Self::InvalidXPath => "INVALID_XPATH",
            Self::InvalidState => "INVALID_STATE",
            Self::NoResponse => "NO_RESPONSE",
            Self::TransportFailure => "TRANSPORT_FAILURE",
            Self::Config => "CONFIG",
            Self::Serialize => "SERIALIZE",
            Self::Io => "IO",
        }
    }
}

impl SoapError {
    /// The code of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedBody(_) => ErrorCode::MalformedBody,
            Self::MalformedResponse(_) => ErrorCode::MalformedResponse,
            Self::MalformedExpected(_) => ErrorCode::MalformedExpected,
            Self::InvalidMethodName(_) => ErrorCode::InvalidMethodName,
            Self::SkeletonLoadFailure(_) => ErrorCode::SkeletonLoadFailure,
            Self::AssertionMismatch { .. } => ErrorCode::AssertionMismatch,
            Self::NoMatch(_) => ErrorCode::NoMatch,
            Self::InvalidXPath { .. } => ErrorCode::InvalidXPath,
            Self::InvalidState(_) => ErrorCode::InvalidState,
            Self::NoResponse => ErrorCode::NoResponse,
            Self::TransportFailure(_) => ErrorCode::TransportFailure,
            Self::Config(_) => ErrorCode::Config,
            Self::Serialize(_) => ErrorCode::Serialize,
            Self::Io(_) => ErrorCode::Io,
        }
    }

    /// True for assertion failures, as opposed to faults in the test itself.
    pub fn is_assertion_failure(&self) -> bool {
        matches!(self, Self::AssertionMismatch { .. } | Self::NoMatch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::MalformedBody.as_str(), "MALFORMED_BODY");
        assert_eq!(ErrorCode::InvalidXPath.as_str(), "INVALID_XPATH");
    }

    #[test]
    fn test_mismatch_message_carries_both_sides() {
        let err = SoapError::AssertionMismatch {
            assertion: "assert_equals",
            expected: "<a>1</a>".to_string(),
            actual: "<a>2</a>".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with("assert_equals failed"));
        assert!(message.contains("<a>1</a>"));
        assert!(message.contains("<a>2</a>"));
        assert_eq!(err.code(), ErrorCode::AssertionMismatch);
        assert!(err.is_assertion_failure());
    }

    #[test]
    fn test_transport_failure_keeps_source() {
        use std::error::Error as _;

        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = SoapError::TransportFailure(Box::new(inner));
        assert_eq!(err.code().as_str(), "TRANSPORT_FAILURE");
        assert!(err.source().is_some());
        assert!(!err.is_assertion_failure());
    }
}
