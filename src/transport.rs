//! The collaborator that carries envelopes to the service.

use crate::error::TransportError;

/// Sends a serialized envelope and returns the raw response text.
///
/// HTTP, SOAPAction headers and retries all live behind this trait.
pub trait SoapTransport {
    fn send(&mut self, envelope: &str) -> Result<String, TransportError>;
}

impl<F> SoapTransport for F
where
    F: FnMut(&str) -> Result<String, TransportError>,
{
    fn send(&mut self, envelope: &str) -> Result<String, TransportError> {
        self(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_transport() {
        let mut seen = Vec::new();
        let mut transport = |envelope: &str| -> Result<String, TransportError> {
            seen.push(envelope.to_string());
            Ok("<ok/>".to_string())
        };
        assert_eq!(transport.send("<ping/>").unwrap(), "<ok/>");
        drop(transport);
        assert_eq!(seen, vec!["<ping/>"]);
    }
}
