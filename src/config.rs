//! Configuration types for SOAP sessions.

use crate::error::{Result, SoapError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SOAP 1.1 envelope namespace.
pub const SOAP_11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
/// SOAP 1.2 envelope namespace.
pub const SOAP_12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Main configuration for building requests against one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapConfig {
    /// Schema URI, bound to the `ns` prefix of request methods
    pub schema: String,

    /// Service endpoint URI
    pub endpoint: String,

    /// Path to the envelope layout; a standard skeleton is used when absent
    #[serde(default)]
    pub skeleton: Option<PathBuf>,

    /// SOAP version of the standard skeleton
    #[serde(default)]
    pub version: SoapVersion,
}

impl SoapConfig {
    /// Create a configuration for the given schema and endpoint.
    pub fn new(schema: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            endpoint: endpoint.into(),
            skeleton: None,
            version: SoapVersion::default(),
        }
    }

    /// Use an envelope layout file instead of the standard skeleton.
    pub fn with_skeleton(mut self, path: impl Into<PathBuf>) -> Self {
        self.skeleton = Some(path.into());
        self
    }

    /// Select the SOAP version of the standard skeleton.
    pub fn with_version(mut self, version: SoapVersion) -> Self {
        self.version = version;
        self
    }

    /// Parse and validate a YAML configuration.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| SoapError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that required values are present.
    pub fn validate(&self) -> Result<()> {
        if self.schema.trim().is_empty() {
            return Err(SoapError::Config("schema must not be empty".to_string()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(SoapError::Config("endpoint must not be empty".to_string()));
        }
        Ok(())
    }
}

/// SOAP versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SoapVersion {
    /// SOAP 1.1 (namespace: http://schemas.xmlsoap.org/soap/envelope/)
    #[default]
    #[serde(rename = "1.1")]
    Soap11,
    /// SOAP 1.2 (namespace: http://www.w3.org/2003/05/soap-envelope)
    #[serde(rename = "1.2")]
    Soap12,
}

impl SoapVersion {
    /// Envelope namespace URI for this version.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Soap11 => SOAP_11_NS,
            Self::Soap12 => SOAP_12_NS,
        }
    }
}
