//! Locators: raw XPath or a space-separated tag path shorthand.
//!
//! The shorthand `"doc node"` selects every `node` below a `doc` and is
//! translated to `descendant-or-self::doc/descendant::node`.

use crate::error::{Result, SoapError};

/// A parsed locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// An XPath 1.0 expression used as is
    XPath(String),
    /// Tag names forming a descendant chain
    Shorthand(Vec<String>),
}

impl Locator {
    /// Classify and parse a locator string.
    pub fn parse(locator: &str) -> Result<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(SoapError::InvalidXPath {
                expression: locator.to_string(),
                reason: "empty locator".to_string(),
            });
        }

        if looks_like_xpath(locator) {
            return Ok(Self::XPath(locator.to_string()));
        }

        let tokens: Vec<String> = locator.split_whitespace().map(str::to_string).collect();
        if let Some(bad) = tokens.iter().find(|t| !is_tag_token(t)) {
            return Err(SoapError::InvalidXPath {
                expression: locator.to_string(),
                reason: format!("{:?} is not a tag name", bad),
            });
        }
        Ok(Self::Shorthand(tokens))
    }

    /// XPath expression for this locator.
    pub fn to_xpath(&self) -> String {
        match self {
            Self::XPath(expr) => expr.clone(),
            Self::Shorthand(tokens) => tokens
                .iter()
                .enumerate()
                .map(|(i, tag)| {
                    if i == 0 {
                        format!("descendant-or-self::{}", tag)
                    } else {
                        format!("descendant::{}", tag)
                    }
                })
                .collect::<Vec<_>>()
                .join("/"),
        }
    }
}

fn looks_like_xpath(locator: &str) -> bool {
    locator.starts_with('.')
        || locator.contains("::")
        || locator.contains(['/', '@', '[', '('])
}

fn is_tag_token(token: &str) -> bool {
    token == "*"
        || token
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}
