//! # Schema Identifiers
//!
//! A [`SchemaId`] is the stable key a schema document is registered under,
//! normally the value of its `$id` keyword. Identifiers are compared
//! exactly; no URI normalization is applied, so `#/schemas/User.json` and
//! `https://example.com/schemas/User.json` are distinct keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Registry key of a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaId(String);

impl SchemaId {
    /// Build an identifier, rejecting empty or all-whitespace input.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::EmptyIdentifier);
        }
        Ok(Self(id))
    }

    /// Read the `$id` keyword of a schema document, if it carries one.
    pub fn of_document(document: &serde_json::Value) -> Option<Self> {
        document
            .get("$id")
            .and_then(|v| v.as_str())
            .and_then(|id| Self::new(id).ok())
    }

    /// The identifier as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier with any `#fragment` removed.
    ///
    /// Fragment-only identifiers such as `#/schemas/User.json` have an empty
    /// base.
    pub fn base(&self) -> &str {
        match self.0.split_once('#') {
            Some((base, _)) => base,
            None => &self.0,
        }
    }

    /// The `#fragment` part without the leading `#`, if present.
    pub fn fragment(&self) -> Option<&str> {
        self.0.split_once('#').map(|(_, fragment)| fragment)
    }

    /// Whether the identifier is an absolute URI (`scheme:...`).
    pub fn is_absolute_uri(&self) -> bool {
        let Some((scheme, _)) = self.0.split_once(':') else {
            return false;
        };
        let mut chars = scheme.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SchemaId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SchemaId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SchemaId {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SchemaId> for String {
    fn from(id: SchemaId) -> Self {
        id.0
    }
}

impl AsRef<str> for SchemaId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
