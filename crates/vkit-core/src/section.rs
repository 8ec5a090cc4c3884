//! # Request Sections
//!
//! The three parts of an incoming request a validator can be bound to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A validatable part of an HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// The decoded JSON request body.
    Body,
    /// The URL query string, decoded into an object.
    Query,
    /// The path parameters captured by the matched route.
    Params,
}

impl Section {
    /// All sections, in declaration order.
    pub const ALL: [Section; 3] = [Section::Body, Section::Query, Section::Params];

    /// The lowercase name used in error bodies and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Body => "body",
            Section::Query => "query",
            Section::Params => "params",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "body" => Ok(Section::Body),
            "query" => Ok(Section::Query),
            "params" => Ok(Section::Params),
            other => Err(CoreError::UnknownSection(other.to_string())),
        }
    }
}
