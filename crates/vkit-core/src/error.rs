//! # Error Types
//!
//! Construction errors for the foundational types. Errors from the
//! registry, the generator and the middleware live in their own crates.

use thiserror::Error;

/// Error produced when parsing a foundational value from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Schema identifiers must contain at least one non-whitespace character.
    #[error("schema identifier must not be empty")]
    EmptyIdentifier,

    /// The text does not name a request section.
    #[error("unknown request section '{0}' (expected body, query or params)")]
    UnknownSection(String),
}
