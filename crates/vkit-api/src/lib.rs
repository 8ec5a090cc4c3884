//! # vkit-api — Request Validation Middleware
//!
//! Validates the body, query string or path parameters of incoming requests
//! against JSON Schemas before they reach a handler, on the Axum/Tower stack.
//!
//! ## Flow
//!
//! ```text
//! RequestValidator::validate_*  (setup: compile once, fail fast)
//!        │
//!        ▼
//! ValidationLayer → ValidationService → read section → normalize + validate
//!        │                                   │
//!        │ valid                             │ invalid
//!        ▼                                   ▼
//! ValidatedSections extension        400 {"error": "Invalid <section>", "details": [...]}
//!        │
//!        ▼
//! handler (ValidatedBody<T> / ValidatedQuery<T> / ValidatedParams<T>)
//! ```
//!
//! ## Crate Policy
//!
//! - Schemas are compiled when a layer is built, never per request.
//! - Validation failures are responses, not errors: they never reach the
//!   wrapped service and never touch registry state.
//! - The raw request is passed on intact; normalized values travel in
//!   request extensions.

pub mod error;
pub mod extract;
pub mod kit;
pub mod layer;
pub mod metrics;

pub use error::ApiError;
pub use extract::{ValidatedBody, ValidatedParams, ValidatedQuery, ValidatedSections};
pub use kit::{RequestValidator, SchemaSource};
pub use layer::{ValidationLayer, ValidationService, DEFAULT_BODY_LIMIT};
pub use vkit_core::Section;
