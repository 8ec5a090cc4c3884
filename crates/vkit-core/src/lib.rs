//! # vkit-core — Foundational Types
//!
//! Shared vocabulary for the vkit workspace. Every other crate depends on
//! `vkit-core`; it depends on nothing internal.
//!
//! - [`SchemaId`]: the registry key of a schema document (its `$id`).
//! - [`Section`]: the part of an HTTP request a validator is bound to.
//! - [`CoreError`]: construction errors for the types above.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `vkit-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod section;

pub use error::CoreError;
pub use identity::SchemaId;
pub use section::Section;
