//! # vkit-cli — Command Line Interface
//!
//! Subcommand handlers for the `vkit` binary:
//!
//! - `gen` (default): generate `<Type>.schema.json` files from Rust type
//!   declarations.
//! - `check`: validate a JSON document against a directory of schemas.
//!
//! Handlers return `anyhow::Result<u8>`; the binary maps the `u8` to its
//! exit status and logs errors at the boundary.

pub mod check;
pub mod gen;
