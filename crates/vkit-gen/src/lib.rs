//! # vkit-gen — Schema Generation Pipeline
//!
//! Derives one JSON Schema document per named Rust type so request schemas
//! stay in step with the types handlers deserialize into.
//!
//! ## Stages
//!
//! 1. **Sources** (`sources`): glob patterns or a `Cargo.toml` manifest are
//!    resolved to a sorted list of `.rs` files.
//! 2. **Program** (`program`): every file is parsed with `syn`; structs,
//!    enums and type aliases are indexed by name together with the serde
//!    attributes that affect their JSON shape.
//! 3. **Generator** (`generator`): a named declaration and everything it
//!    references become a draft-07 schema.
//! 4. **Pipeline** (`pipeline`): each schema is stamped with its `$id`,
//!    optionally relaxed, and written to `<out>/<Type>.schema.json`.
//!
//! ## Crate Policy
//!
//! - Source files are parsed, never compiled or expanded; macro-generated
//!   types are invisible.
//! - Unsupported constructs fail loudly with the offending type named,
//!   instead of emitting a permissive schema.

pub mod attrs;
pub mod error;
pub mod generator;
pub mod options;
pub mod pipeline;
pub mod program;
pub mod sources;

pub use error::GenerationError;
pub use generator::{GeneratorSettings, SchemaGenerator};
pub use options::GenerationOptions;
pub use pipeline::{generate_schemas, render_schema, GeneratedSchema, GenerationReport};
pub use program::SourceProgram;
