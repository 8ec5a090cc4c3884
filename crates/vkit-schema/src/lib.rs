//! # vkit-schema — Schema Compilation & Validator Registry
//!
//! The policy layer between JSON Schema documents and request validation.
//!
//! ## Compilation (`compiler`)
//!
//! [`SchemaCompiler`] wraps the `jsonschema` engine with fixed defaults:
//! accumulate every failure, coerce scalar types, inject declared defaults,
//! strip properties that fail `additionalProperties`, tolerate unknown
//! formats. The engine only validates, so the mutating policies run as a
//! normalization pass over the instance (see `normalize`) before the engine
//! sees it.
//!
//! ## Registry (`registry`)
//!
//! [`ValidatorRegistry`] owns one compiler, registers documents by `$id`,
//! compiles lazily on first lookup and caches the result. Re-registering an
//! identifier evicts its cached validator.
//!
//! ## Problems (`problem`)
//!
//! [`to_problems`] and [`bad_request`] turn raw failures into the stable
//! `{message, path, code}` format returned to clients.
//!
//! ## Relaxation (`relax`)
//!
//! [`relax_record_schemas`] reopens property-less object schemas that a
//! closed-by-default generator would otherwise make reject every key.

pub mod compiler;
pub mod failure;
mod normalize;
pub mod problem;
pub mod registry;
pub mod relax;

pub use compiler::{
    Coercion, CompileError, CompiledValidator, CompilerOptions, RemoveAdditional, SchemaCompiler,
    SchemaDraft,
};
pub use failure::{FailureKeyword, ValidationFailure};
pub use problem::{bad_request, to_problems, BadRequestBody, ValidationProblem};
pub use registry::{RegistryError, ValidatorRegistry};
pub use relax::{is_record_like, relax_record_schemas};
