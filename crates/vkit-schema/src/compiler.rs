//! Schema compiler: the validation engine plus vkit's fixed policies.
//!
//! The `jsonschema` engine is a pure validator. The mutating behaviors a
//! request validator needs (type coercion, default injection, removal of
//! additional properties) are applied by a normalization pass that walks the
//! schema and the instance together before the engine runs. See
//! [`CompilerOptions`] for the switches.
//!
//! Documents registered with the compiler form a local store. `$ref`s into
//! that store resolve through [`StoreRetriever`]; nothing is fetched over
//! the network.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use jsonschema::{Draft, Retrieve, Uri, Validator};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vkit_core::SchemaId;

use crate::failure::ValidationFailure;
use crate::normalize::Normalizer;

/// Documents known to a compiler, keyed by identifier.
pub(crate) type SchemaStore = BTreeMap<String, Value>;

/// A user-supplied format predicate.
pub(crate) type FormatCheck = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Type coercion policy applied before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coercion {
    /// Values are validated exactly as received.
    Off,
    /// Scalars convert between string, number, integer, boolean and null.
    #[default]
    Scalars,
    /// Scalar rules plus wrapping into and unwrapping out of one-element arrays.
    Array,
}

/// Additional-property removal policy applied before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoveAdditional {
    /// Undeclared properties are left for `additionalProperties` to judge.
    Off,
    /// Undeclared properties are dropped where `additionalProperties` is `false`.
    WhenForbidden,
    /// Undeclared properties are dropped from every schema that declares `properties`.
    All,
    /// Undeclared properties are dropped where they would fail `additionalProperties`.
    #[default]
    Failing,
}

/// JSON Schema dialect used when a document has no `$schema`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchemaDraft {
    #[serde(rename = "draft-04")]
    Draft4,
    #[serde(rename = "draft-06")]
    Draft6,
    #[default]
    #[serde(rename = "draft-07")]
    Draft7,
    #[serde(rename = "2019-09")]
    Draft201909,
    #[serde(rename = "2020-12")]
    Draft202012,
}

impl From<SchemaDraft> for Draft {
    fn from(draft: SchemaDraft) -> Self {
        match draft {
            SchemaDraft::Draft4 => Draft::Draft4,
            SchemaDraft::Draft6 => Draft::Draft6,
            SchemaDraft::Draft7 => Draft::Draft7,
            SchemaDraft::Draft201909 => Draft::Draft201909,
            SchemaDraft::Draft202012 => Draft::Draft202012,
        }
    }
}

/// Compiler configuration.
///
/// The defaults are the policies request validation is built around; the
/// struct deserializes from camelCase TOML/JSON with every field optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Report every failure instead of stopping at the first.
    pub all_errors: bool,
    pub coerce_types: Coercion,
    pub remove_additional: RemoveAdditional,
    /// Insert `default` values for absent properties and tuple items.
    pub use_defaults: bool,
    /// Treat unknown formats as compile errors.
    pub strict: bool,
    pub validate_formats: bool,
    pub default_draft: SchemaDraft,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            all_errors: true,
            coerce_types: Coercion::Scalars,
            remove_additional: RemoveAdditional::Failing,
            use_defaults: true,
            strict: false,
            validate_formats: true,
            default_draft: SchemaDraft::Draft7,
        }
    }
}

/// A schema the engine refused to compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CompileError(pub String);

/// Resolves `$ref`s against the compiler's document store.
///
/// Unknown URIs fail rather than fall through to a network fetch.
struct StoreRetriever {
    store: Arc<SchemaStore>,
}

impl Retrieve for StoreRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let key = uri.as_str();
        let found = self
            .store
            .get(key)
            .or_else(|| self.store.get(key.trim_end_matches('#')));
        match found {
            Some(doc) => Ok(engine_document(doc)),
            None => Err(format!("schema '{key}' is not registered").into()),
        }
    }
}

/// Engine construction shared by a compiler and the validators it produces.
#[derive(Clone)]
pub(crate) struct Engine {
    options: CompilerOptions,
    formats: BTreeMap<String, FormatCheck>,
    store: Arc<SchemaStore>,
}

impl Engine {
    pub(crate) fn store(&self) -> &SchemaStore {
        &self.store
    }

    pub(crate) fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub(crate) fn build(&self, schema: &Value) -> Result<Validator, CompileError> {
        let mut builder = jsonschema::options();
        if schema.get("$schema").is_none() {
            builder.with_draft(self.options.default_draft.into());
        }
        builder
            .should_validate_formats(self.options.validate_formats)
            .should_ignore_unknown_formats(!self.options.strict)
            .with_retriever(StoreRetriever {
                store: Arc::clone(&self.store),
            });
        for (name, check) in &self.formats {
            let check = Arc::clone(check);
            builder.with_format(name.clone(), move |value: &str| check(value));
        }
        builder
            .build(&engine_document(schema))
            .map_err(|e| CompileError(e.to_string()))
    }
}

/// Copy of `doc` safe to hand to the engine.
///
/// Relative and fragment-only `$id`s (`#/schemas/Foo.json`) are identifiers
/// in the store, not base URIs, so they are dropped at every level.
pub(crate) fn engine_document(doc: &Value) -> Value {
    let mut doc = doc.clone();
    strip_relative_ids(&mut doc);
    doc
}

fn strip_relative_ids(node: &mut Value) {
    match node {
        Value::Object(map) => {
            let relative = matches!(
                map.get("$id").and_then(Value::as_str).map(SchemaId::new),
                Some(Ok(ref id)) if !id.is_absolute_uri()
            );
            if relative {
                map.remove("$id");
            }
            for child in map.values_mut() {
                strip_relative_ids(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_relative_ids),
        _ => {}
    }
}

/// Formats registered on every compiler in addition to the engine's own.
fn baseline_formats() -> BTreeMap<String, FormatCheck> {
    let mut formats: BTreeMap<String, FormatCheck> = BTreeMap::new();
    formats.insert("uuid".into(), Arc::new(is_uuid));
    formats.insert("int32".into(), Arc::new(|s| s.parse::<i32>().is_ok()));
    formats.insert("int64".into(), Arc::new(|s| s.parse::<i64>().is_ok()));
    formats.insert("float".into(), Arc::new(|s| s.parse::<f32>().is_ok()));
    formats.insert("double".into(), Arc::new(|s| s.parse::<f64>().is_ok()));
    formats.insert("byte".into(), Arc::new(is_base64));
    formats.insert("binary".into(), Arc::new(|_| true));
    formats.insert("password".into(), Arc::new(|_| true));
    formats
}

fn is_uuid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_base64(value: &str) -> bool {
    let trimmed = value.trim_end_matches('=');
    value.len() % 4 == 0
        && value.len() - trimmed.len() <= 2
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/')
}

/// Compiles schema documents into [`CompiledValidator`]s.
///
/// Holds the document store; every validator it produces resolves `$ref`s
/// against a snapshot of the store taken at compile time.
#[derive(Clone)]
pub struct SchemaCompiler {
    engine: Engine,
}

impl fmt::Debug for SchemaCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCompiler")
            .field("options", &self.engine.options)
            .field("formats", &self.engine.formats.keys().collect::<Vec<_>>())
            .field("documents", &self.engine.store.len())
            .finish()
    }
}

impl Default for SchemaCompiler {
    fn default() -> Self {
        Self::new(CompilerOptions::default())
    }
}

impl SchemaCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            engine: Engine {
                options,
                formats: baseline_formats(),
                store: Arc::new(SchemaStore::new()),
            },
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.engine.options
    }

    /// Registers a named format predicate, replacing any previous one.
    pub fn add_format<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.engine.formats.insert(name.into(), Arc::new(check));
    }

    /// Stores `doc` under `key`, replacing any document with the same key.
    pub fn add_document(&mut self, key: &SchemaId, doc: Value) {
        Arc::make_mut(&mut self.engine.store).insert(key.to_string(), doc);
    }

    pub fn document(&self, id: &str) -> Option<&Value> {
        self.engine.store.get(id)
    }

    pub fn document_ids(&self) -> impl Iterator<Item = &str> {
        self.engine.store.keys().map(String::as_str)
    }

    pub fn document_count(&self) -> usize {
        self.engine.store.len()
    }

    /// Compiles `doc`. `id` names the validator in logs and lookups.
    pub fn compile(
        &self,
        id: Option<SchemaId>,
        doc: &Value,
    ) -> Result<CompiledValidator, CompileError> {
        let engine = self.engine.build(doc)?;
        tracing::debug!(
            schema_id = id.as_ref().map(SchemaId::as_str).unwrap_or("<anonymous>"),
            "compiled schema"
        );
        Ok(CompiledValidator {
            id,
            schema: Arc::new(doc.clone()),
            engine,
            normalizer: Normalizer::new(self.engine.clone()),
            last_failures: Mutex::new(Vec::new()),
        })
    }
}

/// A compiled schema, ready to validate instances.
///
/// Shared as `Arc<CompiledValidator>`; all methods take `&self`.
pub struct CompiledValidator {
    id: Option<SchemaId>,
    schema: Arc<Value>,
    engine: Validator,
    normalizer: Normalizer,
    last_failures: Mutex<Vec<ValidationFailure>>,
}

impl fmt::Debug for CompiledValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledValidator")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl CompiledValidator {
    pub fn id(&self) -> Option<&SchemaId> {
        self.id.as_ref()
    }

    /// The document this validator was compiled from.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Normalizes `instance` in place, then validates it.
    ///
    /// On failure returns every failure found, or only the first when
    /// `all_errors` is off.
    pub fn check(&self, instance: &mut Value) -> Result<(), Vec<ValidationFailure>> {
        self.normalizer.apply(&self.schema, instance);
        let mut failures = self.engine.iter_errors(instance).map(ValidationFailure::from);
        let failures: Vec<ValidationFailure> = if self.normalizer.all_errors() {
            failures.collect()
        } else {
            failures.next().into_iter().collect()
        };
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    /// Like [`check`](Self::check), but records the failures of this call
    /// for [`last_failures`](Self::last_failures) and returns only validity.
    pub fn validate(&self, instance: &mut Value) -> bool {
        let outcome = self.check(instance);
        let mut last = self.last_failures.lock();
        match outcome {
            Ok(()) => {
                last.clear();
                true
            }
            Err(failures) => {
                *last = failures;
                false
            }
        }
    }

    /// Failures recorded by the most recent [`validate`](Self::validate) call.
    pub fn last_failures(&self) -> Vec<ValidationFailure> {
        self.last_failures.lock().clone()
    }

    /// Validates without normalizing or recording anything.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.engine.is_valid(instance)
    }
}
