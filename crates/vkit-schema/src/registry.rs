//! # Validator Registry
//!
//! Registers schema documents by identifier and hands out compiled
//! validators, compiling each identifier at most once.
//!
//! ## Cache policy
//!
//! - Lookups by identifier compile on first request and cache the result.
//! - Registering a document evicts any cached validator for its identifier,
//!   so the next lookup sees the new document.
//! - Anonymous documents (no `$id`) are compiled fresh on every call.
//!
//! Mutating operations take `&mut self`; share a registry behind a lock or
//! build it up front and hand out the `Arc<CompiledValidator>`s it returns.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use vkit_core::SchemaId;

use crate::compiler::{CompiledValidator, CompilerOptions, SchemaCompiler};

/// Errors from registering or looking up schemas.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The identifier is unknown, or its schema did not compile.
    #[error("schema not found or failed to compile: {id}: {reason}")]
    NotFound { id: String, reason: String },

    #[error("schema document has no $id; register it with an explicit key")]
    MissingIdentifier,

    #[error("invalid schema document: {0}")]
    InvalidDocument(String),

    #[error("failed to load schema {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Schema documents plus a cache of their compiled validators.
#[derive(Debug, Default)]
pub struct ValidatorRegistry {
    compiler: SchemaCompiler,
    cache: HashMap<SchemaId, Arc<CompiledValidator>>,
}

impl ValidatorRegistry {
    /// A registry using the default compiler policies.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Self::with_compiler(SchemaCompiler::new(options))
    }

    pub fn with_compiler(compiler: SchemaCompiler) -> Self {
        Self {
            compiler,
            cache: HashMap::new(),
        }
    }

    pub fn compiler(&self) -> &SchemaCompiler {
        &self.compiler
    }

    /// Registers `doc` under its own `$id`, which it must carry.
    pub fn add_schema(&mut self, doc: Value) -> Result<SchemaId, RegistryError> {
        let id = SchemaId::of_document(&doc).ok_or(RegistryError::MissingIdentifier)?;
        self.add_schema_with_key(id.clone(), doc)?;
        Ok(id)
    }

    /// Registers `doc` under `key` regardless of its `$id`.
    pub fn add_schema_with_key(&mut self, key: SchemaId, doc: Value) -> Result<(), RegistryError> {
        if !matches!(doc, Value::Object(_) | Value::Bool(_)) {
            return Err(RegistryError::InvalidDocument(format!(
                "schema '{key}' must be an object or a boolean"
            )));
        }
        if self.cache.remove(&key).is_some() {
            tracing::debug!(schema_id = %key, "evicted cached validator");
        }
        self.compiler.add_document(&key, doc);
        tracing::debug!(schema_id = %key, "registered schema");
        Ok(())
    }

    /// Registers several documents; stops at the first one rejected.
    pub fn add_schemas<I>(&mut self, docs: I) -> Result<Vec<SchemaId>, RegistryError>
    where
        I: IntoIterator<Item = Value>,
    {
        docs.into_iter().map(|doc| self.add_schema(doc)).collect()
    }

    /// Returns the validator for `id`, compiling and caching it on first use.
    ///
    /// Falls back to compiling `{"$ref": id}` when no document is stored
    /// under exactly `id`, which resolves `id#/pointer` style references.
    pub fn get_by_id(&mut self, id: &str) -> Result<Arc<CompiledValidator>, RegistryError> {
        let key = SchemaId::new(id).map_err(|e| RegistryError::NotFound {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        if let Some(validator) = self.cache.get(&key) {
            tracing::trace!(schema_id = %key, "validator cache hit");
            return Ok(Arc::clone(validator));
        }

        let compiled = match self.compiler.document(id) {
            Some(doc) => self.compiler.compile(Some(key.clone()), doc),
            None => self
                .compiler
                .compile(Some(key.clone()), &serde_json::json!({ "$ref": id })),
        };
        let validator = compiled.map(Arc::new).map_err(|e| {
            tracing::debug!(schema_id = %key, error = %e, "schema lookup failed");
            RegistryError::NotFound {
                id: id.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.cache.insert(key, Arc::clone(&validator));
        Ok(validator)
    }

    /// Compiles `schema`.
    ///
    /// A document carrying `$id` goes through [`get_by_id`](Self::get_by_id),
    /// registering it first if the identifier is new, so repeated compiles
    /// share one cache entry. Anonymous documents are compiled uncached.
    pub fn compile(&mut self, schema: &Value) -> Result<Arc<CompiledValidator>, RegistryError> {
        match SchemaId::of_document(schema) {
            Some(id) => {
                if self.compiler.document(id.as_str()).is_none() {
                    self.add_schema_with_key(id.clone(), schema.clone())?;
                }
                self.get_by_id(id.as_str())
            }
            None => self
                .compiler
                .compile(None, schema)
                .map(Arc::new)
                .map_err(|e| RegistryError::InvalidDocument(e.to_string())),
        }
    }

    /// Registers every `*.schema.json`, `*.schema.yaml` and `*.schema.yml`
    /// file directly inside `dir`, in file-name order.
    ///
    /// Files without `$id` are keyed by their name minus the schema suffix.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<Vec<SchemaId>, RegistryError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| RegistryError::Load {
            path: dir.display().to_string(),
            reason: format!("cannot read schema directory: {e}"),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(stem) = [".schema.json", ".schema.yaml", ".schema.yml"]
                .iter()
                .find_map(|suffix| name.strip_suffix(suffix))
            {
                files.push((name.to_string(), stem.to_string(), path.clone()));
            }
        }
        files.sort();

        let mut loaded = Vec::with_capacity(files.len());
        for (name, stem, path) in files {
            let doc = read_document(&path)?;
            let key = match SchemaId::of_document(&doc) {
                Some(id) => id,
                None => SchemaId::new(stem).map_err(|e| RegistryError::Load {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?,
            };
            self.add_schema_with_key(key.clone(), doc)?;
            tracing::debug!(file = %name, schema_id = %key, "loaded schema file");
            loaded.push(key);
        }
        tracing::info!(dir = %dir.display(), count = loaded.len(), "loaded schema directory");
        Ok(loaded)
    }

    pub fn get_schema(&self, id: &str) -> Option<&Value> {
        self.compiler.document(id)
    }

    pub fn schema_count(&self) -> usize {
        self.compiler.document_count()
    }

    /// Registered identifiers, sorted.
    pub fn schema_ids(&self) -> Vec<&str> {
        self.compiler.document_ids().collect()
    }

    pub fn is_cached(&self, id: &str) -> bool {
        SchemaId::new(id).is_ok_and(|key| self.cache.contains_key(&key))
    }
}

fn read_document(path: &Path) -> Result<Value, RegistryError> {
    let load_error = |reason: String| RegistryError::Load {
        path: path.display().to_string(),
        reason,
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| load_error(format!("cannot read file: {e}")))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&content)
            .map_err(|e| load_error(format!("invalid YAML: {e}"))),
        _ => serde_json::from_str(&content).map_err(|e| load_error(format!("invalid JSON: {e}"))),
    }
}
