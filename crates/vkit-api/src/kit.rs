//! # Request Validator
//!
//! The factory that turns schemas into [`ValidationLayer`]s. It owns the
//! validator registry, so schemas registered here are visible to every
//! layer it builds.
//!
//! ```ignore
//! let mut validator = RequestValidator::new();
//! validator.load_dir("src/schemas")?;
//! let app = Router::new().route(
//!     "/next-step",
//!     post(next_step).layer(validator.validate_body("#/schemas/NextStepRequest.json")?),
//! );
//! ```

use std::path::Path;

use serde_json::Value;
use vkit_core::{SchemaId, Section};
use vkit_schema::{CompilerOptions, RegistryError, ValidatorRegistry};

use crate::layer::{ValidationLayer, DEFAULT_BODY_LIMIT};

/// Where a layer's schema comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    /// A registered identifier, resolved through the registry.
    Id(String),
    /// An inline document. One carrying `$id` is registered and cached.
    Document(Value),
}

impl From<&str> for SchemaSource {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for SchemaSource {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<&SchemaId> for SchemaSource {
    fn from(id: &SchemaId) -> Self {
        Self::Id(id.as_str().to_string())
    }
}

impl From<Value> for SchemaSource {
    fn from(document: Value) -> Self {
        Self::Document(document)
    }
}

#[derive(Debug, Default)]
pub struct RequestValidator {
    registry: ValidatorRegistry,
    body_limit: Option<usize>,
}

impl RequestValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Self::with_registry(ValidatorRegistry::with_options(options))
    }

    pub fn with_registry(registry: ValidatorRegistry) -> Self {
        Self {
            registry,
            body_limit: None,
        }
    }

    /// Body limit for layers built afterwards.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = Some(limit);
        self
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ValidatorRegistry {
        &mut self.registry
    }

    pub fn add_schema(&mut self, doc: Value) -> Result<SchemaId, RegistryError> {
        self.registry.add_schema(doc)
    }

    pub fn add_schemas<I>(&mut self, docs: I) -> Result<Vec<SchemaId>, RegistryError>
    where
        I: IntoIterator<Item = Value>,
    {
        self.registry.add_schemas(docs)
    }

    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<Vec<SchemaId>, RegistryError> {
        self.registry.load_dir(dir)
    }

    /// Compiles the schema now and returns a layer validating `section`.
    ///
    /// Unknown identifiers and broken schemas fail here, while routes are
    /// wired, rather than on the first request.
    pub fn validate(
        &mut self,
        section: Section,
        source: impl Into<SchemaSource>,
    ) -> Result<ValidationLayer, RegistryError> {
        let validator = match source.into() {
            SchemaSource::Id(id) => self.registry.get_by_id(&id)?,
            SchemaSource::Document(doc) => self.registry.compile(&doc)?,
        };
        tracing::debug!(
            section = %section,
            schema_id = validator.id().map(SchemaId::as_str).unwrap_or("<inline>"),
            "built validation layer"
        );
        Ok(ValidationLayer::new(section, validator)
            .body_limit(self.body_limit.unwrap_or(DEFAULT_BODY_LIMIT)))
    }

    pub fn validate_body(
        &mut self,
        source: impl Into<SchemaSource>,
    ) -> Result<ValidationLayer, RegistryError> {
        self.validate(Section::Body, source)
    }

    pub fn validate_query(
        &mut self,
        source: impl Into<SchemaSource>,
    ) -> Result<ValidationLayer, RegistryError> {
        self.validate(Section::Query, source)
    }

    pub fn validate_params(
        &mut self,
        source: impl Into<SchemaSource>,
    ) -> Result<ValidationLayer, RegistryError> {
        self.validate(Section::Params, source)
    }
}
