//! End-to-end generation: options in, schema files out.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::error::GenerationError;
use crate::generator::SchemaGenerator;
use crate::options::GenerationOptions;
use crate::program::SourceProgram;
use crate::sources::resolve_sources;

/// One schema file written by [`generate_schemas`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSchema {
    pub type_name: String,
    pub id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub written: Vec<GeneratedSchema>,
}

impl GenerationReport {
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.written.iter().map(|schema| &schema.path)
    }
}

/// Generates and writes one schema per requested type.
///
/// Configuration is checked before any file is read. Types are processed in
/// the order given; the first failure aborts the call, leaving files already
/// written in place.
pub fn generate_schemas(options: &GenerationOptions) -> Result<GenerationReport, GenerationError> {
    if options.type_names.is_empty() {
        return Err(GenerationError::MissingTypeNames);
    }
    let files = resolve_sources(options)?;
    let program = SourceProgram::from_files(&files)?;
    let generator = SchemaGenerator::new(&program, options.into());

    std::fs::create_dir_all(&options.output_directory)
        .map_err(|e| GenerationError::io(&options.output_directory, e))?;

    let mut report = GenerationReport::default();
    for type_name in &options.type_names {
        let id = options.schema_id(type_name);
        let schema = render_schema(&generator, options, type_name)?;
        let path = options.schema_path(type_name);

        let mut text = serde_json::to_string_pretty(&schema).map_err(|source| {
            GenerationError::Serialize {
                type_name: type_name.clone(),
                source,
            }
        })?;
        text.push('\n');
        std::fs::write(&path, text).map_err(|e| GenerationError::io(&path, e))?;

        tracing::info!(type_name = %type_name, id = %id, path = %path.display(), "wrote schema");
        report.written.push(GeneratedSchema {
            type_name: type_name.clone(),
            id,
            path,
        });
    }
    Ok(report)
}

/// The finished document for `type_name`: generated, stamped with its `$id`,
/// and relaxed when enabled.
pub fn render_schema(
    generator: &SchemaGenerator<'_>,
    options: &GenerationOptions,
    type_name: &str,
) -> Result<Value, GenerationError> {
    let mut schema = generator.schema_for(type_name)?;
    if let Value::Object(map) = &mut schema {
        map.insert("$id".into(), Value::String(options.schema_id(type_name)));
    }
    if options.relax_record_like_schemas {
        vkit_schema::relax_record_schemas(&mut schema);
    }
    Ok(schema)
}
