//! # Check — Validate a JSON document against a registered schema.
//!
//! ```bash
//! vkit check --schemas src/schemas --id '#/schemas/NextStepRequest.json' request.json
//! ```
//!
//! Valid documents are printed after normalization (coercion, defaults,
//! stripped properties). Invalid ones print the 400 body a middleware would
//! return and exit with status 1.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use vkit_core::Section;
use vkit_schema::{bad_request, BadRequestBody, CompilerOptions, ValidatorRegistry};

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CheckArgs {
    /// Directory of `*.json` schema documents to register.
    #[arg(long, value_name = "DIR")]
    pub schemas: PathBuf,

    /// Identifier of the schema to validate against.
    #[arg(long, value_name = "SCHEMA_ID")]
    pub id: String,

    /// JSON document to validate.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// TOML file of compiler options (camelCase keys).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Section named in the error body.
    #[arg(long, default_value = "body")]
    pub section: Section,
}

/// Result of checking one document.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// The normalized document.
    Valid(Value),
    Invalid(BadRequestBody),
}

/// Reads compiler options from a TOML file, or the defaults when absent.
pub fn load_options(path: Option<&Path>) -> Result<CompilerOptions> {
    let Some(path) = path else {
        return Ok(CompilerOptions::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

/// Validates `document` against the schema registered as `id`.
pub fn check_document(
    registry: &mut ValidatorRegistry,
    id: &str,
    section: Section,
    mut document: Value,
) -> Result<CheckOutcome> {
    let validator = registry.get_by_id(id)?;
    Ok(match validator.check(&mut document) {
        Ok(()) => CheckOutcome::Valid(document),
        Err(failures) => CheckOutcome::Invalid(bad_request(section, &failures)),
    })
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let options = load_options(args.config.as_deref())?;
    let mut registry = ValidatorRegistry::with_options(options);
    let loaded = registry
        .load_dir(&args.schemas)
        .with_context(|| format!("failed to load schemas from {}", args.schemas.display()))?;
    tracing::debug!(count = loaded.len(), "registered schemas");

    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let document: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))?;

    match check_document(&mut registry, &args.id, args.section, document)? {
        CheckOutcome::Valid(normalized) => {
            println!("{}", serde_json::to_string_pretty(&normalized)?);
            Ok(0)
        }
        CheckOutcome::Invalid(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vkit_schema::{Coercion, RemoveAdditional};

    const PING_ID: &str = "#/schemas/Ping.json";

    fn write_schema(dir: &Path) {
        let schema = json!({
            "$id": PING_ID,
            "type": "object",
            "properties": {"seq": {"type": "integer"}},
            "required": ["seq"],
            "additionalProperties": false
        });
        std::fs::write(dir.join("Ping.schema.json"), schema.to_string()).unwrap();
    }

    fn args(dir: &Path, document: &str) -> CheckArgs {
        let file = dir.join("doc.json");
        std::fs::write(&file, document).unwrap();
        CheckArgs {
            schemas: dir.to_path_buf(),
            id: PING_ID.into(),
            file,
            config: None,
            section: Section::Body,
        }
    }

    #[test]
    fn valid_document_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(dir.path());
        let args = args(dir.path(), r#"{"seq": 4}"#);
        assert_eq!(run_check(&args).unwrap(), 0);
    }

    #[test]
    fn invalid_document_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(dir.path());
        let args = args(dir.path(), r#"{"other": 1}"#);
        assert_eq!(run_check(&args).unwrap(), 1);
    }

    #[test]
    fn unknown_id_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(dir.path());
        let mut args = args(dir.path(), "{}");
        args.id = "#/schemas/Missing.json".into();
        assert!(run_check(&args).is_err());
    }

    #[test]
    fn check_document_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(dir.path());
        let mut registry = ValidatorRegistry::new();
        registry.load_dir(dir.path()).unwrap();

        let outcome =
            check_document(&mut registry, PING_ID, Section::Body, json!({"seq": "5", "x": 1}))
                .unwrap();
        assert_eq!(outcome, CheckOutcome::Valid(json!({"seq": 5})));

        let outcome =
            check_document(&mut registry, PING_ID, Section::Query, json!({})).unwrap();
        let CheckOutcome::Invalid(body) = outcome else {
            panic!("expected invalid outcome");
        };
        assert_eq!(body.error, "Invalid query");
        assert_eq!(body.details[0].code, "required");
    }

    #[test]
    fn options_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vkit.toml");
        std::fs::write(&path, "coerceTypes = \"off\"\nremoveAdditional = \"off\"\n").unwrap();
        let options = load_options(Some(&path)).unwrap();
        assert_eq!(options.coerce_types, Coercion::Off);
        assert_eq!(options.remove_additional, RemoveAdditional::Off);
        assert!(options.all_errors);

        assert_eq!(load_options(None).unwrap(), CompilerOptions::default());
    }

    #[test]
    fn config_disables_coercion() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(dir.path());
        let config = dir.path().join("vkit.toml");
        std::fs::write(&config, "coerceTypes = \"off\"\n").unwrap();
        let mut args = args(dir.path(), r#"{"seq": "5"}"#);
        args.config = Some(config);
        assert_eq!(run_check(&args).unwrap(), 1);
    }
}
