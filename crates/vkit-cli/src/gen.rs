//! # Gen — Schema generation from Rust type declarations.
//!
//! ```bash
//! vkit gen --include 'src/**/*.rs' --types NextStepRequest,TestType
//! vkit --manifest Cargo.toml --types TestType --out schemas --no-top-ref
//! ```
//!
//! `gen` is also what runs when no subcommand is given.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use vkit_gen::{generate_schemas, GenerationOptions};

/// Arguments of the `gen` subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GenArgs {
    /// Cargo.toml of the crate whose sources declare the types.
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Comma-separated glob patterns selecting the source files.
    #[arg(long, value_delimiter = ',', value_name = "GLOBS")]
    pub include: Vec<String>,

    /// Comma-separated names of the types to generate schemas for.
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub types: Vec<String>,

    /// Output directory for `<Type>.schema.json` files.
    #[arg(long, default_value = "src/schemas", value_name = "DIR")]
    pub out: PathBuf,

    /// Prefix of each schema's `$id`.
    #[arg(long, default_value = "#/schemas/", value_name = "PREFIX")]
    pub id_prefix: String,

    /// Inline the root type instead of emitting a top-level `$ref`.
    #[arg(long)]
    pub no_top_ref: bool,

    /// Allow undeclared properties on generated objects.
    #[arg(long)]
    pub extra_props: bool,

    /// Do not let `Option<T>` accept `null`.
    #[arg(long)]
    pub no_strict_null_checks: bool,

    /// Keep property-less object schemas closed.
    #[arg(long)]
    pub no_record_additional_props: bool,
}

impl GenArgs {
    /// Maps flags onto [`GenerationOptions`], rejecting missing inputs.
    pub fn to_options(&self) -> Result<GenerationOptions> {
        let types = non_empty(&self.types);
        let include = non_empty(&self.include);
        if types.is_empty() {
            bail!("--types is required");
        }
        if include.is_empty() && self.manifest.is_none() {
            bail!("either --include or --manifest is required");
        }
        Ok(GenerationOptions {
            type_names: types,
            type_sources: include,
            manifest: self.manifest.clone(),
            output_directory: self.out.clone(),
            identifier_prefix: self.id_prefix.clone(),
            top_level_reference: !self.no_top_ref,
            forbid_extra_properties: !self.extra_props,
            strict_null_checks: !self.no_strict_null_checks,
            relax_record_like_schemas: !self.no_record_additional_props,
        })
    }
}

fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Execute the gen subcommand.
pub fn run_gen(args: &GenArgs) -> Result<u8> {
    let options = args.to_options()?;
    let report = generate_schemas(&options)?;
    for schema in &report.written {
        println!("{}: {}", schema.type_name, schema.path.display());
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> GenArgs {
        GenArgs {
            manifest: None,
            include: vec!["src/**/*.rs".into()],
            types: vec!["A".into(), " B ".into(), String::new()],
            out: PathBuf::from("src/schemas"),
            id_prefix: "#/schemas/".into(),
            no_top_ref: false,
            extra_props: false,
            no_strict_null_checks: false,
            no_record_additional_props: false,
        }
    }

    #[test]
    fn defaults_map_to_enabled_options() {
        let options = args().to_options().unwrap();
        assert_eq!(options.type_names, ["A", "B"]);
        assert!(options.top_level_reference);
        assert!(options.forbid_extra_properties);
        assert!(options.strict_null_checks);
        assert!(options.relax_record_like_schemas);
    }

    #[test]
    fn toggles_negate_their_option() {
        let options = GenArgs {
            no_top_ref: true,
            extra_props: true,
            no_strict_null_checks: true,
            no_record_additional_props: true,
            ..args()
        }
        .to_options()
        .unwrap();
        assert!(!options.top_level_reference);
        assert!(!options.forbid_extra_properties);
        assert!(!options.strict_null_checks);
        assert!(!options.relax_record_like_schemas);
    }

    #[test]
    fn missing_types_rejected() {
        let err = GenArgs {
            types: Vec::new(),
            ..args()
        }
        .to_options()
        .unwrap_err();
        assert!(err.to_string().contains("--types"));
    }

    #[test]
    fn missing_sources_rejected() {
        let err = GenArgs {
            include: Vec::new(),
            ..args()
        }
        .to_options()
        .unwrap_err();
        assert!(err.to_string().contains("--include or --manifest"));

        let with_manifest = GenArgs {
            include: Vec::new(),
            manifest: Some(PathBuf::from("Cargo.toml")),
            ..args()
        };
        assert!(with_manifest.to_options().is_ok());
    }

    #[test]
    fn run_writes_schemas() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("types.rs"), "pub struct Ping { seq: u32 }").unwrap();
        let out = dir.path().join("schemas");
        let code = run_gen(&GenArgs {
            include: vec![format!("{}/*.rs", dir.path().display())],
            types: vec!["Ping".into()],
            out: out.clone(),
            ..args()
        })
        .unwrap();
        assert_eq!(code, 0);
        assert!(out.join("Ping.schema.json").is_file());
    }
}
