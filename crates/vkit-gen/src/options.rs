//! Generation options.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Inputs to [`generate_schemas`](crate::generate_schemas).
///
/// Either `type_sources` or `manifest` must be set, and `type_names` must be
/// non-empty. Deserializes from camelCase with every field optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationOptions {
    /// Types to emit, one schema file each.
    pub type_names: Vec<String>,
    /// Glob patterns selecting `.rs` files, e.g. `src/**/*.rs`.
    pub type_sources: Vec<String>,
    /// A `Cargo.toml` whose crate sources make up the program.
    pub manifest: Option<PathBuf>,
    pub output_directory: PathBuf,
    /// Prepended to `<Type>.json` to form each schema's `$id`.
    pub identifier_prefix: String,
    /// Emit `{"$ref": "#/definitions/T"}` at the root instead of inlining `T`.
    pub top_level_reference: bool,
    /// Close every generated object with `additionalProperties: false`.
    pub forbid_extra_properties: bool,
    /// Let `Option<T>` accept `null`.
    pub strict_null_checks: bool,
    /// Reopen property-less object schemas after generation.
    pub relax_record_like_schemas: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            type_names: Vec::new(),
            type_sources: Vec::new(),
            manifest: None,
            output_directory: PathBuf::from("src/schemas"),
            identifier_prefix: "#/schemas/".to_string(),
            top_level_reference: true,
            forbid_extra_properties: true,
            strict_null_checks: true,
            relax_record_like_schemas: true,
        }
    }
}

impl GenerationOptions {
    /// The `$id` stamped on the schema for `type_name`.
    pub fn schema_id(&self, type_name: &str) -> String {
        format!("{}{type_name}.json", self.identifier_prefix)
    }

    /// Where the schema for `type_name` is written.
    pub fn schema_path(&self, type_name: &str) -> PathBuf {
        self.output_directory.join(format!("{type_name}.schema.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = GenerationOptions::default();
        assert_eq!(options.output_directory, PathBuf::from("src/schemas"));
        assert_eq!(options.identifier_prefix, "#/schemas/");
        assert!(options.top_level_reference);
        assert!(options.forbid_extra_properties);
        assert!(options.strict_null_checks);
        assert!(options.relax_record_like_schemas);
    }

    #[test]
    fn test_schema_id_and_path() {
        let options = GenerationOptions {
            output_directory: PathBuf::from("out"),
            identifier_prefix: "https://schemas.test/".into(),
            ..GenerationOptions::default()
        };
        assert_eq!(options.schema_id("User"), "https://schemas.test/User.json");
        assert_eq!(options.schema_path("User"), PathBuf::from("out/User.schema.json"));
    }

    #[test]
    fn test_deserialize_partial() {
        let options: GenerationOptions =
            serde_json::from_str(r#"{"typeNames": ["A"], "typeSources": ["src/**/*.rs"]}"#)
                .unwrap();
        assert_eq!(options.type_names, ["A"]);
        assert!(options.relax_record_like_schemas);
    }
}
