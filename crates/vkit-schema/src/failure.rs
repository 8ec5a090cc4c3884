//! Raw validation failures as reported by a [`CompiledValidator`](crate::CompiledValidator).

use std::fmt;

use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The keyword that failed, with the parameters problem messages need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "keyword", rename_all = "camelCase")]
pub enum FailureKeyword {
    Required { missing_property: String },
    Type { expected: Vec<String> },
    Enum { allowed: Vec<Value> },
    Other { name: String },
}

impl FailureKeyword {
    /// The JSON Schema keyword name, e.g. `required` or `maxLength`.
    pub fn name(&self) -> &str {
        match self {
            Self::Required { .. } => "required",
            Self::Type { .. } => "type",
            Self::Enum { .. } => "enum",
            Self::Other { name } => name,
        }
    }
}

/// One failed keyword at one location in the instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// JSON pointer into the instance; empty for the root.
    pub instance_path: String,
    /// JSON pointer to the failing keyword in the schema.
    pub schema_path: String,
    pub keyword: FailureKeyword,
    /// Engine-provided description.
    pub message: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.instance_path.is_empty() {
            "/"
        } else {
            &self.instance_path
        };
        write!(f, "{path}: {} ({})", self.message, self.keyword.name())
    }
}

impl From<ValidationError<'_>> for ValidationFailure {
    fn from(error: ValidationError<'_>) -> Self {
        let message = error.to_string();
        let schema_path = error.schema_path.as_str().to_string();
        let keyword = match error.kind {
            ValidationErrorKind::Required { property } => FailureKeyword::Required {
                missing_property: match property {
                    Value::String(name) => name,
                    other => other.to_string(),
                },
            },
            ValidationErrorKind::Type { kind } => FailureKeyword::Type {
                expected: match kind {
                    TypeKind::Single(t) => vec![t.to_string()],
                    TypeKind::Multiple(ts) => ts.into_iter().map(|t| t.to_string()).collect(),
                },
            },
            ValidationErrorKind::Enum { options } => FailureKeyword::Enum {
                allowed: match options {
                    Value::Array(values) => values,
                    other => vec![other],
                },
            },
            kind => FailureKeyword::Other {
                name: keyword_name(&kind, &schema_path),
            },
        };
        Self {
            instance_path: error.instance_path.as_str().to_string(),
            schema_path,
            keyword,
            message,
        }
    }
}

fn keyword_name(kind: &ValidationErrorKind, schema_path: &str) -> String {
    let name = match kind {
        ValidationErrorKind::AdditionalItems { .. } => "additionalItems",
        ValidationErrorKind::AdditionalProperties { .. } => "additionalProperties",
        ValidationErrorKind::AnyOf => "anyOf",
        ValidationErrorKind::Constant { .. } => "const",
        ValidationErrorKind::Contains => "contains",
        ValidationErrorKind::ContentEncoding { .. } | ValidationErrorKind::FromUtf8 { .. } => {
            "contentEncoding"
        }
        ValidationErrorKind::ContentMediaType { .. } => "contentMediaType",
        ValidationErrorKind::ExclusiveMaximum { .. } => "exclusiveMaximum",
        ValidationErrorKind::ExclusiveMinimum { .. } => "exclusiveMinimum",
        ValidationErrorKind::FalseSchema => "false",
        ValidationErrorKind::Format { .. } => "format",
        ValidationErrorKind::MaxItems { .. } => "maxItems",
        ValidationErrorKind::Maximum { .. } => "maximum",
        ValidationErrorKind::MaxLength { .. } => "maxLength",
        ValidationErrorKind::MaxProperties { .. } => "maxProperties",
        ValidationErrorKind::MinItems { .. } => "minItems",
        ValidationErrorKind::Minimum { .. } => "minimum",
        ValidationErrorKind::MinLength { .. } => "minLength",
        ValidationErrorKind::MinProperties { .. } => "minProperties",
        ValidationErrorKind::MultipleOf { .. } => "multipleOf",
        ValidationErrorKind::Not { .. } => "not",
        ValidationErrorKind::OneOfMultipleValid | ValidationErrorKind::OneOfNotValid => "oneOf",
        ValidationErrorKind::Pattern { .. } | ValidationErrorKind::BacktrackLimitExceeded { .. } => {
            "pattern"
        }
        ValidationErrorKind::PropertyNames { .. } => "propertyNames",
        ValidationErrorKind::UnevaluatedItems { .. } => "unevaluatedItems",
        ValidationErrorKind::UnevaluatedProperties { .. } => "unevaluatedProperties",
        ValidationErrorKind::UniqueItems => "uniqueItems",
        ValidationErrorKind::Referencing(_) => "$ref",
        ValidationErrorKind::Required { .. } => "required",
        ValidationErrorKind::Type { .. } => "type",
        ValidationErrorKind::Enum { .. } => "enum",
        ValidationErrorKind::Custom { .. } => {
            return schema_path
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or("custom")
                .to_string()
        }
    };
    name.to_string()
}
