//! Client-facing validation problems.
//!
//! Raw failures carry engine wording and schema internals; problems carry a
//! stable message, the instance path and the failing keyword. The message
//! text for `required`, `type` and `enum` is part of the API.

use serde::{Deserialize, Serialize};
use vkit_core::Section;

use crate::failure::{FailureKeyword, ValidationFailure};

/// One client-facing validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationProblem {
    pub message: String,
    /// JSON pointer into the section, `/` for its root.
    pub path: String,
    /// The failing keyword.
    pub code: String,
}

/// The body of a 400 response for a section that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadRequestBody {
    pub error: String,
    pub details: Vec<ValidationProblem>,
}

/// Translates raw failures one-to-one, preserving order.
pub fn to_problems(failures: &[ValidationFailure]) -> Vec<ValidationProblem> {
    failures.iter().map(to_problem).collect()
}

fn to_problem(failure: &ValidationFailure) -> ValidationProblem {
    let message = match &failure.keyword {
        FailureKeyword::Required { missing_property } => {
            format!("Missing required property \"{missing_property}\"")
        }
        FailureKeyword::Type { expected } => {
            format!("Invalid type, expected {}", expected.join(","))
        }
        FailureKeyword::Enum { allowed } => {
            let allowed: Vec<String> = allowed
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            format!("Invalid value, must be one of {}", allowed.join(", "))
        }
        FailureKeyword::Other { .. } => failure.message.clone(),
    };
    let path = if failure.instance_path.is_empty() {
        "/".to_string()
    } else {
        failure.instance_path.clone()
    };
    ValidationProblem {
        message,
        path,
        code: failure.keyword.name().to_string(),
    }
}

/// Builds the 400 body for `section`.
pub fn bad_request(section: Section, failures: &[ValidationFailure]) -> BadRequestBody {
    BadRequestBody {
        error: format!("Invalid {section}"),
        details: to_problems(failures),
    }
}
