//! # API Error Types
//!
//! Everything the validation layer and the extractors can answer a request
//! with. Validation failures carry the client-facing 400 body; every other
//! variant renders as `{"error": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use vkit_core::Section;
use vkit_schema::{BadRequestBody, RegistryError, ValidationProblem};

#[derive(Error, Debug)]
pub enum ApiError {
    /// A section failed its schema (400).
    #[error("invalid {section}: {} problem(s)", .body.details.len())]
    Invalid {
        section: Section,
        body: BadRequestBody,
    },

    /// The body exceeded the configured limit (413).
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The body stream failed before it was fully read (400).
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// A handler asked for a section no validation layer stored (500).
    #[error("no validated {0} in request extensions")]
    MissingSection(Section),

    /// The validated value does not deserialize into the handler's type (400).
    #[error("validated {section} does not match the expected type: {reason}")]
    Deserialize { section: Section, reason: String },

    /// Schema lookup or compilation failed while wiring routes (500).
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ApiError {
    /// A 400 for a body that is not JSON, reported as one `parse` problem at the root.
    pub fn malformed_body(reason: impl std::fmt::Display) -> Self {
        Self::Invalid {
            section: Section::Body,
            body: BadRequestBody {
                error: format!("Invalid {}", Section::Body),
                details: vec![ValidationProblem {
                    message: format!("Malformed JSON: {reason}"),
                    path: "/".to_string(),
                    code: "parse".to_string(),
                }],
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Invalid { .. } | Self::BodyRead(_) | Self::Deserialize { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MissingSection(_) | Self::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Invalid { body, .. } => (status, Json(body)).into_response(),
            other => {
                if status.is_server_error() {
                    tracing::error!(error = %other, "request validation misconfigured");
                }
                let body = serde_json::json!({ "error": other.to_string() });
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_is_bad_request() {
        let err = ApiError::malformed_body("expected value at line 1 column 1");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let ApiError::Invalid { body, .. } = err else {
            panic!("expected Invalid");
        };
        assert_eq!(body.error, "Invalid body");
        assert_eq!(body.details[0].code, "parse");
        assert_eq!(body.details[0].path, "/");
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 10 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::MissingSection(Section::Query).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Deserialize {
                section: Section::Params,
                reason: "missing field `id`".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn registry_error_converts() {
        let err: ApiError = RegistryError::MissingIdentifier.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
