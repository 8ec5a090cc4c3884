//! Errors raised while generating schemas.

use std::path::PathBuf;

/// Generation failures, grouped as configuration, program, type, and I/O errors.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("at least one type name is required")]
    MissingTypeNames,

    #[error("either type source globs or a project manifest is required")]
    MissingSources,

    #[error("invalid manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    /// The source program could not be built: a file is unreadable or malformed,
    /// or no file matched.
    #[error("generator could not be constructed: {path}: {reason}")]
    ProgramUnavailable { path: PathBuf, reason: String },

    #[error("type not found: {0}")]
    UnknownType(String),

    #[error("unsupported type `{ty}` in {context}")]
    UnsupportedType { context: String, ty: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize schema for {type_name}: {source}")]
    Serialize {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GenerationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported(context: impl Into<String>, ty: impl Into<String>) -> Self {
        Self::UnsupportedType {
            context: context.into(),
            ty: ty.into(),
        }
    }
}
