use thiserror::Error;

use crate::path::InvalidPathError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidPath(#[from] InvalidPathError),
    #[error("no custom field is configured at '{path}'")]
    UnknownField { path: String },
    #[error("'{path}' is not {expected} field")]
    WrongFieldKind { path: String, expected: &'static str },
    #[error("'{path}' does not hold an array")]
    NotAnArray { path: String },
    #[error("failed to build the validation schema: {0}")]
    ValidationSchema(String),
    #[error("failed to encode custom fields: {0}")]
    Encode(#[from] serde_json::Error),
}
