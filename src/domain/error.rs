use thiserror::Error;

use crate::predicate::PredicateError;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("field '{path}' has type '{field_type}' but declares objectFields")]
    UnexpectedObjectFields { path: String, field_type: String },
    #[error("array_of_objects field '{path}' does not declare objectFields")]
    MissingObjectFields { path: String },
    #[error("field '{path}' has an invalid visibleWhen expression: {source}")]
    Predicate {
        path: String,
        #[source]
        source: PredicateError,
    },
    #[error("custom field configuration is malformed: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("failed to encode the configuration schema: {0}")]
    EncodeSchema(#[source] serde_json::Error),
}
