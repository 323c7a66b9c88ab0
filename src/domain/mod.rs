mod config;
mod error;
mod raw;

pub use config::{
    Choice, Condition, FieldConfig, FieldKind, FieldTag, FieldsConfig, ObjectFields,
    ValidationHint,
};
pub use error::SchemaError;
pub use raw::{RawFieldConfig, config_json_schema};
