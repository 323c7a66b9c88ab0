#![deny(rust_2018_idioms)]
//! Schema-driven custom fields.
//!
//! A [`FieldsConfig`](domain::FieldsConfig) describes the extra fields an
//! entity carries. From it and a record the engine derives which fields are
//! hidden (`visibleWhen`), renders edit and read-only field trees through a
//! pluggable component registry, validates the custom-field region and
//! encodes it for saving.

pub mod authorization;
pub mod domain;
pub mod error;
pub mod filter;
pub mod form;
pub mod io;
pub mod options;
pub mod path;
pub mod predicate;
pub mod registry;
pub mod render;
pub mod serialize;
pub mod validation;
pub mod visibility;

pub use error::EngineError;

pub mod prelude {
    pub use crate::authorization::{Actor, AuthorizationPolicy, authorized_fields, sensitive_fields};
    pub use crate::domain::{FieldConfig, FieldKind, FieldTag, FieldsConfig, SchemaError};
    pub use crate::error::EngineError;
    pub use crate::form::{ChangeHandler, EntityRef, FormSession, GeoEdit, RawInput};
    pub use crate::io::{DocumentFormat, load_fields_config_str, parse_document_str};
    pub use crate::options::EngineOptions;
    pub use crate::path::{FieldPath, InvalidPathError};
    pub use crate::registry::FieldRegistry;
    pub use crate::render::{HiddenSource, render_edit, render_readonly};
    pub use crate::serialize::{
        SensitiveFieldRecord, custom_fields_json, hydrate_custom_fields, parse_sensitive_fields,
        reshape_sensitive_fields,
    };
    pub use crate::validation::{FormValidator, ValidationReport};
    pub use crate::visibility::{HiddenFields, refresh_invisible_fields, with_initial_invisible_fields};
}
