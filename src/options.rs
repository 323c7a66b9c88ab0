use std::{sync::Arc, time::Duration};

use crate::form::{CoordinateFormat, LatLngFormat};
use crate::path::FieldPath;

pub const DEFAULT_CUSTOM_FIELDS_PARENT: &str = "formCustomFields";
pub const SENSITIVE_CUSTOM_FIELDS_PARENT: &str = "formSensitiveFields";
pub const INVISIBLE_CUSTOM_FIELDS_FIELD: &str = "invisibleCustomFields";

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Top-level record key holding the custom-field values.
    pub parent_field: String,
    /// Top-level record key holding the sensitive custom-field values.
    pub sensitive_parent_field: String,
    /// Key, inside the parent, of the persisted hidden-field list.
    pub invisible_field: String,
    pub validation_debounce: Duration,
    /// `chrono` format strings used by read-only date and datetime fields.
    pub date_format: String,
    pub datetime_format: String,
    pub(crate) coordinates: Arc<dyn CoordinateFormat>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            parent_field: DEFAULT_CUSTOM_FIELDS_PARENT.to_string(),
            sensitive_parent_field: SENSITIVE_CUSTOM_FIELDS_PARENT.to_string(),
            invisible_field: INVISIBLE_CUSTOM_FIELDS_FIELD.to_string(),
            validation_debounce: Duration::from_millis(400),
            date_format: "%d %B %Y".to_string(),
            datetime_format: "%d %B %Y @ %H:%M".to_string(),
            coordinates: Arc::new(LatLngFormat::default()),
        }
    }
}

impl EngineOptions {
    pub fn with_parent_field(mut self, parent: impl Into<String>) -> Self {
        self.parent_field = parent.into();
        self
    }

    pub fn with_sensitive_parent_field(mut self, parent: impl Into<String>) -> Self {
        self.sensitive_parent_field = parent.into();
        self
    }

    pub fn with_invisible_field(mut self, key: impl Into<String>) -> Self {
        self.invisible_field = key.into();
        self
    }

    pub fn with_validation_debounce(mut self, delay: Duration) -> Self {
        self.validation_debounce = delay;
        self
    }

    pub fn with_date_formats(
        mut self,
        date_format: impl Into<String>,
        datetime_format: impl Into<String>,
    ) -> Self {
        self.date_format = date_format.into();
        self.datetime_format = datetime_format.into();
        self
    }

    pub fn with_coordinate_format(mut self, format: impl CoordinateFormat + 'static) -> Self {
        self.coordinates = Arc::new(format);
        self
    }

    pub fn coordinates(&self) -> &dyn CoordinateFormat {
        self.coordinates.as_ref()
    }

    pub fn parent_path(&self) -> FieldPath {
        FieldPath::parse(&self.parent_field)
    }

    pub fn sensitive_parent_path(&self) -> FieldPath {
        FieldPath::parse(&self.sensitive_parent_field)
    }

    pub fn invisible_fields_path(&self) -> FieldPath {
        self.parent_path().child(self.invisible_field.as_str())
    }
}
