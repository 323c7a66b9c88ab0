use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::{Choice, ValidationHint};
use super::error::SchemaError;

/// Wire shape of one field in a custom-field configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawFieldConfig {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip_text: Option<String>,
    /// JSONPath expression evaluated against the whole record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_group_uuids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<ValidationHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_error: Option<String>,
    /// Nested fields of an `array_of_objects` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_fields: Option<IndexMap<String, RawFieldConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_button_label: Option<String>,
    /// Options of `enum` and `enumset` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<IndexMap<String, Choice>>,
    /// Widget name of a `special_field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
    /// Entity types accepted by `anet_object` and `array_of_anet_objects`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// JSON Schema describing a whole configuration document
/// (field key -> field config).
pub fn config_json_schema() -> Result<Value, SchemaError> {
    let schema = schemars::schema_for!(IndexMap<String, RawFieldConfig>);
    serde_json::to_value(schema).map_err(SchemaError::EncodeSchema)
}
