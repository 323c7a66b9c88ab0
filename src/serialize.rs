//! Save-time encoding of the custom-field regions of a record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::options::EngineOptions;
use crate::path::{self, FieldPath};
use crate::visibility::HiddenFields;

/// Record key of the stored custom-field text blob.
pub const CUSTOM_FIELDS_BLOB: &str = "customFields";

/// Encodes the custom-field region of `record` for saving.
///
/// Values at the paths of the persisted hidden-field list are stripped
/// first: object members are dropped, array elements become `null`. The
/// bookkeeping list itself stays unless `for_note_text` is set. Returns
/// `None` when the record has no custom-field region.
pub fn custom_fields_json(
    record: &Value,
    for_note_text: bool,
    options: &EngineOptions,
) -> Result<Option<String>, EngineError> {
    let parent = options.parent_path();
    let Some(Value::Object(region)) = path::get(record, &parent).value() else {
        return Ok(None);
    };

    let hidden = HiddenFields::persisted(record, options);
    let mut region = Value::Object(region.clone());
    for hidden_path in &hidden {
        let Some(relative) = relative_to(hidden_path, &parent) else {
            continue;
        };
        path::remove_in_place(&mut region, &relative);
    }
    if for_note_text {
        if let Value::Object(map) = &mut region {
            map.shift_remove(&options.invisible_field);
        }
    }
    tracing::debug!(stripped = hidden.len(), for_note_text, "serialized custom fields");
    Ok(Some(serde_json::to_string(&region)?))
}

fn relative_to(full: &FieldPath, parent: &FieldPath) -> Option<FieldPath> {
    if !full.starts_with(parent) || full.len() == parent.len() {
        return None;
    }
    Some(FieldPath::from_segments(
        full.segments()[parent.len()..].iter().cloned(),
    ))
}

/// One sensitive custom field as stored in its own access-controlled row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveFieldRecord {
    #[serde(rename = "customFieldName")]
    pub field_name: String,
    /// JSON text of a single-key object `{field_name: value}`.
    #[serde(rename = "customFieldValue")]
    pub field_value: String,
    #[serde(rename = "uuid", default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

/// Turns the sensitive-field region (`key -> value`) into one record per
/// field, reusing the row id of the matching entry of `existing`.
pub fn reshape_sensitive_fields(
    record: &Value,
    existing: &[SensitiveFieldRecord],
    options: &EngineOptions,
) -> Result<Vec<SensitiveFieldRecord>, EngineError> {
    let Some(Value::Object(region)) = path::get(record, &options.sensitive_parent_path()).value()
    else {
        return Ok(Vec::new());
    };

    let mut reshaped = Vec::with_capacity(region.len());
    for (key, value) in region {
        let mut single = Map::new();
        single.insert(key.clone(), value.clone());
        reshaped.push(SensitiveFieldRecord {
            field_name: key.clone(),
            field_value: serde_json::to_string(&Value::Object(single))?,
            record_id: existing
                .iter()
                .find(|row| row.field_name == *key)
                .and_then(|row| row.record_id.clone()),
        });
    }
    Ok(reshaped)
}

/// Merges loaded sensitive-field rows back into one `key -> value` object.
/// Rows whose value does not decode to an object are skipped.
pub fn parse_sensitive_fields(records: &[SensitiveFieldRecord]) -> Value {
    let mut merged = Map::new();
    for row in records {
        match serde_json::from_str::<Value>(&row.field_value) {
            Ok(Value::Object(fields)) => merged.extend(fields),
            Ok(_) => {
                tracing::warn!(field = %row.field_name, "sensitive field value is not an object");
            }
            Err(err) => {
                tracing::warn!(field = %row.field_name, error = %err, "undecodable sensitive field value");
            }
        }
    }
    Value::Object(merged)
}

/// Returns a copy of `record` whose custom-field region is decoded from the
/// stored `customFields` text blob. An empty or invalid blob yields `{}`.
pub fn hydrate_custom_fields(
    record: &Value,
    options: &EngineOptions,
) -> Result<Value, EngineError> {
    let blob = record
        .get(CUSTOM_FIELDS_BLOB)
        .and_then(Value::as_str)
        .unwrap_or_default();
    let region = if blob.trim().is_empty() {
        Value::Object(Map::new())
    } else {
        match serde_json::from_str::<Value>(blob) {
            Ok(Value::Object(map)) => Value::Object(map),
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring undecodable custom field blob");
                Value::Object(Map::new())
            }
        }
    };

    let mut hydrated = record.clone();
    let parent = options.parent_path();
    if let Some(container) = parent.parent() {
        path::ensure_object(&mut hydrated, &container)?;
    }
    path::set_in_place(&mut hydrated, &parent, region)?;
    Ok(hydrated)
}
