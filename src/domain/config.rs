use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::SchemaError;
use super::raw::RawFieldConfig;
use crate::predicate::{JsonPathLanguage, Predicate, PredicateLanguage};

/// Registry key of the built-in field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldTag {
    Text,
    Number,
    Date,
    DateTime,
    Json,
    GeoLocation,
    Enum,
    EnumSet,
    ArrayOfObjects,
    SpecialField,
    AnetObject,
    ArrayOfAnetObjects,
}

impl FieldTag {
    pub const ALL: [FieldTag; 12] = [
        FieldTag::Text,
        FieldTag::Number,
        FieldTag::Date,
        FieldTag::DateTime,
        FieldTag::Json,
        FieldTag::GeoLocation,
        FieldTag::Enum,
        FieldTag::EnumSet,
        FieldTag::ArrayOfObjects,
        FieldTag::SpecialField,
        FieldTag::AnetObject,
        FieldTag::ArrayOfAnetObjects,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldTag::Text => "text",
            FieldTag::Number => "number",
            FieldTag::Date => "date",
            FieldTag::DateTime => "datetime",
            FieldTag::Json => "json",
            FieldTag::GeoLocation => "geo_location",
            FieldTag::Enum => "enum",
            FieldTag::EnumSet => "enumset",
            FieldTag::ArrayOfObjects => "array_of_objects",
            FieldTag::SpecialField => "special_field",
            FieldTag::AnetObject => "anet_object",
            FieldTag::ArrayOfAnetObjects => "array_of_anet_objects",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_str() == name)
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Choice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// One `{type, params}` validation entry attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationHint {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct ObjectFields {
    pub fields: FieldsConfig,
    pub object_label: Option<String>,
    pub add_button_label: Option<String>,
}

impl ObjectFields {
    pub fn item_label(&self, index: usize) -> String {
        let label = self.object_label.as_deref().unwrap_or("item");
        format!("{} {}", upper_first(label), index + 1)
    }

    pub fn add_label(&self) -> &str {
        self.add_button_label.as_deref().unwrap_or("Add a new item")
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    DateTime,
    Json,
    GeoLocation,
    Enum { choices: IndexMap<String, Choice> },
    EnumSet { choices: IndexMap<String, Choice> },
    ArrayOfObjects(ObjectFields),
    SpecialField { widget: Option<String> },
    AnetObject { types: Vec<String> },
    ArrayOfAnetObjects { types: Vec<String> },
    /// A type tag this engine has no implementation for.
    Unknown(String),
}

impl FieldKind {
    pub fn tag(&self) -> Option<FieldTag> {
        Some(match self {
            FieldKind::Text => FieldTag::Text,
            FieldKind::Number => FieldTag::Number,
            FieldKind::Date => FieldTag::Date,
            FieldKind::DateTime => FieldTag::DateTime,
            FieldKind::Json => FieldTag::Json,
            FieldKind::GeoLocation => FieldTag::GeoLocation,
            FieldKind::Enum { .. } => FieldTag::Enum,
            FieldKind::EnumSet { .. } => FieldTag::EnumSet,
            FieldKind::ArrayOfObjects(_) => FieldTag::ArrayOfObjects,
            FieldKind::SpecialField { .. } => FieldTag::SpecialField,
            FieldKind::AnetObject { .. } => FieldTag::AnetObject,
            FieldKind::ArrayOfAnetObjects { .. } => FieldTag::ArrayOfAnetObjects,
            FieldKind::Unknown(_) => return None,
        })
    }

    pub fn type_name(&self) -> &str {
        match self {
            FieldKind::Unknown(name) => name,
            other => other.tag().map(FieldTag::as_str).unwrap_or_default(),
        }
    }

    /// Value a freshly created field of this kind starts with.
    pub fn default_value(&self) -> Value {
        match self {
            FieldKind::Text | FieldKind::Enum { .. } => Value::String(String::new()),
            FieldKind::GeoLocation => Value::Object(Map::new()),
            FieldKind::EnumSet { .. }
            | FieldKind::ArrayOfObjects(_)
            | FieldKind::ArrayOfAnetObjects { .. } => Value::Array(Vec::new()),
            FieldKind::Number
            | FieldKind::Date
            | FieldKind::DateTime
            | FieldKind::Json
            | FieldKind::SpecialField { .. }
            | FieldKind::AnetObject { .. }
            | FieldKind::Unknown(_) => Value::Null,
        }
    }

    pub fn object_fields(&self) -> Option<&ObjectFields> {
        match self {
            FieldKind::ArrayOfObjects(object) => Some(object),
            _ => None,
        }
    }
}

/// A compiled `visibleWhen` expression.
#[derive(Clone)]
pub struct Condition {
    predicate: Arc<dyn Predicate>,
}

impl Condition {
    pub fn new(predicate: Arc<dyn Predicate>) -> Self {
        Self { predicate }
    }

    pub fn holds(&self, record: &Value) -> bool {
        self.predicate.evaluate(record)
    }

    pub fn source(&self) -> &str {
        self.predicate.source()
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Condition").field(&self.source()).finish()
    }
}

#[derive(Debug, Clone)]
pub struct FieldConfig {
    pub kind: FieldKind,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub tooltip_text: Option<String>,
    pub visible_when: Option<Condition>,
    pub deprecated: bool,
    pub authorization_group_uuids: Option<Vec<String>>,
    pub validations: Vec<ValidationHint>,
    pub type_error: Option<String>,
    /// Properties this engine does not interpret, passed through to widgets.
    pub extra: IndexMap<String, Value>,
}

impl FieldConfig {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            label: None,
            placeholder: None,
            help_text: None,
            tooltip_text: None,
            visible_when: None,
            deprecated: false,
            authorization_group_uuids: None,
            validations: Vec::new(),
            type_error: None,
            extra: IndexMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_visible_when(mut self, condition: Condition) -> Self {
        self.visible_when = Some(condition);
        self
    }

    pub fn with_validation(mut self, hint: ValidationHint) -> Self {
        self.validations.push(hint);
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn tag(&self) -> Option<FieldTag> {
        self.kind.tag()
    }

    /// Whether access to this field is governed by authorization groups.
    pub fn is_sensitive(&self) -> bool {
        self.authorization_group_uuids.is_some()
    }

    pub fn display_label<'a>(&'a self, key: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(key)
    }

    pub fn object_fields(&self) -> Option<&FieldsConfig> {
        self.kind.object_fields().map(|object| &object.fields)
    }

    fn from_raw(
        path: &str,
        raw: RawFieldConfig,
        language: &dyn PredicateLanguage,
    ) -> Result<Self, SchemaError> {
        let tag = FieldTag::from_wire(&raw.field_type);
        if raw.object_fields.is_some() && tag != Some(FieldTag::ArrayOfObjects) {
            return Err(SchemaError::UnexpectedObjectFields {
                path: path.to_string(),
                field_type: raw.field_type,
            });
        }

        let kind = match tag {
            Some(FieldTag::Text) => FieldKind::Text,
            Some(FieldTag::Number) => FieldKind::Number,
            Some(FieldTag::Date) => FieldKind::Date,
            Some(FieldTag::DateTime) => FieldKind::DateTime,
            Some(FieldTag::Json) => FieldKind::Json,
            Some(FieldTag::GeoLocation) => FieldKind::GeoLocation,
            Some(FieldTag::Enum) => FieldKind::Enum {
                choices: raw.choices.unwrap_or_default(),
            },
            Some(FieldTag::EnumSet) => FieldKind::EnumSet {
                choices: raw.choices.unwrap_or_default(),
            },
            Some(FieldTag::ArrayOfObjects) => {
                let Some(nested) = raw.object_fields else {
                    return Err(SchemaError::MissingObjectFields {
                        path: path.to_string(),
                    });
                };
                FieldKind::ArrayOfObjects(ObjectFields {
                    fields: FieldsConfig::from_raw(path, nested, language)?,
                    object_label: raw.object_label,
                    add_button_label: raw.add_button_label,
                })
            }
            Some(FieldTag::SpecialField) => FieldKind::SpecialField { widget: raw.widget },
            Some(FieldTag::AnetObject) => FieldKind::AnetObject {
                types: raw.types.unwrap_or_default(),
            },
            Some(FieldTag::ArrayOfAnetObjects) => FieldKind::ArrayOfAnetObjects {
                types: raw.types.unwrap_or_default(),
            },
            None => {
                tracing::warn!(field = path, field_type = %raw.field_type, "unknown custom field type");
                FieldKind::Unknown(raw.field_type)
            }
        };

        let visible_when = raw
            .visible_when
            .filter(|source| !source.trim().is_empty())
            .map(|source| {
                language
                    .compile(&source)
                    .map(Condition::new)
                    .map_err(|source| SchemaError::Predicate {
                        path: path.to_string(),
                        source,
                    })
            })
            .transpose()?;

        Ok(Self {
            kind,
            label: raw.label,
            placeholder: raw.placeholder,
            help_text: raw.help_text,
            tooltip_text: raw.tooltip_text,
            visible_when,
            deprecated: raw.deprecated,
            authorization_group_uuids: raw.authorization_group_uuids,
            validations: raw.validations,
            type_error: raw.type_error,
            extra: raw.extra,
        })
    }
}

/// An ordered mapping of field key to field configuration.
#[derive(Debug, Clone, Default)]
pub struct FieldsConfig {
    fields: IndexMap<String, FieldConfig>,
}

impl FieldsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration document, compiling `visibleWhen` expressions
    /// with the built-in JSONPath language.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        Self::from_value_with(value, &JsonPathLanguage)
    }

    pub fn from_value_with(
        value: &Value,
        language: &dyn PredicateLanguage,
    ) -> Result<Self, SchemaError> {
        let raw: IndexMap<String, RawFieldConfig> = serde_json::from_value(value.clone())?;
        Self::from_raw("", raw, language)
    }

    fn from_raw(
        parent: &str,
        raw: IndexMap<String, RawFieldConfig>,
        language: &dyn PredicateLanguage,
    ) -> Result<Self, SchemaError> {
        let mut fields = IndexMap::with_capacity(raw.len());
        for (key, raw_field) in raw {
            let path = if parent.is_empty() {
                key.clone()
            } else {
                format!("{parent}.{key}")
            };
            let config = FieldConfig::from_raw(&path, raw_field, language)?;
            fields.insert(key, config);
        }
        Ok(Self { fields })
    }

    pub fn insert(&mut self, key: impl Into<String>, config: FieldConfig) -> Option<FieldConfig> {
        self.fields.insert(key.into(), config)
    }

    pub fn with_field(mut self, key: impl Into<String>, config: FieldConfig) -> Self {
        self.insert(key, config);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldConfig> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, FieldConfig> {
        self.fields.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, FieldConfig> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Structurally complete default object: every field set to its type's
    /// default value.
    pub fn default_object(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(key, config)| (key.clone(), config.kind.default_value()))
                .collect(),
        )
    }

    /// Resolves a dotted schema path (array indices allowed and skipped) to
    /// the field it names.
    pub fn lookup(&self, path: &str) -> Option<&FieldConfig> {
        let mut fields = self;
        let mut found = None;
        for segment in path.split('.') {
            if found.is_some() && segment.parse::<usize>().is_ok() {
                continue;
            }
            let config = fields.get(segment)?;
            found = Some(config);
            if let Some(nested) = config.object_fields() {
                fields = nested;
            }
        }
        found
    }
}

impl FromIterator<(String, FieldConfig)> for FieldsConfig {
    fn from_iter<I: IntoIterator<Item = (String, FieldConfig)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FieldsConfig {
    type Item = (&'a String, &'a FieldConfig);
    type IntoIter = indexmap::map::Iter<'a, String, FieldConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

fn upper_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_array_of_objects() {
        let fields = FieldsConfig::from_value(&json!({
            "people": {
                "type": "array_of_objects",
                "objectLabel": "person",
                "objectFields": {
                    "name": {"type": "text", "visibleWhen": "$.formCustomFields.show"},
                    "age": {"type": "number"}
                }
            }
        }))
        .unwrap();
        let people = fields.get("people").unwrap();
        let object = people.kind.object_fields().unwrap();
        assert_eq!(object.fields.len(), 2);
        assert_eq!(object.item_label(0), "Person 1");
        assert_eq!(object.add_label(), "Add a new item");
        assert!(fields.lookup("people.3.name").unwrap().visible_when.is_some());
    }

    #[test]
    fn object_fields_only_on_array_of_objects() {
        let err = FieldsConfig::from_value(&json!({
            "a": {"type": "text", "objectFields": {}}
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnexpectedObjectFields { .. }));

        let err = FieldsConfig::from_value(&json!({
            "a": {"type": "array_of_objects"}
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::MissingObjectFields { .. }));
    }

    #[test]
    fn unknown_types_are_kept_as_unknown() {
        let fields = FieldsConfig::from_value(&json!({"a": {"type": "hologram"}})).unwrap();
        let field = fields.get("a").unwrap();
        assert!(field.tag().is_none());
        assert_eq!(field.kind.type_name(), "hologram");
        assert_eq!(field.kind.default_value(), Value::Null);
    }

    #[test]
    fn reports_invalid_predicates_with_field_path() {
        let err = FieldsConfig::from_value(&json!({
            "outer": {
                "type": "array_of_objects",
                "objectFields": {"inner": {"type": "text", "visibleWhen": "$.a[?(@ ==)]"}}
            }
        }))
        .unwrap_err();
        match err {
            SchemaError::Predicate { path, .. } => assert_eq!(path, "outer.inner"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn default_object_uses_type_defaults() {
        let fields = FieldsConfig::from_value(&json!({
            "t": {"type": "text"},
            "n": {"type": "number"},
            "g": {"type": "geo_location"},
            "s": {"type": "enumset"}
        }))
        .unwrap();
        assert_eq!(
            fields.default_object(),
            json!({"t": "", "n": null, "g": {}, "s": []})
        );
    }
}
