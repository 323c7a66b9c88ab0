//! Form-wide validation.
//!
//! The custom-field configuration is compiled into a JSON Schema once per
//! session. Validation hints (`{type, params}`) become schema keywords and
//! each keyword remembers the message to show when it fails. Checks that
//! span several values (geo coordinates, empty rich text) run as a second
//! pass over the record.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use jsonschema::Validator;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::domain::{FieldConfig, FieldKind, FieldsConfig, ValidationHint};
use crate::error::EngineError;
use crate::form::geo::{LATITUDE_ERROR, LONGITUDE_ERROR, coordinate};
use crate::options::EngineOptions;
use crate::path::{self, FieldPath};
use crate::visibility::HiddenFields;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const URL_PATTERN: &str = r"^(https?|ftp)://[^\s/$.?#][^\s]*$";
const RICH_TEXT_EDITOR: &str = "richTextEditor";

/// Validation messages keyed by the dotted path of the offending value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationReport {
    errors: IndexMap<FieldPath, Vec<String>>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self, path: &FieldPath) -> &[String] {
        self.errors.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, FieldPath, Vec<String>> {
        self.errors.iter()
    }

    pub fn push(&mut self, path: FieldPath, message: impl Into<String>) {
        let message = message.into();
        let messages = self.errors.entry(path).or_default();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    /// Moves errors of later siblings down one index after an element of
    /// `array` was removed; errors of the removed element are dropped.
    pub fn reindex_after_removal(&mut self, array: &FieldPath, removed: usize) {
        let errors = std::mem::take(&mut self.errors);
        for (path, messages) in errors {
            if let Some(moved) = path.reindex_after_removal(array, removed) {
                self.errors.entry(moved).or_default().extend(messages);
            }
        }
    }
}

#[derive(Clone)]
pub struct FormValidator {
    fields: FieldsConfig,
    parent: FieldPath,
    schema: Value,
    validator: Arc<Validator>,
    messages: HashMap<String, String>,
    html_tags: Regex,
    options: EngineOptions,
}

impl fmt::Debug for FormValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormValidator")
            .field("parent", &self.parent)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl FormValidator {
    pub fn new(fields: &FieldsConfig, options: &EngineOptions) -> Result<Self, EngineError> {
        let mut builder = SchemaBuilder::default();
        let schema = builder.object_schema(fields, "");
        let validator = jsonschema::validator_for(&schema)
            .map_err(|err| EngineError::ValidationSchema(err.to_string()))?;
        let html_tags = Regex::new(r"<[^>]*>|&nbsp;")
            .map_err(|err| EngineError::ValidationSchema(err.to_string()))?;
        Ok(Self {
            fields: fields.clone(),
            parent: options.parent_path(),
            schema,
            validator: Arc::new(validator),
            messages: builder.messages,
            html_tags,
            options: options.clone(),
        })
    }

    /// The derived JSON Schema of the custom-field region.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validates the custom-field region of `record`. Values that are hidden,
    /// or live below a hidden path, are not validated.
    pub fn validate(&self, record: &Value, hidden: &HiddenFields) -> ValidationReport {
        let mut region = path::get(record, &self.parent)
            .value()
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        fill_defaults(&self.fields, &mut region);

        let mut report = ValidationReport::default();
        for error in self.validator.iter_errors(&region) {
            let instance = error.instance_path.to_string();
            let field = pointer_to_path(&self.parent, &instance);
            if hidden.covers(&field) {
                continue;
            }
            let schema_path = error.schema_path.to_string();
            let message = self
                .messages
                .get(&schema_path)
                .cloned()
                .unwrap_or_else(|| error.to_string());
            report.push(field, message);
        }

        self.cross_checks(&self.fields, &region, &self.parent, hidden, &mut report);
        tracing::debug!(errors = report.len(), "validated custom fields");
        report
    }

    fn cross_checks(
        &self,
        fields: &FieldsConfig,
        values: &Value,
        parent: &FieldPath,
        hidden: &HiddenFields,
        report: &mut ValidationReport,
    ) {
        for (key, config) in fields {
            let field = parent.child(key.as_str());
            if hidden.covers(&field) {
                continue;
            }
            let value = values.get(key.as_str());
            match &config.kind {
                FieldKind::GeoLocation => {
                    if let Some(geo @ Value::Object(_)) = value {
                        self.check_geo(geo, &field, report);
                    }
                }
                FieldKind::ArrayOfObjects(object) => {
                    if let Some(Value::Array(items)) = value {
                        for (index, item) in items.iter().enumerate() {
                            self.cross_checks(
                                &object.fields,
                                item,
                                &field.index(index),
                                hidden,
                                report,
                            );
                        }
                    }
                }
                FieldKind::SpecialField { widget } if widget.as_deref() == Some(RICH_TEXT_EDITOR) => {
                    if let Some(hint) = config.validations.iter().find(|hint| hint.kind == "required")
                    {
                        let html = value.and_then(Value::as_str).unwrap_or_default();
                        if self.html_tags.replace_all(html, "").trim().is_empty() {
                            report.push(field, message_param(hint, 0).unwrap_or_default());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn check_geo(&self, geo: &Value, field: &FieldPath, report: &mut ValidationReport) {
        let lat = coordinate(geo.get("lat"));
        let lng = coordinate(geo.get("lng"));
        if lng.is_some() && lat.is_none() {
            report.push(field.child("lat"), "Please enter latitude");
        }
        if lat.is_some() && lng.is_none() {
            report.push(field.child("lng"), "Please enter longitude");
        }
        let displayed = geo
            .get("displayedCoordinate")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let format = self.options.coordinates();
        if !displayed.trim().is_empty() && format.parse(displayed).is_none() {
            report.push(
                field.child("displayedCoordinate"),
                format!("Please enter a valid {} coordinate", format.name()),
            );
        }
    }
}

/// Fills every missing field, at every nesting level, with its type default.
pub(crate) fn fill_defaults(fields: &FieldsConfig, values: &mut Value) {
    let Value::Object(map) = values else {
        return;
    };
    for (key, config) in fields {
        let value = map
            .entry(key.clone())
            .or_insert_with(|| config.kind.default_value());
        if let (Some(nested), Value::Array(items)) = (config.object_fields(), value) {
            for item in items.iter_mut() {
                fill_defaults(nested, item);
            }
        }
    }
}

fn pointer_to_path(parent: &FieldPath, pointer: &str) -> FieldPath {
    let mut segments: Vec<String> = parent.segments().to_vec();
    segments.extend(
        pointer
            .split('/')
            .skip(1)
            .map(|segment| segment.replace("~1", "/").replace("~0", "~")),
    );
    FieldPath::from_segments(segments)
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn message_param(hint: &ValidationHint, index: usize) -> Option<String> {
    match hint.params.get(index)? {
        Value::String(message) => Some(message.clone()),
        Value::Object(options) => options
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    String,
    Number,
    Array,
    Other,
}

impl Category {
    fn of(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Text | FieldKind::Enum { .. } => Category::String,
            FieldKind::Number => Category::Number,
            FieldKind::EnumSet { .. }
            | FieldKind::ArrayOfObjects(_)
            | FieldKind::ArrayOfAnetObjects { .. } => Category::Array,
            _ => Category::Other,
        }
    }
}

#[derive(Debug, Default)]
struct SchemaBuilder {
    messages: HashMap<String, String>,
}

impl SchemaBuilder {
    fn object_schema(&mut self, fields: &FieldsConfig, pointer: &str) -> Value {
        let mut properties = Map::new();
        for (key, config) in fields {
            let field_pointer = format!("{pointer}/properties/{}", escape_pointer(key));
            properties.insert(key.clone(), self.field_schema(key, config, &field_pointer));
        }
        json!({"type": "object", "properties": properties})
    }

    fn field_schema(&mut self, key: &str, config: &FieldConfig, pointer: &str) -> Value {
        let label = config.display_label(key);
        let mut schema = Map::new();

        let type_name = match &config.kind {
            FieldKind::Text | FieldKind::Enum { .. } => Some(("string", json!(["string", "null"]))),
            FieldKind::Number => Some(("number", json!(["number", "null"]))),
            FieldKind::Date | FieldKind::DateTime => {
                Some(("date", json!(["string", "number", "null"])))
            }
            FieldKind::Json => Some(("json", json!(["object", "array", "null"]))),
            FieldKind::GeoLocation => Some(("object", json!(["object", "null"]))),
            FieldKind::EnumSet { .. }
            | FieldKind::ArrayOfObjects(_)
            | FieldKind::ArrayOfAnetObjects { .. } => Some(("array", json!(["array", "null"]))),
            FieldKind::SpecialField { .. } | FieldKind::AnetObject { .. } | FieldKind::Unknown(_) => {
                None
            }
        };
        if let Some((name, types)) = type_name {
            schema.insert("type".into(), types);
            let message = match (&config.type_error, name) {
                (Some(custom), _) => custom.clone(),
                (None, "json") => "Invalid JSON".to_string(),
                (None, name) => format!("{label} must be a `{name}` type"),
            };
            self.message(pointer, "type", message);
        }

        match &config.kind {
            FieldKind::GeoLocation => {
                let mut properties = Map::new();
                for (axis, bound, error) in [("lat", 90, LATITUDE_ERROR), ("lng", 180, LONGITUDE_ERROR)] {
                    let axis_pointer = format!("{pointer}/properties/{axis}");
                    for keyword in ["type", "minimum", "maximum"] {
                        self.message(&axis_pointer, keyword, error.to_string());
                    }
                    properties.insert(
                        axis.to_string(),
                        json!({"type": ["number", "null"], "minimum": -bound, "maximum": bound}),
                    );
                }
                schema.insert("properties".into(), Value::Object(properties));
            }
            FieldKind::ArrayOfObjects(object) => {
                let items = self.object_schema(&object.fields, &format!("{pointer}/items"));
                schema.insert("items".into(), items);
            }
            _ => {}
        }

        let category = Category::of(&config.kind);
        let mut patterns = Vec::new();
        for hint in &config.validations {
            self.apply_hint(hint, category, label, pointer, &mut schema, &mut patterns);
        }
        if !patterns.is_empty() {
            let mut all_of = Vec::with_capacity(patterns.len());
            for (index, (pattern, message)) in patterns.into_iter().enumerate() {
                self.message(&format!("{pointer}/allOf/{index}"), "pattern", message);
                all_of.push(json!({"pattern": pattern}));
            }
            schema.insert("allOf".into(), Value::Array(all_of));
        }

        Value::Object(schema)
    }

    fn apply_hint(
        &mut self,
        hint: &ValidationHint,
        category: Category,
        label: &str,
        pointer: &str,
        schema: &mut Map<String, Value>,
        patterns: &mut Vec<(String, String)>,
    ) {
        let limit = hint.params.first().filter(|value| value.is_number()).cloned();
        // bounded hints take the message second, flag hints take it first
        let bounded = |fallback: String| message_param(hint, 1).unwrap_or(fallback);
        let flag = |fallback: String| message_param(hint, 0).unwrap_or(fallback);

        let keywords: Vec<(&str, Value, String)> = match (hint.kind.as_str(), category, limit) {
            ("required", _, _) => {
                let forbidden = if category == Category::String {
                    json!([null, ""])
                } else {
                    json!([null])
                };
                vec![(
                    "not",
                    json!({"enum": forbidden}),
                    flag(format!("{label} is a required field")),
                )]
            }
            ("min", Category::String, Some(n)) => {
                let message = bounded(format!("{label} must be at least {n} characters"));
                vec![("minLength", n, message)]
            }
            ("max", Category::String, Some(n)) => {
                let message = bounded(format!("{label} must be at most {n} characters"));
                vec![("maxLength", n, message)]
            }
            ("length", Category::String, Some(n)) => {
                let message = bounded(format!("{label} must be exactly {n} characters"));
                vec![("minLength", n.clone(), message.clone()), ("maxLength", n, message)]
            }
            ("min", Category::Number, Some(n)) => {
                let message = bounded(format!("{label} must be greater than or equal to {n}"));
                vec![("minimum", n, message)]
            }
            ("max", Category::Number, Some(n)) => {
                let message = bounded(format!("{label} must be less than or equal to {n}"));
                vec![("maximum", n, message)]
            }
            ("moreThan", Category::Number, Some(n)) => {
                let message = bounded(format!("{label} must be greater than {n}"));
                vec![("exclusiveMinimum", n, message)]
            }
            ("lessThan", Category::Number, Some(n)) => {
                let message = bounded(format!("{label} must be less than {n}"));
                vec![("exclusiveMaximum", n, message)]
            }
            ("min", Category::Array, Some(n)) => {
                let message = bounded(format!("{label} field must have at least {n} items"));
                vec![("minItems", n, message)]
            }
            ("max", Category::Array, Some(n)) => {
                let message =
                    bounded(format!("{label} field must have less than or equal to {n} items"));
                vec![("maxItems", n, message)]
            }
            ("length", Category::Array, Some(n)) => {
                let message = bounded(format!("{label} must have {n} items"));
                vec![("minItems", n.clone(), message.clone()), ("maxItems", n, message)]
            }
            ("positive", Category::Number, _) => vec![(
                "exclusiveMinimum",
                json!(0),
                flag(format!("{label} must be a positive number")),
            )],
            ("negative", Category::Number, _) => vec![(
                "exclusiveMaximum",
                json!(0),
                flag(format!("{label} must be a negative number")),
            )],
            ("integer", Category::Number, _) => vec![(
                "multipleOf",
                json!(1),
                flag(format!("{label} must be an integer")),
            )],
            ("matches", Category::String, _) => {
                let Some(pattern) = hint.params.first().and_then(Value::as_str) else {
                    tracing::warn!(field = label, "matches validation without a pattern ignored");
                    return;
                };
                if let Err(err) = Regex::new(pattern) {
                    tracing::warn!(field = label, %err, "invalid matches pattern ignored");
                    return;
                }
                let message = bounded(format!("{label} must match the following: \"{pattern}\""));
                patterns.push((pattern.to_string(), message));
                Vec::new()
            }
            ("email", Category::String, _) => {
                let message = flag(format!("{label} must be a valid email"));
                patterns.push((EMAIL_PATTERN.to_string(), message));
                Vec::new()
            }
            ("url", Category::String, _) => {
                let message = flag(format!("{label} must be a valid URL"));
                patterns.push((URL_PATTERN.to_string(), message));
                Vec::new()
            }
            (other, _, _) => {
                tracing::warn!(field = label, validation = other, "unsupported validation ignored");
                Vec::new()
            }
        };

        for (keyword, value, message) in keywords {
            schema.insert(keyword.to_string(), value);
            self.message(pointer, keyword, message);
        }
    }

    fn message(&mut self, pointer: &str, keyword: &str, message: String) {
        self.messages.insert(format!("{pointer}/{keyword}"), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report_for(config: Value, region: Value) -> ValidationReport {
        let fields = FieldsConfig::from_value(&config).unwrap();
        let options = EngineOptions::default();
        let validator = FormValidator::new(&fields, &options).unwrap();
        let record = json!({"formCustomFields": region});
        validator.validate(&record, &HiddenFields::new())
    }

    fn messages(report: &ValidationReport, path: &str) -> Vec<String> {
        report.messages(&FieldPath::parse(path)).to_vec()
    }

    #[test]
    fn required_rejects_empty_text_and_null() {
        let config = json!({
            "name": {"type": "text", "label": "Name", "validations": [{"type": "required", "params": ["Name please"]}]},
            "count": {"type": "number", "validations": [{"type": "required"}]}
        });
        let report = report_for(config, json!({"name": ""}));
        assert_eq!(messages(&report, "formCustomFields.name"), vec!["Name please"]);
        assert_eq!(
            messages(&report, "formCustomFields.count"),
            vec!["count is a required field"]
        );
    }

    #[test]
    fn min_and_max_follow_the_field_category() {
        let config = json!({
            "code": {"type": "text", "validations": [{"type": "min", "params": [3, "Too short"]}]},
            "age": {"type": "number", "label": "Age", "validations": [{"type": "max", "params": [120]}]},
            "tags": {"type": "enumset", "validations": [{"type": "min", "params": [1]}]}
        });
        let report = report_for(config, json!({"code": "ab", "age": 130, "tags": []}));
        assert_eq!(messages(&report, "formCustomFields.code"), vec!["Too short"]);
        assert_eq!(
            messages(&report, "formCustomFields.age"),
            vec!["Age must be less than or equal to 120"]
        );
        assert_eq!(
            messages(&report, "formCustomFields.tags"),
            vec!["tags field must have at least 1 items"]
        );
    }

    #[test]
    fn type_errors_use_custom_messages() {
        let config = json!({
            "n": {"type": "number", "typeError": "Numbers only"},
            "j": {"type": "json"}
        });
        let report = report_for(config, json!({"n": "abc", "j": "{oops"}));
        assert_eq!(messages(&report, "formCustomFields.n"), vec!["Numbers only"]);
        assert_eq!(messages(&report, "formCustomFields.j"), vec!["Invalid JSON"]);
    }

    #[test]
    fn patterns_and_unsupported_hints() {
        let config = json!({
            "mail": {"type": "text", "validations": [{"type": "email"}, {"type": "trim"}]},
            "zip": {"type": "text", "validations": [{"type": "matches", "params": ["^[0-9]{5}$", "Five digits"]}]}
        });
        let report = report_for(config, json!({"mail": "nope", "zip": "12a"}));
        assert_eq!(
            messages(&report, "formCustomFields.mail"),
            vec!["mail must be a valid email"]
        );
        assert_eq!(messages(&report, "formCustomFields.zip"), vec!["Five digits"]);
    }

    #[test]
    fn nested_array_errors_are_reported_per_element() {
        let config = json!({
            "rows": {"type": "array_of_objects", "objectFields": {
                "x": {"type": "number", "validations": [{"type": "positive"}]}
            }}
        });
        let report = report_for(config, json!({"rows": [{"x": 1}, {"x": -1}]}));
        assert_eq!(report.len(), 1);
        assert_eq!(
            messages(&report, "formCustomFields.rows.1.x"),
            vec!["x must be a positive number"]
        );
    }

    #[test]
    fn hidden_fields_are_not_validated() {
        let fields = FieldsConfig::from_value(&json!({
            "a": {"type": "text", "validations": [{"type": "required"}]}
        }))
        .unwrap();
        let validator = FormValidator::new(&fields, &EngineOptions::default()).unwrap();
        let hidden: HiddenFields = [FieldPath::parse("formCustomFields.a")].into_iter().collect();
        let report = validator.validate(&json!({"formCustomFields": {}}), &hidden);
        assert!(report.is_valid());
    }

    #[test]
    fn geo_cross_checks() {
        let config = json!({"where": {"type": "geo_location"}});
        let report = report_for(config.clone(), json!({"where": {"lat": 10, "lng": null}}));
        assert_eq!(
            messages(&report, "formCustomFields.where.lng"),
            vec!["Please enter longitude"]
        );
        let report = report_for(config.clone(), json!({"where": {"lat": 95, "lng": 0}}));
        assert_eq!(messages(&report, "formCustomFields.where.lat"), vec![LATITUDE_ERROR]);
        let report = report_for(
            config,
            json!({"where": {"lat": null, "lng": null, "displayedCoordinate": "nowhere"}}),
        );
        assert_eq!(
            messages(&report, "formCustomFields.where.displayedCoordinate"),
            vec!["Please enter a valid LAT_LON coordinate"]
        );
    }

    #[test]
    fn empty_rich_text_fails_required() {
        let config = json!({
            "body": {"type": "special_field", "widget": "richTextEditor",
                     "validations": [{"type": "required", "params": ["Write something"]}]}
        });
        let report = report_for(config.clone(), json!({"body": "<p> </p>"}));
        assert_eq!(messages(&report, "formCustomFields.body"), vec!["Write something"]);
        let report = report_for(config, json!({"body": "<p>hi</p>"}));
        assert!(report.is_valid());
    }

    #[test]
    fn removal_reindexes_errors() {
        let mut report = ValidationReport::default();
        report.push(FieldPath::parse("f.rows.0.x"), "a");
        report.push(FieldPath::parse("f.rows.2.x"), "b");
        report.reindex_after_removal(&FieldPath::parse("f.rows"), 0);
        assert!(report.messages(&FieldPath::parse("f.rows.0.x")).is_empty());
        assert_eq!(report.messages(&FieldPath::parse("f.rows.1.x")), ["b".to_string()]);
    }
}
