//! Edit and read-only field trees derived from a schema and a record.
//!
//! Both paths drop unset deprecated fields at every nesting level and skip
//! hidden fields. The edit path takes the session's live hidden-field list;
//! the read path recomputes it from the record unless told to trust the
//! persisted list.

mod edit;
mod readonly;
pub mod text;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{FieldConfig, FieldsConfig};
use crate::form::{ChangeHandler, EntityRef};
use crate::options::EngineOptions;
use crate::path::FieldPath;
use crate::registry::FieldRegistry;
use crate::validation::ValidationReport;
use crate::visibility::{self, HiddenFields};

pub use edit::render_edit_fields;
pub use readonly::{ReadonlyFields, render_readonly_fields};

/// Shared inputs of one rendering pass.
#[derive(Clone, Copy)]
pub struct RenderScope<'a> {
    pub record: &'a Value,
    pub hidden: &'a HiddenFields,
    pub registry: &'a FieldRegistry,
    pub options: &'a EngineOptions,
    pub errors: Option<&'a ValidationReport>,
}

/// Marker shown next to fields that carry authorization metadata or are
/// deprecated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldIndicator {
    pub deprecated: bool,
    pub authorization_group_uuids: Vec<String>,
}

impl FieldIndicator {
    pub(crate) fn for_field(config: &FieldConfig) -> Option<Self> {
        if !config.deprecated && !config.is_sensitive() {
            return None;
        }
        Some(Self {
            deprecated: config.deprecated,
            authorization_group_uuids: config.authorization_group_uuids.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EditNode {
    pub key: String,
    pub name: FieldPath,
    pub label: String,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub tooltip_text: Option<String>,
    pub indicator: Option<FieldIndicator>,
    pub errors: Vec<String>,
    pub control: EditControl,
    pub on_change: ChangeHandler,
}

#[derive(Debug, Clone)]
pub enum EditControl {
    TextInput {
        value: String,
        multiline: bool,
    },
    NumberInput {
        value: String,
    },
    DateInput {
        value: Option<Value>,
        with_time: bool,
    },
    JsonInput {
        text: String,
    },
    GeoLocation {
        lat: Option<f64>,
        lng: Option<f64>,
        displayed: String,
        format: String,
    },
    RadioGroup {
        options: Vec<ChoiceOption>,
        selected: Option<String>,
    },
    CheckboxGroup {
        options: Vec<ChoiceOption>,
        selected: Vec<String>,
    },
    ArrayOfObjects {
        add: AddHandle,
        items: Vec<ObjectItem>,
    },
    Widget {
        widget: String,
        output: String,
    },
    EntityPicker {
        types: Vec<String>,
        multi: bool,
        selected: Vec<EntityRef>,
    },
    /// Placeholder for a field type without an edit component.
    Missing {
        message: String,
    },
}

/// Appends a structurally complete default object to `array`.
#[derive(Debug, Clone, PartialEq)]
pub struct AddHandle {
    pub array: FieldPath,
    pub label: String,
    pub default_object: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveHandle {
    pub array: FieldPath,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct ObjectItem {
    pub index: usize,
    pub title: String,
    pub remove: RemoveHandle,
    pub fields: Vec<EditNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadonlyNode {
    pub key: String,
    pub name: FieldPath,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator: Option<FieldIndicator>,
    pub value: ReadonlyValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "camelCase")]
pub enum ReadonlyValue {
    Text(String),
    Date(String),
    Json(String),
    Geo {
        displayed: String,
        lat: Option<f64>,
        lng: Option<f64>,
    },
    Badges(Vec<ChoiceOption>),
    Group(Vec<ReadonlyGroup>),
    Widget {
        widget: String,
        output: String,
    },
    EntityLinks(Vec<EntityLink>),
    /// Placeholder for a field type without a read-only component.
    Missing {
        message: String,
    },
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadonlyGroup {
    pub index: usize,
    pub title: String,
    pub fields: ReadonlyFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityLink {
    pub entity_type: String,
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// Where the read path takes its hidden-field list from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HiddenSource {
    /// Re-evaluate `visibleWhen` against the record.
    #[default]
    Live,
    /// Trust the list persisted in the record.
    Persisted,
}

/// Renders the editable field tree of the custom-field region.
pub fn render_edit(
    fields: &FieldsConfig,
    record: &Value,
    hidden: &HiddenFields,
    registry: &FieldRegistry,
    options: &EngineOptions,
    errors: Option<&ValidationReport>,
) -> Vec<EditNode> {
    let scope = RenderScope {
        record,
        hidden,
        registry,
        options,
        errors,
    };
    render_edit_fields(&scope, fields, &options.parent_path())
}

/// Renders the read-only field tree of the custom-field region.
pub fn render_readonly(
    fields: &FieldsConfig,
    record: &Value,
    registry: &FieldRegistry,
    options: &EngineOptions,
    source: HiddenSource,
) -> ReadonlyFields {
    let parent = options.parent_path();
    let hidden = match source {
        HiddenSource::Live => visibility::evaluate(fields, &parent, record, false),
        HiddenSource::Persisted => HiddenFields::persisted(record, options),
    };
    let scope = RenderScope {
        record,
        hidden: &hidden,
        registry,
        options,
        errors: None,
    };
    render_readonly_fields(&scope, fields, &parent)
}

pub(crate) fn choice_options(
    choices: &indexmap::IndexMap<String, crate::domain::Choice>,
) -> Vec<ChoiceOption> {
    choices
        .iter()
        .map(|(value, choice)| ChoiceOption {
            value: value.clone(),
            label: choice.label.clone().unwrap_or_else(|| value.clone()),
            color: choice.color.clone(),
        })
        .collect()
}

pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
