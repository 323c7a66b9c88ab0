use serde_json::Value;

use super::widget::WidgetProps;
use super::{EditComponent, FieldContext, missing_widget_message};
use crate::domain::FieldKind;
use crate::form::geo::{coordinate, display_coordinate};
use crate::form::{Coercion, EntityRef, ValidationTrigger};
use crate::render::{
    AddHandle, EditControl, ObjectItem, RemoveHandle, choice_options, render_edit_fields,
    value_to_text,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct TextComponent;

impl EditComponent for TextComponent {
    fn render_edit(&self, ctx: &FieldContext<'_>) -> EditControl {
        let multiline = ["textArea", "multiline"].iter().any(|flag| {
            ctx.config
                .extra
                .get(*flag)
                .and_then(Value::as_bool)
                .unwrap_or(false)
        });
        EditControl::TextInput {
            value: ctx.value.map(value_to_text).unwrap_or_default(),
            multiline,
        }
    }

    fn coercion(&self) -> Coercion {
        Coercion::Text
    }

    fn validation_trigger(&self) -> ValidationTrigger {
        ValidationTrigger::Debounced
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberComponent;

impl EditComponent for NumberComponent {
    fn render_edit(&self, ctx: &FieldContext<'_>) -> EditControl {
        EditControl::NumberInput {
            value: ctx.value.map(value_to_text).unwrap_or_default(),
        }
    }

    fn coercion(&self) -> Coercion {
        Coercion::Number
    }

    fn validation_trigger(&self) -> ValidationTrigger {
        ValidationTrigger::Debounced
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DateComponent {
    pub with_time: bool,
}

impl EditComponent for DateComponent {
    fn render_edit(&self, ctx: &FieldContext<'_>) -> EditControl {
        EditControl::DateInput {
            value: ctx.value.filter(|value| !value.is_null()).cloned(),
            with_time: self.with_time,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonComponent;

impl EditComponent for JsonComponent {
    fn render_edit(&self, ctx: &FieldContext<'_>) -> EditControl {
        let text = match ctx.value {
            None | Some(Value::Null) => String::new(),
            // unparsable input is stored as typed
            Some(Value::String(raw)) => raw.clone(),
            Some(other) => serde_json::to_string_pretty(other).unwrap_or_default(),
        };
        EditControl::JsonInput { text }
    }

    fn coercion(&self) -> Coercion {
        Coercion::Json
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeoLocationComponent;

impl EditComponent for GeoLocationComponent {
    fn render_edit(&self, ctx: &FieldContext<'_>) -> EditControl {
        let format = ctx.scope.options.coordinates();
        let value = ctx.value.cloned().unwrap_or(Value::Null);
        EditControl::GeoLocation {
            lat: coordinate(value.get("lat")),
            lng: coordinate(value.get("lng")),
            displayed: display_coordinate(&value, format).unwrap_or_default(),
            format: format.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnumComponent;

impl EditComponent for EnumComponent {
    fn render_edit(&self, ctx: &FieldContext<'_>) -> EditControl {
        let options = match &ctx.config.kind {
            FieldKind::Enum { choices } | FieldKind::EnumSet { choices } => choice_options(choices),
            _ => Vec::new(),
        };
        EditControl::RadioGroup {
            options,
            selected: ctx
                .value
                .and_then(Value::as_str)
                .filter(|selected| !selected.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnumSetComponent;

impl EditComponent for EnumSetComponent {
    fn render_edit(&self, ctx: &FieldContext<'_>) -> EditControl {
        let options = match &ctx.config.kind {
            FieldKind::Enum { choices } | FieldKind::EnumSet { choices } => choice_options(choices),
            _ => Vec::new(),
        };
        let selected = match ctx.value {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        EditControl::CheckboxGroup { options, selected }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayOfObjectsComponent;

impl EditComponent for ArrayOfObjectsComponent {
    fn render_edit(&self, ctx: &FieldContext<'_>) -> EditControl {
        let Some(object) = ctx.config.kind.object_fields() else {
            return EditControl::Missing {
                message: format!("{} has no object fields", ctx.name),
            };
        };
        let len = match ctx.value {
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        };
        let items = (0..len)
            .map(|index| {
                let element = ctx.name.index(index);
                ObjectItem {
                    index,
                    title: object.item_label(index),
                    remove: RemoveHandle {
                        array: ctx.name.clone(),
                        index,
                    },
                    fields: render_edit_fields(ctx.scope, &object.fields, &element),
                }
            })
            .collect();
        EditControl::ArrayOfObjects {
            add: AddHandle {
                array: ctx.name.clone(),
                label: object.add_label().to_string(),
                default_object: object.fields.default_object(),
            },
            items,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpecialFieldComponent;

impl EditComponent for SpecialFieldComponent {
    fn render_edit(&self, ctx: &FieldContext<'_>) -> EditControl {
        render_widget(ctx, true).unwrap_or_else(|message| EditControl::Missing { message })
    }
}

pub(super) fn widget_output(ctx: &FieldContext<'_>, editable: bool) -> Result<(String, String), String> {
    let FieldKind::SpecialField { widget } = &ctx.config.kind else {
        return Err(missing_widget_message(None));
    };
    let name = widget.as_deref();
    let Some(implementation) = name.and_then(|name| ctx.scope.registry.widget(name)) else {
        tracing::warn!(field = %ctx.name, widget = ?name, "no widget registered");
        return Err(missing_widget_message(name));
    };
    let output = implementation.render(&WidgetProps {
        name: ctx.name,
        value: ctx.value,
        editable,
        config: ctx.config,
    });
    Ok((name.unwrap_or_default().to_string(), output))
}

fn render_widget(ctx: &FieldContext<'_>, editable: bool) -> Result<EditControl, String> {
    let (widget, output) = widget_output(ctx, editable)?;
    Ok(EditControl::Widget { widget, output })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnetObjectComponent {
    pub multi: bool,
}

impl EditComponent for AnetObjectComponent {
    fn render_edit(&self, ctx: &FieldContext<'_>) -> EditControl {
        let types = match &ctx.config.kind {
            FieldKind::AnetObject { types } | FieldKind::ArrayOfAnetObjects { types } => {
                types.clone()
            }
            _ => Vec::new(),
        };
        EditControl::EntityPicker {
            types,
            multi: self.multi,
            selected: selected_entities(ctx.value),
        }
    }
}

pub(super) fn selected_entities(value: Option<&Value>) -> Vec<EntityRef> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(EntityRef::from_value).collect(),
        Some(single) => EntityRef::from_value(single).into_iter().collect(),
        None => Vec::new(),
    }
}
