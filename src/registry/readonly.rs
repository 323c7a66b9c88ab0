use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use super::components::{selected_entities, widget_output};
use super::{FieldContext, ReadonlyComponent};
use crate::domain::FieldKind;
use crate::filter::is_unset;
use crate::form::geo::{coordinate, display_coordinate};
use crate::options::EngineOptions;
use crate::render::{
    EntityLink, ReadonlyGroup, ReadonlyValue, choice_options, render_readonly_fields,
    value_to_text,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadonlyTextComponent;

impl ReadonlyComponent for ReadonlyTextComponent {
    fn render_readonly(&self, ctx: &FieldContext<'_>) -> ReadonlyValue {
        match ctx.value {
            Some(value) if !is_unset(Some(value)) => ReadonlyValue::Text(value_to_text(value)),
            _ => ReadonlyValue::Empty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadonlyDateComponent {
    pub with_time: bool,
}

impl ReadonlyComponent for ReadonlyDateComponent {
    fn render_readonly(&self, ctx: &FieldContext<'_>) -> ReadonlyValue {
        ctx.value
            .and_then(|value| format_date(value, self.with_time, ctx.scope.options))
            .map(ReadonlyValue::Date)
            .unwrap_or(ReadonlyValue::Empty)
    }
}

/// Formats an RFC 3339 string, a `YYYY-MM-DD` string or epoch milliseconds
/// with the configured date or datetime format. Other strings are shown as
/// stored.
pub(crate) fn format_date(value: &Value, with_time: bool, options: &EngineOptions) -> Option<String> {
    let pattern = if with_time {
        &options.datetime_format
    } else {
        &options.date_format
    };
    let moment: NaiveDateTime = match value {
        Value::Number(number) => {
            DateTime::<Utc>::from_timestamp_millis(number.as_i64()?)?.naive_utc()
        }
        Value::String(text) if text.trim().is_empty() => return None,
        Value::String(text) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                parsed.with_timezone(&Utc).naive_utc()
            } else if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                date.and_hms_opt(0, 0, 0)?
            } else {
                return Some(text.clone());
            }
        }
        _ => return None,
    };
    Some(moment.format(pattern).to_string())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadonlyJsonComponent;

impl ReadonlyComponent for ReadonlyJsonComponent {
    fn render_readonly(&self, ctx: &FieldContext<'_>) -> ReadonlyValue {
        match ctx.value {
            None | Some(Value::Null) => ReadonlyValue::Empty,
            Some(Value::String(raw)) => ReadonlyValue::Json(raw.clone()),
            Some(other) => {
                ReadonlyValue::Json(serde_json::to_string_pretty(other).unwrap_or_default())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadonlyGeoLocationComponent;

impl ReadonlyComponent for ReadonlyGeoLocationComponent {
    fn render_readonly(&self, ctx: &FieldContext<'_>) -> ReadonlyValue {
        let Some(value) = ctx.value else {
            return ReadonlyValue::Empty;
        };
        let lat = coordinate(value.get("lat"));
        let lng = coordinate(value.get("lng"));
        if lat.is_none() || lng.is_none() {
            return ReadonlyValue::Empty;
        }
        ReadonlyValue::Geo {
            displayed: display_coordinate(value, ctx.scope.options.coordinates())
                .unwrap_or_default(),
            lat,
            lng,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadonlyEnumComponent;

impl ReadonlyComponent for ReadonlyEnumComponent {
    fn render_readonly(&self, ctx: &FieldContext<'_>) -> ReadonlyValue {
        let (FieldKind::Enum { choices } | FieldKind::EnumSet { choices }) = &ctx.config.kind
        else {
            return ReadonlyValue::Empty;
        };
        let selected: Vec<&str> = match ctx.value {
            Some(Value::String(one)) if !one.is_empty() => vec![one.as_str()],
            Some(Value::Array(many)) => many.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        if selected.is_empty() {
            return ReadonlyValue::Empty;
        }
        let options = choice_options(choices);
        let badges = selected
            .into_iter()
            .map(|key| {
                options
                    .iter()
                    .find(|option| option.value == key)
                    .cloned()
                    .unwrap_or_else(|| crate::render::ChoiceOption {
                        value: key.to_string(),
                        label: key.to_string(),
                        color: None,
                    })
            })
            .collect();
        ReadonlyValue::Badges(badges)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadonlyArrayOfObjectsComponent;

impl ReadonlyComponent for ReadonlyArrayOfObjectsComponent {
    fn render_readonly(&self, ctx: &FieldContext<'_>) -> ReadonlyValue {
        let Some(object) = ctx.config.kind.object_fields() else {
            return ReadonlyValue::Empty;
        };
        let Some(Value::Array(items)) = ctx.value else {
            return ReadonlyValue::Empty;
        };
        let groups = (0..items.len())
            .map(|index| ReadonlyGroup {
                index,
                title: object.item_label(index),
                fields: render_readonly_fields(ctx.scope, &object.fields, &ctx.name.index(index)),
            })
            .collect();
        ReadonlyValue::Group(groups)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadonlySpecialFieldComponent;

impl ReadonlyComponent for ReadonlySpecialFieldComponent {
    fn render_readonly(&self, ctx: &FieldContext<'_>) -> ReadonlyValue {
        match widget_output(ctx, false) {
            Ok((widget, output)) => ReadonlyValue::Widget { widget, output },
            Err(message) => ReadonlyValue::Missing { message },
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadonlyAnetObjectComponent;

impl ReadonlyComponent for ReadonlyAnetObjectComponent {
    fn render_readonly(&self, ctx: &FieldContext<'_>) -> ReadonlyValue {
        let links: Vec<EntityLink> = selected_entities(ctx.value)
            .into_iter()
            .map(|entity| EntityLink {
                href: entity.href(),
                entity_type: entity.entity_type,
                uuid: entity.uuid,
            })
            .collect();
        if links.is_empty() {
            ReadonlyValue::Empty
        } else {
            ReadonlyValue::EntityLinks(links)
        }
    }
}
