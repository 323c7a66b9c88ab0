//! Field type registry: one editable and one read-only implementation per
//! field type, looked up by [`FieldTag`], plus named widgets for special
//! fields.

mod components;
mod readonly;
mod widget;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::{FieldConfig, FieldKind, FieldTag};
use crate::form::{Coercion, ValidationTrigger};
use crate::path::FieldPath;
use crate::render::{EditControl, ReadonlyValue, RenderScope};

pub use components::{
    AnetObjectComponent, ArrayOfObjectsComponent, DateComponent, EnumComponent,
    EnumSetComponent, GeoLocationComponent, JsonComponent, NumberComponent,
    SpecialFieldComponent, TextComponent,
};
pub use readonly::{
    ReadonlyAnetObjectComponent, ReadonlyArrayOfObjectsComponent, ReadonlyDateComponent,
    ReadonlyEnumComponent, ReadonlyGeoLocationComponent, ReadonlyJsonComponent,
    ReadonlySpecialFieldComponent, ReadonlyTextComponent,
};
pub use widget::{Widget, WidgetProps};

/// Everything a component sees about the field it renders.
#[derive(Clone, Copy)]
pub struct FieldContext<'a> {
    pub key: &'a str,
    pub name: &'a FieldPath,
    pub config: &'a FieldConfig,
    pub value: Option<&'a Value>,
    pub scope: &'a RenderScope<'a>,
}

pub trait EditComponent: fmt::Debug + Send + Sync {
    fn render_edit(&self, ctx: &FieldContext<'_>) -> EditControl;

    fn coercion(&self) -> Coercion {
        Coercion::Passthrough
    }

    fn validation_trigger(&self) -> ValidationTrigger {
        ValidationTrigger::Immediate
    }
}

pub trait ReadonlyComponent: fmt::Debug + Send + Sync {
    fn render_readonly(&self, ctx: &FieldContext<'_>) -> ReadonlyValue;
}

#[derive(Debug, Clone)]
pub struct FieldRegistry {
    edit: HashMap<FieldTag, Arc<dyn EditComponent>>,
    readonly: HashMap<FieldTag, Arc<dyn ReadonlyComponent>>,
    widgets: HashMap<String, Arc<dyn Widget>>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::empty()
            .with_edit_component(FieldTag::Text, TextComponent)
            .with_edit_component(FieldTag::Number, NumberComponent)
            .with_edit_component(FieldTag::Date, DateComponent { with_time: false })
            .with_edit_component(FieldTag::DateTime, DateComponent { with_time: true })
            .with_edit_component(FieldTag::Json, JsonComponent)
            .with_edit_component(FieldTag::GeoLocation, GeoLocationComponent)
            .with_edit_component(FieldTag::Enum, EnumComponent)
            .with_edit_component(FieldTag::EnumSet, EnumSetComponent)
            .with_edit_component(FieldTag::ArrayOfObjects, ArrayOfObjectsComponent)
            .with_edit_component(FieldTag::SpecialField, SpecialFieldComponent)
            .with_edit_component(FieldTag::AnetObject, AnetObjectComponent { multi: false })
            .with_edit_component(
                FieldTag::ArrayOfAnetObjects,
                AnetObjectComponent { multi: true },
            )
            .with_readonly_component(FieldTag::Text, ReadonlyTextComponent)
            .with_readonly_component(FieldTag::Number, ReadonlyTextComponent)
            .with_readonly_component(FieldTag::Date, ReadonlyDateComponent { with_time: false })
            .with_readonly_component(
                FieldTag::DateTime,
                ReadonlyDateComponent { with_time: true },
            )
            .with_readonly_component(FieldTag::Json, ReadonlyJsonComponent)
            .with_readonly_component(FieldTag::GeoLocation, ReadonlyGeoLocationComponent)
            .with_readonly_component(FieldTag::Enum, ReadonlyEnumComponent)
            .with_readonly_component(FieldTag::EnumSet, ReadonlyEnumComponent)
            .with_readonly_component(FieldTag::ArrayOfObjects, ReadonlyArrayOfObjectsComponent)
            .with_readonly_component(FieldTag::SpecialField, ReadonlySpecialFieldComponent)
            .with_readonly_component(FieldTag::AnetObject, ReadonlyAnetObjectComponent)
            .with_readonly_component(FieldTag::ArrayOfAnetObjects, ReadonlyAnetObjectComponent)
    }
}

impl FieldRegistry {
    /// A registry with no components at all; every field renders as a
    /// placeholder until components are registered.
    pub fn empty() -> Self {
        Self {
            edit: HashMap::new(),
            readonly: HashMap::new(),
            widgets: HashMap::new(),
        }
    }

    pub fn with_edit_component(
        mut self,
        tag: FieldTag,
        component: impl EditComponent + 'static,
    ) -> Self {
        self.edit.insert(tag, Arc::new(component));
        self
    }

    pub fn with_readonly_component(
        mut self,
        tag: FieldTag,
        component: impl ReadonlyComponent + 'static,
    ) -> Self {
        self.readonly.insert(tag, Arc::new(component));
        self
    }

    pub fn without_edit_component(mut self, tag: FieldTag) -> Self {
        self.edit.remove(&tag);
        self
    }

    pub fn without_readonly_component(mut self, tag: FieldTag) -> Self {
        self.readonly.remove(&tag);
        self
    }

    pub fn with_widget(mut self, name: impl Into<String>, widget: impl Widget + 'static) -> Self {
        self.widgets.insert(name.into(), Arc::new(widget));
        self
    }

    pub fn edit_component(&self, kind: &FieldKind) -> Option<&dyn EditComponent> {
        kind.tag()
            .and_then(|tag| self.edit.get(&tag))
            .map(|component| component.as_ref())
    }

    pub fn readonly_component(&self, kind: &FieldKind) -> Option<&dyn ReadonlyComponent> {
        kind.tag()
            .and_then(|tag| self.readonly.get(&tag))
            .map(|component| component.as_ref())
    }

    pub fn widget(&self, name: &str) -> Option<&dyn Widget> {
        self.widgets.get(name).map(|widget| widget.as_ref())
    }
}

pub(crate) fn missing_edit_message(kind: &FieldKind) -> String {
    format!("Missing FieldComponent for {}", kind.type_name())
}

pub(crate) fn missing_readonly_message(kind: &FieldKind) -> String {
    format!("Missing ReadonlyFieldComponent for {}", kind.type_name())
}

pub(crate) fn missing_widget_message(widget: Option<&str>) -> String {
    format!("Missing widget {}", widget.unwrap_or("<unnamed>"))
}
