use std::fmt;

use serde_json::Value;

use crate::domain::FieldConfig;
use crate::path::FieldPath;

/// Generic props handed to caller-supplied widgets.
#[derive(Debug, Clone, Copy)]
pub struct WidgetProps<'a> {
    pub name: &'a FieldPath,
    pub value: Option<&'a Value>,
    pub editable: bool,
    pub config: &'a FieldConfig,
}

/// A caller-supplied renderer for `special_field` fields (rich text
/// editors, likert scales and the like). Its output is opaque to the engine.
pub trait Widget: fmt::Debug + Send + Sync {
    fn render(&self, props: &WidgetProps<'_>) -> String;
}
