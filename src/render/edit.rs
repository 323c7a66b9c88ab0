use crate::domain::FieldsConfig;
use crate::filter::filter_deprecated;
use crate::form::{ChangeHandler, Coercion, ValidationTrigger};
use crate::path::{self, FieldPath};
use crate::registry::{self, FieldContext};

use super::{EditControl, EditNode, FieldIndicator, RenderScope};

/// Renders the visible fields of `fields`, whose values live in the object
/// at `parent`. Array-of-objects components call back into this for every
/// element, with `parent` set to `{field}.{index}`.
pub fn render_edit_fields(
    scope: &RenderScope<'_>,
    fields: &FieldsConfig,
    parent: &FieldPath,
) -> Vec<EditNode> {
    let values = path::get(scope.record, parent).value();
    let active = filter_deprecated(fields, values);

    let mut nodes = Vec::with_capacity(active.len());
    for (key, config) in &active {
        let name = parent.child(key.as_str());
        if scope.hidden.contains(&name) {
            continue;
        }
        let ctx = FieldContext {
            key,
            name: &name,
            config,
            value: values.and_then(|v| v.get(key.as_str())),
            scope,
        };

        let (control, coercion, trigger) = match scope.registry.edit_component(&config.kind) {
            Some(component) => (
                component.render_edit(&ctx),
                component.coercion(),
                component.validation_trigger(),
            ),
            None => {
                tracing::warn!(field = %name, field_type = config.kind.type_name(), "no edit component registered");
                (
                    EditControl::Missing {
                        message: registry::missing_edit_message(&config.kind),
                    },
                    Coercion::Passthrough,
                    ValidationTrigger::Immediate,
                )
            }
        };

        let errors = scope
            .errors
            .map(|report| report.messages(&name).to_vec())
            .unwrap_or_default();

        nodes.push(EditNode {
            key: key.clone(),
            label: config.display_label(key).to_string(),
            placeholder: config.placeholder.clone(),
            help_text: config.help_text.clone(),
            tooltip_text: config.tooltip_text.clone(),
            indicator: FieldIndicator::for_field(config),
            errors,
            control,
            on_change: ChangeHandler {
                path: name.clone(),
                coercion,
                trigger,
            },
            name,
        });
    }
    nodes
}
