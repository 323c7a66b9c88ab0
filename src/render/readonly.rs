use indexmap::IndexMap;
use serde::Serialize;

use crate::domain::FieldsConfig;
use crate::filter::filter_deprecated;
use crate::path::{self, FieldPath};
use crate::registry::{self, FieldContext};

use super::{FieldIndicator, ReadonlyNode, ReadonlyValue, RenderScope};

const SENSITIVE_CLASS: &str = "sensitive-information";

/// Read-only nodes keyed by field key, in schema order, so pages can place
/// individual custom fields among their ordinary ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReadonlyFields {
    nodes: IndexMap<String, ReadonlyNode>,
}

impl ReadonlyFields {
    pub fn get(&self, key: &str) -> Option<&ReadonlyNode> {
        self.nodes.get(key)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ReadonlyNode> {
        self.nodes.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, ReadonlyNode> {
        self.nodes.keys()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<'a> IntoIterator for &'a ReadonlyFields {
    type Item = (&'a String, &'a ReadonlyNode);
    type IntoIter = indexmap::map::Iter<'a, String, ReadonlyNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

pub fn render_readonly_fields(
    scope: &RenderScope<'_>,
    fields: &FieldsConfig,
    parent: &FieldPath,
) -> ReadonlyFields {
    let values = path::get(scope.record, parent).value();
    let active = filter_deprecated(fields, values);

    let mut nodes = IndexMap::with_capacity(active.len());
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
        let value = match scope.registry.readonly_component(&config.kind) {
            Some(component) => component.render_readonly(&ctx),
            None => ReadonlyValue::Missing {
                message: registry::missing_readonly_message(&config.kind),
            },
        };
        nodes.insert(
            key.clone(),
            ReadonlyNode {
                key: key.clone(),
                label: config.display_label(key).to_string(),
                class: config.is_sensitive().then_some(SENSITIVE_CLASS),
                indicator: FieldIndicator::for_field(config),
                value,
                name,
            },
        );
    }
    ReadonlyFields { nodes }
}
