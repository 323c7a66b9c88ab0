//! Hidden-field computation.
//!
//! Visibility is derived data: [`evaluate`] recomputes it from the schema and
//! the whole record, and the resulting list is written back into the record
//! (under the invisible-field bookkeeping key) so read-only views and the
//! serializer can reproduce the filtering without the live form.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::FieldsConfig;
use crate::options::EngineOptions;
use crate::path::{self, FieldPath, InvalidPathError};

/// Insertion-ordered set of hidden field paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HiddenFields {
    paths: IndexSet<FieldPath>,
}

impl HiddenFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: FieldPath) {
        self.paths.insert(path);
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.paths.contains(path)
    }

    /// Whether `path` is hidden itself or lives below a hidden path.
    pub fn covers(&self, path: &FieldPath) -> bool {
        (0..=path.len()).any(|depth| {
            self.paths
                .contains(&FieldPath::from_segments(path.segments()[..depth].iter().cloned()))
        })
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, FieldPath> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Order-insensitive comparison.
    pub fn same_set(&self, other: &HiddenFields) -> bool {
        self.paths == other.paths
    }

    pub fn to_value(&self) -> Value {
        Value::Array(
            self.paths
                .iter()
                .map(|path| Value::String(path.to_string()))
                .collect(),
        )
    }

    /// Reads a persisted list. Entries that are not strings are skipped.
    pub fn from_value(value: Option<&Value>) -> Self {
        let mut hidden = Self::new();
        if let Some(Value::Array(items)) = value {
            for path in items.iter().filter_map(Value::as_str) {
                hidden.push(FieldPath::parse(path));
            }
        }
        hidden
    }

    /// Reads the list persisted in `record` under the configured parent.
    pub fn persisted(record: &Value, options: &EngineOptions) -> Self {
        Self::from_value(path::get(record, &options.invisible_fields_path()).value())
    }
}

impl FromIterator<FieldPath> for HiddenFields {
    fn from_iter<I: IntoIterator<Item = FieldPath>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a HiddenFields {
    type Item = &'a FieldPath;
    type IntoIter = indexmap::set::Iter<'a, FieldPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Computes the hidden paths of `fields`, which live under `parent`.
///
/// Predicates are evaluated against the whole `record`. Nested
/// array-of-objects schemas are always descended into, whatever the parent
/// field's own visibility. When `within_array` is set, `parent` names an
/// array and a hidden field is reported once per existing element.
pub fn evaluate(
    fields: &FieldsConfig,
    parent: &FieldPath,
    record: &Value,
    within_array: bool,
) -> HiddenFields {
    let mut hidden = HiddenFields::new();
    collect(fields, parent, record, within_array, &mut hidden);
    tracing::debug!(parent = %parent, hidden = hidden.len(), "computed hidden custom fields");
    hidden
}

fn collect(
    fields: &FieldsConfig,
    parent: &FieldPath,
    record: &Value,
    within_array: bool,
    hidden: &mut HiddenFields,
) {
    let containers = if within_array {
        element_paths(record, parent)
    } else {
        vec![parent.clone()]
    };

    for (key, config) in fields {
        if let Some(nested) = config.object_fields() {
            for container in &containers {
                collect(nested, &container.child(key.as_str()), record, true, hidden);
            }
        }

        let visible = config
            .visible_when
            .as_ref()
            .is_none_or(|condition| condition.holds(record));
        if !visible {
            tracing::trace!(parent = %parent, field = %key, "field hidden by visibleWhen");
            for container in &containers {
                hidden.push(container.child(key.as_str()));
            }
        }
    }
}

fn element_paths(record: &Value, array: &FieldPath) -> Vec<FieldPath> {
    match path::get(record, array).value() {
        Some(Value::Array(items)) => (0..items.len()).map(|index| array.index(index)).collect(),
        _ => Vec::new(),
    }
}

/// Returns a copy of `record` whose custom-field region carries an initial
/// hidden-field list. Records without a custom-field region, or that already
/// carry a list, are returned unchanged.
pub fn with_initial_invisible_fields(
    record: &Value,
    fields: &FieldsConfig,
    options: &EngineOptions,
) -> Result<Value, InvalidPathError> {
    let parent = options.parent_path();
    let Some(Value::Object(region)) = path::get(record, &parent).value() else {
        return Ok(record.clone());
    };
    if region
        .get(&options.invisible_field)
        .is_some_and(|existing| !existing.is_null())
    {
        return Ok(record.clone());
    }
    let hidden = evaluate(fields, &parent, record, false);
    path::set(record, &options.invisible_fields_path(), hidden.to_value())
}

/// Recomputes the hidden-field list and stores it in a copy of `record`,
/// replacing whatever was persisted before.
pub fn refresh_invisible_fields(
    record: &Value,
    fields: &FieldsConfig,
    options: &EngineOptions,
) -> Result<(Value, HiddenFields), InvalidPathError> {
    let parent = options.parent_path();
    let hidden = evaluate(fields, &parent, record, false);
    if !matches!(path::get(record, &parent).value(), Some(Value::Object(_))) {
        return Ok((record.clone(), hidden));
    }
    let persisted = HiddenFields::persisted(record, options);
    if persisted.same_set(&hidden) {
        return Ok((record.clone(), hidden));
    }
    let updated = path::set(record, &options.invisible_fields_path(), hidden.to_value())?;
    Ok((updated, hidden))
}
