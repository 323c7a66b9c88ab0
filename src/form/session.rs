use std::collections::BTreeSet;
use std::time::Instant;

use serde_json::Value;

use super::anet::EntityRef;
use super::coerce::{ChangeHandler, RawInput, ValidationTrigger};
use super::debounce::Debouncer;
use super::geo::{GeoEdit, apply_geo_edit};
use crate::domain::{FieldConfig, FieldKind, FieldsConfig};
use crate::error::EngineError;
use crate::options::EngineOptions;
use crate::path::{self, FieldPath, InvalidPathError};
use crate::registry::FieldRegistry;
use crate::render::{self, EditNode, HiddenSource, ReadonlyFields};
use crate::serialize::custom_fields_json;
use crate::validation::{FormValidator, ValidationReport};
use crate::visibility::{self, HiddenFields};

/// Mutable state of one edit form: the record being edited, the live
/// hidden-field list, touched fields and the latest validation report.
///
/// Every mutation recomputes the hidden fields before it returns, so a
/// render that follows always sees visibility of the post-edit record.
#[derive(Debug)]
pub struct FormSession {
    fields: FieldsConfig,
    registry: FieldRegistry,
    options: EngineOptions,
    validator: FormValidator,
    record: Value,
    hidden: HiddenFields,
    touched: BTreeSet<FieldPath>,
    debouncer: Debouncer,
    report: ValidationReport,
}

impl FormSession {
    pub fn new(
        fields: FieldsConfig,
        record: Value,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let mut record = record;
        let parent = options.parent_path();
        path::ensure_object(&mut record, &parent)?;
        if let Some(Value::Object(region)) = path::get_mut(&mut record, &parent) {
            for (key, config) in &fields {
                region
                    .entry(key.clone())
                    .or_insert_with(|| config.kind.default_value());
            }
        }

        let validator = FormValidator::new(&fields, &options)?;
        let mut session = Self {
            debouncer: Debouncer::new(options.validation_debounce),
            registry: FieldRegistry::default(),
            hidden: HiddenFields::new(),
            touched: BTreeSet::new(),
            report: ValidationReport::default(),
            fields,
            options,
            validator,
            record,
        };
        session.recompute_hidden()?;
        Ok(session)
    }

    pub fn with_registry(mut self, registry: FieldRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn fields(&self) -> &FieldsConfig {
        &self.fields
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn record(&self) -> &Value {
        &self.record
    }

    pub fn into_record(self) -> Value {
        self.record
    }

    pub fn hidden(&self) -> &HiddenFields {
        &self.hidden
    }

    pub fn is_touched(&self, path: &FieldPath) -> bool {
        self.touched.contains(path)
    }

    pub fn touched(&self) -> impl Iterator<Item = &FieldPath> {
        self.touched.iter()
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn validation_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Applies raw control input through the handler's coercion.
    pub fn handle_change(
        &mut self,
        handler: &ChangeHandler,
        input: RawInput,
        now: Instant,
    ) -> Result<(), EngineError> {
        let value = handler.coercion.apply(input);
        self.write(&handler.path, value)?;
        match handler.trigger {
            ValidationTrigger::Debounced => self.debouncer.schedule(now),
            ValidationTrigger::Immediate => self.validate_now(),
        }
        Ok(())
    }

    pub fn set_value(&mut self, path: &FieldPath, value: Value) -> Result<(), EngineError> {
        self.field_at(path)?;
        self.write(path, value)?;
        self.validate_now();
        Ok(())
    }

    pub fn blur(&mut self, path: &FieldPath) {
        self.touched.insert(path.clone());
    }

    /// Appends a structurally complete default object to an array-of-objects
    /// field and returns its index.
    pub fn add_object(&mut self, array: &FieldPath) -> Result<usize, EngineError> {
        let config = self.field_at(array)?;
        let Some(object) = config.kind.object_fields() else {
            return Err(wrong_kind(array, "an array of objects"));
        };
        let default_object = object.fields.default_object();
        let mut items = self.array_items(array)?;
        items.push(default_object);
        let index = items.len() - 1;
        self.write(array, Value::Array(items))?;
        self.validate_now();
        Ok(index)
    }

    /// Removes one element of an array-of-objects field. Touched paths and
    /// errors of the following siblings move down one index.
    pub fn remove_object(&mut self, array: &FieldPath, index: usize) -> Result<(), EngineError> {
        let config = self.field_at(array)?;
        if config.kind.object_fields().is_none() {
            return Err(wrong_kind(array, "an array of objects"));
        }
        let mut items = self.array_items(array)?;
        if index >= items.len() {
            return Err(InvalidPathError::OutOfBounds {
                path: array.index(index).to_string(),
                index,
                len: items.len(),
            }
            .into());
        }
        items.remove(index);
        path::set_in_place(&mut self.record, array, Value::Array(items))?;

        // bookkeeping follows the record only once the removal has landed
        self.touched = std::mem::take(&mut self.touched)
            .into_iter()
            .filter_map(|path| path.reindex_after_removal(array, index))
            .collect();
        self.report.reindex_after_removal(array, index);
        self.touched.insert(array.clone());
        self.recompute_hidden()?;
        self.validate_now();
        Ok(())
    }

    /// Replaces an entity reference as a whole; `None` clears it to `null`.
    pub fn set_anet_object(
        &mut self,
        path: &FieldPath,
        entity: Option<EntityRef>,
    ) -> Result<(), EngineError> {
        let config = self.field_at(path)?;
        if !matches!(config.kind, FieldKind::AnetObject { .. }) {
            return Err(wrong_kind(path, "an entity reference"));
        }
        let value = entity.map_or(Value::Null, |entity| entity.to_value());
        self.write(path, value)?;
        self.validate_now();
        Ok(())
    }

    /// Appends `entity` unless an equal reference is already selected.
    pub fn add_anet_object(
        &mut self,
        path: &FieldPath,
        entity: EntityRef,
    ) -> Result<bool, EngineError> {
        let mut selected = self.selected_entities(path)?;
        if selected.contains(&entity) {
            return Ok(false);
        }
        selected.push(entity);
        self.write_entities(path, &selected)?;
        Ok(true)
    }

    pub fn remove_anet_object(
        &mut self,
        path: &FieldPath,
        entity: &EntityRef,
    ) -> Result<bool, EngineError> {
        let mut selected = self.selected_entities(path)?;
        let before = selected.len();
        selected.retain(|existing| existing != entity);
        if selected.len() == before {
            return Ok(false);
        }
        self.write_entities(path, &selected)?;
        Ok(true)
    }

    pub fn set_geo_location(&mut self, path: &FieldPath, edit: GeoEdit) -> Result<(), EngineError> {
        let config = self.field_at(path)?;
        if !matches!(config.kind, FieldKind::GeoLocation) {
            return Err(wrong_kind(path, "a geo location"));
        }
        let value = apply_geo_edit(
            path::get(&self.record, path).value(),
            edit,
            self.options.coordinates(),
        );
        self.write(path, value)?;
        self.validate_now();
        Ok(())
    }

    /// Runs the debounced validation if its window has passed. Returns
    /// whether a validation pass ran.
    pub fn poll_validation(&mut self, now: Instant) -> bool {
        if !self.debouncer.fire(now) {
            return false;
        }
        self.run_validation();
        true
    }

    /// Validates right away, dropping any pending debounced run.
    pub fn validate_now(&mut self) {
        self.debouncer.cancel();
        self.run_validation();
    }

    /// Save-time text of the custom-field region, after refreshing the
    /// persisted hidden-field list.
    pub fn serialize(&mut self, for_note_text: bool) -> Result<Option<String>, EngineError> {
        self.recompute_hidden()?;
        custom_fields_json(&self.record, for_note_text, &self.options)
    }

    pub fn render_edit(&self) -> Vec<EditNode> {
        render::render_edit(
            &self.fields,
            &self.record,
            &self.hidden,
            &self.registry,
            &self.options,
            Some(&self.report),
        )
    }

    pub fn render_readonly(&self) -> ReadonlyFields {
        render::render_readonly(
            &self.fields,
            &self.record,
            &self.registry,
            &self.options,
            HiddenSource::Live,
        )
    }

    fn run_validation(&mut self) {
        self.report = self.validator.validate(&self.record, &self.hidden);
    }

    fn write(&mut self, path: &FieldPath, value: Value) -> Result<(), EngineError> {
        path::set_in_place(&mut self.record, path, value)?;
        self.touched.insert(path.clone());
        tracing::trace!(field = %path, "custom field changed");
        self.recompute_hidden()
    }

    fn recompute_hidden(&mut self) -> Result<(), EngineError> {
        let parent = self.options.parent_path();
        let hidden = visibility::evaluate(&self.fields, &parent, &self.record, false);
        let persisted = HiddenFields::persisted(&self.record, &self.options);
        let bookkeeping = self.options.invisible_fields_path();
        if path::get(&self.record, &bookkeeping).is_missing() || !persisted.same_set(&hidden) {
            path::set_in_place(&mut self.record, &bookkeeping, hidden.to_value())?;
        }
        self.hidden = hidden;
        Ok(())
    }

    /// Resolves the configuration of the field stored at an absolute path.
    fn field_at(&self, path: &FieldPath) -> Result<&FieldConfig, EngineError> {
        let parent = self.options.parent_path();
        let unknown = || EngineError::UnknownField {
            path: path.to_string(),
        };
        if !path.starts_with(&parent) || path.len() == parent.len() {
            return Err(unknown());
        }
        let relative = path.segments()[parent.len()..].join(".");
        self.fields.lookup(&relative).ok_or_else(unknown)
    }

    fn array_items(&self, array: &FieldPath) -> Result<Vec<Value>, EngineError> {
        match path::get(&self.record, array).value() {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(_) => Err(EngineError::NotAnArray {
                path: array.to_string(),
            }),
        }
    }

    fn selected_entities(&self, path: &FieldPath) -> Result<Vec<EntityRef>, EngineError> {
        let config = self.field_at(path)?;
        if !matches!(config.kind, FieldKind::ArrayOfAnetObjects { .. }) {
            return Err(wrong_kind(path, "an entity reference list"));
        }
        Ok(self
            .array_items(path)?
            .iter()
            .filter_map(EntityRef::from_value)
            .collect())
    }

    fn write_entities(&mut self, path: &FieldPath, entities: &[EntityRef]) -> Result<(), EngineError> {
        let items = entities.iter().map(EntityRef::to_value).collect();
        self.write(path, Value::Array(items))?;
        self.validate_now();
        Ok(())
    }
}

fn wrong_kind(path: &FieldPath, expected: &'static str) -> EngineError {
    EngineError::WrongFieldKind {
        path: path.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{Coercion, ValidationTrigger};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn session(config: Value, region: Value) -> FormSession {
        let fields = FieldsConfig::from_value(&config).unwrap();
        FormSession::new(fields, json!({"formCustomFields": region}), EngineOptions::default())
            .unwrap()
    }

    fn text_handler(path: &str) -> ChangeHandler {
        ChangeHandler {
            path: FieldPath::parse(path),
            coercion: Coercion::Text,
            trigger: ValidationTrigger::Debounced,
        }
    }

    #[test]
    fn new_fills_top_level_defaults_and_bookkeeping() {
        let session = session(
            json!({"a": {"type": "text"}, "n": {"type": "number"}, "tags": {"type": "enumset"}}),
            json!({"a": "kept"}),
        );
        assert_eq!(
            session.record()["formCustomFields"],
            json!({"a": "kept", "n": null, "tags": [], "invisibleCustomFields": []})
        );
    }

    #[test]
    fn text_edits_debounce_validation() {
        let mut session = session(
            json!({"a": {"type": "text", "validations": [{"type": "required"}]}}),
            json!({"a": "x"}),
        );
        let start = Instant::now();
        let handler = text_handler("formCustomFields.a");
        session.handle_change(&handler, "".into(), start).unwrap();
        assert!(session.validation_pending());
        assert!(session.report().is_valid());

        session
            .handle_change(&handler, "".into(), start + Duration::from_millis(300))
            .unwrap();
        assert!(!session.poll_validation(start + Duration::from_millis(500)));
        assert!(session.poll_validation(start + Duration::from_millis(700)));
        assert_eq!(
            session.report().messages(&FieldPath::parse("formCustomFields.a")),
            ["a is a required field".to_string()]
        );
        assert!(session.is_touched(&FieldPath::parse("formCustomFields.a")));
    }

    #[test]
    fn immediate_changes_cancel_pending_validation() {
        let mut session = session(
            json!({"a": {"type": "text"}, "when": {"type": "date"}}),
            json!({}),
        );
        let start = Instant::now();
        session
            .handle_change(&text_handler("formCustomFields.a"), "x".into(), start)
            .unwrap();
        let handler = ChangeHandler {
            path: FieldPath::parse("formCustomFields.when"),
            coercion: Coercion::Passthrough,
            trigger: ValidationTrigger::Immediate,
        };
        session
            .handle_change(&handler, json!("2024-01-01").into(), start)
            .unwrap();
        assert!(!session.validation_pending());
    }

    #[test]
    fn visibility_is_recomputed_on_every_change() {
        let mut session = session(
            json!({"a": {"type": "text"}, "b": {"type": "text", "visibleWhen": "$.formCustomFields.a"}}),
            json!({"a": ""}),
        );
        let b = FieldPath::parse("formCustomFields.b");
        assert!(session.hidden().contains(&b));
        session
            .handle_change(&text_handler("formCustomFields.a"), "on".into(), Instant::now())
            .unwrap();
        assert!(session.hidden().is_empty());
        assert_eq!(
            session.record()["formCustomFields"]["invisibleCustomFields"],
            json!([])
        );
    }

    #[test]
    fn array_elements_are_added_and_removed() {
        let mut session = session(
            json!({"rows": {"type": "array_of_objects", "objectFields": {
                "x": {"type": "number", "validations": [{"type": "positive"}]},
                "y": {"type": "text"}
            }}}),
            json!({}),
        );
        let rows = FieldPath::parse("formCustomFields.rows");
        assert_eq!(session.add_object(&rows).unwrap(), 0);
        assert_eq!(session.add_object(&rows).unwrap(), 1);
        assert_eq!(
            session.record()["formCustomFields"]["rows"],
            json!([{"x": null, "y": ""}, {"x": null, "y": ""}])
        );

        session
            .set_value(&FieldPath::parse("formCustomFields.rows.1.x"), json!(-3))
            .unwrap();
        assert!(!session.report().is_valid());

        session.remove_object(&rows, 0).unwrap();
        assert!(session.is_touched(&FieldPath::parse("formCustomFields.rows.0.x")));
        assert!(!session.is_touched(&FieldPath::parse("formCustomFields.rows.1.x")));
        assert_eq!(
            session
                .report()
                .messages(&FieldPath::parse("formCustomFields.rows.0.x"))
                .len(),
            1
        );

        let err = session.remove_object(&rows, 4).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPath(_)));
    }

    #[test]
    fn failed_removals_leave_bookkeeping_untouched() {
        let mut session = session(
            json!({"rows": {"type": "array_of_objects", "objectFields": {
                "x": {"type": "number", "validations": [{"type": "positive"}]}
            }}}),
            json!({"rows": [{"x": 1}, {"x": -1}]}),
        );
        let rows = FieldPath::parse("formCustomFields.rows");
        let second = FieldPath::parse("formCustomFields.rows.1.x");
        session.set_value(&second, json!(-2)).unwrap();
        let report = session.report().clone();
        let record = session.record().clone();

        let err = session.remove_object(&rows, 2).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPath(_)));
        let err = session
            .remove_object(&FieldPath::parse("formCustomFields.missing"), 0)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownField { .. }));

        assert!(session.is_touched(&second));
        assert_eq!(session.report(), &report);
        assert_eq!(session.record(), &record);

        session.remove_object(&rows, 0).unwrap();
        assert!(session.is_touched(&FieldPath::parse("formCustomFields.rows.0.x")));
        assert!(!session.is_touched(&second));
        assert!(session.is_touched(&rows));
        assert_eq!(session.record()["formCustomFields"]["rows"], json!([{"x": -2}]));
    }

    #[test]
    fn entity_references_are_replaced_whole() {
        let mut session = session(
            json!({
                "owner": {"type": "anet_object", "types": ["Person"]},
                "related": {"type": "array_of_anet_objects", "types": ["Report"]}
            }),
            json!({}),
        );
        let owner = FieldPath::parse("formCustomFields.owner");
        session
            .set_anet_object(&owner, Some(EntityRef::new("Person", "abc")))
            .unwrap();
        assert_eq!(
            session.record()["formCustomFields"]["owner"],
            json!({"type": "Person", "uuid": "abc"})
        );
        session.set_anet_object(&owner, None).unwrap();
        assert_eq!(session.record()["formCustomFields"]["owner"], Value::Null);

        let related = FieldPath::parse("formCustomFields.related");
        let report = EntityRef::new("Report", "r1");
        assert!(session.add_anet_object(&related, report.clone()).unwrap());
        assert!(!session.add_anet_object(&related, report.clone()).unwrap());
        assert!(session.remove_anet_object(&related, &report).unwrap());
        assert!(!session.remove_anet_object(&related, &report).unwrap());
        assert_eq!(session.record()["formCustomFields"]["related"], json!([]));

        let err = session.set_anet_object(&related, None).unwrap_err();
        assert!(matches!(err, EngineError::WrongFieldKind { .. }));
    }

    #[test]
    fn geo_edits_keep_both_representations_in_sync() {
        let mut session = session(json!({"where": {"type": "geo_location"}}), json!({}));
        let path = FieldPath::parse("formCustomFields.where");
        session
            .set_geo_location(&path, GeoEdit::LatLng { lat: Some(1.5), lng: Some(2.0) })
            .unwrap();
        assert_eq!(
            session.record()["formCustomFields"]["where"]["displayedCoordinate"],
            json!("1.5, 2")
        );
        session
            .set_geo_location(&path, GeoEdit::Displayed("garbage".into()))
            .unwrap();
        assert!(!session.report().is_valid());
    }

    #[test]
    fn unknown_paths_are_rejected() {
        let mut session = session(json!({"a": {"type": "text"}}), json!({}));
        let err = session
            .set_value(&FieldPath::parse("formCustomFields.zzz"), json!(1))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownField { .. }));
    }
}
