use customfields::domain::FieldsConfig;
use customfields::options::EngineOptions;
use customfields::path::FieldPath;
use customfields::registry::{FieldRegistry, Widget, WidgetProps};
use customfields::render::{HiddenSource, ReadonlyValue, render_edit, render_readonly};
use customfields::visibility::HiddenFields;
use pretty_assertions::assert_eq;
use serde_json::json;

#[derive(Debug)]
struct Markdown;

impl Widget for Markdown {
    fn render(&self, props: &WidgetProps<'_>) -> String {
        let text = props.value.and_then(|value| value.as_str()).unwrap_or_default();
        if props.editable {
            format!("[edit] {text}")
        } else {
            text.to_string()
        }
    }
}

fn config() -> FieldsConfig {
    FieldsConfig::from_value(&json!({
        "name": {"type": "text", "label": "Name"},
        "secret": {"type": "text", "authorizationGroupUuids": ["g1"]},
        "notes": {"type": "special_field", "widget": "markdown"},
        "owner": {"type": "anet_object", "types": ["Person"]},
        "rows": {"type": "array_of_objects", "objectLabel": "row", "objectFields": {
            "x": {"type": "number"}
        }},
        "legacy": {"type": "text", "deprecated": true},
        "hidden": {"type": "text", "visibleWhen": "$.formCustomFields.name[?(@ == 'show')]"}
    }))
    .unwrap()
}

fn record() -> serde_json::Value {
    json!({"formCustomFields": {
        "name": "Ada",
        "secret": "s",
        "notes": "*hi*",
        "owner": {"type": "Person", "uuid": "a b"},
        "rows": [{"x": 1}, {"x": 2}],
        "legacy": null,
        "hidden": "x",
        "invisibleCustomFields": []
    }})
}

#[test]
fn readonly_view_keeps_schema_order_and_skips_hidden() {
    let registry = FieldRegistry::default().with_widget("markdown", Markdown);
    let view = render_readonly(
        &config(),
        &record(),
        &registry,
        &EngineOptions::default(),
        HiddenSource::Live,
    );
    assert_eq!(
        view.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["name", "secret", "notes", "owner", "rows"]
    );
    assert_eq!(view.get("secret").and_then(|node| node.class), Some("sensitive-information"));
    assert_eq!(
        view.get("notes").map(|node| &node.value),
        Some(&ReadonlyValue::Widget {
            widget: "markdown".into(),
            output: "*hi*".into()
        })
    );
    match view.get("owner").map(|node| &node.value) {
        Some(ReadonlyValue::EntityLinks(links)) => {
            assert_eq!(links[0].href.as_deref(), Some("/people/a%20b"));
        }
        other => panic!("unexpected owner value: {other:?}"),
    }
    match view.get("rows").map(|node| &node.value) {
        Some(ReadonlyValue::Group(groups)) => {
            assert_eq!(groups.len(), 2);
            assert_eq!(groups[1].title, "Row 2");
        }
        other => panic!("unexpected rows value: {other:?}"),
    }
}

#[test]
fn persisted_source_trusts_the_stored_list() {
    let mut record = record();
    record["formCustomFields"]["invisibleCustomFields"] = json!(["formCustomFields.name"]);
    let view = render_readonly(
        &config(),
        &record,
        &FieldRegistry::default(),
        &EngineOptions::default(),
        HiddenSource::Persisted,
    );
    assert!(view.get("name").is_none());
    assert!(view.get("hidden").is_some());
}

#[test]
fn missing_widgets_degrade_to_placeholders() {
    let nodes = render_edit(
        &config(),
        &record(),
        &HiddenFields::new(),
        &FieldRegistry::default(),
        &EngineOptions::default(),
        None,
    );
    let notes = nodes.iter().find(|node| node.key == "notes").unwrap();
    assert!(matches!(
        &notes.control,
        customfields::render::EditControl::Missing { message } if message.contains("markdown")
    ));
    let rows = nodes.iter().find(|node| node.key == "rows").unwrap();
    match &rows.control {
        customfields::render::EditControl::ArrayOfObjects { add, items } => {
            assert_eq!(add.default_object, json!({"x": null}));
            assert_eq!(items.len(), 2);
            assert_eq!(items[1].fields[0].name, FieldPath::parse("formCustomFields.rows.1.x"));
        }
        other => panic!("unexpected rows control: {other:?}"),
    }
}
