use customfields::domain::FieldsConfig;
use customfields::filter::filter_deprecated;
use customfields::options::EngineOptions;
use customfields::serialize::{custom_fields_json, hydrate_custom_fields};
use customfields::visibility::refresh_invisible_fields;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

#[test]
fn serialization_is_idempotent() {
    let fields = FieldsConfig::from_value(&json!({
        "a": {"type": "text"},
        "b": {"type": "text", "visibleWhen": "$.formCustomFields.a"},
        "n": {"type": "number"}
    }))
    .unwrap();
    let options = EngineOptions::default();
    let record = json!({"formCustomFields": {"a": "", "b": "stale", "n": 4}});
    let (record, _) = refresh_invisible_fields(&record, &fields, &options).unwrap();

    let first = custom_fields_json(&record, false, &options).unwrap().unwrap();
    let mut reloaded = record.clone();
    reloaded["formCustomFields"] = serde_json::from_str::<Value>(&first).unwrap();
    let (reloaded, _) = refresh_invisible_fields(&reloaded, &fields, &options).unwrap();
    let second = custom_fields_json(&reloaded, false, &options).unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::from_str::<Value>(&first).unwrap(),
        json!({"a": "", "n": 4, "invisibleCustomFields": ["formCustomFields.b"]})
    );
}

#[test]
fn stored_blob_round_trips_through_hydration() {
    let options = EngineOptions::default();
    let stored = json!({"uuid": "p1", "customFields": "{\"a\":\"x\",\"invisibleCustomFields\":[]}"});
    let hydrated = hydrate_custom_fields(&stored, &options).unwrap();
    let text = custom_fields_json(&hydrated, false, &options).unwrap().unwrap();
    assert_eq!(text, "{\"a\":\"x\",\"invisibleCustomFields\":[]}");
}

#[test]
fn deprecated_fields_follow_the_emptiness_rule() {
    let fields = FieldsConfig::from_value(&json!({
        "old": {"type": "text", "deprecated": true},
        "zero": {"type": "number", "deprecated": true},
        "flag": {"type": "text", "deprecated": true},
        "blank": {"type": "json", "deprecated": true},
        "current": {"type": "text"}
    }))
    .unwrap();
    let values = json!({"old": "   ", "zero": 0, "flag": false, "blank": {}});
    let active = filter_deprecated(&fields, Some(&values));
    assert_eq!(
        active.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["zero", "flag", "current"]
    );
}
