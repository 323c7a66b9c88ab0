use customfields::domain::FieldsConfig;
use customfields::options::EngineOptions;
use customfields::path::FieldPath;
use customfields::visibility::{self, refresh_invisible_fields, with_initial_invisible_fields};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn nested_config() -> FieldsConfig {
    FieldsConfig::from_value(&json!({
        "toggle": {"type": "text"},
        "outer": {"type": "array_of_objects", "objectFields": {
            "inner": {"type": "array_of_objects", "objectFields": {
                "field": {"type": "text", "visibleWhen": "$.formCustomFields.toggle"}
            }}
        }}
    }))
    .unwrap()
}

fn hidden_paths(fields: &FieldsConfig, record: &Value) -> Vec<String> {
    visibility::evaluate(fields, &FieldPath::parse("formCustomFields"), record, false)
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn three_level_nesting_emits_one_path_per_innermost_element() {
    let fields = nested_config();
    let mut record = json!({"formCustomFields": {
        "toggle": "",
        "outer": [
            {"inner": [{"field": "a"}]},
            {"inner": [{"field": "b"}]}
        ]
    }});
    assert_eq!(
        hidden_paths(&fields, &record),
        vec![
            "formCustomFields.outer.0.inner.0.field",
            "formCustomFields.outer.1.inner.0.field",
        ]
    );

    record["formCustomFields"]["toggle"] = json!("on");
    assert!(hidden_paths(&fields, &record).is_empty());
}

#[test]
fn empty_arrays_emit_no_element_paths() {
    let fields = nested_config();
    let record = json!({"formCustomFields": {"toggle": null, "outer": []}});
    assert!(hidden_paths(&fields, &record).is_empty());
}

#[test]
fn visibility_follows_the_predicate_scenario() {
    let fields = FieldsConfig::from_value(&json!({
        "a": {"type": "text"},
        "b": {"type": "text", "visibleWhen": "$.root.a"}
    }))
    .unwrap();
    let options = EngineOptions::default().with_parent_field("root");

    let record = json!({"root": {"a": "", "b": "x"}});
    let (record, hidden) = refresh_invisible_fields(&record, &fields, &options).unwrap();
    assert_eq!(record["root"]["invisibleCustomFields"], json!(["root.b"]));
    assert_eq!(hidden.len(), 1);

    let mut edited = record.clone();
    edited["root"]["a"] = json!("now set");
    let (edited, hidden) = refresh_invisible_fields(&edited, &fields, &options).unwrap();
    assert!(hidden.is_empty());
    assert_eq!(edited["root"]["invisibleCustomFields"], json!([]));
}

#[test]
fn initial_bookkeeping_is_written_once() {
    let fields = FieldsConfig::from_value(&json!({
        "b": {"type": "text", "visibleWhen": "$.formCustomFields.a"}
    }))
    .unwrap();
    let options = EngineOptions::default();

    let record = json!({"formCustomFields": {}});
    let seeded = with_initial_invisible_fields(&record, &fields, &options).unwrap();
    assert_eq!(
        seeded["formCustomFields"]["invisibleCustomFields"],
        json!(["formCustomFields.b"])
    );

    let kept = json!({"formCustomFields": {"invisibleCustomFields": ["x"]}});
    assert_eq!(with_initial_invisible_fields(&kept, &fields, &options).unwrap(), kept);

    let no_region = json!({"name": "Ada"});
    assert_eq!(
        with_initial_invisible_fields(&no_region, &fields, &options).unwrap(),
        no_region
    );
}

#[test]
fn evaluation_does_not_touch_the_record() {
    let fields = nested_config();
    let record = json!({"formCustomFields": {"toggle": "", "outer": [{"inner": [{}]}]}});
    let before = record.clone();
    let _ = hidden_paths(&fields, &record);
    assert_eq!(record, before);
}

fn large_rows_record(rows: usize) -> Value {
    let items: Vec<Value> = (0..rows).map(|index| json!({"x": index})).collect();
    json!({"formCustomFields": {"rows": items}})
}

fn timed_evaluation(fields: &FieldsConfig, record: &Value) -> (usize, std::time::Duration) {
    let started = std::time::Instant::now();
    let hidden =
        visibility::evaluate(fields, &FieldPath::parse("formCustomFields"), record, false);
    (hidden.len(), started.elapsed())
}

#[test]
fn evaluation_scales_linearly_with_array_elements() {
    let fields = FieldsConfig::from_value(&json!({
        "rows": {"type": "array_of_objects", "objectFields": {
            "x": {"type": "text", "visibleWhen": "$.formCustomFields.missing"}
        }}
    }))
    .unwrap();
    let small = large_rows_record(5_000);
    let large = large_rows_record(20_000);

    // warm up allocator and caches
    timed_evaluation(&fields, &small);
    let (small_len, small_time) = timed_evaluation(&fields, &small);
    let (large_len, large_time) = timed_evaluation(&fields, &large);

    assert_eq!(small_len, 5_000);
    assert_eq!(large_len, 20_000);
    // 4x the input must stay far below the 16x a quadratic dedup would cost
    let ratio = large_time.as_secs_f64() / small_time.as_secs_f64().max(1e-6);
    assert!(ratio < 10.0, "4x input took {ratio:.1}x longer");

    let hidden =
        visibility::evaluate(&fields, &FieldPath::parse("formCustomFields"), &large, false);
    assert!(hidden.covers(&FieldPath::parse("formCustomFields.rows.19999.x.nested")));
    assert!(!hidden.covers(&FieldPath::parse("formCustomFields.rows.20000.x")));
}
