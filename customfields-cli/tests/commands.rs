use assert_cmd::cargo::{self};
use predicates::prelude::*;
use predicates::str::contains;

const CONFIG: &str = r#"{
    "a": {"type": "text", "label": "Alpha"},
    "b": {"type": "text", "label": "Beta", "visibleWhen": "$.formCustomFields.a",
          "validations": [{"type": "required"}]}
}"#;

#[test]
fn hidden_lists_invisible_paths() {
    cargo::cargo_bin_cmd!("customfields")
        .args(["hidden", "--no-pretty", "-c", CONFIG, "-r"])
        .arg(r#"{"formCustomFields": {"a": "", "b": "x"}}"#)
        .assert()
        .success()
        .stdout(contains(r#"["formCustomFields.b"]"#));
}

#[test]
fn serialize_strips_hidden_values() {
    cargo::cargo_bin_cmd!("customfields")
        .args(["serialize", "--note-text", "-c", CONFIG, "-r"])
        .arg(r#"{"formCustomFields": {"a": "", "b": "x"}}"#)
        .assert()
        .success()
        .stdout(contains(r#"{"a":""}"#));
}

#[test]
fn show_prints_labels() {
    cargo::cargo_bin_cmd!("customfields")
        .args(["show", "-c", CONFIG, "-r"])
        .arg(r#"{"formCustomFields": {"a": "on", "b": "x"}}"#)
        .assert()
        .success()
        .stdout(contains("Alpha").and(contains("Beta")));
}

#[test]
fn validate_fails_on_invalid_records() {
    cargo::cargo_bin_cmd!("customfields")
        .args(["validate", "-c", CONFIG, "-r"])
        .arg(r#"{"formCustomFields": {"a": "on", "b": ""}}"#)
        .assert()
        .failure()
        .stdout(contains("Beta is a required field"))
        .stderr(contains("validation error"));
}

#[test]
fn validate_skips_hidden_fields() {
    cargo::cargo_bin_cmd!("customfields")
        .args(["validate", "-c", CONFIG, "-r"])
        .arg(r#"{"formCustomFields": {"a": "", "b": ""}}"#)
        .assert()
        .success();
}

#[test]
fn rejects_malformed_configurations() {
    cargo::cargo_bin_cmd!("customfields")
        .args(["hidden", "-c", r#"{"a": {"label": "no type"}}"#, "-r", "{}"])
        .assert()
        .failure()
        .stderr(contains("invalid custom field configuration"));
}

#[test]
fn sensitive_reshapes_rows() {
    cargo::cargo_bin_cmd!("customfields")
        .args(["sensitive", "--no-pretty", "-r"])
        .arg(r#"{"formSensitiveFields": {"ssn": "123"}}"#)
        .arg("-e")
        .arg(r#"[{"customFieldName": "ssn", "customFieldValue": "{}", "uuid": "row-1"}]"#)
        .assert()
        .success()
        .stdout(contains(r#""uuid":"row-1""#));
}

#[test]
fn prints_config_schema() {
    cargo::cargo_bin_cmd!("customfields")
        .arg("config-schema")
        .assert()
        .success()
        .stdout(contains("objectFields"))
        .stdout(contains("\"additionalProperties\""));
}
