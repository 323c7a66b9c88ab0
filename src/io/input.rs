use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use super::DocumentFormat;
use crate::domain::{FieldsConfig, config_json_schema};

/// Parse structured data in any supported format into a `serde_json::Value`.
pub fn parse_document_str(contents: &str, format: DocumentFormat) -> Result<Value> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(contents).context("failed to parse JSON document")
        }
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => {
            serde_yaml::from_str::<Value>(contents).context("failed to parse YAML document")
        }
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => toml::from_str::<toml::Table>(contents)
            .context("failed to parse TOML document")
            .and_then(|table| serde_json::to_value(table).context("failed to convert TOML to JSON")),
    }
}

/// Parses and loads a custom-field configuration document.
pub fn load_fields_config_str(contents: &str, format: DocumentFormat) -> Result<FieldsConfig> {
    let value = parse_document_str(contents, format)?;
    load_fields_config_value(&value)
}

/// Checks `value` against the configuration format's JSON Schema, then
/// builds the field tree and compiles its `visibleWhen` predicates.
pub fn load_fields_config_value(value: &Value) -> Result<FieldsConfig> {
    let schema = config_json_schema().context("failed to build the configuration schema")?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|err| anyhow!("invalid configuration schema: {err}"))?;

    let problems: Vec<String> = validator
        .iter_errors(value)
        .map(|err| {
            let pointer = err.instance_path.to_string();
            let location = if pointer.is_empty() { "/" } else { pointer.as_str() };
            format!("{location}: {err}")
        })
        .collect();
    if !problems.is_empty() {
        return Err(anyhow!(
            "custom field configuration does not match the expected shape:\n  {}",
            problems.join("\n  ")
        ));
    }

    FieldsConfig::from_value(value).context("failed to load custom field configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loads_json_configuration() {
        let fields = load_fields_config_str(
            r#"{"name": {"type": "text", "label": "Name"}, "rows": {"type": "array_of_objects", "objectFields": {"x": {"type": "number"}}}}"#,
            DocumentFormat::Json,
        )
        .unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.lookup("rows.0.x").is_some());
    }

    #[test]
    fn rejects_documents_of_the_wrong_shape() {
        let err = load_fields_config_value(&json!({"name": {"label": "missing type"}})).unwrap_err();
        assert!(err.to_string().contains("expected shape"));

        let err = load_fields_config_value(&json!({"name": {"type": "text", "objectFields": {}}}))
            .unwrap_err();
        assert!(format!("{err:#}").contains("objectFields"));
    }

    #[test]
    fn reports_bad_predicates() {
        let err = load_fields_config_value(&json!({"b": {"type": "text", "visibleWhen": "$.a[?(@.b ==)]"}}))
            .unwrap_err();
        assert!(format!("{err:#}").contains("b"));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn loads_yaml_configuration() {
        let fields = load_fields_config_str("name:\n  type: text\n", DocumentFormat::Yaml).unwrap();
        assert_eq!(fields.keys().next().map(String::as_str), Some("name"));
    }
}
