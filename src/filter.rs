use serde_json::Value;

use crate::domain::FieldsConfig;

/// Emptiness rule shared by deprecated-field filtering and visibility
/// predicates: absent, `null`, whitespace-only strings and collections with
/// no members are unset. `0`, `false` and populated collections are set.
pub fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Number(number)) => number.as_f64().is_some_and(f64::is_nan),
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_)) => false,
    }
}

/// Drops every deprecated field whose value inside `values` is unset.
///
/// `values` is the object the field keys live in: the custom-field region
/// for top-level fields, one array element for nested ones.
pub fn filter_deprecated(fields: &FieldsConfig, values: Option<&Value>) -> FieldsConfig {
    fields
        .iter()
        .filter(|(key, config)| {
            let keep = !config.deprecated || !is_unset(values.and_then(|v| v.get(key.as_str())));
            if !keep {
                tracing::trace!(field = %key, "dropping unset deprecated field");
            }
            keep
        })
        .map(|(key, config)| (key.clone(), config.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emptiness_rule() {
        assert!(is_unset(None));
        assert!(is_unset(Some(&json!(null))));
        assert!(is_unset(Some(&json!("   "))));
        assert!(is_unset(Some(&json!({}))));
        assert!(is_unset(Some(&json!([]))));
        assert!(!is_unset(Some(&json!(0))));
        assert!(!is_unset(Some(&json!(false))));
        assert!(!is_unset(Some(&json!([0]))));
        assert!(!is_unset(Some(&json!({"k": null}))));
    }

    #[test]
    fn keeps_deprecated_fields_that_still_hold_data() {
        let fields = FieldsConfig::from_value(&json!({
            "zero": {"type": "number", "deprecated": true},
            "blank": {"type": "text", "deprecated": true},
            "obj": {"type": "json", "deprecated": true},
            "current": {"type": "text"}
        }))
        .unwrap();
        let values = json!({"zero": 0, "blank": "", "obj": {}});
        let active = filter_deprecated(&fields, Some(&values));
        let keys: Vec<_> = active.keys().cloned().collect();
        assert_eq!(keys, vec!["zero".to_string(), "current".to_string()]);
    }
}
