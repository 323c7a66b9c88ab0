use serde_json::{Map, Number, Value};

use crate::path::FieldPath;

/// Raw input coming from a control: typed text, or an already structured
/// value (a selected option, a picked date).
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    Text(String),
    Value(Value),
}

impl From<&str> for RawInput {
    fn from(text: &str) -> Self {
        RawInput::Text(text.to_string())
    }
}

impl From<Value> for RawInput {
    fn from(value: Value) -> Self {
        RawInput::Value(value)
    }
}

/// How raw input becomes a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Text,
    /// Empty input is stored as `null`. Text that is not a number is kept as
    /// typed so validation can report it.
    Number,
    /// Empty input becomes `{}`, non-object documents become `{}`, and text
    /// that fails to parse is kept as typed.
    Json,
    Passthrough,
}

impl Coercion {
    pub fn apply(self, input: RawInput) -> Value {
        match (self, input) {
            (Coercion::Number, RawInput::Text(text)) => number_input(&text),
            (Coercion::Number, RawInput::Value(Value::String(text))) => number_input(&text),
            (Coercion::Json, RawInput::Text(text)) => json_input(&text),
            (Coercion::Json, RawInput::Value(Value::String(text))) => json_input(&text),
            (_, RawInput::Text(text)) => Value::String(text),
            (_, RawInput::Value(value)) => value,
        }
    }
}

fn number_input(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Value::from(integer);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text.to_string()))
}

fn json_input(text: &str) -> Value {
    let source = if text.trim().is_empty() { "{}" } else { text };
    match serde_json::from_str::<Value>(source) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(_) => Value::Object(Map::new()),
        Err(err) => {
            tracing::debug!(error = %err, "keeping unparsable JSON field input as text");
            Value::String(text.to_string())
        }
    }
}

/// When a change triggers form-wide validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationTrigger {
    /// After the debounce window passes without further edits.
    Debounced,
    Immediate,
}

/// Change handler wired to one rendered field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeHandler {
    pub path: FieldPath,
    pub coercion: Coercion,
    pub trigger: ValidationTrigger,
}
