use serde_json::Value;

/// Pulls the text to show out of an `/ask` payload.
///
/// A bare string is the answer. Otherwise a truthy `answer` field wins, then a
/// truthy `detail` field (how the backend reports errors), and anything else
/// is shown as serialized JSON.
pub fn extract_answer(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Object(fields) => ["answer", "detail"]
            .iter()
            .filter_map(|key| fields.get(*key))
            .find(|value| is_truthy(value))
            .map(field_text)
            .unwrap_or_else(|| payload.to_string()),
        other => other.to_string(),
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
