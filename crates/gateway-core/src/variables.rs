//! `{{name}}` placeholder substitution

use serde_json::{Map, Value};

/// Replace every literal `{{key}}` in `content` with the rendered value.
///
/// Keys are applied in request order. Placeholders without a matching key are left
/// as-is; keys without a placeholder do nothing.
#[must_use]
pub fn substitute_variables(content: &str, variables: &Map<String, Value>) -> String {
    variables
        .iter()
        .fold(content.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{{{key}}}}}"), &js_string(value))
        })
}

/// Render a JSON value the way JavaScript's `String(value)` would.
#[must_use]
pub fn js_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() && f.is_finite() && f.fract() == 0.0 => {
                format!("{f:.0}")
            }
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}
