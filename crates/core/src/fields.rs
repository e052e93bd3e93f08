//! Lenient field readers for provider JSON.
//!
//! Provider payloads disagree on key names and on whether numbers are sent
//! as numbers or strings. Readers take a list of legacy key names and return
//! the first one that yields a usable value.

use serde_json::{Map, Value};

/// Read an integer from the first key that holds one.
///
/// Accepts JSON numbers (integral floats included) and numeric strings.
pub(crate) fn int_field(map: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| map.get(*k).and_then(as_int))
}

/// Read a non-blank string from the first key that holds one.
///
/// Numbers are rendered as strings so numeric ids survive.
pub(crate) fn str_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| map.get(*k).and_then(as_text))
}

/// Whether any of the keys is present with a non-null value.
pub(crate) fn has_any(map: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter()
        .any(|k| map.get(*k).is_some_and(|v| !v.is_null()))
}

/// Integer from a JSON number or a numeric string.
pub(crate) fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
