//! Coercion and predicate helpers for `serde_json::Value`.
//!
//! Form inputs arrive loosely typed (a number field may hold `"18"`), so
//! comparisons and checks go through these helpers instead of raw `==`.

use serde_json::{Map, Value};

/// Get the type name of a Value for diagnostics.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a value counts as "not filled in".
///
/// `null`, whitespace-only strings and empty arrays are empty. `false` and
/// `0` are deliberate answers and are not empty.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Check if a value is truthy (not null, false, 0, NaN, or empty string/array/object)
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i != 0
            } else if let Some(f) = n.as_f64() {
                f != 0.0 && !f.is_nan()
            } else {
                true // u64 values
            }
        }
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
    }
}

/// Numeric view of a value, `NaN` when there is none.
///
/// `null`, `false` and blank strings read as `0`, `true` as `1`. Strings are
/// trimmed before parsing. A single-element array reads as its element.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_numeric(s),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => to_number(single),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

/// Parse free text as a number; blank text is `0`, garbage is `NaN`.
pub fn parse_numeric(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Render a number the way a form would display it.
///
/// Integral values print without a fractional part, so `5.0` becomes `"5"`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// String view of a value used for textual comparison.
///
/// `null` is the empty string and arrays are comma-joined.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                format_number(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(to_display_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Loose equality between a field value and a literal.
///
/// Identical JSON is equal. Numbers compare numerically against numbers,
/// booleans and numeric strings (`18 == "18"`). Strings and booleans compare
/// by their text (`"true" == true`). Blank strings never equal a number.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => to_number(left) == to_number(right),
        (Value::Number(_), Value::String(s)) | (Value::String(s), Value::Number(_))
            if s.trim().is_empty() =>
        {
            false
        }
        (Value::Number(_), Value::String(_) | Value::Bool(_))
        | (Value::String(_) | Value::Bool(_), Value::Number(_)) => {
            let (l, r) = (to_number(left), to_number(right));
            !l.is_nan() && l == r
        }
        (Value::String(_), Value::Bool(_)) | (Value::Bool(_), Value::String(_)) => {
            to_display_string(left) == to_display_string(right)
        }
        _ => false,
    }
}

/// Walk a dotted path through nested objects and arrays.
///
/// Numeric segments index into arrays. A key containing the whole path
/// wins over walking, so flat maps with dotted keys still resolve.
pub fn lookup_path<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(direct) = root.get(path) {
        return Some(direct);
    }
    let mut segments = path.split('.').filter(|s| !s.is_empty());
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
