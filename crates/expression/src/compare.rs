//! Operator application on resolved values.

use formwork_schema::Operator;
use formwork_schema::value::{is_empty, is_truthy, loose_eq, to_display_string, to_number};
use regex::Regex;
use serde_json::Value;

use crate::dsl::compile_pattern;

/// Apply `op` to a resolved left-hand value and optional right-hand literal.
///
/// Operators that need an operand are `false` without one. Ordering
/// operators compare numerically and are `false` when either side is `NaN`.
/// `in` / `not-in` are `false` unless the literal is an array. `matches`
/// compiles a string literal as a regex, either `/source/flags` or plain
/// pattern text, and is `false` when it does not compile.
pub fn apply(op: Operator, left: &Value, right: Option<&Value>) -> bool {
    match op {
        Operator::Eq => right.is_some_and(|r| loose_eq(left, r)),
        Operator::Ne => right.is_some_and(|r| !loose_eq(left, r)),
        Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => {
            right.is_some_and(|r| compare_numbers(op, to_number(left), to_number(r)))
        }
        Operator::In => right
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(|item| loose_eq(left, item))),
        Operator::NotIn => right
            .and_then(Value::as_array)
            .is_some_and(|items| !items.iter().any(|item| loose_eq(left, item))),
        Operator::Includes => includes(left, right),
        Operator::Truthy => is_truthy(left),
        Operator::Falsy => !is_truthy(left),
        Operator::Empty => is_empty(left),
        Operator::Filled => !is_empty(left),
        Operator::Matches => right
            .and_then(Value::as_str)
            .and_then(compile_pattern)
            .is_some_and(|regex| matches_regex(left, &regex)),
    }
}

/// Whether a value's text form matches `regex`. `null` never matches.
pub fn matches_regex(value: &Value, regex: &Regex) -> bool {
    !value.is_null() && regex.is_match(&to_display_string(value))
}

fn compare_numbers(op: Operator, left: f64, right: f64) -> bool {
    match op {
        Operator::Lt => left < right,
        Operator::Gt => left > right,
        Operator::Le => left <= right,
        Operator::Ge => left >= right,
        _ => false,
    }
}

fn includes(haystack: &Value, needle: Option<&Value>) -> bool {
    let Some(needle) = needle else {
        return false;
    };
    match haystack {
        Value::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
        Value::String(text) => needle.as_str().is_some_and(|n| text.contains(n)),
        _ => false,
    }
}
