//! Coercion of raw input values to the shape a field kind expects.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use formwork_schema::BaseType;
use formwork_schema::value::{
    format_number, is_empty, parse_numeric, to_display_string, to_number,
};
use serde_json::{Number, Value};

use crate::issue::{INVALID_DATE, INVALID_TYPE};

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// A field value after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// Trimmed text.
    Text(String),
    /// `None` when the input was blank.
    Number(Option<f64>),
    Boolean(bool),
    /// `None` when the input was blank.
    Date(Option<NaiveDateTime>),
    List(Vec<Value>),
    Rows(Vec<Value>),
}

/// Why a raw value could not be coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoerceError {
    NotANumber,
    InvalidDate,
    NotAList,
}

impl CoerceError {
    /// Issue code reported for this failure.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::NotANumber | Self::NotAList => INVALID_TYPE,
            Self::InvalidDate => INVALID_DATE,
        }
    }

    /// Default message for this failure.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::NotANumber => "Must be a number",
            Self::InvalidDate => "Enter a valid date",
            Self::NotAList => "Must be a list of items",
        }
    }
}

/// Coerce a raw value for a field of the given base type.
pub fn coerce(base: BaseType, raw: &Value) -> Result<Coerced, CoerceError> {
    match base {
        BaseType::Text => Ok(Coerced::Text(match raw {
            Value::String(s) => s.trim().to_owned(),
            other => to_display_string(other),
        })),
        BaseType::Number => coerce_number(raw).map(Coerced::Number),
        BaseType::Boolean => Ok(Coerced::Boolean(coerce_bool(raw))),
        BaseType::Date => {
            if is_empty(raw) {
                Ok(Coerced::Date(None))
            } else {
                parse_date(raw)
                    .map(|d| Coerced::Date(Some(d)))
                    .ok_or(CoerceError::InvalidDate)
            }
        }
        BaseType::List => Ok(Coerced::List(match raw {
            Value::Null => Vec::new(),
            Value::Array(items) => items.clone(),
            Value::String(s) if s.trim().is_empty() => Vec::new(),
            other => vec![other.clone()],
        })),
        BaseType::Rows => match raw {
            Value::Null => Ok(Coerced::Rows(Vec::new())),
            Value::Array(rows) => Ok(Coerced::Rows(rows.clone())),
            _ => Err(CoerceError::NotAList),
        },
    }
}

fn coerce_number(raw: &Value) -> Result<Option<f64>, CoerceError> {
    match raw {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => {
            let n = parse_numeric(s);
            if n.is_finite() {
                Ok(Some(n))
            } else {
                Err(CoerceError::NotANumber)
            }
        }
        Value::Number(_) | Value::Bool(_) => Ok(Some(to_number(raw))),
        Value::Array(_) | Value::Object(_) => Err(CoerceError::NotANumber),
    }
}

fn coerce_bool(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "on" | "yes" | "1"
        ),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// Parse a date from RFC 3339 text, `YYYY-MM-DD`, common local date-time
/// forms, or epoch milliseconds.
pub fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(text) => parse_date_text(text.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.naive_utc()),
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl Coerced {
    /// Whether the coerced value is blank. Booleans are never blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Number(n) => n.is_none(),
            Self::Boolean(_) => false,
            Self::Date(d) => d.is_none(),
            Self::List(items) | Self::Rows(items) => items.is_empty(),
        }
    }

    /// Whether a `required` check fails: blank, or an unticked checkbox.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Boolean(b) => !b,
            other => other.is_empty(),
        }
    }

    /// JSON form used by cross-field checks.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => n.map_or(Value::Null, number_value),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Date(None) => Value::Null,
            Self::Date(Some(d)) => {
                let text = if d.time() == chrono::NaiveTime::MIN {
                    d.format("%Y-%m-%d").to_string()
                } else {
                    d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
                };
                Value::String(text)
            }
            Self::List(items) | Self::Rows(items) => Value::Array(items.clone()),
        }
    }

    /// Text form used by string checks.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(Some(n)) => format_number(*n),
            other => to_display_string(&other.to_value()),
        }
    }

    /// Text of each item for lists, or the single text form otherwise.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.iter().map(to_display_string).collect(),
            other => vec![other.text()],
        }
    }

    /// Numeric form, `NaN` when there is none.
    #[must_use]
    pub fn number(&self) -> f64 {
        match self {
            Self::Number(n) => n.unwrap_or(f64::NAN),
            Self::Text(s) => parse_numeric(s),
            other => to_number(&other.to_value()),
        }
    }

    /// Items of a list or repeater.
    #[must_use]
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Rows(items) => Some(items),
            _ => None,
        }
    }
}
