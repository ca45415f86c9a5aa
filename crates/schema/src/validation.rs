//! Declarative validation entries attached to fields.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `type` of a validation entry.
///
/// Unknown types are preserved in [`ValidationKind::Unknown`] and ignored
/// at validation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValidationKind {
    Required,
    MinLength,
    MaxLength,
    Pattern,
    Email,
    Url,
    Min,
    Max,
    Integer,
    Positive,
    Nonnegative,
    Enum,
    Equals,
    NotEquals,
    SameAs,
    RequiredIf,
    Unknown(String),
}

impl ValidationKind {
    /// Schema spelling, also used as the issue code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Required => "required",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::Pattern => "pattern",
            Self::Email => "email",
            Self::Url => "url",
            Self::Min => "min",
            Self::Max => "max",
            Self::Integer => "integer",
            Self::Positive => "positive",
            Self::Nonnegative => "nonnegative",
            Self::Enum => "enum",
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::SameAs => "sameAs",
            Self::RequiredIf => "requiredIf",
            Self::Unknown(name) => name,
        }
    }

    /// Whether the check reads other fields and runs after per-field checks.
    #[must_use]
    pub fn is_cross_field(&self) -> bool {
        matches!(self, Self::SameAs | Self::RequiredIf)
    }
}

impl From<&str> for ValidationKind {
    fn from(name: &str) -> Self {
        match name {
            "required" => Self::Required,
            "minLength" => Self::MinLength,
            "maxLength" => Self::MaxLength,
            "pattern" => Self::Pattern,
            "email" => Self::Email,
            "url" => Self::Url,
            "min" => Self::Min,
            "max" => Self::Max,
            "integer" => Self::Integer,
            "positive" => Self::Positive,
            "nonnegative" => Self::Nonnegative,
            "enum" => Self::Enum,
            "equals" => Self::Equals,
            "notEquals" => Self::NotEquals,
            "sameAs" => Self::SameAs,
            "requiredIf" => Self::RequiredIf,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for ValidationKind {
    fn from(name: String) -> Self {
        match Self::from(name.as_str()) {
            Self::Unknown(_) => Self::Unknown(name),
            known => known,
        }
    }
}

impl From<ValidationKind> for String {
    fn from(kind: ValidationKind) -> Self {
        match kind {
            ValidationKind::Unknown(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation entry: `{type, value?, message?, other?, when?, op?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSpec {
    #[serde(rename = "type")]
    pub kind: ValidationKind,
    /// Rule parameter: a length, bound, pattern, allowed list or comparison literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Custom failure message; a default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// `sameAs`: path of the field to match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<String>,
    /// `requiredIf`: path whose value decides whether this field is required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    /// `requiredIf`: operator applied to `when`; `filled` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
}

impl ValidationSpec {
    /// Bare entry of the given kind.
    #[must_use]
    pub fn new(kind: ValidationKind) -> Self {
        Self {
            kind,
            value: None,
            message: None,
            other: None,
            when: None,
            op: None,
        }
    }

    fn with_value(kind: ValidationKind, value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(kind)
        }
    }

    /// Field must be filled in.
    #[must_use]
    pub fn required() -> Self {
        Self::new(ValidationKind::Required)
    }

    /// Minimum text length (or item count for lists).
    #[must_use]
    pub fn min_length(len: usize) -> Self {
        Self::with_value(ValidationKind::MinLength, len)
    }

    /// Maximum text length (or item count for lists).
    #[must_use]
    pub fn max_length(len: usize) -> Self {
        Self::with_value(ValidationKind::MaxLength, len)
    }

    /// Regular expression, either plain or as `/source/flags`.
    #[must_use]
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::with_value(ValidationKind::Pattern, pattern.into())
    }

    #[must_use]
    pub fn email() -> Self {
        Self::new(ValidationKind::Email)
    }

    #[must_use]
    pub fn url() -> Self {
        Self::new(ValidationKind::Url)
    }

    /// Lower bound: a number, a date for date fields, a row count for repeaters.
    #[must_use]
    pub fn min(bound: impl Into<Value>) -> Self {
        Self::with_value(ValidationKind::Min, bound)
    }

    /// Upper bound: a number, a date for date fields, a row count for repeaters.
    #[must_use]
    pub fn max(bound: impl Into<Value>) -> Self {
        Self::with_value(ValidationKind::Max, bound)
    }

    #[must_use]
    pub fn integer() -> Self {
        Self::new(ValidationKind::Integer)
    }

    #[must_use]
    pub fn positive() -> Self {
        Self::new(ValidationKind::Positive)
    }

    #[must_use]
    pub fn nonnegative() -> Self {
        Self::new(ValidationKind::Nonnegative)
    }

    /// Value must be one of the listed options.
    #[must_use]
    pub fn one_of(options: Vec<Value>) -> Self {
        Self::with_value(ValidationKind::Enum, options)
    }

    #[must_use]
    pub fn equals(expected: impl Into<Value>) -> Self {
        Self::with_value(ValidationKind::Equals, expected)
    }

    #[must_use]
    pub fn not_equals(unexpected: impl Into<Value>) -> Self {
        Self::with_value(ValidationKind::NotEquals, unexpected)
    }

    /// Value must be identical to another field's value.
    #[must_use]
    pub fn same_as(other: impl Into<String>) -> Self {
        Self {
            other: Some(other.into()),
            ..Self::new(ValidationKind::SameAs)
        }
    }

    /// Field is required when `op` applied to the value at `when` holds.
    #[must_use]
    pub fn required_if(when: impl Into<String>, op: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            when: Some(when.into()),
            op: Some(op.into()),
            value,
            ..Self::new(ValidationKind::RequiredIf)
        }
    }

    /// Replace the failure message (builder-style, consuming).
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn builders_serialize_to_schema_shape() {
        assert_eq!(
            serde_json::to_value(ValidationSpec::min_length(3).with_message("too short")).unwrap(),
            json!({"type": "minLength", "value": 3, "message": "too short"})
        );
        assert_eq!(
            serde_json::to_value(ValidationSpec::same_as("password")).unwrap(),
            json!({"type": "sameAs", "other": "password"})
        );
        assert_eq!(
            serde_json::to_value(ValidationSpec::required_if(
                "values.country",
                "==",
                Some(json!("IN"))
            ))
            .unwrap(),
            json!({"type": "requiredIf", "value": "IN", "when": "values.country", "op": "=="})
        );
    }

    #[test]
    fn unknown_type_is_preserved() {
        let spec: ValidationSpec =
            serde_json::from_value(json!({"type": "luhn", "value": 1})).unwrap();
        assert_eq!(spec.kind, ValidationKind::Unknown("luhn".into()));
        assert_eq!(serde_json::to_value(&spec).unwrap()["type"], json!("luhn"));
    }

    #[test]
    fn cross_field_classification() {
        assert!(ValidationKind::SameAs.is_cross_field());
        assert!(ValidationKind::RequiredIf.is_cross_field());
        assert!(!ValidationKind::Required.is_cross_field());
    }
}
