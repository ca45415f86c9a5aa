use std::fmt;

use serde::{Deserialize, Serialize};

/// The widget kind of a field, as spelled in the schema's `type` key.
///
/// Unknown kinds are kept verbatim in [`FieldKind::Other`] and validated as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    Text,
    Password,
    Email,
    Tel,
    Url,
    Textarea,
    Number,
    Checkbox,
    Date,
    Datepicker,
    Select,
    Autocomplete,
    Multiselect,
    Radio,
    RadioGroup,
    Repeater,
    Other(String),
}

/// The value shape a field kind is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// Free text; the default.
    Text,
    /// Numeric input, coerced from strings.
    Number,
    /// A single checkbox.
    Boolean,
    /// A calendar date.
    Date,
    /// Several selected options.
    List,
    /// Repeated rows, each validated by the item schema.
    Rows,
}

impl FieldKind {
    /// Schema spelling of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Password => "password",
            Self::Email => "email",
            Self::Tel => "tel",
            Self::Url => "url",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Checkbox => "checkbox",
            Self::Date => "date",
            Self::Datepicker => "datepicker",
            Self::Select => "select",
            Self::Autocomplete => "autocomplete",
            Self::Multiselect => "multiselect",
            Self::Radio => "radio",
            Self::RadioGroup => "radio-group",
            Self::Repeater => "repeater",
            Self::Other(name) => name,
        }
    }

    /// Value shape used when validating this kind.
    #[must_use]
    pub fn base_type(&self) -> BaseType {
        match self {
            Self::Number => BaseType::Number,
            Self::Checkbox => BaseType::Boolean,
            Self::Date | Self::Datepicker => BaseType::Date,
            Self::Multiselect => BaseType::List,
            Self::Repeater => BaseType::Rows,
            _ => BaseType::Text,
        }
    }

    /// Whether this is a repeater of nested rows.
    #[must_use]
    pub fn is_repeater(&self) -> bool {
        matches!(self, Self::Repeater)
    }
}

impl From<&str> for FieldKind {
    fn from(name: &str) -> Self {
        match name {
            "text" => Self::Text,
            "password" => Self::Password,
            "email" => Self::Email,
            "tel" => Self::Tel,
            "url" => Self::Url,
            "textarea" => Self::Textarea,
            "number" => Self::Number,
            "checkbox" => Self::Checkbox,
            "date" => Self::Date,
            "datepicker" => Self::Datepicker,
            "select" => Self::Select,
            "autocomplete" => Self::Autocomplete,
            "multiselect" => Self::Multiselect,
            "radio" => Self::Radio,
            "radio-group" => Self::RadioGroup,
            "repeater" => Self::Repeater,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for FieldKind {
    fn from(name: String) -> Self {
        match Self::from(name.as_str()) {
            Self::Other(_) => Self::Other(name),
            known => known,
        }
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Other(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("text", BaseType::Text)]
    #[case("email", BaseType::Text)]
    #[case("select", BaseType::Text)]
    #[case("radio-group", BaseType::Text)]
    #[case("number", BaseType::Number)]
    #[case("checkbox", BaseType::Boolean)]
    #[case("date", BaseType::Date)]
    #[case("datepicker", BaseType::Date)]
    #[case("multiselect", BaseType::List)]
    #[case("repeater", BaseType::Rows)]
    #[case("signature-pad", BaseType::Text)]
    fn base_types(#[case] name: &str, #[case] expected: BaseType) {
        assert_eq!(FieldKind::from(name).base_type(), expected);
    }

    #[test]
    fn unknown_kind_roundtrips() {
        let kind: FieldKind = serde_json::from_str("\"signature-pad\"").unwrap();
        assert_eq!(kind, FieldKind::Other("signature-pad".into()));
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"signature-pad\"");
    }

    #[test]
    fn known_kind_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&FieldKind::RadioGroup).unwrap(),
            "\"radio-group\""
        );
        assert_eq!(FieldKind::Repeater.to_string(), "repeater");
        assert!(FieldKind::Repeater.is_repeater());
    }
}
