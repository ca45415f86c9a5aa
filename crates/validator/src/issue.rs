use std::fmt;

use serde::{Deserialize, Serialize};

/// Issue code for a value that cannot be read as a number or list.
pub const INVALID_TYPE: &str = "invalid_type";
/// Issue code for text that is not a recognisable date.
pub const INVALID_DATE: &str = "invalid_date";

/// One validation failure, addressed by field path.
///
/// Top-level fields use their id; repeater row fields use
/// `"<repeater>.<row>.<field>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub field_id: String,
    /// The validation type that failed (`required`, `minLength`, ...) or a
    /// coercion code such as [`INVALID_TYPE`].
    pub code: String,
    pub message: String,
}

impl Issue {
    #[must_use]
    pub fn new(
        field_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field_id: field_id.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.field_id, self.message, self.code)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wire_shape_uses_field_id() {
        let issue = Issue::new("items.0.name", "required", "This field is required");
        assert_eq!(
            serde_json::to_value(&issue).unwrap(),
            json!({"fieldId": "items.0.name", "code": "required", "message": "This field is required"})
        );
        assert_eq!(
            issue.to_string(),
            "items.0.name: This field is required (required)"
        );
    }
}
