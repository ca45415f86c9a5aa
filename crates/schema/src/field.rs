use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::kind::FieldKind;
use crate::rule::RuleSpec;
use crate::validation::ValidationSpec;

/// One input in a form.
///
/// Keys the model does not know about are kept in `extra` and written back
/// unchanged, so presentation hints survive a load/save cycle. Empty
/// `validations` / `rules` lists and a `null` `defaultValue` read the same as
/// absent keys and are omitted on output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Unique within the enclosing form or repeater item.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<ValidationSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Row schema for repeaters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemSchema>,
    /// Explicit rule dependencies; inferred from the rules when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields of one repeater row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemSchema {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldSpec {
    /// Field with no validations or rules.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<FieldKind>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            validations: Vec::new(),
            rules: Vec::new(),
            default_value: None,
            item: None,
            depends_on: None,
            extra: Map::new(),
        }
    }

    /// Add a validation (builder-style, consuming).
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationSpec) -> Self {
        self.validations.push(validation);
        self
    }

    /// Add a rule (builder-style, consuming).
    #[must_use]
    pub fn with_rule(mut self, rule: RuleSpec) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the default value (builder-style, consuming).
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Set repeater row fields (builder-style, consuming).
    #[must_use]
    pub fn with_item(mut self, fields: Vec<FieldSpec>) -> Self {
        self.item = Some(ItemSchema {
            fields,
            extra: Map::new(),
        });
        self
    }

    /// Declare rule dependencies explicitly (builder-style, consuming).
    #[must_use]
    pub fn with_depends_on(mut self, paths: Vec<String>) -> Self {
        self.depends_on = Some(paths);
        self
    }

    /// Row fields of a repeater, empty for everything else.
    #[must_use]
    pub fn item_fields(&self) -> &[FieldSpec] {
        self.item.as_ref().map_or(&[], |item| item.fields.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn camel_case_keys_and_extras() {
        let field: FieldSpec = serde_json::from_value(json!({
            "id": "phone",
            "type": "tel",
            "label": "Phone",
            "placeholder": "+91",
            "defaultValue": "",
            "dependsOn": ["values.country"]
        }))
        .unwrap();

        assert_eq!(field.kind, FieldKind::Tel);
        assert_eq!(field.default_value, Some(json!("")));
        assert_eq!(field.depends_on, Some(vec!["values.country".to_owned()]));
        assert_eq!(field.extra.get("label"), Some(&json!("Phone")));
        assert!(field.validations.is_empty());
    }

    #[test]
    fn repeater_items() {
        let field = FieldSpec::new("owners", FieldKind::Repeater).with_item(vec![
            FieldSpec::new("name", FieldKind::Text),
            FieldSpec::new("share", FieldKind::Number),
        ]);
        assert_eq!(field.item_fields().len(), 2);
        assert!(FieldSpec::new("x", "text").item_fields().is_empty());

        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["item"]["fields"][1]["type"], json!("number"));
    }
}
