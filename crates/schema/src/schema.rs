use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::field::FieldSpec;

/// How reset actions (`show`, `enable`, `unrequire`) are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDialect {
    /// Reset actions clear their flag.
    #[default]
    Standard,
    /// Reset actions are ignored and flags only ever turn on.
    Additive,
}

impl RuleDialect {
    fn is_standard(&self) -> bool {
        *self == Self::Standard
    }
}

/// A titled group of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Section {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            fields: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Add a field (builder-style, consuming).
    #[must_use]
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }
}

/// A complete form document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    pub id: String,
    /// Free-form version tag, a number or a string.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub version: Value,
    #[serde(default, skip_serializing_if = "RuleDialect::is_standard")]
    pub dialect: RuleDialect,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormSchema {
    /// Empty schema with the standard dialect.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: Value::Null,
            dialect: RuleDialect::Standard,
            sections: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Set the version tag (builder-style, consuming).
    #[must_use]
    pub fn with_version(mut self, version: impl Into<Value>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the rule dialect (builder-style, consuming).
    #[must_use]
    pub fn with_dialect(mut self, dialect: RuleDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Add a section (builder-style, consuming).
    #[must_use]
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Parse a schema document.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build a schema from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize back to a JSON document.
    ///
    /// Output reparses to an equal schema. Keys whose value equals the
    /// default (an empty list, a `null` default value) are not written.
    pub fn to_json(&self) -> Result<String, SchemaError> {
        serde_json::to_string(self).map_err(|e| SchemaError::SerializationError {
            error: e.to_string(),
        })
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Result<Value, SchemaError> {
        serde_json::to_value(self).map_err(|e| SchemaError::SerializationError {
            error: e.to_string(),
        })
    }

    /// Top-level fields across all sections, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.sections.iter().flat_map(|section| section.fields.iter())
    }

    /// Look up a top-level field by id.
    #[must_use]
    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields().find(|field| field.id == id)
    }

    /// Number of top-level fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|section| section.fields.len()).sum()
    }

    /// Check that ids are unique across the form and within every repeater item.
    pub fn check_unique_ids(&self) -> Result<(), SchemaError> {
        let scope = format!("form `{}`", self.id);
        check_scope(self.fields(), &scope)
    }
}

fn check_scope<'a>(
    fields: impl IntoIterator<Item = &'a FieldSpec>,
    scope: &str,
) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.id.as_str()) {
            return Err(SchemaError::DuplicateFieldId {
                id: field.id.clone(),
                scope: scope.to_owned(),
            });
        }
        if field.item.is_some() {
            check_scope(field.item_fields(), &format!("repeater `{}`", field.id))?;
        }
    }
    Ok(())
}
