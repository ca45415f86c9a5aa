/// Structural error raised while loading or compiling a form schema.
///
/// Runtime problems (bad user input, unparseable rule text, unknown
/// validation types) never surface here; those degrade to issues or to
/// "condition is false". Only defects in the schema document itself do.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The document is not a well-formed schema.
    #[error("invalid schema document: {reason}")]
    InvalidDocument { reason: String },

    /// Two fields in the same scope share an id.
    #[error("duplicate field id `{id}` in {scope}")]
    DuplicateFieldId { id: String, scope: String },

    /// A rule, validation or `dependsOn` entry names a field that does not exist.
    #[error("field `{field}` references unknown field `{reference}`")]
    UnknownReference { field: String, reference: String },

    /// Derive expressions feed into each other.
    #[error("derive cycle: {}", cycle.join(" -> "))]
    DeriveCycle { cycle: Vec<String> },

    /// Failed to serialize a schema.
    #[error("serialization failed: {error}")]
    SerializationError { error: String },
}

impl SchemaError {
    /// Broad error category for grouping in logs.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::InvalidDocument { .. } => "format",
            Self::DuplicateFieldId { .. } => "structure",
            Self::UnknownReference { .. } => "structure",
            Self::DeriveCycle { .. } => "structure",
            Self::SerializationError { .. } => "serialization",
        }
    }

    /// Machine-readable error code for programmatic handling.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidDocument { .. } => "SCHEMA_INVALID_DOCUMENT",
            Self::DuplicateFieldId { .. } => "SCHEMA_DUPLICATE_FIELD",
            Self::UnknownReference { .. } => "SCHEMA_UNKNOWN_REFERENCE",
            Self::DeriveCycle { .. } => "SCHEMA_DERIVE_CYCLE",
            Self::SerializationError { .. } => "SCHEMA_SER",
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidDocument {
            reason: error.to_string(),
        }
    }
}
