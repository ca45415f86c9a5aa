use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Presentation state of one field after rule evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub required: bool,
    /// Result of the last applicable `derive` rule; absent when it did not
    /// evaluate to a finite number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<f64>,
}

impl Effect {
    /// Whether every flag is off and nothing was derived.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Effects keyed by field path, in schema order.
///
/// Top-level fields are keyed by id. Repeater row fields are keyed
/// `"<repeater>.<row>.<field>"`.
pub type EffectMap = IndexMap<String, Effect>;
