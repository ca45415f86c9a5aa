use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// What a structured rule does when its condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleAction {
    Hide,
    Show,
    Disable,
    Enable,
    Require,
    Unrequire,
    /// Compute a value from the rule's `value` expression.
    Derive,
    /// Unrecognised action, ignored at evaluation time.
    Unknown(String),
}

impl RuleAction {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hide => "hide",
            Self::Show => "show",
            Self::Disable => "disable",
            Self::Enable => "enable",
            Self::Require => "require",
            Self::Unrequire => "unrequire",
            Self::Derive => "derive",
            Self::Unknown(name) => name,
        }
    }

    /// Whether the action clears a flag rather than setting it.
    #[must_use]
    pub fn is_reset(&self) -> bool {
        matches!(self, Self::Show | Self::Enable | Self::Unrequire)
    }
}

impl From<&str> for RuleAction {
    fn from(name: &str) -> Self {
        match name {
            "hide" => Self::Hide,
            "show" => Self::Show,
            "disable" => Self::Disable,
            "enable" => Self::Enable,
            "require" => Self::Require,
            "unrequire" => Self::Unrequire,
            "derive" => Self::Derive,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for RuleAction {
    fn from(name: String) -> Self {
        match Self::from(name.as_str()) {
            Self::Unknown(_) => Self::Unknown(name),
            known => known,
        }
    }
}

impl From<RuleAction> for String {
    fn from(action: RuleAction) -> Self {
        match action {
            RuleAction::Unknown(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule attached to a field, either DSL text or a structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSpec {
    /// `when <condition> -> <effect>`
    Dsl(String),
    /// `{when, action, value?}`
    Structured {
        when: Condition,
        action: RuleAction,
        /// Arithmetic expression for `derive`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl RuleSpec {
    /// Rule written in the DSL.
    #[must_use]
    pub fn dsl(text: impl Into<String>) -> Self {
        Self::Dsl(text.into())
    }

    /// Structured rule without a value.
    #[must_use]
    pub fn when(condition: impl Into<Condition>, action: RuleAction) -> Self {
        Self::Structured {
            when: condition.into(),
            action,
            value: None,
        }
    }

    /// Structured `derive` rule.
    #[must_use]
    pub fn derive_when(condition: impl Into<Condition>, expression: impl Into<String>) -> Self {
        Self::Structured {
            when: condition.into(),
            action: RuleAction::Derive,
            value: Some(expression.into()),
        }
    }
}
