//! Evaluation context: current form values plus ambient user, tenant and flags.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value::lookup_path;

/// Namespace a selector resolves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Current form values. Bare paths land here.
    Values,
    /// Attributes of the signed-in user.
    User,
    /// The tenant identifier.
    Tenant,
    /// Feature flags.
    Flags,
}

impl Namespace {
    /// Prefix used in selectors.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Values => "values",
            Self::User => "user",
            Self::Tenant => "tenant",
            Self::Flags => "flags",
        }
    }
}

/// Split a selector into its namespace and the remaining path.
///
/// `"values.a.b"` gives `(Values, "a.b")`, `"flags.beta"` gives
/// `(Flags, "beta")`, `"tenant"` gives `(Tenant, "")`, and a bare `"a.b"`
/// gives `(Values, "a.b")`.
pub fn split_selector(selector: &str) -> (Namespace, &str) {
    let (head, rest) = selector.split_once('.').unwrap_or((selector, ""));
    match head {
        "values" => (Namespace::Values, rest),
        "user" => (Namespace::User, rest),
        "flags" => (Namespace::Flags, rest),
        "tenant" => (Namespace::Tenant, rest),
        _ => (Namespace::Values, selector),
    }
}

/// Canonical spelling of a selector with an explicit namespace.
pub fn normalize_selector(selector: &str) -> String {
    match split_selector(selector) {
        (Namespace::Tenant, _) => "tenant".to_owned(),
        (namespace, "") => namespace.as_str().to_owned(),
        (namespace, path) => format!("{}.{path}", namespace.as_str()),
    }
}

/// The form field a selector reads from, if it reads form values at all.
pub fn referenced_field(selector: &str) -> Option<&str> {
    match split_selector(selector) {
        (Namespace::Values, path) => path.split('.').next().filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// Values and ambient data that rules are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    values: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    user: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    flags: Map<String, Value>,
}

impl Context {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context holding only form values.
    #[must_use]
    pub fn from_values(values: Map<String, Value>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    /// Current form values.
    #[must_use]
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// User attributes.
    #[must_use]
    pub fn user(&self) -> &Map<String, Value> {
        &self.user
    }

    /// Tenant identifier.
    #[must_use]
    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// Feature flags.
    #[must_use]
    pub fn flags(&self) -> &Map<String, Value> {
        &self.flags
    }

    /// Set a form value (builder-style, consuming).
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Replace all form values (builder-style, consuming).
    #[must_use]
    pub fn with_values(mut self, values: Map<String, Value>) -> Self {
        self.values = values;
        self
    }

    /// Set a user attribute (builder-style, consuming).
    #[must_use]
    pub fn with_user_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.user.insert(key.into(), value);
        self
    }

    /// Set the tenant (builder-style, consuming).
    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Set a feature flag (builder-style, consuming).
    #[must_use]
    pub fn with_flag(mut self, key: impl Into<String>, value: Value) -> Self {
        self.flags.insert(key.into(), value);
        self
    }

    /// Context for one repeater row: the row's object becomes `values`,
    /// while user, tenant and flags carry over.
    #[must_use]
    pub fn for_row(&self, row: &Value) -> Self {
        Self {
            values: row.as_object().cloned().unwrap_or_default(),
            user: self.user.clone(),
            tenant: self.tenant.clone(),
            flags: self.flags.clone(),
        }
    }

    /// Resolve a selector to a value, `null` when anything along the path is missing.
    #[must_use]
    pub fn resolve(&self, selector: &str) -> Cow<'_, Value> {
        let (namespace, path) = split_selector(selector);
        let found = match namespace {
            Namespace::Tenant => {
                return match (&self.tenant, path) {
                    (Some(tenant), "") => Cow::Owned(Value::String(tenant.clone())),
                    _ => Cow::Owned(Value::Null),
                };
            }
            Namespace::Values => Self::walk(&self.values, path),
            Namespace::User => Self::walk(&self.user, path),
            Namespace::Flags => Self::walk(&self.flags, path),
        };
        found.unwrap_or(Cow::Owned(Value::Null))
    }

    fn walk<'a>(root: &'a Map<String, Value>, path: &str) -> Option<Cow<'a, Value>> {
        if path.is_empty() {
            return Some(Cow::Owned(Value::Object(root.clone())));
        }
        lookup_path(root, path).map(Cow::Borrowed)
    }
}
