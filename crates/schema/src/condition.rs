use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::operator::Operator;

/// A condition attached to a rule.
///
/// Conditions are written in four shapes: a boolean literal, a
/// `[selector, op, literal]` triple, an `{all, any, none}` composite, or a
/// DSL string. Anything else is kept as [`Condition::Malformed`] and
/// evaluates to `false`; a malformed condition never fails schema loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Condition {
    /// `true` or `false`.
    Literal(bool),
    /// `[selector, op]` or `[selector, op, literal]`. The literal is taken as-is.
    Comparison {
        selector: String,
        op: Operator,
        operand: Option<Value>,
    },
    /// Nested conditions combined by `all` / `any` / `none`.
    Composite(Composite),
    /// A DSL condition such as `values.age >= 18 AND values.city in ['BLR']`.
    Dsl(String),
    /// Unrecognised shape, preserved verbatim.
    Malformed(Value),
}

/// The three optional members of a composite condition.
///
/// An absent member imposes nothing. `all: []` and `none: []` hold,
/// `any: []` does not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composite {
    pub all: Option<Vec<Condition>>,
    pub any: Option<Vec<Condition>>,
    pub none: Option<Vec<Condition>>,
}

impl Condition {
    /// Triple comparison `[selector, op, operand]`.
    #[must_use]
    pub fn compare(selector: impl Into<String>, op: Operator, operand: impl Into<Value>) -> Self {
        Self::Comparison {
            selector: selector.into(),
            op,
            operand: Some(operand.into()),
        }
    }

    /// Two-element triple for operand-less operators such as `filled`.
    #[must_use]
    pub fn check(selector: impl Into<String>, op: Operator) -> Self {
        Self::Comparison {
            selector: selector.into(),
            op,
            operand: None,
        }
    }

    /// Every member must hold.
    #[must_use]
    pub fn all(members: Vec<Self>) -> Self {
        Self::Composite(Composite {
            all: Some(members),
            ..Composite::default()
        })
    }

    /// At least one member must hold.
    #[must_use]
    pub fn any(members: Vec<Self>) -> Self {
        Self::Composite(Composite {
            any: Some(members),
            ..Composite::default()
        })
    }

    /// No member may hold.
    #[must_use]
    pub fn none(members: Vec<Self>) -> Self {
        Self::Composite(Composite {
            none: Some(members),
            ..Composite::default()
        })
    }

    /// DSL condition text.
    #[must_use]
    pub fn dsl(text: impl Into<String>) -> Self {
        Self::Dsl(text.into())
    }

    fn from_triple(items: &[Value]) -> Option<Self> {
        let (selector, op, operand) = match items {
            [selector, op] => (selector, op, None),
            [selector, op, operand] => (selector, op, Some(operand.clone())),
            _ => return None,
        };
        Some(Self::Comparison {
            selector: selector.as_str()?.to_owned(),
            op: Operator::parse(op.as_str()?)?,
            operand,
        })
    }

    fn from_composite(map: &Map<String, Value>) -> Option<Self> {
        if map.is_empty() {
            return None;
        }
        let mut composite = Composite::default();
        for (key, members) in map {
            let slot = match key.as_str() {
                "all" => &mut composite.all,
                "any" => &mut composite.any,
                "none" => &mut composite.none,
                _ => return None,
            };
            let members = members.as_array()?;
            *slot = Some(members.iter().cloned().map(Self::from).collect());
        }
        Some(Self::Composite(composite))
    }
}

impl From<Value> for Condition {
    fn from(value: Value) -> Self {
        let parsed = match &value {
            Value::Bool(b) => Some(Self::Literal(*b)),
            Value::String(text) => Some(Self::Dsl(text.clone())),
            Value::Array(items) => Self::from_triple(items),
            Value::Object(map) => Self::from_composite(map),
            _ => None,
        };
        parsed.unwrap_or(Self::Malformed(value))
    }
}

impl From<Condition> for Value {
    fn from(condition: Condition) -> Self {
        match condition {
            Condition::Literal(b) => Self::Bool(b),
            Condition::Comparison {
                selector,
                op,
                operand,
            } => {
                let mut items = vec![Self::String(selector), Self::String(op.as_str().to_owned())];
                items.extend(operand);
                Self::Array(items)
            }
            Condition::Composite(composite) => {
                let mut map = Map::new();
                for (key, members) in [
                    ("all", composite.all),
                    ("any", composite.any),
                    ("none", composite.none),
                ] {
                    if let Some(members) = members {
                        map.insert(
                            key.to_owned(),
                            Self::Array(members.into_iter().map(Self::from).collect()),
                        );
                    }
                }
                Self::Object(map)
            }
            Condition::Dsl(text) => Self::String(text),
            Condition::Malformed(raw) => raw,
        }
    }
}

impl From<bool> for Condition {
    fn from(value: bool) -> Self {
        Self::Literal(value)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_each_shape() {
        assert_eq!(Condition::from(json!(true)), Condition::Literal(true));
        assert_eq!(
            Condition::from(json!(["values.age", ">=", 18])),
            Condition::compare("values.age", Operator::Ge, 18)
        );
        assert_eq!(
            Condition::from(json!(["values.state", "filled"])),
            Condition::check("values.state", Operator::Filled)
        );
        assert_eq!(
            Condition::from(json!("values.a == 1")),
            Condition::dsl("values.a == 1")
        );
        assert_eq!(
            Condition::from(json!({"any": [true, false]})),
            Condition::any(vec![Condition::Literal(true), Condition::Literal(false)])
        );
    }

    #[test]
    fn nested_composites() {
        let condition = Condition::from(json!({
            "all": [["values.a", "==", 1], {"none": [["values.b", "empty"]]}],
            "any": []
        }));
        let Condition::Composite(composite) = condition else {
            panic!("expected composite");
        };
        assert_eq!(composite.all.as_ref().map(Vec::len), Some(2));
        assert_eq!(composite.any, Some(vec![]));
        assert_eq!(composite.none, None);
    }

    #[test]
    fn unrecognised_shapes_are_malformed() {
        for raw in [
            json!({}),
            json!({"either": []}),
            json!({"all": true}),
            json!(["values.a", "===", 1]),
            json!(["values.a"]),
            json!([1, "==", 1]),
            json!(42),
            json!(null),
        ] {
            assert_eq!(Condition::from(raw.clone()), Condition::Malformed(raw));
        }
    }

    #[test]
    fn serde_roundtrip_preserves_shape() {
        let raw = json!({
            "all": [["values.a", "in", ["x", "y"]], "values.b filled", {"oops": 1}],
            "none": [false]
        });
        let condition: Condition = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&condition).unwrap(), raw);
    }
}
