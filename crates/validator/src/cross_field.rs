//! Checks that read other fields: `sameAs` and `requiredIf`.
//!
//! These run in one pass after every field has been coerced, against a
//! context whose `values` hold the coerced values. User attributes and
//! flags come from the caller's context when one is given.

use formwork_expression::compare;
use formwork_expression::dsl::Literal;
use formwork_schema::context::referenced_field;
use formwork_schema::value::is_empty;
use formwork_schema::{Context, Operator, ValidationKind, ValidationSpec};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
pub(crate) enum CrossFieldKind {
    SameAs {
        other: String,
    },
    RequiredIf {
        when: String,
        op: Operator,
        operand: Option<Literal>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct CrossFieldCheck {
    field_id: String,
    kind: CrossFieldKind,
    message: String,
}

impl CrossFieldCheck {
    /// Compile a `sameAs` / `requiredIf` entry. Entries missing their target
    /// path or naming an unknown operator are skipped.
    pub(crate) fn compile(field_id: &str, spec: &ValidationSpec) -> Option<Self> {
        let (kind, default_message) = match spec.kind {
            ValidationKind::SameAs => {
                let other = spec.other.clone()?;
                let label = referenced_field(&other).unwrap_or(&other).to_owned();
                (CrossFieldKind::SameAs { other }, format!("Must match {label}"))
            }
            ValidationKind::RequiredIf => {
                let when = spec.when.clone()?;
                let op = match spec.op.as_deref() {
                    None => Operator::Filled,
                    Some(token) => {
                        let Some(op) = Operator::parse(token) else {
                            debug!(field = field_id, op = token, "ignoring requiredIf with unknown operator");
                            return None;
                        };
                        op
                    }
                };
                let operand = spec.value.as_ref().map(Literal::from_json);
                (
                    CrossFieldKind::RequiredIf { when, op, operand },
                    "This field is required".to_owned(),
                )
            }
            _ => return None,
        };
        Some(Self {
            field_id: field_id.to_owned(),
            kind,
            message: spec.message.clone().unwrap_or(default_message),
        })
    }

    pub(crate) fn field_id(&self) -> &str {
        &self.field_id
    }

    pub(crate) fn code(&self) -> &'static str {
        match self.kind {
            CrossFieldKind::SameAs { .. } => "sameAs",
            CrossFieldKind::RequiredIf { .. } => "requiredIf",
        }
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }

    /// Whether the check passes against coerced values.
    pub(crate) fn passes(&self, context: &Context) -> bool {
        let own = context.values().get(&self.field_id).unwrap_or(&Value::Null);
        match &self.kind {
            CrossFieldKind::SameAs { other } => *own == *context.resolve(other),
            CrossFieldKind::RequiredIf { when, op, operand } => {
                let right = operand.as_ref().map(|literal| literal.resolve(context));
                let triggered = compare::apply(*op, &context.resolve(when), right.as_deref());
                !triggered || !(is_empty(own) || *own == Value::Bool(false))
            }
        }
    }
}
