//! Compiled conditions.

use formwork_schema::{Condition, Context, Operator};
use serde_json::Value;
use tracing::debug;

use crate::compare;
use crate::dsl::{self, ConditionChain};

/// A [`Condition`] with its DSL text parsed up front, ready to evaluate
/// many times.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledCondition {
    /// Literal, or anything that could not be understood (always `false`).
    Constant(bool),
    Comparison {
        selector: String,
        op: Operator,
        operand: Option<Value>,
    },
    Composite {
        all: Option<Vec<CompiledCondition>>,
        any: Option<Vec<CompiledCondition>>,
        none: Option<Vec<CompiledCondition>>,
    },
    Chain(ConditionChain),
}

impl CompiledCondition {
    /// Compile a condition. Malformed shapes and unparseable DSL text become
    /// `Constant(false)`.
    #[must_use]
    pub fn compile(condition: &Condition) -> Self {
        match condition {
            Condition::Literal(b) => Self::Constant(*b),
            Condition::Comparison {
                selector,
                op,
                operand,
            } => Self::Comparison {
                selector: selector.clone(),
                op: *op,
                operand: operand.clone(),
            },
            Condition::Composite(composite) => {
                let compile_all = |members: &Vec<Condition>| -> Vec<Self> {
                    members.iter().map(Self::compile).collect()
                };
                Self::Composite {
                    all: composite.all.as_ref().map(compile_all),
                    any: composite.any.as_ref().map(compile_all),
                    none: composite.none.as_ref().map(compile_all),
                }
            }
            Condition::Dsl(text) => match dsl::parse_condition(text) {
                Some(chain) => Self::Chain(chain),
                None => {
                    debug!(condition = %text, "skipping unparseable condition");
                    Self::Constant(false)
                }
            },
            Condition::Malformed(raw) => {
                debug!(condition = %raw, "skipping malformed condition");
                Self::Constant(false)
            }
        }
    }

    /// Evaluate against a context.
    #[must_use]
    pub fn evaluate(&self, context: &Context) -> bool {
        match self {
            Self::Constant(b) => *b,
            Self::Comparison {
                selector,
                op,
                operand,
            } => compare::apply(*op, &context.resolve(selector), operand.as_ref()),
            Self::Composite { all, any, none } => {
                all.as_ref()
                    .is_none_or(|members| members.iter().all(|c| c.evaluate(context)))
                    && any
                        .as_ref()
                        .is_none_or(|members| members.iter().any(|c| c.evaluate(context)))
                    && none
                        .as_ref()
                        .is_none_or(|members| !members.iter().any(|c| c.evaluate(context)))
            }
            Self::Chain(chain) => chain.evaluate(context),
        }
    }

    /// Selectors this condition reads, as written.
    #[must_use]
    pub fn references(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<String>) {
        match self {
            Self::Constant(_) => {}
            Self::Comparison { selector, .. } => out.push(selector.clone()),
            Self::Composite { all, any, none } => {
                for members in [all, any, none].into_iter().flatten() {
                    members.iter().for_each(|c| c.collect_references(out));
                }
            }
            Self::Chain(chain) => out.extend(chain.references()),
        }
    }
}

/// Evaluate a condition once. Prefer [`CompiledCondition`] for repeated use.
#[must_use]
pub fn evaluate(condition: &Condition, context: &Context) -> bool {
    CompiledCondition::compile(condition).evaluate(context)
}
