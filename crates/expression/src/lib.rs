//! # formwork-expression
//!
//! Everything that reads a [`Context`](formwork_schema::Context):
//!
//! - [`condition`]: compile and evaluate rule conditions in all four shapes
//! - [`dsl`]: the `when <condition> -> <effect>` rule language
//! - [`arithmetic`]: the restricted evaluator behind `derive`
//! - [`compare`]: operator semantics shared by all of the above
//!
//! ```
//! use formwork_expression::{dsl, evaluate_derived};
//! use formwork_schema::Context;
//! use serde_json::json;
//!
//! let ctx = Context::new()
//!     .with_value("builtUpArea", json!(120))
//!     .with_value("plotArea", json!(200));
//!
//! let rule = dsl::parse_dsl_rule(
//!     "when values.plotArea > 0 -> derive(values.builtUpArea / values.plotArea)",
//! )
//! .unwrap();
//! assert!(rule.condition.evaluate(&ctx));
//! if let dsl::Effect::Derive(expr) = &rule.effect {
//!     assert_eq!(evaluate_derived(expr, &ctx), Some(0.6));
//! }
//! ```

pub mod arithmetic;
pub mod compare;
pub mod condition;
pub mod dsl;

pub use arithmetic::{evaluate_derived, referenced_paths};
pub use condition::{CompiledCondition, evaluate};
