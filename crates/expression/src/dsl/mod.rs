//! The textual rule language.
//!
//! ```text
//! Rule      := "when" Condition "->" Effect
//! Condition := Clause {("AND" | "OR") Clause}
//! Clause    := Selector Operator [Literal]
//! Effect    := "hide" | "show" | "disable" | "enable" | "require" | "unrequire"
//!            | "derive" "(" Expression ")"
//! ```
//!
//! Parsing never fails loudly: text that does not fit the grammar yields
//! `None`, and callers treat such a rule as one that never matches.

mod literal;
mod parser;
mod scanner;

pub use literal::{Literal, RegexLiteral, compile_pattern};
pub use parser::{Clause, ConditionChain, DslRule, Effect, parse_condition, parse_dsl_rule};
pub use scanner::Connective;
