//! # formwork-engine
//!
//! Composition root of formwork. [`FormEngine::compile`] turns a
//! [`FormSchema`] into a [`CompiledForm`] holding:
//!
//! - the [`CompiledValidator`](formwork_validator::CompiledValidator) for
//!   checking submitted values,
//! - the compiled rules that produce one [`Effect`] per field, and
//! - a static dependency map so hosts can re-evaluate only the fields a
//!   change affects.
//!
//! Compilation rejects duplicate field ids, references to fields that do
//! not exist and derive rules that feed into each other. Everything else
//! that is malformed (unparseable rules, unknown actions, bad patterns) is
//! skipped and logged at `debug`.
//!
//! ```
//! use formwork_engine::FormEngine;
//! use formwork_schema::Context;
//! use serde_json::json;
//!
//! let engine = FormEngine::default();
//! let form = engine.compile_json(r#"{
//!     "id": "site",
//!     "sections": [{"id": "plot", "title": "Plot", "fields": [
//!         {"id": "builtUpArea", "type": "number"},
//!         {"id": "plotArea", "type": "number"},
//!         {"id": "far", "type": "number", "rules": [
//!             "when values.builtUpArea > 0 AND values.plotArea > 0 -> derive(values.builtUpArea / values.plotArea)"
//!         ]}
//!     ]}]
//! }"#)?;
//!
//! let ctx = Context::new()
//!     .with_value("builtUpArea", json!(120))
//!     .with_value("plotArea", json!(200));
//! assert_eq!(form.evaluate(&ctx)["far"].derived, Some(0.6));
//! # Ok::<(), formwork_schema::SchemaError>(())
//! ```
//!
//! [`FormSchema`]: formwork_schema::FormSchema
//! [`Effect`]: formwork_schema::Effect

pub mod config;
mod engine;
mod graph;
pub mod rules;

pub use config::EngineConfig;
pub use engine::{CompiledForm, FormEngine, compile, evaluate_rules, fingerprint};
pub use formwork_expression::evaluate_derived;
pub use rules::{CompiledRule, FieldRules, RuleSet, evaluate_field};
