//! # formwork-validator
//!
//! Compiles the validations of a [`FormSchema`](formwork_schema::FormSchema)
//! into a [`CompiledValidator`] that checks value sets and reports
//! [`Issue`]s by field path.
//!
//! Each field's raw value is first coerced to its kind's base type, then
//! its checks run in declaration order. `sameAs` and `requiredIf` read
//! other fields, so they run in a single pass after every field has been
//! coerced. Repeater rows are checked with a nested validator and report
//! paths like `owners.1.name`.
//!
//! Unknown validation types and malformed patterns are skipped.
//!
//! ```
//! use formwork_schema::{FieldKind, FieldSpec, FormSchema, Section, ValidationSpec};
//! use serde_json::json;
//!
//! let schema = FormSchema::new("signup").with_section(
//!     Section::new("account", "Account")
//!         .with_field(FieldSpec::new("password", FieldKind::Password))
//!         .with_field(
//!             FieldSpec::new("confirmPassword", FieldKind::Password)
//!                 .with_validation(ValidationSpec::same_as("values.password")),
//!         ),
//! );
//! let validator = formwork_validator::compile(&schema);
//!
//! let values = json!({"password": "x", "confirmPassword": "y"});
//! let issues = validator.check(values.as_object().unwrap());
//! assert_eq!(issues.len(), 1);
//! assert_eq!(issues[0].field_id, "confirmPassword");
//! ```

mod check;
pub mod coerce;
mod compiler;
mod cross_field;
pub mod issue;

pub use coerce::{CoerceError, Coerced, coerce, parse_date};
pub use compiler::{CompiledValidator, compile};
pub use issue::Issue;
