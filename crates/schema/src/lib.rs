//! # formwork-schema
//!
//! Document model for declarative forms: sections of typed fields, each
//! carrying validations and conditional rules, plus the evaluation
//! [`Context`] and the per-field [`Effect`] that rules produce.
//!
//! The model is pure data. Validation lives in `formwork-validator`,
//! condition and arithmetic evaluation in `formwork-expression`, and rule
//! aggregation in `formwork-engine`.
//!
//! ```
//! use formwork_schema::prelude::*;
//!
//! let schema = FormSchema::from_json(r#"{
//!     "id": "signup",
//!     "sections": [{
//!         "id": "account",
//!         "title": "Account",
//!         "fields": [
//!             {"id": "email", "type": "email", "validations": [{"type": "required"}]}
//!         ]
//!     }]
//! }"#)?;
//! assert_eq!(schema.field("email").map(|f| f.kind.base_type()), Some(BaseType::Text));
//! # Ok::<(), SchemaError>(())
//! ```

pub mod condition;
pub mod context;
pub mod effect;
pub mod error;
pub mod field;
pub mod kind;
pub mod operator;
pub mod rule;
pub mod schema;
pub mod validation;
pub mod value;

pub use condition::{Composite, Condition};
pub use context::{Context, Namespace};
pub use effect::{Effect, EffectMap};
pub use error::SchemaError;
pub use field::{FieldSpec, ItemSchema};
pub use kind::{BaseType, FieldKind};
pub use operator::Operator;
pub use rule::{RuleAction, RuleSpec};
pub use schema::{FormSchema, RuleDialect, Section};
pub use validation::{ValidationKind, ValidationSpec};

/// Common imports for building and inspecting schemas.
pub mod prelude {
    pub use crate::condition::Condition;
    pub use crate::context::Context;
    pub use crate::effect::{Effect, EffectMap};
    pub use crate::error::SchemaError;
    pub use crate::field::FieldSpec;
    pub use crate::kind::{BaseType, FieldKind};
    pub use crate::operator::Operator;
    pub use crate::rule::{RuleAction, RuleSpec};
    pub use crate::schema::{FormSchema, RuleDialect, Section};
    pub use crate::validation::{ValidationKind, ValidationSpec};
}
