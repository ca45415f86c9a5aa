//! Compiling a schema's validations into a reusable validator.

use formwork_schema::{
    BaseType, Context, EffectMap, FieldSpec, FormSchema, ValidationKind, ValidationSpec,
};
use serde_json::{Map, Value};
use tracing::trace;

use crate::check::{Check, static_code};
use crate::coerce::{Coerced, coerce};
use crate::cross_field::CrossFieldCheck;
use crate::issue::{INVALID_TYPE, Issue};

const REQUIRED_MESSAGE: &str = "This field is required";
const ROW_MESSAGE: &str = "Each item must be an object";

/// Validator for one field.
#[derive(Debug, Clone)]
struct FieldValidator {
    field_id: String,
    base: BaseType,
    /// Message of the field's own `required` entry, if it has one.
    required: Option<String>,
    checks: Vec<Check>,
    /// Row validator for repeaters.
    item: Option<Box<CompiledValidator>>,
}

impl FieldValidator {
    fn compile(field: &FieldSpec) -> (Self, Vec<CrossFieldCheck>) {
        let base = field.kind.base_type();
        let mut required = None;
        let mut checks = Vec::new();
        let mut cross = Vec::new();

        for spec in &field.validations {
            match spec.kind {
                ValidationKind::Required => {
                    required = Some(required_message(spec));
                }
                ValidationKind::SameAs | ValidationKind::RequiredIf => {
                    cross.extend(CrossFieldCheck::compile(&field.id, spec));
                }
                _ => checks.extend(Check::compile(spec, base)),
            }
        }

        let item = (base == BaseType::Rows)
            .then(|| Box::new(CompiledValidator::from_fields(field.item_fields())));

        let validator = Self {
            field_id: field.id.clone(),
            base,
            required,
            checks,
            item,
        };
        (validator, cross)
    }

    /// Validate one raw value, pushing issues and returning the coerced value
    /// for the cross-field pass.
    fn check_into(&self, raw: &Value, scope: &Scope<'_>, issues: &mut Vec<Issue>) -> Value {
        let path = scope.path(&self.field_id);
        let coerced = match coerce(self.base, raw) {
            Ok(coerced) => coerced,
            Err(failure) => {
                issues.push(Issue::new(&path, failure.code(), failure.message()));
                return raw.clone();
            }
        };

        let forced = scope.effect_required(&path);
        let required = self
            .required
            .as_deref()
            .or(forced.then_some(REQUIRED_MESSAGE));

        if coerced.is_missing()
            && let Some(message) = required
        {
            issues.push(Issue::new(&path, static_code(&ValidationKind::Required), message));
            return coerced.to_value();
        }
        if coerced.is_empty() && self.base != BaseType::Rows {
            return coerced.to_value();
        }

        for check in &self.checks {
            if !check.passes(&coerced) {
                issues.push(Issue::new(&path, check.code(), check.message()));
            }
        }

        if let (Coerced::Rows(rows), Some(item)) = (&coerced, &self.item) {
            for (index, row) in rows.iter().enumerate() {
                let row_path = format!("{path}.{index}");
                match row.as_object() {
                    Some(row_values) => {
                        item.check_into(row_values, &scope.nested(row_path), issues);
                    }
                    None => issues.push(Issue::new(row_path, INVALID_TYPE, ROW_MESSAGE)),
                }
            }
        }

        coerced.to_value()
    }
}

fn required_message(spec: &ValidationSpec) -> String {
    spec.message
        .clone()
        .unwrap_or_else(|| REQUIRED_MESSAGE.to_owned())
}

/// Path prefix, optional rule effects and the ambient context (user,
/// flags) for one level of validation.
struct Scope<'a> {
    prefix: Option<String>,
    effects: Option<&'a EffectMap>,
    ambient: Option<&'a Context>,
}

impl<'a> Scope<'a> {
    fn root(effects: Option<&'a EffectMap>, ambient: Option<&'a Context>) -> Self {
        Self {
            prefix: None,
            effects,
            ambient,
        }
    }

    fn nested(&self, prefix: String) -> Self {
        Self {
            prefix: Some(prefix),
            effects: self.effects,
            ambient: self.ambient,
        }
    }

    /// Context for the cross-field pass: coerced values over the ambient
    /// user, tenant and flags.
    fn context(&self, coerced: Map<String, Value>) -> Context {
        match self.ambient {
            Some(ambient) => ambient.clone().with_values(coerced),
            None => Context::from_values(coerced),
        }
    }

    fn path(&self, field_id: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{field_id}"),
            None => field_id.to_owned(),
        }
    }

    fn effect_hidden(&self, path: &str) -> bool {
        self.effects
            .and_then(|effects| effects.get(path))
            .is_some_and(|effect| effect.hidden)
    }

    fn effect_required(&self, path: &str) -> bool {
        self.effects
            .and_then(|effects| effects.get(path))
            .is_some_and(|effect| effect.required)
    }
}

/// Validator for a whole schema (or one repeater's row schema).
///
/// Compiled once, then used for any number of [`check`](Self::check) calls.
#[derive(Debug, Clone)]
pub struct CompiledValidator {
    fields: Vec<FieldValidator>,
    cross_field: Vec<CrossFieldCheck>,
}

impl CompiledValidator {
    /// Compile every top-level field of a schema.
    #[must_use]
    pub fn compile(schema: &FormSchema) -> Self {
        Self::from_fields(schema.fields())
    }

    /// Compile a flat list of fields.
    #[must_use]
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a FieldSpec>) -> Self {
        let mut validators = Vec::new();
        let mut cross_field = Vec::new();
        for field in fields {
            let (validator, cross) = FieldValidator::compile(field);
            validators.push(validator);
            cross_field.extend(cross);
        }
        Self {
            fields: validators,
            cross_field,
        }
    }

    /// Number of fields at this level.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Validate a value set. Returns every issue; empty means valid.
    #[must_use]
    pub fn check(&self, values: &Map<String, Value>) -> Vec<Issue> {
        let mut issues = Vec::new();
        self.check_into(values, &Scope::root(None, None), &mut issues);
        trace!(fields = self.fields.len(), issues = issues.len(), "validated");
        issues
    }

    /// Validate with rule effects applied: hidden fields are skipped and
    /// fields a rule marked required are checked as required.
    #[must_use]
    pub fn check_with_effects(&self, values: &Map<String, Value>, effects: &EffectMap) -> Vec<Issue> {
        let mut issues = Vec::new();
        self.check_into(values, &Scope::root(Some(effects), None), &mut issues);
        trace!(fields = self.fields.len(), issues = issues.len(), "validated with effects");
        issues
    }

    /// Validate a context's values. `requiredIf` conditions may read the
    /// context's `user.*` and `flags.*`; with `effects`, hidden fields are
    /// skipped and rule-required fields are checked as required.
    #[must_use]
    pub fn check_context(&self, context: &Context, effects: Option<&EffectMap>) -> Vec<Issue> {
        let mut issues = Vec::new();
        self.check_into(context.values(), &Scope::root(effects, Some(context)), &mut issues);
        trace!(fields = self.fields.len(), issues = issues.len(), "validated in context");
        issues
    }

    /// Whether a value set has no issues.
    #[must_use]
    pub fn is_valid(&self, values: &Map<String, Value>) -> bool {
        self.check(values).is_empty()
    }

    fn check_into(&self, values: &Map<String, Value>, scope: &Scope<'_>, issues: &mut Vec<Issue>) {
        let mut coerced = values.clone();
        for field in &self.fields {
            if scope.effect_hidden(&scope.path(&field.field_id)) {
                continue;
            }
            let raw = values.get(&field.field_id).unwrap_or(&Value::Null);
            let value = field.check_into(raw, scope, issues);
            coerced.insert(field.field_id.clone(), value);
        }

        if self.cross_field.is_empty() {
            return;
        }
        let context = scope.context(coerced);
        for check in &self.cross_field {
            let path = scope.path(check.field_id());
            if scope.effect_hidden(&path) {
                continue;
            }
            if !check.passes(&context) {
                issues.push(Issue::new(path, check.code(), check.message()));
            }
        }
    }
}

/// Compile a schema's validations.
#[must_use]
pub fn compile(schema: &FormSchema) -> CompiledValidator {
    CompiledValidator::compile(schema)
}
