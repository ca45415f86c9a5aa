//! Compiled forms and the caching engine that produces them.

use std::collections::HashSet;
use std::sync::Arc;

use formwork_schema::{Context, EffectMap, FieldSpec, FormSchema, SchemaError};
use formwork_validator::{CompiledValidator, Issue};
use moka::sync::Cache;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::EngineConfig;
use crate::graph::{self, Dependencies};
use crate::rules::RuleSet;

/// Hex SHA-256 of a schema's canonical JSON.
///
/// Object keys serialize sorted, so two documents that differ only in key
/// order share a fingerprint.
pub fn fingerprint(schema: &FormSchema) -> Result<String, SchemaError> {
    let bytes = serde_json::to_vec(schema).map_err(|e| SchemaError::SerializationError {
        error: e.to_string(),
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// A schema compiled into its validator, rule set and dependency map.
///
/// Immutable once built; share it behind an [`Arc`] across threads.
#[derive(Debug, Clone)]
pub struct CompiledForm {
    schema: Arc<FormSchema>,
    validator: CompiledValidator,
    rules: RuleSet,
    dependencies: Dependencies,
    fingerprint: String,
}

impl CompiledForm {
    /// Compile with the default configuration.
    pub fn compile(schema: &FormSchema) -> Result<Self, SchemaError> {
        Self::compile_with(schema, &EngineConfig::default())
    }

    /// Compile, rejecting structural errors the configuration asks for.
    /// Duplicate field ids are always rejected.
    pub fn compile_with(schema: &FormSchema, config: &EngineConfig) -> Result<Self, SchemaError> {
        let fingerprint = fingerprint(schema)?;
        Self::build(schema, config, fingerprint)
    }

    fn build(
        schema: &FormSchema,
        config: &EngineConfig,
        fingerprint: String,
    ) -> Result<Self, SchemaError> {
        schema.check_unique_ids()?;

        let rules = RuleSet::compile(schema);
        let fields: Vec<&FieldSpec> = schema.fields().collect();
        if config.strict_references {
            graph::check_references(&fields, rules.fields())?;
        }
        if config.reject_derive_cycles {
            graph::check_derive_cycles(&fields, rules.fields())?;
        }
        let dependencies = Dependencies::build(&fields, rules.fields());
        let validator = CompiledValidator::compile(schema);

        debug!(
            schema = %schema.id,
            fields = fields.len(),
            fingerprint = %fingerprint,
            "compiled form"
        );
        Ok(Self {
            schema: Arc::new(schema.clone()),
            validator,
            rules,
            dependencies,
            fingerprint,
        })
    }

    #[must_use]
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    #[must_use]
    pub fn validator(&self) -> &CompiledValidator {
        &self.validator
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Validate values, ignoring rule effects.
    #[must_use]
    pub fn check(&self, values: &Map<String, Value>) -> Vec<Issue> {
        self.validator.check(values)
    }

    /// Validate the context's values with rule effects applied: hidden
    /// fields are skipped and rule-required fields must be filled.
    /// `requiredIf` conditions see the context's user and flags.
    #[must_use]
    pub fn check_effective(&self, context: &Context) -> Vec<Issue> {
        let effects = self.evaluate(context);
        self.validator.check_context(context, Some(&effects))
    }

    /// Effects for every field, recomputed from scratch.
    #[must_use]
    pub fn evaluate(&self, context: &Context) -> EffectMap {
        self.rules.evaluate(context)
    }

    /// Effects for only the fields whose rules read one of the changed
    /// selectors. Bare paths mean `values.<path>`.
    #[must_use]
    pub fn evaluate_changed<S: AsRef<str>>(&self, context: &Context, changed: &[S]) -> EffectMap {
        let affected: HashSet<&str> = self.dependencies.affected(changed).into_iter().collect();
        self.rules.evaluate_only(context, &affected)
    }

    /// Ids of top-level fields whose rules read one of the changed
    /// selectors, in schema order.
    #[must_use]
    pub fn affected_fields<S: AsRef<str>>(&self, changed: &[S]) -> Vec<String> {
        self.dependencies
            .affected(changed)
            .into_iter()
            .map(str::to_owned)
            .collect()
    }
}

/// Compiles schemas and keeps the results keyed by fingerprint.
///
/// The cache is the engine's only mutable state. It is safe to share one
/// engine across threads.
#[derive(Debug, Clone)]
pub struct FormEngine {
    config: EngineConfig,
    cache: Option<Cache<String, Arc<CompiledForm>>>,
}

impl Default for FormEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl FormEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let cache = config
            .cache_enabled
            .then(|| Cache::builder().max_capacity(config.cache_capacity).build());
        Self { config, cache }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compile a schema, reusing a cached result for an identical document.
    pub fn compile(&self, schema: &FormSchema) -> Result<Arc<CompiledForm>, SchemaError> {
        let fingerprint = fingerprint(schema)?;
        let Some(cache) = &self.cache else {
            return CompiledForm::build(schema, &self.config, fingerprint).map(Arc::new);
        };

        let mut missed = false;
        let compiled = cache
            .try_get_with(fingerprint.clone(), || {
                missed = true;
                CompiledForm::build(schema, &self.config, fingerprint.clone()).map(Arc::new)
            })
            .map_err(|e| (*e).clone())?;
        debug!(schema = %schema.id, fingerprint = %fingerprint, hit = !missed, "form cache lookup");
        Ok(compiled)
    }

    /// Parse and compile a JSON schema document.
    pub fn compile_json(&self, document: &str) -> Result<Arc<CompiledForm>, SchemaError> {
        self.compile(&FormSchema::from_json(document)?)
    }

    /// Validate values against a compiled form.
    #[must_use]
    pub fn validate(&self, compiled: &CompiledForm, values: &Map<String, Value>) -> Vec<Issue> {
        compiled.check(values)
    }

    /// Compile (or fetch) a schema and evaluate its rules.
    pub fn evaluate_rules(
        &self,
        schema: &FormSchema,
        context: &Context,
    ) -> Result<EffectMap, SchemaError> {
        Ok(self.compile(schema)?.evaluate(context))
    }

    /// Drop every cached compiled form.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
            cache.run_pending_tasks();
        }
    }

    /// Number of cached compiled forms.
    #[must_use]
    pub fn cache_len(&self) -> u64 {
        self.cache.as_ref().map_or(0, |cache| {
            cache.run_pending_tasks();
            cache.entry_count()
        })
    }
}

/// Compile a schema with the default configuration and no cache.
pub fn compile(schema: &FormSchema) -> Result<CompiledForm, SchemaError> {
    CompiledForm::compile(schema)
}

/// Compile a schema and evaluate its rules once.
pub fn evaluate_rules(schema: &FormSchema, context: &Context) -> Result<EffectMap, SchemaError> {
    Ok(compile(schema)?.evaluate(context))
}

#[cfg(test)]
mod tests {
    use formwork_schema::{FieldKind, RuleSpec, Section, ValidationSpec};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn signup() -> FormSchema {
        FormSchema::new("signup").with_section(
            Section::new("account", "Account")
                .with_field(FieldSpec::new("password", FieldKind::Password))
                .with_field(
                    FieldSpec::new("confirm", FieldKind::Password)
                        .with_validation(ValidationSpec::same_as("values.password"))
                        .with_rule(RuleSpec::dsl("when values.password empty -> hide")),
                ),
        )
    }

    // ── Fingerprints ──

    #[test]
    fn fingerprint_ignores_key_order() {
        let a = FormSchema::from_json(r#"{"id":"f","version":1,"sections":[]}"#).unwrap();
        let b = FormSchema::from_json(r#"{"sections":[],"version":1,"id":"f"}"#).unwrap();
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
        assert_eq!(fingerprint(&a).unwrap().len(), 64);

        let c = a.clone().with_version(2);
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&c).unwrap());
    }

    // ── Compiled form ──

    #[test]
    fn effective_check_skips_hidden_fields() {
        let form = compile(&signup()).unwrap();
        let ctx = Context::new()
            .with_value("password", json!(""))
            .with_value("confirm", json!("typo"));

        assert_eq!(form.check(ctx.values()).len(), 1);
        assert!(form.check_effective(&ctx).is_empty());
    }

    #[test]
    fn evaluate_changed_limits_fields() {
        let form = compile(&signup()).unwrap();
        let ctx = Context::new().with_value("password", json!(""));

        let effects = form.evaluate_changed(&ctx, &["password"]);
        assert_eq!(effects.keys().collect::<Vec<_>>(), ["confirm"]);
        assert!(effects["confirm"].hidden);
        assert!(form.evaluate_changed(&ctx, &["user.role"]).is_empty());
        assert_eq!(form.affected_fields(&["values.password"]), ["confirm"]);
    }

    #[test]
    fn lenient_config_allows_dangling_references() {
        let schema = FormSchema::new("loose").with_section(Section::new("s", "S").with_field(
            FieldSpec::new("a", FieldKind::Text).with_rule(RuleSpec::dsl("when values.ghost filled -> hide")),
        ));
        assert!(CompiledForm::compile(&schema).is_err());

        let config = EngineConfig::default().with_strict_references(false);
        let form = CompiledForm::compile_with(&schema, &config).unwrap();
        assert!(!form.evaluate(&Context::new())["a"].hidden);
    }

    // ── Engine cache ──

    #[test]
    fn engine_reuses_compiled_forms() {
        let engine = FormEngine::default();
        let first = engine.compile(&signup()).unwrap();
        let second = engine.compile(&signup()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.cache_len(), 1);

        engine.clear_cache();
        assert_eq!(engine.cache_len(), 0);
        let third = engine.compile(&signup()).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn uncached_engine_compiles_every_time() {
        let engine = FormEngine::new(EngineConfig::uncached());
        let first = engine.compile(&signup()).unwrap();
        let second = engine.compile(&signup()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(engine.cache_len(), 0);
    }

    #[test]
    fn failed_compiles_are_not_cached() {
        let engine = FormEngine::default();
        let broken = FormSchema::new("dup").with_section(
            Section::new("s", "S")
                .with_field(FieldSpec::new("a", FieldKind::Text))
                .with_field(FieldSpec::new("a", FieldKind::Number)),
        );
        assert!(matches!(
            engine.compile(&broken),
            Err(SchemaError::DuplicateFieldId { .. })
        ));
        assert_eq!(engine.cache_len(), 0);
    }
}
