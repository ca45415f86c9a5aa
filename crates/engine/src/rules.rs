//! Rule compilation and aggregation into per-field effects.

use std::collections::HashSet;

use formwork_expression::dsl::{self, Effect as DslEffect};
use formwork_expression::{CompiledCondition, evaluate_derived, referenced_paths};
use formwork_schema::{
    Context, Effect, EffectMap, FieldSpec, FormSchema, RuleAction, RuleDialect, RuleSpec,
};
use serde_json::Value;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Hidden,
    Disabled,
    Required,
}

impl Flag {
    fn slot(self, effect: &mut Effect) -> &mut bool {
        match self {
            Self::Hidden => &mut effect.hidden,
            Self::Disabled => &mut effect.disabled,
            Self::Required => &mut effect.required,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Set(Flag),
    Reset(Flag),
    Derive(String),
}

impl Action {
    fn is_reset(&self) -> bool {
        matches!(self, Self::Reset(_))
    }
}

/// One rule with its condition compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    condition: CompiledCondition,
    action: Action,
}

impl CompiledRule {
    /// Compile a rule. Unparseable DSL text, unknown actions and `derive`
    /// without an expression give `None`, as do reset actions under the
    /// additive dialect.
    #[must_use]
    pub fn compile(spec: &RuleSpec, dialect: RuleDialect) -> Option<Self> {
        let rule = match spec {
            RuleSpec::Dsl(text) => {
                let Some(parsed) = dsl::parse_dsl_rule(text) else {
                    debug!(rule = %text, "skipping unparseable rule");
                    return None;
                };
                Self {
                    condition: CompiledCondition::Chain(parsed.condition),
                    action: dsl_action(parsed.effect),
                }
            }
            RuleSpec::Structured {
                when,
                action,
                value,
            } => Self {
                condition: CompiledCondition::compile(when),
                action: structured_action(action, value.as_deref())?,
            },
        };

        if dialect == RuleDialect::Additive && rule.action.is_reset() {
            debug!(action = ?rule.action, "additive dialect ignores reset actions");
            return None;
        }
        Some(rule)
    }

    /// Apply the rule to an effect if its condition holds.
    fn apply(&self, context: &Context, effect: &mut Effect) {
        if !self.condition.evaluate(context) {
            return;
        }
        match &self.action {
            Action::Set(flag) => *flag.slot(effect) = true,
            Action::Reset(flag) => *flag.slot(effect) = false,
            Action::Derive(expression) => effect.derived = evaluate_derived(expression, context),
        }
    }

    /// The arithmetic expression of a `derive` rule.
    #[must_use]
    pub fn derive_expression(&self) -> Option<&str> {
        match &self.action {
            Action::Derive(expression) => Some(expression),
            _ => None,
        }
    }

    /// Every selector the rule reads, condition first.
    #[must_use]
    pub fn references(&self) -> Vec<String> {
        let mut refs = self.condition.references();
        if let Some(expression) = self.derive_expression() {
            refs.extend(referenced_paths(expression));
        }
        refs
    }
}

fn dsl_action(effect: DslEffect) -> Action {
    match effect {
        DslEffect::Hide => Action::Set(Flag::Hidden),
        DslEffect::Show => Action::Reset(Flag::Hidden),
        DslEffect::Disable => Action::Set(Flag::Disabled),
        DslEffect::Enable => Action::Reset(Flag::Disabled),
        DslEffect::Require => Action::Set(Flag::Required),
        DslEffect::Unrequire => Action::Reset(Flag::Required),
        DslEffect::Derive(expression) => Action::Derive(expression),
    }
}

fn structured_action(action: &RuleAction, value: Option<&str>) -> Option<Action> {
    Some(match action {
        RuleAction::Hide => Action::Set(Flag::Hidden),
        RuleAction::Show => Action::Reset(Flag::Hidden),
        RuleAction::Disable => Action::Set(Flag::Disabled),
        RuleAction::Enable => Action::Reset(Flag::Disabled),
        RuleAction::Require => Action::Set(Flag::Required),
        RuleAction::Unrequire => Action::Reset(Flag::Required),
        RuleAction::Derive => {
            let Some(expression) = value else {
                debug!("skipping derive rule without an expression");
                return None;
            };
            Action::Derive(expression.to_owned())
        }
        RuleAction::Unknown(name) => {
            debug!(action = %name, "skipping rule with unknown action");
            return None;
        }
    })
}

/// Compiled rules of one field, plus its row fields for repeaters.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRules {
    field_id: String,
    rules: Vec<CompiledRule>,
    item: Option<Vec<FieldRules>>,
}

impl FieldRules {
    #[must_use]
    pub fn compile(field: &FieldSpec, dialect: RuleDialect) -> Self {
        Self {
            field_id: field.id.clone(),
            rules: field
                .rules
                .iter()
                .filter_map(|rule| CompiledRule::compile(rule, dialect))
                .collect(),
            item: field.item.as_ref().map(|_| {
                field
                    .item_fields()
                    .iter()
                    .map(|child| Self::compile(child, dialect))
                    .collect()
            }),
        }
    }

    #[must_use]
    pub fn field_id(&self) -> &str {
        &self.field_id
    }

    #[must_use]
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Row field rules, for repeaters.
    #[must_use]
    pub fn item(&self) -> Option<&[FieldRules]> {
        self.item.as_deref()
    }

    /// Apply every rule in declared order to a fresh default effect.
    #[must_use]
    pub fn evaluate(&self, context: &Context) -> Effect {
        let mut effect = Effect::default();
        for rule in &self.rules {
            rule.apply(context, &mut effect);
        }
        effect
    }

    /// Insert this field's effect, and for repeaters every row field's
    /// effect, into `out`.
    pub fn evaluate_into(&self, context: &Context, prefix: Option<&str>, out: &mut EffectMap) {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{}", self.field_id),
            None => self.field_id.clone(),
        };
        out.insert(path.clone(), self.evaluate(context));

        let Some(item) = &self.item else {
            return;
        };
        let Some(Value::Array(rows)) = context.values().get(&self.field_id) else {
            return;
        };
        for (index, row) in rows.iter().enumerate() {
            let row_context = context.for_row(row);
            let row_path = format!("{path}.{index}");
            for child in item {
                child.evaluate_into(&row_context, Some(&row_path), out);
            }
        }
    }
}

/// Rules of every top-level field in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    fields: Vec<FieldRules>,
}

impl RuleSet {
    #[must_use]
    pub fn compile(schema: &FormSchema) -> Self {
        Self {
            fields: schema
                .fields()
                .map(|field| FieldRules::compile(field, schema.dialect))
                .collect(),
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldRules] {
        &self.fields
    }

    /// Effects for every field, including repeater rows.
    #[must_use]
    pub fn evaluate(&self, context: &Context) -> EffectMap {
        let mut out = EffectMap::new();
        for field in &self.fields {
            field.evaluate_into(context, None, &mut out);
        }
        trace!(effects = out.len(), "evaluated rules");
        out
    }

    /// Effects for the named top-level fields only.
    #[must_use]
    pub fn evaluate_only(&self, context: &Context, field_ids: &HashSet<&str>) -> EffectMap {
        let mut out = EffectMap::new();
        for field in self
            .fields
            .iter()
            .filter(|field| field_ids.contains(field.field_id.as_str()))
        {
            field.evaluate_into(context, None, &mut out);
        }
        trace!(effects = out.len(), requested = field_ids.len(), "evaluated changed rules");
        out
    }
}

/// Evaluate one field's rules under the standard dialect.
#[must_use]
pub fn evaluate_field(field: &FieldSpec, context: &Context) -> Effect {
    FieldRules::compile(field, RuleDialect::Standard).evaluate(context)
}
