//! Properties every evaluation must hold regardless of input.

use formwork_engine::{CompiledForm, compile, evaluate_rules};
use formwork_schema::{Context, FormSchema, RuleDialect};
use proptest::prelude::*;
use serde_json::{Value, json};

fn loan_form(dialect: &str) -> FormSchema {
    FormSchema::from_value(json!({
        "id": "loan",
        "version": 1,
        "dialect": dialect,
        "sections": [{"id": "main", "title": "Main", "fields": [
            {"id": "amount", "type": "number"},
            {"id": "city", "type": "select"},
            {"id": "income", "type": "number"},
            {"id": "pan", "type": "text", "rules": [
                "when values.amount > 500000 -> require",
                "when values.amount <= 1000 -> unrequire",
                "when values.city in ['BLR','MUM'] -> hide",
                "when flags.simple truthy -> show",
                {"when": ["values.income", "<", 1], "action": "disable"},
                {"when": {"any": [["values.city", "==", "PUN"]]}, "action": "enable"}
            ]},
            {"id": "ratio", "type": "number", "rules": [
                "when values.income > 0 -> derive(round(values.amount / values.income))"
            ]}
        ]}]
    }))
    .expect("loan form should parse")
}

fn context_strategy() -> impl Strategy<Value = Context> {
    (
        prop_oneof![Just(json!(null)), (0i64..2_000_000).prop_map(Value::from), "[0-9a-z]{0,5}".prop_map(Value::from)],
        prop_oneof![Just("BLR"), Just("MUM"), Just("PUN"), Just("")],
        prop_oneof![Just(json!(0)), (1i64..500_000).prop_map(Value::from)],
        any::<bool>(),
    )
        .prop_map(|(amount, city, income, simple)| {
            Context::new()
                .with_value("amount", amount)
                .with_value("city", json!(city))
                .with_value("income", income)
                .with_flag("simple", json!(simple))
        })
}

proptest! {
    #[test]
    fn evaluation_is_idempotent(ctx in context_strategy()) {
        let form = compile(&loan_form("standard")).unwrap();
        prop_assert_eq!(form.evaluate(&ctx), form.evaluate(&ctx));
        prop_assert_eq!(
            evaluate_rules(&loan_form("standard"), &ctx).unwrap(),
            form.evaluate(&ctx)
        );
    }

    #[test]
    fn compiling_is_deterministic(ctx in context_strategy()) {
        let a = compile(&loan_form("standard")).unwrap();
        let b = compile(&loan_form("standard")).unwrap();
        prop_assert_eq!(a.fingerprint(), b.fingerprint());
        prop_assert_eq!(a.check(ctx.values()), b.check(ctx.values()));
        prop_assert_eq!(a.evaluate(&ctx), b.evaluate(&ctx));
    }

    #[test]
    fn additive_flags_are_monotonic(ctx in context_strategy()) {
        let form = compile(&loan_form("additive")).unwrap();
        prop_assert_eq!(form.schema().dialect, RuleDialect::Additive);
        let effect = form.evaluate(&ctx)["pan"];

        // With resets ignored, any matching setter leaves its flag on.
        let amount = formwork_schema::value::to_number(&ctx.resolve("values.amount"));
        let city = ctx.resolve("values.city").into_owned();
        let income = formwork_schema::value::to_number(&ctx.resolve("values.income"));
        prop_assert_eq!(effect.required, amount > 500_000.0);
        prop_assert_eq!(effect.hidden, city == json!("BLR") || city == json!("MUM"));
        prop_assert_eq!(effect.disabled, income < 1.0);
    }

    #[test]
    fn changed_evaluation_agrees_with_full(ctx in context_strategy()) {
        let form: CompiledForm = compile(&loan_form("standard")).unwrap();
        let full = form.evaluate(&ctx);
        let partial = form.evaluate_changed(&ctx, &["values.income"]);
        prop_assert!(!partial.is_empty());
        for (id, effect) in &partial {
            prop_assert_eq!(Some(effect), full.get(id));
        }
    }
}
