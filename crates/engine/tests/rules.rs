//! Compiling full documents and evaluating their rules.

use formwork_engine::{EngineConfig, FormEngine, evaluate_derived, evaluate_rules};
use formwork_schema::{Context, Effect, FormSchema, SchemaError};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn document(fields: Value) -> FormSchema {
    FormSchema::from_value(json!({
        "id": "doc",
        "version": "2024-06",
        "sections": [{"id": "main", "title": "Main", "fields": fields}]
    }))
    .expect("document should parse")
}

fn property_form() -> FormSchema {
    document(json!([
        {"id": "state", "type": "select"},
        {"id": "city", "type": "select"},
        {"id": "district", "type": "select",
         "rules": ["when values.state filled -> require"]},
        {"id": "builtUpArea", "type": "number"},
        {"id": "plotArea", "type": "number"},
        {"id": "far", "type": "number", "rules": [
            "when values.builtUpArea > 0 AND values.plotArea > 0 -> derive(values.builtUpArea / values.plotArea)"
        ]},
        {"id": "metroCess", "type": "number", "rules": [
            "when values.city in ['BLR','MUM'] -> hide"
        ]},
        {"id": "owners", "type": "repeater",
         "validations": [{"type": "min", "value": 1}, {"type": "max", "value": 3}],
         "item": {"fields": [
             {"id": "name", "type": "text", "validations": [{"type": "required"}]},
             {"id": "guardian", "type": "text", "rules": [
                 {"when": ["values.minor", "truthy"], "action": "require"}
             ]},
             {"id": "minor", "type": "checkbox"}
         ]}}
    ]))
}

// ── DSL examples ──

#[rstest]
#[case(json!("KA"), true)]
#[case(json!(""), false)]
fn filled_state_requires_district(#[case] state: Value, #[case] required: bool) {
    let ctx = Context::new().with_value("state", state);
    let effects = evaluate_rules(&property_form(), &ctx).unwrap();
    assert_eq!(effects["district"].required, required);
}

#[test]
fn floor_area_ratio_is_derived() {
    let ctx = Context::new()
        .with_value("builtUpArea", json!(120))
        .with_value("plotArea", json!(200));
    let effects = evaluate_rules(&property_form(), &ctx).unwrap();
    assert_eq!(
        effects["far"],
        Effect {
            derived: Some(0.6),
            ..Effect::default()
        }
    );

    let missing_plot = Context::new().with_value("builtUpArea", json!(120));
    let effects = evaluate_rules(&property_form(), &missing_plot).unwrap();
    assert_eq!(effects["far"].derived, None);
}

#[rstest]
#[case("BLR", true)]
#[case("PUN", false)]
fn metro_cities_hide_cess(#[case] city: &str, #[case] hidden: bool) {
    let ctx = Context::new().with_value("city", json!(city));
    let effects = evaluate_rules(&property_form(), &ctx).unwrap();
    assert_eq!(effects["metroCess"].hidden, hidden);
}

#[test]
fn derived_values_are_available_standalone() {
    let ctx = Context::new().with_value("a", json!(5));
    assert_eq!(evaluate_derived("values.a + __proto__", &ctx), None);
    assert_eq!(evaluate_derived("max(values.a, 7) - 1", &ctx), Some(6.0));
}

// ── Repeaters ──

#[test]
fn repeater_rows_are_keyed_by_path() {
    let ctx = Context::new().with_value(
        "owners",
        json!([{"name": "Asha", "minor": false}, {"name": "Ravi", "minor": true}]),
    );
    let effects = evaluate_rules(&property_form(), &ctx).unwrap();
    let row_keys: Vec<&str> = effects
        .keys()
        .map(String::as_str)
        .filter(|key| key.starts_with("owners."))
        .collect();
    assert_eq!(
        row_keys,
        [
            "owners.0.name",
            "owners.0.guardian",
            "owners.0.minor",
            "owners.1.name",
            "owners.1.guardian",
            "owners.1.minor",
        ]
    );
    assert!(!effects["owners.0.guardian"].required);
    assert!(effects["owners.1.guardian"].required);
}

#[test]
fn repeater_validation_reports_row_paths() {
    let engine = FormEngine::default();
    let form = engine.compile(&property_form()).unwrap();

    let none = json!({"owners": []});
    let issues = engine.validate(&form, none.as_object().unwrap());
    assert_eq!(issues.len(), 1);
    assert_eq!((issues[0].field_id.as_str(), issues[0].code.as_str()), ("owners", "min"));

    let two = json!({"owners": [{"name": "Asha"}, {"name": ""}]});
    let issues = engine.validate(&form, two.as_object().unwrap());
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].field_id, "owners.1.name");
}

#[test]
fn effective_validation_applies_row_effects() {
    let engine = FormEngine::default();
    let form = engine.compile(&property_form()).unwrap();
    let ctx = Context::new().with_value(
        "owners",
        json!([{"name": "Ravi", "minor": true, "guardian": ""}]),
    );

    let issues = form.check_effective(&ctx);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].field_id, "owners.0.guardian");
    assert!(form.check(ctx.values()).is_empty());
}

#[test]
fn effective_validation_sees_user_attributes() {
    let schema = document(json!([
        {"id": "branchCode", "type": "text",
         "validations": [{"type": "requiredIf", "when": "user.role", "op": "==", "value": "agent"}]}
    ]));
    let form = FormEngine::default().compile(&schema).unwrap();

    let agent = Context::new().with_user_attr("role", json!("agent"));
    let issues = form.check_effective(&agent);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].code, "requiredIf");

    let customer = Context::new().with_user_attr("role", json!("customer"));
    assert!(form.check_effective(&customer).is_empty());
}

// ── Structural errors ──

#[test]
fn duplicate_ids_fail_compilation() {
    let schema = document(json!([
        {"id": "owners", "type": "repeater", "item": {"fields": [
            {"id": "name", "type": "text"},
            {"id": "name", "type": "text"}
        ]}}
    ]));
    let err = FormEngine::default().compile(&schema).unwrap_err();
    assert_eq!(
        err,
        SchemaError::DuplicateFieldId {
            id: "name".into(),
            scope: "repeater `owners`".into(),
        }
    );
    assert_eq!(err.code(), "SCHEMA_DUPLICATE_FIELD");
}

#[test]
fn derive_cycles_fail_compilation_unless_allowed() {
    let schema = document(json!([
        {"id": "net", "type": "number", "rules": ["when values.gross filled -> derive(values.gross - values.tax)"]},
        {"id": "tax", "type": "number", "rules": [{"when": true, "action": "derive", "value": "values.net * 0.1"}]},
        {"id": "gross", "type": "number"}
    ]));
    let err = FormEngine::default().compile(&schema).unwrap_err();
    assert_eq!(err.to_string(), "derive cycle: net -> tax -> net");

    let lenient = FormEngine::new(EngineConfig::default().with_reject_derive_cycles(false));
    assert!(lenient.compile(&schema).is_ok());
}

#[test]
fn dangling_references_fail_compilation() {
    let schema = document(json!([
        {"id": "confirm", "type": "password",
         "validations": [{"type": "sameAs", "other": "values.password"}]}
    ]));
    let err = FormEngine::default().compile(&schema).unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnknownReference {
            field: "confirm".into(),
            reference: "password".into(),
        }
    );
}

// ── Cache ──

#[test]
fn identical_documents_share_one_cache_entry() {
    let engine = FormEngine::new(EngineConfig::default().with_cache_capacity(4));
    let text = property_form().to_json().unwrap();

    let a = engine.compile_json(&text).unwrap();
    let b = engine.compile(&property_form()).unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(engine.cache_len(), 1);

    let other = document(json!([{"id": "x", "type": "text"}]));
    engine.compile(&other).unwrap();
    assert_eq!(engine.cache_len(), 2);
}
