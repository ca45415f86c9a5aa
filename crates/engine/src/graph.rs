//! Static dependency analysis: reference checks, derive cycles, and the
//! selector sets used to skip unaffected fields.

use std::collections::HashSet;

use formwork_expression::dsl::Literal;
use formwork_expression::referenced_paths;
use formwork_schema::context::{normalize_selector, referenced_field, split_selector};
use formwork_schema::{FieldSpec, Namespace, SchemaError, ValidationKind};
use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;

use crate::rules::FieldRules;

/// Fields of one scope (the form, or one repeater's rows) with their
/// compiled rules, in the same order.
struct Scope<'a> {
    fields: Vec<&'a FieldSpec>,
    rules: &'a [FieldRules],
}

fn scopes<'a>(fields: &[&'a FieldSpec], rules: &'a [FieldRules]) -> Vec<Scope<'a>> {
    let mut out = Vec::new();
    collect_scopes(fields.to_vec(), rules, &mut out);
    out
}

fn collect_scopes<'a>(fields: Vec<&'a FieldSpec>, rules: &'a [FieldRules], out: &mut Vec<Scope<'a>>) {
    out.push(Scope {
        fields: fields.clone(),
        rules,
    });
    for (&field, field_rules) in fields.iter().zip(rules) {
        if let Some(item_rules) = field_rules.item() {
            collect_scopes(field.item_fields().iter().collect(), item_rules, out);
        }
    }
}

/// Every selector a field reads through its rules, cross-field
/// validations and `dependsOn`.
fn field_references(field: &FieldSpec, rules: &FieldRules) -> Vec<String> {
    let mut refs: Vec<String> = rules.rules().iter().flat_map(|rule| rule.references()).collect();
    for validation in &field.validations {
        match validation.kind {
            ValidationKind::SameAs => refs.extend(validation.other.clone()),
            ValidationKind::RequiredIf => {
                refs.extend(validation.when.clone());
                if let Some(value) = &validation.value {
                    Literal::from_json(value).collect_references(&mut refs);
                }
            }
            _ => {}
        }
    }
    refs.extend(field.depends_on.iter().flatten().cloned());
    refs
}

/// Reject references to form values that no field in the same scope holds.
pub(crate) fn check_references(fields: &[&FieldSpec], rules: &[FieldRules]) -> Result<(), SchemaError> {
    for scope in scopes(fields, rules) {
        let known: HashSet<&str> = scope.fields.iter().map(|f| f.id.as_str()).collect();
        for (field, field_rules) in scope.fields.iter().zip(scope.rules) {
            for selector in field_references(field, field_rules) {
                if let Some(target) = referenced_field(&selector)
                    && !known.contains(target)
                {
                    return Err(SchemaError::UnknownReference {
                        field: field.id.clone(),
                        reference: target.to_owned(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Reject derive rules that read, directly or through other derived
/// fields, their own field.
pub(crate) fn check_derive_cycles(fields: &[&FieldSpec], rules: &[FieldRules]) -> Result<(), SchemaError> {
    for scope in scopes(fields, rules) {
        if let Some(cycle) = find_derive_cycle(scope.rules) {
            return Err(SchemaError::DeriveCycle { cycle });
        }
    }
    Ok(())
}

fn find_derive_cycle(rules: &[FieldRules]) -> Option<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for field in rules {
        for expression in field.rules().iter().filter_map(|rule| rule.derive_expression()) {
            for path in referenced_paths(expression) {
                if let Some(target) = referenced_field(&path)
                    && let Some(known) = rules.iter().find(|f| f.field_id() == target)
                {
                    graph.add_edge(field.field_id(), known.field_id(), ());
                }
            }
        }
    }

    tarjan_scc(&graph).into_iter().find_map(|component| {
        let cyclic = component.len() > 1
            || component
                .first()
                .is_some_and(|&node| graph.contains_edge(node, node));
        cyclic.then(|| {
            let mut cycle: Vec<String> = component.iter().map(|id| (*id).to_owned()).collect();
            cycle.sort();
            cycle.push(cycle[0].clone());
            cycle
        })
    })
}

/// Selectors each top-level field's rules read, normalized to
/// `namespace.path`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Dependencies {
    by_field: IndexMap<String, Vec<String>>,
}

impl Dependencies {
    pub(crate) fn build(fields: &[&FieldSpec], rules: &[FieldRules]) -> Self {
        let by_field = fields
            .iter()
            .zip(rules)
            .map(|(field, field_rules)| (field.id.clone(), field_dependencies(field, field_rules)))
            .collect();
        Self { by_field }
    }

    /// Top-level fields whose rules read any of the changed selectors, in
    /// schema order.
    pub(crate) fn affected<S: AsRef<str>>(&self, changed: &[S]) -> Vec<&str> {
        let changed: Vec<String> = changed
            .iter()
            .map(|path| normalize_selector(path.as_ref()))
            .collect();
        self.by_field
            .iter()
            .filter(|(_, deps)| {
                deps.iter()
                    .any(|dep| changed.iter().any(|path| overlaps(dep, path)))
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

fn field_dependencies(field: &FieldSpec, rules: &FieldRules) -> Vec<String> {
    if let Some(explicit) = &field.depends_on {
        return dedup(explicit.iter().map(|path| normalize_selector(path)));
    }

    let mut selectors: Vec<String> = rules
        .rules()
        .iter()
        .flat_map(|rule| rule.references())
        .map(|selector| normalize_selector(&selector))
        .collect();

    if let Some(item) = rules.item() {
        // Row rules read row values, so any change under the repeater counts.
        selectors.push(format!("values.{}", field.id));
        selectors.extend(
            item_references(item)
                .into_iter()
                .filter(|selector| split_selector(selector).0 != Namespace::Values)
                .map(|selector| normalize_selector(&selector)),
        );
    }
    dedup(selectors.into_iter())
}

fn item_references(item: &[FieldRules]) -> Vec<String> {
    item.iter()
        .flat_map(|child| {
            let mut refs: Vec<String> = child.rules().iter().flat_map(|rule| rule.references()).collect();
            if let Some(nested) = child.item() {
                refs.extend(item_references(nested));
            }
            refs
        })
        .collect()
}

fn dedup(selectors: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for selector in selectors {
        if !out.contains(&selector) {
            out.push(selector);
        }
    }
    out
}

/// Whether one selector sits on the path of the other.
fn overlaps(dependency: &str, changed: &str) -> bool {
    let nested = |outer: &str, inner: &str| {
        inner
            .strip_prefix(outer)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    };
    nested(dependency, changed) || nested(changed, dependency)
}
