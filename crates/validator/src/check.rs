//! Single-field checks compiled from validation entries.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use formwork_expression::dsl::compile_pattern;
use formwork_schema::value::{format_number, loose_eq, to_display_string, to_number};
use formwork_schema::{BaseType, ValidationKind, ValidationSpec};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::coerce::{Coerced, parse_date};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap()
});

/// Bound of a `min` / `max` check, typed by the field's base type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Bound {
    Number(f64),
    Date(NaiveDateTime),
    Count(usize),
}

#[derive(Debug, Clone)]
pub(crate) enum Rule {
    MinLength(usize),
    MaxLength(usize),
    Pattern(Regex),
    Email,
    Url,
    Min(Bound),
    Max(Bound),
    Integer,
    Positive,
    Nonnegative,
    OneOf(Vec<Value>),
    Equals(String),
    NotEquals(String),
}

/// A compiled check with its code and resolved message.
#[derive(Debug, Clone)]
pub(crate) struct Check {
    rule: Rule,
    code: &'static str,
    message: String,
}

impl Check {
    /// Compile a per-field validation entry. Returns `None` for `required`,
    /// cross-field and unknown types, and for entries whose parameter is
    /// missing or malformed.
    pub(crate) fn compile(spec: &ValidationSpec, base: BaseType) -> Option<Self> {
        let rule = match &spec.kind {
            ValidationKind::MinLength => Rule::MinLength(length_param(spec)?),
            ValidationKind::MaxLength => Rule::MaxLength(length_param(spec)?),
            ValidationKind::Pattern => {
                let text = spec.value.as_ref().and_then(Value::as_str)?;
                let Some(regex) = compile_pattern(text) else {
                    debug!(pattern = text, "ignoring malformed pattern");
                    return None;
                };
                Rule::Pattern(regex)
            }
            ValidationKind::Email => Rule::Email,
            ValidationKind::Url => Rule::Url,
            ValidationKind::Min => Rule::Min(bound_param(spec, base)?),
            ValidationKind::Max => Rule::Max(bound_param(spec, base)?),
            ValidationKind::Integer => Rule::Integer,
            ValidationKind::Positive => Rule::Positive,
            ValidationKind::Nonnegative => Rule::Nonnegative,
            ValidationKind::Enum => Rule::OneOf(spec.value.as_ref()?.as_array()?.clone()),
            ValidationKind::Equals => Rule::Equals(to_display_string(spec.value.as_ref()?)),
            ValidationKind::NotEquals => Rule::NotEquals(to_display_string(spec.value.as_ref()?)),
            ValidationKind::Unknown(name) => {
                debug!(validation = %name, "ignoring unknown validation type");
                return None;
            }
            ValidationKind::Required | ValidationKind::SameAs | ValidationKind::RequiredIf => {
                return None;
            }
        };
        let message = spec
            .message
            .clone()
            .unwrap_or_else(|| default_message(&rule, base));
        Some(Self {
            code: rule_code(&rule),
            rule,
            message,
        })
    }

    pub(crate) fn code(&self) -> &'static str {
        self.code
    }

    pub(crate) fn message(&self) -> &str {
        &self.message
    }

    /// Whether a non-empty coerced value passes.
    pub(crate) fn passes(&self, value: &Coerced) -> bool {
        match &self.rule {
            Rule::MinLength(min) => length(value) >= *min,
            Rule::MaxLength(max) => length(value) <= *max,
            Rule::Pattern(regex) => value.texts().iter().all(|t| regex.is_match(t)),
            Rule::Email => value.texts().iter().all(|t| EMAIL_REGEX.is_match(t)),
            Rule::Url => value.texts().iter().all(|t| url::Url::parse(t).is_ok()),
            Rule::Min(bound) => within(value, bound, |ord| ord.is_ge()),
            Rule::Max(bound) => within(value, bound, |ord| ord.is_le()),
            Rule::Integer => {
                let n = value.number();
                n.is_finite() && n.fract() == 0.0
            }
            Rule::Positive => value.number() > 0.0,
            Rule::Nonnegative => value.number() >= 0.0,
            Rule::OneOf(allowed) => match value {
                Coerced::List(items) => items.iter().all(|item| is_allowed(item, allowed)),
                other => is_allowed(&other.to_value(), allowed),
            },
            Rule::Equals(expected) => value.text() == *expected,
            Rule::NotEquals(unexpected) => value.text() != *unexpected,
        }
    }
}

fn length_param(spec: &ValidationSpec) -> Option<usize> {
    let n = to_number(spec.value.as_ref()?);
    (n.is_finite() && n >= 0.0).then_some(n as usize)
}

fn bound_param(spec: &ValidationSpec, base: BaseType) -> Option<Bound> {
    let raw = spec.value.as_ref()?;
    match base {
        BaseType::Date => parse_date(raw).map(Bound::Date),
        BaseType::List | BaseType::Rows => length_param(spec).map(Bound::Count),
        _ => {
            let n = to_number(raw);
            n.is_finite().then_some(Bound::Number(n))
        }
    }
}

fn length(value: &Coerced) -> usize {
    match value.items() {
        Some(items) => items.len(),
        None => value.text().chars().count(),
    }
}

fn within(value: &Coerced, bound: &Bound, accept: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    let ordering = match (bound, value) {
        (Bound::Date(limit), Coerced::Date(Some(date))) => Some(date.cmp(limit)),
        (Bound::Date(_), _) => None,
        (Bound::Count(limit), _) => value.items().map(|items| items.len().cmp(limit)),
        (Bound::Number(limit), _) => value.number().partial_cmp(limit),
    };
    ordering.is_some_and(accept)
}

fn is_allowed(candidate: &Value, allowed: &[Value]) -> bool {
    allowed.iter().any(|option| loose_eq(candidate, option))
}

fn rule_code(rule: &Rule) -> &'static str {
    let kind = match rule {
        Rule::MinLength(_) => ValidationKind::MinLength,
        Rule::MaxLength(_) => ValidationKind::MaxLength,
        Rule::Pattern(_) => ValidationKind::Pattern,
        Rule::Email => ValidationKind::Email,
        Rule::Url => ValidationKind::Url,
        Rule::Min(_) => ValidationKind::Min,
        Rule::Max(_) => ValidationKind::Max,
        Rule::Integer => ValidationKind::Integer,
        Rule::Positive => ValidationKind::Positive,
        Rule::Nonnegative => ValidationKind::Nonnegative,
        Rule::OneOf(_) => ValidationKind::Enum,
        Rule::Equals(_) => ValidationKind::Equals,
        Rule::NotEquals(_) => ValidationKind::NotEquals,
    };
    static_code(&kind)
}

/// Issue code for a known validation kind.
pub(crate) fn static_code(kind: &ValidationKind) -> &'static str {
    match kind {
        ValidationKind::Required => "required",
        ValidationKind::MinLength => "minLength",
        ValidationKind::MaxLength => "maxLength",
        ValidationKind::Pattern => "pattern",
        ValidationKind::Email => "email",
        ValidationKind::Url => "url",
        ValidationKind::Min => "min",
        ValidationKind::Max => "max",
        ValidationKind::Integer => "integer",
        ValidationKind::Positive => "positive",
        ValidationKind::Nonnegative => "nonnegative",
        ValidationKind::Enum => "enum",
        ValidationKind::Equals => "equals",
        ValidationKind::NotEquals => "notEquals",
        ValidationKind::SameAs => "sameAs",
        ValidationKind::RequiredIf => "requiredIf",
        ValidationKind::Unknown(_) => "unknown",
    }
}

fn default_message(rule: &Rule, base: BaseType) -> String {
    let counted = matches!(base, BaseType::List | BaseType::Rows);
    match rule {
        Rule::MinLength(n) if counted => format!("Select at least {n} options"),
        Rule::MinLength(n) => format!("Must be at least {n} characters"),
        Rule::MaxLength(n) if counted => format!("Select at most {n} options"),
        Rule::MaxLength(n) => format!("Must be at most {n} characters"),
        Rule::Pattern(_) => "Invalid format".to_owned(),
        Rule::Email => "Enter a valid email address".to_owned(),
        Rule::Url => "Enter a valid URL".to_owned(),
        Rule::Min(bound) => match bound {
            Bound::Number(n) => format!("Must be at least {}", format_number(*n)),
            Bound::Date(d) => format!("Must be on or after {}", d.date()),
            Bound::Count(n) => format!("Add at least {n} items"),
        },
        Rule::Max(bound) => match bound {
            Bound::Number(n) => format!("Must be at most {}", format_number(*n)),
            Bound::Date(d) => format!("Must be on or before {}", d.date()),
            Bound::Count(n) => format!("Add at most {n} items"),
        },
        Rule::Integer => "Must be a whole number".to_owned(),
        Rule::Positive => "Must be greater than 0".to_owned(),
        Rule::Nonnegative => "Must be 0 or greater".to_owned(),
        Rule::OneOf(_) => "Select one of the allowed values".to_owned(),
        Rule::Equals(expected) => format!("Must equal {expected}"),
        Rule::NotEquals(unexpected) => format!("Must not equal {unexpected}"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::coerce::coerce;

    fn passes(spec: ValidationSpec, base: BaseType, raw: Value) -> bool {
        let check = Check::compile(&spec, base).expect("check should compile");
        check.passes(&coerce(base, &raw).unwrap())
    }

    // ── Strings ──

    #[rstest]
    #[case(ValidationSpec::min_length(3), json!("abc"), true)]
    #[case(ValidationSpec::min_length(3), json!(" ab "), false)]
    #[case(ValidationSpec::max_length(2), json!("日本"), true)]
    #[case(ValidationSpec::pattern("^[0-9]{6}$"), json!("560001"), true)]
    #[case(ValidationSpec::pattern("/^[a-z]+$/i"), json!("ABC"), true)]
    #[case(ValidationSpec::pattern("/^[a-z]+$/"), json!("ABC"), false)]
    #[case(ValidationSpec::email(), json!("a.b@example.com"), true)]
    #[case(ValidationSpec::email(), json!("not-an-email"), false)]
    #[case(ValidationSpec::url(), json!("https://example.com/x?y=1"), true)]
    #[case(ValidationSpec::url(), json!("example dot com"), false)]
    #[case(ValidationSpec::equals("yes"), json!("yes"), true)]
    #[case(ValidationSpec::not_equals("admin"), json!("admin"), false)]
    fn text_checks(#[case] spec: ValidationSpec, #[case] raw: Value, #[case] expected: bool) {
        assert_eq!(passes(spec, BaseType::Text, raw), expected);
    }

    // ── Numbers ──

    #[rstest]
    #[case(ValidationSpec::min(18), json!("18"), true)]
    #[case(ValidationSpec::min(18), json!(17.5), false)]
    #[case(ValidationSpec::max(100), json!(100), true)]
    #[case(ValidationSpec::integer(), json!("4"), true)]
    #[case(ValidationSpec::integer(), json!(4.2), false)]
    #[case(ValidationSpec::positive(), json!(0), false)]
    #[case(ValidationSpec::nonnegative(), json!(0), true)]
    #[case(ValidationSpec::equals(5), json!("5.0"), true)]
    #[case(ValidationSpec::one_of(vec![json!(1), json!(2)]), json!("2"), true)]
    fn number_checks(#[case] spec: ValidationSpec, #[case] raw: Value, #[case] expected: bool) {
        assert_eq!(passes(spec, BaseType::Number, raw), expected);
    }

    // ── Dates, lists, rows ──

    #[test]
    fn date_bounds_compare_dates() {
        assert!(passes(ValidationSpec::min("2024-01-01"), BaseType::Date, json!("2024-06-01")));
        assert!(!passes(ValidationSpec::max("2024-01-01"), BaseType::Date, json!("2024-06-01")));
        assert!(passes(
            ValidationSpec::max("2024-01-01T12:00:00Z"),
            BaseType::Date,
            json!("2024-01-01")
        ));
    }

    #[test]
    fn list_checks_count_and_restrict_items() {
        let options = vec![json!("red"), json!("green")];
        assert!(passes(ValidationSpec::one_of(options.clone()), BaseType::List, json!(["red"])));
        assert!(!passes(ValidationSpec::one_of(options), BaseType::List, json!(["red", "blue"])));
        assert!(passes(ValidationSpec::min_length(2), BaseType::List, json!(["a", "b"])));
        assert!(!passes(ValidationSpec::max_length(1), BaseType::List, json!(["a", "b"])));
    }

    #[test]
    fn row_bounds_count_rows() {
        assert!(!passes(ValidationSpec::min(1), BaseType::Rows, json!([])));
        assert!(passes(ValidationSpec::max(3), BaseType::Rows, json!([{}, {}, {}])));
        assert!(!passes(ValidationSpec::max(3), BaseType::Rows, json!([{}, {}, {}, {}])));
    }

    // ── Compilation ──

    #[test]
    fn skipped_entries() {
        let base = BaseType::Text;
        assert!(Check::compile(&ValidationSpec::required(), base).is_none());
        assert!(Check::compile(&ValidationSpec::same_as("x"), base).is_none());
        assert!(Check::compile(&ValidationSpec::pattern("("), base).is_none());
        assert!(Check::compile(&ValidationSpec::new(ValidationKind::MinLength), base).is_none());
        assert!(Check::compile(&ValidationSpec::min("soon"), BaseType::Date).is_none());
        assert!(
            Check::compile(&ValidationSpec::new(ValidationKind::Unknown("luhn".into())), base)
                .is_none()
        );
    }

    #[test]
    fn messages_default_per_type_unless_overridden() {
        let check = Check::compile(&ValidationSpec::min_length(8), BaseType::Text).unwrap();
        assert_eq!(check.code(), "minLength");
        assert_eq!(check.message(), "Must be at least 8 characters");

        let check = Check::compile(&ValidationSpec::min(1), BaseType::Rows).unwrap();
        assert_eq!(check.message(), "Add at least 1 items");

        let check = Check::compile(
            &ValidationSpec::email().with_message("Use your work email"),
            BaseType::Text,
        )
        .unwrap();
        assert_eq!(check.message(), "Use your work email");
    }
}
