//! Parser for rule text of the form `when <condition> -> <effect>`.

use formwork_schema::{Context, Operator};
use tracing::trace;

use super::literal::Literal;
use super::scanner::{Connective, LiteralMask, split_connectives};
use crate::compare;

/// `selector operator [literal]`
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub selector: String,
    pub op: Operator,
    pub literal: Option<Literal>,
}

impl Clause {
    /// Evaluate against a context. A regex literal under `matches` is used
    /// precompiled; everything else goes through [`compare::apply`].
    #[must_use]
    pub fn evaluate(&self, context: &Context) -> bool {
        let left = context.resolve(&self.selector);
        match (&self.op, &self.literal) {
            (Operator::Matches, Some(Literal::Regex(regex))) => {
                compare::matches_regex(&left, regex.regex())
            }
            _ => {
                let right = self.literal.as_ref().map(|lit| lit.resolve(context));
                compare::apply(self.op, &left, right.as_deref())
            }
        }
    }
}

/// Clauses joined by `AND` / `OR`, folded strictly left to right.
///
/// `a OR b AND c` means `(a OR b) AND c`; there is no precedence and no
/// grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionChain {
    pub head: Clause,
    pub tail: Vec<(Connective, Clause)>,
}

impl ConditionChain {
    #[must_use]
    pub fn evaluate(&self, context: &Context) -> bool {
        self.tail
            .iter()
            .fold(self.head.evaluate(context), |acc, (connective, clause)| {
                match connective {
                    Connective::And => acc && clause.evaluate(context),
                    Connective::Or => acc || clause.evaluate(context),
                }
            })
    }

    /// Every selector and reference literal the chain reads.
    #[must_use]
    pub fn references(&self) -> Vec<String> {
        let mut out = Vec::new();
        for clause in std::iter::once(&self.head).chain(self.tail.iter().map(|(_, c)| c)) {
            out.push(clause.selector.clone());
            if let Some(literal) = &clause.literal {
                literal.collect_references(&mut out);
            }
        }
        out
    }

    /// Number of clauses.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    /// Always `false`; a chain holds at least one clause.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Right-hand side of a DSL rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Hide,
    Show,
    Disable,
    Enable,
    Require,
    Unrequire,
    /// `derive(<arithmetic expression>)`
    Derive(String),
}

/// A parsed `when ... -> ...` rule.
#[derive(Debug, Clone, PartialEq)]
pub struct DslRule {
    pub condition: ConditionChain,
    pub effect: Effect,
}

/// Parse `when <condition> -> <effect>`. Returns `None` when the text does
/// not follow the grammar.
#[must_use]
pub fn parse_dsl_rule(text: &str) -> Option<DslRule> {
    let body = strip_when(text.trim())?;
    let mask = LiteralMask::scan(body);
    let Some(arrow) = mask.find(body, "->") else {
        trace!(rule = text, "rule has no `->`");
        return None;
    };
    let condition = parse_condition_chain(&body[..arrow])?;
    let effect = parse_effect(&body[arrow + 2..])?;
    Some(DslRule { condition, effect })
}

/// Parse a DSL condition used on its own.
///
/// A leading `when` is optional and anything from `->` onwards is dropped,
/// so a full rule string reduces to its left-hand side.
#[must_use]
pub fn parse_condition(text: &str) -> Option<ConditionChain> {
    let trimmed = text.trim();
    let body = strip_when(trimmed).unwrap_or(trimmed);
    let mask = LiteralMask::scan(body);
    let end = mask.find(body, "->").unwrap_or(body.len());
    parse_condition_chain(&body[..end])
}

fn strip_when(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("when")?;
    rest.starts_with(char::is_whitespace).then_some(rest)
}

fn parse_condition_chain(text: &str) -> Option<ConditionChain> {
    let mut parts = split_connectives(text).into_iter();
    let (_, first) = parts.next()?;
    let head = parse_clause(first)?;
    let tail = parts
        .map(|(connective, part)| Some((connective?, parse_clause(part)?)))
        .collect::<Option<Vec<_>>>()?;
    Some(ConditionChain { head, tail })
}

/// Parse `selector operator [literal]`.
///
/// The selector runs up to whitespace or the first of `= ! < >`.
fn parse_clause(text: &str) -> Option<Clause> {
    let text = text.trim();
    let end = text
        .find(|c: char| c.is_whitespace() || matches!(c, '=' | '!' | '<' | '>'))
        .unwrap_or(text.len());
    let selector = &text[..end];
    if selector.is_empty() {
        return None;
    }
    let (op, rest) = match_operator(text[end..].trim_start())?;
    let rest = rest.trim();
    let literal = if rest.is_empty() {
        None
    } else {
        Some(Literal::parse(rest)?)
    };
    if op.takes_operand() != literal.is_some() {
        trace!(clause = text, op = %op, "operand does not fit operator");
        return None;
    }
    Some(Clause {
        selector: selector.to_owned(),
        op,
        literal,
    })
}

/// Longest operator at the start of `text`. Word operators must end at a
/// word boundary (`in` does not match `inside`).
fn match_operator(text: &str) -> Option<(Operator, &str)> {
    Operator::BY_LENGTH.into_iter().find_map(|op| {
        let rest = text.strip_prefix(op.as_str())?;
        let boundary = rest
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || matches!(c, '[' | '\'' | '"' | '/'));
        (!op.is_word() || boundary).then_some((op, rest))
    })
}

fn parse_effect(text: &str) -> Option<Effect> {
    let text = text.trim();
    let effect = match text {
        "hide" => Effect::Hide,
        "show" => Effect::Show,
        "disable" => Effect::Disable,
        "enable" => Effect::Enable,
        "require" => Effect::Require,
        "unrequire" => Effect::Unrequire,
        _ => {
            let args = text.strip_prefix("derive")?.trim_start();
            let expr = args.strip_prefix('(')?.strip_suffix(')')?.trim();
            if expr.is_empty() {
                return None;
            }
            Effect::Derive(expr.to_owned())
        }
    };
    Some(effect)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn clause(selector: &str, op: Operator, literal: Option<Literal>) -> Clause {
        Clause {
            selector: selector.into(),
            op,
            literal,
        }
    }

    // ── Rule structure ──

    #[test]
    fn parses_simple_rule() {
        let rule = parse_dsl_rule("when values.state filled -> require").unwrap();
        assert_eq!(
            rule,
            DslRule {
                condition: ConditionChain {
                    head: clause("values.state", Operator::Filled, None),
                    tail: vec![],
                },
                effect: Effect::Require,
            }
        );
    }

    #[test]
    fn parses_derive_effect() {
        let rule = parse_dsl_rule(
            "when values.plotArea > 0 -> derive(values.builtUpArea / values.plotArea)",
        )
        .unwrap();
        assert_eq!(
            rule.effect,
            Effect::Derive("values.builtUpArea / values.plotArea".into())
        );
        assert_eq!(
            rule.condition.head,
            clause("values.plotArea", Operator::Gt, Some(Literal::Value(json!(0))))
        );
    }

    #[test]
    fn derive_with_nested_calls() {
        let rule = parse_dsl_rule("when true == true -> derive( max(values.a, (values.b)) )").unwrap();
        assert_eq!(rule.effect, Effect::Derive("max(values.a, (values.b))".into()));
    }

    #[test]
    fn parses_chain_with_connectives() {
        let rule = parse_dsl_rule(
            "when values.city in ['BLR', 'MUM'] AND user.role != 'admin' OR flags.beta == true -> hide",
        )
        .unwrap();
        assert_eq!(rule.condition.len(), 3);
        assert_eq!(rule.condition.tail[0].0, Connective::And);
        assert_eq!(rule.condition.tail[1].0, Connective::Or);
        assert_eq!(
            rule.condition.references(),
            ["values.city", "user.role", "flags.beta"]
        );
    }

    #[rstest]
    #[case("values.a == 1 -> hide")]
    #[case("whenever values.a == 1 -> hide")]
    #[case("when values.a == 1")]
    #[case("when values.a == 1 -> explode")]
    #[case("when values.a == -> hide")]
    #[case("when values.a filled 3 -> hide")]
    #[case("when values.a ~= 1 -> hide")]
    #[case("when == 1 -> hide")]
    #[case("when values.a == 1 AND -> hide")]
    #[case("when values.a matches /(/ -> hide")]
    #[case("when values.a == 1 -> derive()")]
    #[case("when values.a == 1 -> derive values.b")]
    fn unparseable_rules(#[case] text: &str) {
        assert_eq!(parse_dsl_rule(text), None);
    }

    // ── Operators ──

    #[rstest]
    #[case("values.a>=3", Operator::Ge)]
    #[case("values.a <= 3", Operator::Le)]
    #[case("values.a!=3", Operator::Ne)]
    #[case("values.a not-in [1]", Operator::NotIn)]
    #[case("values.a in[1]", Operator::In)]
    #[case("values.tags includes 'x'", Operator::Includes)]
    #[case("values.code matches /^A/", Operator::Matches)]
    #[case("values.x empty", Operator::Empty)]
    fn operators_match_longest_first(#[case] text: &str, #[case] expected: Operator) {
        assert_eq!(parse_condition(text).unwrap().head.op, expected);
    }

    #[test]
    fn word_operators_need_boundary() {
        assert_eq!(parse_condition("values.a inside [1]"), None);
        assert_eq!(parse_condition("values.a filledx"), None);
    }

    // ── Standalone conditions ──

    #[test]
    fn condition_reduces_rule_to_left_side() {
        let full = parse_condition("when values.a == 1 -> hide").unwrap();
        let bare = parse_condition("values.a == 1").unwrap();
        assert_eq!(full, bare);
    }

    #[test]
    fn evaluation_folds_left_to_right() {
        // (false OR true) AND false → false; with precedence it would be true.
        let chain = parse_condition("values.a == 1 OR values.b == 1 AND values.c == 1").unwrap();
        let ctx = Context::new()
            .with_value("a", json!(0))
            .with_value("b", json!(1))
            .with_value("c", json!(0));
        assert!(!chain.evaluate(&ctx));

        // true OR ... AND true → true
        let ctx = ctx.with_value("c", json!(1));
        assert!(chain.evaluate(&ctx));
    }

    #[test]
    fn reference_literal_resolves_at_evaluation() {
        let chain = parse_condition("values.confirm != values.password").unwrap();
        let same = Context::new()
            .with_value("password", json!("s3cret"))
            .with_value("confirm", json!("s3cret"));
        assert!(!chain.evaluate(&same));
        let differ = same.with_value("confirm", json!("other"));
        assert!(chain.evaluate(&differ));
    }

    #[test]
    fn regex_literal_evaluates_precompiled() {
        let chain = parse_condition("values.pan matches /^[a-z]{5}[0-9]{4}[a-z]$/i").unwrap();
        assert!(chain.evaluate(&Context::new().with_value("pan", json!("ABCDE1234F"))));
        assert!(!chain.evaluate(&Context::new().with_value("pan", json!("ABC"))));
        assert!(!chain.evaluate(&Context::new()));
    }
}
