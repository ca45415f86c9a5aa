//! Restricted arithmetic for `derive` rules.
//!
//! Expressions reference form values and user attributes by path, which are
//! substituted as numbers before evaluation. After substitution the text may
//! contain only digits, `+ - * / ( ) , .`, whitespace and the whitelisted
//! functions `min max abs round ceil floor`. Nothing else is ever executed.

use std::sync::LazyLock;

use formwork_schema::Context;
use formwork_schema::value::to_number;
use regex::{Captures, Regex};
use tracing::{debug, trace};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_.]*").unwrap());

static ALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9+\-*/().,\s]*$").unwrap());

/// Maximum nesting of unary signs and parentheses.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Min,
    Max,
    Abs,
    Round,
    Ceil,
    Floor,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "abs" => Some(Self::Abs),
            "round" => Some(Self::Round),
            "ceil" => Some(Self::Ceil),
            "floor" => Some(Self::Floor),
            _ => None,
        }
    }

    fn call(self, args: &[f64]) -> Option<f64> {
        match (self, args) {
            (Self::Min, [first, rest @ ..]) => Some(rest.iter().fold(*first, |acc, x| acc.min(*x))),
            (Self::Max, [first, rest @ ..]) => Some(rest.iter().fold(*first, |acc, x| acc.max(*x))),
            (Self::Abs, [x]) => Some(x.abs()),
            // Half rounds toward positive infinity: round(-2.5) == -2.
            (Self::Round, [x]) => Some((x + 0.5).floor()),
            (Self::Ceil, [x]) => Some(x.ceil()),
            (Self::Floor, [x]) => Some(x.floor()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
    Comma,
    Call(Function),
}

impl Token {
    fn precedence(self) -> Option<u8> {
        match self {
            Self::Plus | Self::Minus => Some(1),
            Self::Star | Self::Slash => Some(2),
            _ => None,
        }
    }
}

/// Evaluate a derive expression. Returns `None` when the expression uses
/// anything outside the allowed grammar or the result is not finite.
#[must_use]
pub fn evaluate_derived(expression: &str, context: &Context) -> Option<f64> {
    let substituted = substitute(expression, context);
    let masked = IDENTIFIER.replace_all(&substituted, |caps: &Captures<'_>| {
        if Function::from_name(&caps[0]).is_some() {
            String::new()
        } else {
            caps[0].to_owned()
        }
    });
    if !ALLOWED.is_match(&masked) {
        debug!(expression, "derive expression contains disallowed tokens");
        return None;
    }

    let value = Parser::new(tokenize(&substituted)?).parse()?;
    if value.is_finite() {
        trace!(expression, value, "derived");
        Some(value)
    } else {
        trace!(expression, "derive result is not finite");
        None
    }
}

/// `values.*` and `user.*` paths an expression reads, in order of first use.
#[must_use]
pub fn referenced_paths(expression: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for found in IDENTIFIER.find_iter(expression) {
        let ident = found.as_str();
        if is_reference(ident) && !paths.iter().any(|p| p == ident) {
            paths.push(ident.to_owned());
        }
    }
    paths
}

fn is_reference(ident: &str) -> bool {
    ident.starts_with("values.") || ident.starts_with("user.")
}

/// Replace references with numbers and unknown letter-initial identifiers
/// with `0`. Identifiers starting with `_` are left in place so the charset
/// check rejects them.
fn substitute(expression: &str, context: &Context) -> String {
    IDENTIFIER
        .replace_all(expression, |caps: &Captures<'_>| {
            let ident = &caps[0];
            if is_reference(ident) {
                let n = to_number(&context.resolve(ident));
                let n = if n.is_finite() { n } else { 0.0 };
                if n < 0.0 { format!("({n})") } else { format!("{n}") }
            } else if Function::from_name(ident).is_some() || ident.starts_with('_') {
                ident.to_owned()
            } else {
                "0".to_owned()
            }
        })
        .into_owned()
}

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some(&(start, ch)) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(idx, c)) = chars.peek() {
                    if !(c.is_ascii_digit() || c == '.') {
                        break;
                    }
                    end = idx + c.len_utf8();
                    chars.next();
                }
                Token::Number(text[start..end].parse().ok()?)
            }
            'a'..='z' => {
                let mut end = start;
                while let Some(&(idx, c)) = chars.peek() {
                    if !c.is_ascii_lowercase() {
                        break;
                    }
                    end = idx + c.len_utf8();
                    chars.next();
                }
                Token::Call(Function::from_name(&text[start..end])?)
            }
            _ => {
                chars.next();
                match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    ',' => Token::Comma,
                    _ => return None,
                }
            }
        };
        tokens.push(token);
    }
    Some(tokens)
}

/// Precedence-climbing evaluator over the token stream.
struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    /// Evaluate the whole stream; trailing tokens are an error.
    fn parse(mut self) -> Option<f64> {
        let value = self.parse_binary_expression(0)?;
        (self.position == self.tokens.len()).then_some(value)
    }

    fn current(&self) -> Option<Token> {
        self.tokens.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.current()?;
        self.position += 1;
        Some(token)
    }

    fn expect(&mut self, expected: Token) -> Option<()> {
        (self.advance()? == expected).then_some(())
    }

    fn parse_binary_expression(&mut self, min_precedence: u8) -> Option<f64> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.current() {
            let Some(precedence) = op.precedence() else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary_expression(precedence + 1)?;
            left = match op {
                Token::Plus => left + right,
                Token::Minus => left - right,
                Token::Star => left * right,
                Token::Slash => left / right,
                _ => return None,
            };
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<f64> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return None;
        }
        let value = match self.current()? {
            Token::Plus => {
                self.advance();
                self.parse_unary()
            }
            Token::Minus => {
                self.advance();
                self.parse_unary().map(|v| -v)
            }
            _ => self.parse_primary(),
        };
        self.depth -= 1;
        value
    }

    fn parse_primary(&mut self) -> Option<f64> {
        match self.advance()? {
            Token::Number(n) => Some(n),
            Token::LeftParen => {
                let value = self.parse_binary_expression(0)?;
                self.expect(Token::RightParen)?;
                Some(value)
            }
            Token::Call(function) => {
                self.expect(Token::LeftParen)?;
                let mut args = Vec::new();
                if self.current() != Some(Token::RightParen) {
                    loop {
                        args.push(self.parse_binary_expression(0)?);
                        if self.current() == Some(Token::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RightParen)?;
                function.call(&args)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn ctx() -> Context {
        Context::new()
            .with_value("a", json!(5))
            .with_value("b", json!("2"))
            .with_value("neg", json!(-3))
            .with_value("text", json!("abc"))
            .with_value("builtUpArea", json!(120))
            .with_value("plotArea", json!(200))
            .with_value("dims", json!({"w": 4, "h": 2.5}))
            .with_user_attr("discount", json!(10))
    }

    // ── Arithmetic ──

    #[rstest]
    #[case("1 + 2 * 3", 7.0)]
    #[case("(1 + 2) * 3", 9.0)]
    #[case("10 - 4 - 3", 3.0)]
    #[case("8 / 4 / 2", 1.0)]
    #[case("-2 * -3", 6.0)]
    #[case("+4", 4.0)]
    #[case("--4", 4.0)]
    #[case(".5 + 1.", 1.5)]
    #[case("values.a * values.b", 10.0)]
    #[case("values.a - values.neg", 8.0)]
    #[case("values.neg * values.neg", 9.0)]
    #[case("values.dims.w * values.dims.h", 10.0)]
    #[case("values.a * (100 - user.discount) / 100", 4.5)]
    #[case("values.builtUpArea / values.plotArea", 0.6)]
    fn evaluates(#[case] expr: &str, #[case] expected: f64) {
        assert_eq!(evaluate_derived(expr, &ctx()), Some(expected));
    }

    // ── Functions ──

    #[rstest]
    #[case("min(3, 1, 2)", 1.0)]
    #[case("max(values.a, values.b, 4)", 5.0)]
    #[case("abs(values.neg)", 3.0)]
    #[case("round(2.5)", 3.0)]
    #[case("round(-2.5)", -2.0)]
    #[case("ceil(1.2)", 2.0)]
    #[case("floor(-1.2)", -2.0)]
    #[case("max(min(1, 2), abs(-7))", 7.0)]
    fn functions(#[case] expr: &str, #[case] expected: f64) {
        assert_eq!(evaluate_derived(expr, &ctx()), Some(expected));
    }

    // ── Coercion of unknowns ──

    #[test]
    fn non_numeric_and_missing_values_read_as_zero() {
        assert_eq!(evaluate_derived("values.text + 1", &ctx()), Some(1.0));
        assert_eq!(evaluate_derived("values.missing + 1", &ctx()), Some(1.0));
    }

    #[test]
    fn unknown_identifiers_are_neutralised() {
        assert_eq!(evaluate_derived("values.a + constructor", &ctx()), Some(5.0));
        assert_eq!(evaluate_derived("window.alert + 2", &ctx()), Some(2.0));
    }

    // ── Rejections ──

    #[rstest]
    #[case("values.a + __proto__")]
    #[case("_secret * 2")]
    #[case("values.a / 0")]
    #[case("0 / 0")]
    #[case("2 ** 3")]
    #[case("1, 2")]
    #[case("(1 + 2")]
    #[case("1 + 2)")]
    #[case("min()")]
    #[case("abs(1, 2)")]
    #[case("1.2.3 + 1")]
    #[case("values.a; 1")]
    #[case("'1' + 1")]
    #[case("1 % 2")]
    #[case("")]
    #[case("max")]
    fn rejected(#[case] expr: &str) {
        assert_eq!(evaluate_derived(expr, &ctx()), None);
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let expr = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(evaluate_derived(&expr, &ctx()), None);
        let expr = format!("{}1", "-".repeat(200));
        assert_eq!(evaluate_derived(&expr, &ctx()), None);
    }

    #[test]
    fn referenced_paths_in_order() {
        assert_eq!(
            referenced_paths("max(values.a, user.cap) / values.a + values.b.c + other"),
            ["values.a", "user.cap", "values.b.c"]
        );
        assert!(referenced_paths("1 + 2").is_empty());
    }
}
