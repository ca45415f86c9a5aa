//! Right-hand literals of DSL clauses.

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use formwork_schema::Context;
use regex::{Regex, RegexBuilder};
use serde_json::{Number, Value};

use super::scanner::LiteralMask;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap());

/// Maximum nesting of array literals.
const MAX_DEPTH: usize = 64;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(values|user|flags)(\.[A-Za-z0-9_$-]+)+$").unwrap()
});

/// A `/source/flags` regex, compiled once.
#[derive(Clone)]
pub struct RegexLiteral {
    source: String,
    flags: String,
    regex: Regex,
}

impl RegexLiteral {
    /// Parse `/source/flags`. Returns `None` when the text is not delimited
    /// like a regex or does not compile.
    ///
    /// Flags `i`, `m`, `s` and `x` map to the regex engine's options; `g`,
    /// `u` and `y` are accepted and ignored. Any other flag is rejected.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let body = text.strip_prefix('/')?;
        let close = body.rfind('/')?;
        let (source, flags) = (&body[..close], &body[close + 1..]);
        let mut builder = RegexBuilder::new(source);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                'g' | 'u' | 'y' => &mut builder,
                _ => return None,
            };
        }
        let regex = builder.build().ok()?;
        Some(Self {
            source: source.to_owned(),
            flags: flags.to_owned(),
            regex,
        })
    }

    /// Pattern text between the slashes.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Flag characters after the closing slash.
    #[must_use]
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// The compiled regex.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl fmt::Debug for RegexLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

impl PartialEq for RegexLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

/// Compile a validation pattern given either as `/source/flags` or as plain
/// regex text.
#[must_use]
pub fn compile_pattern(text: &str) -> Option<Regex> {
    if text.len() > 1 && text.starts_with('/') && text[1..].contains('/') {
        if let Some(literal) = RegexLiteral::parse(text) {
            return Some(literal.regex);
        }
    }
    Regex::new(text).ok()
}

/// A literal operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted string, number, boolean, `null` or opaque token.
    Value(Value),
    /// `/pattern/flags`
    Regex(RegexLiteral),
    /// `values.*`, `user.*` or `flags.*`, resolved at evaluation time.
    Reference(String),
    /// `[a, 'b', 3]`
    Array(Vec<Literal>),
}

impl Literal {
    /// Parse a literal token. Returns `None` for a malformed regex or array,
    /// or for arrays nested deeper than 64 levels.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Self::parse_nested(token, 0)
    }

    fn parse_nested(token: &str, depth: usize) -> Option<Self> {
        let token = token.trim();
        if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            if depth >= MAX_DEPTH {
                return None;
            }
            return split_elements(inner)
                .into_iter()
                .map(|element| Self::parse_nested(element, depth + 1))
                .collect::<Option<Vec<_>>>()
                .map(Self::Array);
        }
        if token.starts_with('/') {
            return RegexLiteral::parse(token).map(Self::Regex);
        }
        if let Some(text) = unquote(token) {
            return Some(Self::Value(Value::String(text)));
        }
        let literal = match token {
            "true" => Self::Value(Value::Bool(true)),
            "false" => Self::Value(Value::Bool(false)),
            "null" => Self::Value(Value::Null),
            _ if NUMBER.is_match(token) => Self::Value(parse_number(token)),
            _ if REFERENCE.is_match(token) => Self::Reference(token.to_owned()),
            _ => Self::Value(Value::String(token.to_owned())),
        };
        Some(literal)
    }

    /// Literal from a JSON value, where strings shaped like references resolve lazily.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(text) if REFERENCE.is_match(text) => Self::Reference(text.clone()),
            other => Self::Value(other.clone()),
        }
    }

    /// Resolve against a context. Regexes resolve to their source text.
    #[must_use]
    pub fn resolve<'a>(&'a self, context: &'a Context) -> Cow<'a, Value> {
        match self {
            Self::Value(value) => Cow::Borrowed(value),
            Self::Reference(path) => context.resolve(path),
            Self::Regex(regex) => Cow::Owned(Value::String(regex.source.clone())),
            Self::Array(items) => Cow::Owned(Value::Array(
                items
                    .iter()
                    .map(|item| item.resolve(context).into_owned())
                    .collect(),
            )),
        }
    }

    /// Paths of every reference inside this literal.
    pub fn collect_references(&self, out: &mut Vec<String>) {
        match self {
            Self::Reference(path) => out.push(path.clone()),
            Self::Array(items) => items.iter().for_each(|item| item.collect_references(out)),
            Self::Value(_) | Self::Regex(_) => {}
        }
    }
}

fn parse_number(token: &str) -> Value {
    if let Ok(int) = token.parse::<i64>() {
        return Value::Number(int.into());
    }
    token
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(token.to_owned()), Value::Number)
}

fn unquote(token: &str) -> Option<String> {
    let quote = token.chars().next().filter(|c| matches!(c, '\'' | '"'))?;
    let inner = token
        .strip_prefix(quote)?
        .strip_suffix(quote)
        .filter(|_| token.len() >= 2)?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    Some(out)
}

/// Split array contents on top-level commas, skipping empty elements so
/// trailing commas are tolerated.
fn split_elements(inner: &str) -> Vec<&str> {
    let mask = LiteralMask::scan(inner);
    let mut elements = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, byte) in inner.bytes().enumerate() {
        if !mask.is_code(idx) {
            continue;
        }
        match byte {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                elements.push(&inner[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    elements.push(&inner[start..]);
    elements
        .into_iter()
        .map(str::trim)
        .filter(|element| !element.is_empty())
        .collect()
}
