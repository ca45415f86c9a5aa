//! Literal-aware scanning of rule text.
//!
//! Rule text is split on `->`, `AND` and `OR`, none of which may be split
//! on when they appear inside a quoted string or a `/regex/` literal.
//! [`LiteralMask`] marks which bytes belong to such literals so the splitting
//! code can work on plain byte offsets.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Quoted(char),
    Regex,
}

/// Per-byte flags: `true` where the byte is inside a string or regex literal.
#[derive(Debug)]
pub(crate) struct LiteralMask {
    literal: Vec<bool>,
}

impl LiteralMask {
    /// Scan `text`, tracking quotes and regex delimiters with backslash escapes.
    ///
    /// A `/` opens a regex only at the start of a token, i.e. at the start of
    /// the text or after whitespace, `(`, `[` or `,`.
    pub(crate) fn scan(text: &str) -> Self {
        let mut literal = vec![false; text.len()];
        let mut state = State::Code;
        let mut escaped = false;
        let mut prev: Option<char> = None;

        for (idx, ch) in text.char_indices() {
            let inside = match state {
                State::Code => match ch {
                    '"' | '\'' => {
                        state = State::Quoted(ch);
                        true
                    }
                    '/' if starts_token(prev) => {
                        state = State::Regex;
                        true
                    }
                    _ => false,
                },
                State::Quoted(quote) => {
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == quote {
                        state = State::Code;
                    }
                    true
                }
                State::Regex => {
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == '/' {
                        state = State::Code;
                    }
                    true
                }
            };
            literal[idx..idx + ch.len_utf8()].fill(inside);
            prev = Some(ch);
        }

        Self { literal }
    }

    /// Whether the byte at `idx` is outside every literal.
    pub(crate) fn is_code(&self, idx: usize) -> bool {
        !self.literal.get(idx).copied().unwrap_or(true)
    }

    /// Byte offset of the first occurrence of `needle` entirely outside literals.
    pub(crate) fn find(&self, text: &str, needle: &str) -> Option<usize> {
        text.match_indices(needle)
            .map(|(idx, _)| idx)
            .find(|&idx| (idx..idx + needle.len()).all(|i| self.is_code(i)))
    }
}

fn starts_token(prev: Option<char>) -> bool {
    prev.is_none_or(|c| c.is_whitespace() || matches!(c, '(' | '[' | ','))
}

/// Connective joining two clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    fn keyword(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Split condition text on whitespace-delimited `AND` / `OR` keywords
/// outside literals.
///
/// The first part has no connective; every following part carries the
/// connective that precedes it.
pub(crate) fn split_connectives(text: &str) -> Vec<(Option<Connective>, &str)> {
    let mask = LiteralMask::scan(text);
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut pending = None;
    let mut start = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        let hit = [Connective::And, Connective::Or]
            .into_iter()
            .find(|conn| keyword_at(text, &mask, idx, conn.keyword()));
        if let Some(conn) = hit {
            parts.push((pending, &text[start..idx]));
            pending = Some(conn);
            idx += conn.keyword().len();
            start = idx;
        } else {
            idx += 1;
        }
    }
    parts.push((pending, &text[start..]));
    parts
}

fn keyword_at(text: &str, mask: &LiteralMask, idx: usize, keyword: &str) -> bool {
    let bytes = text.as_bytes();
    let end = idx + keyword.len();
    idx > 0
        && bytes[idx - 1].is_ascii_whitespace()
        && bytes.get(end).is_some_and(u8::is_ascii_whitespace)
        && text.get(idx..end) == Some(keyword)
        && (idx..end).all(|i| mask.is_code(i))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn arrow_inside_quotes_is_ignored() {
        let text = "values.note == 'a -> b' -> hide";
        let mask = LiteralMask::scan(text);
        assert_eq!(mask.find(text, "->"), Some(24));
    }

    #[test]
    fn arrow_inside_regex_is_ignored() {
        let text = r"values.code matches /x->y/i -> disable";
        let mask = LiteralMask::scan(text);
        assert_eq!(&text[mask.find(text, "->").unwrap()..], "-> disable");
    }

    #[test]
    fn escaped_quote_does_not_close_string() {
        let text = r#"values.a == "say \"hi\" -> ok" -> hide"#;
        let mask = LiteralMask::scan(text);
        assert_eq!(&text[mask.find(text, "->").unwrap()..], "-> hide");
    }

    #[test]
    fn unterminated_literal_swallows_rest() {
        let text = "values.a == 'oops -> hide";
        let mask = LiteralMask::scan(text);
        assert_eq!(mask.find(text, "->"), None);
    }

    #[test]
    fn splits_on_connectives_in_code_only() {
        let parts = split_connectives("values.a == 'X AND Y' AND values.b filled OR flags.beta == true");
        assert_eq!(
            parts,
            vec![
                (None, "values.a == 'X AND Y' "),
                (Some(Connective::And), " values.b filled "),
                (Some(Connective::Or), " flags.beta == true"),
            ]
        );
    }

    #[test]
    fn connectives_need_surrounding_whitespace_and_uppercase() {
        let parts = split_connectives("values.brand == ANDROID and values.x filled");
        assert_eq!(parts.len(), 1);
        let parts = split_connectives("values.tag matches /A OR B/ OR values.x empty");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].1, "values.tag matches /A OR B/ ");
    }
}
