use std::fmt;

/// Comparison operator shared by structured conditions, the rule DSL and
/// `requiredIf` validations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `==`, loose equality.
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// Value is a member of the literal array.
    In,
    /// Value is not a member of the literal array.
    NotIn,
    /// Array value contains the literal, or string value contains it as a substring.
    Includes,
    /// Value is truthy. Takes no operand.
    Truthy,
    /// Value is falsy. Takes no operand.
    Falsy,
    /// Value is empty. Takes no operand.
    Empty,
    /// Value is not empty. Takes no operand.
    Filled,
    /// Value's text matches a regular expression.
    Matches,
}

impl Operator {
    /// Every operator, longest spelling first so prefix scanning never
    /// mistakes `>=` for `>` or `not-in` for `in`.
    pub const BY_LENGTH: [Self; 14] = [
        Self::Includes,
        Self::Matches,
        Self::NotIn,
        Self::Filled,
        Self::Truthy,
        Self::Falsy,
        Self::Empty,
        Self::Ge,
        Self::Le,
        Self::Eq,
        Self::Ne,
        Self::In,
        Self::Gt,
        Self::Lt,
    ];

    /// Parse an operator token. Only canonical spellings are accepted.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Self::BY_LENGTH.into_iter().find(|op| op.as_str() == token)
    }

    /// Canonical spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not-in",
            Self::Includes => "includes",
            Self::Truthy => "truthy",
            Self::Falsy => "falsy",
            Self::Empty => "empty",
            Self::Filled => "filled",
            Self::Matches => "matches",
        }
    }

    /// Whether the operator needs a right-hand operand.
    #[must_use]
    pub fn takes_operand(&self) -> bool {
        !matches!(
            self,
            Self::Truthy | Self::Falsy | Self::Empty | Self::Filled
        )
    }

    /// Whether the spelling is a word, which must end at a word boundary.
    #[must_use]
    pub fn is_word(&self) -> bool {
        self.as_str().starts_with(|c: char| c.is_ascii_alphabetic())
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
