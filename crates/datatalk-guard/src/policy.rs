//! What the validator allows.

use crate::analyzer::{self, SqlAnalyzer, normalize_name};
use sqlparser::tokenizer::Token;
use std::collections::BTreeSet;

/// A literal as it appears in SQL text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Literal {
    Number(String),
    String(String),
}

impl Literal {
    /// The literal carried by a plain number or single-quoted string token.
    pub fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Number(n, _) => Some(Self::Number(n.clone())),
            Token::SingleQuotedString(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }
}

/// The token a literal follows, as a lookup key. Unquoted words are
/// upper-cased so keyword spelling does not matter.
fn context_key(previous: Option<&Token>) -> String {
    match previous {
        Some(Token::Word(word)) if word.quote_style.is_none() => word.value.to_uppercase(),
        Some(token) => token.to_string(),
        None => String::new(),
    }
}

/// Function names (or prefixes, when ending in `*`) that reach outside the
/// allowed views.
pub const DENIED_FUNCTIONS: &[&str] = &[
    "pg_*",
    "dblink*",
    "lo_*",
    "current_setting",
    "set_config",
    "query_to_xml*",
    "table_to_xml*",
];

#[derive(Debug, Clone)]
pub struct GuardrailPolicy {
    row_ceiling: u32,
    allowed_views: BTreeSet<String>,
    /// Literals keyed by the token they follow in a first-party shape.
    allowed_literals: BTreeSet<(String, Literal)>,
}

impl GuardrailPolicy {
    pub fn new<I, S>(row_ceiling: u32, allowed_views: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            row_ceiling,
            allowed_views: allowed_views
                .into_iter()
                .map(|v| normalize_name(v.as_ref()))
                .collect(),
            allowed_literals: BTreeSet::new(),
        }
    }

    /// Allow every literal that appears in the given first-party shapes, in
    /// the position it appears there: a literal is only accepted after the
    /// same token it follows in some shape. `round(x, 2)` therefore does not
    /// make `= 2` acceptable.
    ///
    /// Shapes that fail to tokenize contribute nothing.
    pub fn allow_literals_from<'a>(mut self, shapes: impl IntoIterator<Item = &'a str>) -> Self {
        let analyzer = SqlAnalyzer::new();
        for shape in shapes {
            let tokens = match analyzer.tokenize(shape) {
                Ok(tokens) => tokens,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping untokenizable template shape");
                    continue;
                }
            };
            let mut previous = None;
            for token in tokens.iter().filter(|t| !analyzer::is_trivia(t)) {
                if let Some(literal) = Literal::from_token(token) {
                    self.allowed_literals.insert((context_key(previous), literal));
                }
                previous = Some(token);
            }
        }
        self
    }

    pub fn row_ceiling(&self) -> u32 {
        self.row_ceiling
    }

    pub fn allowed_views(&self) -> &BTreeSet<String> {
        &self.allowed_views
    }

    pub fn is_allowed_view(&self, relation: &str) -> bool {
        self.allowed_views.contains(&normalize_name(relation))
    }

    /// Whether `literal`, following `previous` (the last non-trivia token),
    /// occurs in that position in a first-party shape.
    pub fn is_allowed_literal(&self, previous: Option<&Token>, literal: &Literal) -> bool {
        self.allowed_literals
            .contains(&(context_key(previous), literal.clone()))
    }

    pub fn is_denied_function(&self, name: &str) -> bool {
        let name = normalize_name(name);
        let last = name.rsplit('.').next().unwrap_or(&name);
        DENIED_FUNCTIONS.iter().any(|denied| match denied.strip_suffix('*') {
            Some(prefix) => last.starts_with(prefix),
            None => last == *denied,
        })
    }
}
