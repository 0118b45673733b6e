//! SQL parsing and token-level analysis.

use crate::error::GuardError;
use sqlparser::ast::{
    Expr, ObjectName, Query, SetExpr, Statement, Visit, Visitor, visit_expressions,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};
use std::collections::BTreeSet;
use std::ops::ControlFlow;

/// Analyzes SQL text with the PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlAnalyzer;

impl SqlAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Parse a SQL string into statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, GuardError> {
        Parser::parse_sql(&PostgreSqlDialect {}, sql).map_err(|e| GuardError::Parse(e.to_string()))
    }

    /// Split SQL into tokens, comments and whitespace included.
    pub fn tokenize(&self, sql: &str) -> Result<Vec<Token>, GuardError> {
        Tokenizer::new(&PostgreSqlDialect {}, sql)
            .tokenize()
            .map_err(|e| GuardError::Tokenize(e.to_string()))
    }

    /// Relations read by a statement, normalized, excluding its own CTE names.
    ///
    /// Covers table references in `FROM`/`JOIN` and Postgres `TABLE name`
    /// operands of a query body, at any nesting depth.
    pub fn relations(&self, stmt: &Statement) -> BTreeSet<String> {
        let mut collector = RelationCollector::default();
        let _ = stmt.visit(&mut collector);

        let ctes = cte_names(stmt);
        collector
            .relations
            .into_iter()
            .filter(|r| !ctes.contains(r))
            .collect()
    }

    /// Names of every function called anywhere in a statement, normalized.
    pub fn function_names(&self, stmt: &Statement) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let _ = visit_expressions(stmt, |expr| {
            if let Expr::Function(function) = expr {
                names.insert(normalize_name(&function.name.to_string()));
            }
            ControlFlow::<()>::Continue(())
        });
        names
    }

    /// Whether a statement is a plain query (`SELECT`, `WITH ... SELECT`, `VALUES`).
    pub fn is_query(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Query(_))
    }
}

#[derive(Default)]
struct RelationCollector {
    relations: BTreeSet<String>,
}

impl RelationCollector {
    fn collect_set_expr(&mut self, body: &SetExpr) {
        match body {
            SetExpr::Table(table) => {
                // `TABLE name` carries plain strings, not an ObjectName
                let name = match (&table.schema_name, &table.table_name) {
                    (Some(schema), Some(name)) => format!("{}.{}", schema, name),
                    (None, Some(name)) => name.clone(),
                    (_, None) => String::new(),
                };
                self.relations.insert(normalize_name(&name));
            }
            SetExpr::SetOperation { left, right, .. } => {
                self.collect_set_expr(left);
                self.collect_set_expr(right);
            }
            // nested queries reach `pre_visit_query` on their own
            _ => {}
        }
    }
}

impl Visitor for RelationCollector {
    type Break = ();

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<()> {
        self.relations.insert(normalize_name(&relation.to_string()));
        ControlFlow::Continue(())
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<()> {
        self.collect_set_expr(&query.body);
        ControlFlow::Continue(())
    }
}

fn cte_names(stmt: &Statement) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    if let Statement::Query(query) = stmt {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                names.insert(normalize_name(&cte.alias.name.value));
            }
        }
    }
    names
}

/// Lower-case a (possibly qualified, possibly quoted) name and drop quotes.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '"')
        .collect::<String>()
        .trim()
        .to_lowercase()
}

/// Whether a token carries no meaning for the statement (whitespace or comment).
pub fn is_trivia(token: &Token) -> bool {
    matches!(token, Token::Whitespace(_))
}

pub fn is_comment(token: &Token) -> bool {
    matches!(
        token,
        Token::Whitespace(Whitespace::SingleLineComment { .. } | Whitespace::MultiLineComment(_))
    )
}

/// An unquoted word token equal (case-insensitively) to `keyword`.
pub fn is_keyword(token: &Token, keyword: &str) -> bool {
    match token {
        Token::Word(word) => word.quote_style.is_none() && word.value.eq_ignore_ascii_case(keyword),
        _ => false,
    }
}

/// Tokens up to (not including) the first statement separator.
pub fn first_statement(tokens: &[Token]) -> &[Token] {
    let end = tokens
        .iter()
        .position(|t| matches!(t, Token::SemiColon))
        .unwrap_or(tokens.len());
    &tokens[..end]
}

/// Index of the last `LIMIT` keyword outside any parentheses.
pub fn top_level_limit(tokens: &[Token]) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut found = None;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth -= 1,
            _ if depth == 0 && is_keyword(token, "LIMIT") => found = Some(i),
            _ => {}
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relations_exclude_ctes() {
        let analyzer = SqlAnalyzer::new();
        let stmts = analyzer
            .parse(
                "WITH recent AS (SELECT * FROM \"Sales\".\"Invoices\") \
                 SELECT * FROM recent JOIN customers c ON c.id = recent.customer_id",
            )
            .unwrap();
        let relations = analyzer.relations(&stmts[0]);
        assert_eq!(
            relations,
            BTreeSet::from(["sales.invoices".to_string(), "customers".to_string()])
        );
    }

    #[test]
    fn test_relations_include_table_operands() {
        let analyzer = SqlAnalyzer::new();
        let stmts = analyzer
            .parse("SELECT * FROM v UNION ALL TABLE res_partner LIMIT 5")
            .unwrap();
        assert_eq!(
            analyzer.relations(&stmts[0]),
            BTreeSet::from(["v".to_string(), "res_partner".to_string()])
        );

        let stmts = analyzer
            .parse("SELECT * FROM v WHERE id IN (SELECT id FROM v EXCEPT TABLE \"Auth\".users)")
            .unwrap();
        assert!(analyzer.relations(&stmts[0]).contains("auth.users"));
    }

    #[test]
    fn test_function_names() {
        let analyzer = SqlAnalyzer::new();
        let stmts = analyzer
            .parse("SELECT round(x, 2), pg_catalog.pg_read_file('/etc/passwd') FROM v")
            .unwrap();
        let names = analyzer.function_names(&stmts[0]);
        assert!(names.contains("round"));
        assert!(names.contains("pg_catalog.pg_read_file"));
    }

    #[test]
    fn test_top_level_limit_ignores_subqueries() {
        let analyzer = SqlAnalyzer::new();
        let tokens = analyzer
            .tokenize("SELECT * FROM (SELECT * FROM v LIMIT 5) s")
            .unwrap();
        assert_eq!(top_level_limit(&tokens), None);

        let tokens = analyzer
            .tokenize("SELECT * FROM (SELECT * FROM v LIMIT 5) s LIMIT 7")
            .unwrap();
        let i = top_level_limit(&tokens).unwrap();
        assert!(is_keyword(&tokens[i], "limit"));
    }

    #[test]
    fn test_comments_are_trivia() {
        let analyzer = SqlAnalyzer::new();
        let tokens = analyzer.tokenize("SELECT 1 -- note\n").unwrap();
        assert!(tokens.iter().any(is_comment));
        assert!(tokens.iter().filter(|t| is_comment(t)).all(is_trivia));
    }
}
