//! Guardrail validation.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. write clauses (any write, DDL or session keyword, or a non-query statement)
//! 2. multiple statements
//! 3. sources outside the allowed views
//! 4. top-level row limit
//! 5. raw literals that no first-party template contains

use crate::analyzer::{self, SqlAnalyzer};
use crate::error::RejectionReason;
use crate::policy::{GuardrailPolicy, Literal};
use datatalk_core::{BoundParam, ResolvedQuery};
use sqlparser::ast::Statement;
use sqlparser::tokenizer::Token;

/// Keywords that never appear in a read-only statement.
pub const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "UPSERT", "DROP", "ALTER", "TRUNCATE", "CREATE",
    "GRANT", "REVOKE", "COPY", "CALL", "DO", "EXECUTE", "PREPARE", "LOCK", "VACUUM", "REINDEX",
    "CLUSTER", "COMMENT", "INTO", "SET", "RESET", "LISTEN", "NOTIFY", "REFRESH", "IMPORT",
    "ATTACH", "DETACH", "BEGIN", "COMMIT", "ROLLBACK", "SAVEPOINT",
];

/// Outcome of validating one statement. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardrailVerdict {
    accepted: bool,
    reason: Option<RejectionReason>,
}

impl GuardrailVerdict {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(reason: RejectionReason) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn reason(&self) -> Option<&RejectionReason> {
        self.reason.as_ref()
    }

    pub fn into_reason(self) -> Option<RejectionReason> {
        self.reason
    }
}

/// A statement that passed every guardrail.
///
/// Only [`GuardrailValidator::approve`] can build one, and executors only
/// accept this type, so nothing unvalidated reaches the data store.
#[derive(Debug, Clone)]
pub struct ApprovedQuery {
    query: ResolvedQuery,
}

impl ApprovedQuery {
    pub fn query(&self) -> &ResolvedQuery {
        &self.query
    }

    pub fn sql(&self) -> &str {
        &self.query.sql
    }

    pub fn params(&self) -> &[BoundParam] {
        &self.query.params
    }

    pub fn into_inner(self) -> ResolvedQuery {
        self.query
    }
}

#[derive(Debug, Clone)]
pub struct GuardrailValidator {
    policy: GuardrailPolicy,
    analyzer: SqlAnalyzer,
}

type Check = Result<(), RejectionReason>;

impl GuardrailValidator {
    pub fn new(policy: GuardrailPolicy) -> Self {
        Self {
            policy,
            analyzer: SqlAnalyzer::new(),
        }
    }

    pub fn policy(&self) -> &GuardrailPolicy {
        &self.policy
    }

    pub fn validate(&self, query: &ResolvedQuery) -> GuardrailVerdict {
        self.validate_sql(&query.sql)
    }

    /// Validate raw SQL text. Pure and deterministic.
    pub fn validate_sql(&self, sql: &str) -> GuardrailVerdict {
        match self.run_checks(sql) {
            Ok(()) => GuardrailVerdict::accept(),
            Err(reason) => GuardrailVerdict::reject(reason),
        }
    }

    /// Validate and, on success, wrap the query for execution.
    pub fn approve(&self, query: ResolvedQuery) -> Result<ApprovedQuery, RejectionReason> {
        match self.run_checks(&query.sql) {
            Ok(()) => Ok(ApprovedQuery { query }),
            Err(reason) => {
                tracing::debug!(intent = %query.source_intent, reason = %reason, "statement rejected");
                Err(reason)
            }
        }
    }

    fn run_checks(&self, sql: &str) -> Check {
        let tokens = self
            .analyzer
            .tokenize(sql)
            .map_err(|e| RejectionReason::UnauthorizedSource(e.to_string()))?;
        let parsed = self.analyzer.parse(sql);

        check_write(&tokens, parsed.as_deref().ok())?;
        check_single_statement(&tokens, parsed.as_deref().ok())?;
        let statements = parsed.map_err(|e| RejectionReason::UnauthorizedSource(e.to_string()))?;
        self.check_sources(&statements)?;
        self.check_limit(&tokens)?;
        self.check_literals(&tokens)
    }

    fn check_sources(&self, statements: &[Statement]) -> Check {
        for stmt in statements {
            if let Some(relation) = self
                .analyzer
                .relations(stmt)
                .into_iter()
                .find(|r| !self.policy.is_allowed_view(r))
            {
                return Err(RejectionReason::UnauthorizedSource(format!(
                    "relation '{}' is not an allowed view",
                    relation
                )));
            }
            if let Some(function) = self
                .analyzer
                .function_names(stmt)
                .into_iter()
                .find(|f| self.policy.is_denied_function(f))
            {
                return Err(RejectionReason::UnauthorizedSource(format!(
                    "function '{}' reads outside the allowed views",
                    function
                )));
            }
        }
        Ok(())
    }

    fn check_limit(&self, tokens: &[Token]) -> Check {
        let first = analyzer::first_statement(tokens);
        let Some(at) = analyzer::top_level_limit(first) else {
            return Err(RejectionReason::MissingOrExcessiveLimit(
                "no top-level LIMIT".to_string(),
            ));
        };

        let rest: Vec<&Token> = first[at + 1..]
            .iter()
            .filter(|t| !analyzer::is_trivia(t))
            .collect();
        let bound = match rest.as_slice() {
            [Token::Number(n, _)] => n.parse::<u64>().map_err(|_| {
                RejectionReason::MissingOrExcessiveLimit(format!("LIMIT {} is not an integer", n))
            })?,
            [] => {
                return Err(RejectionReason::MissingOrExcessiveLimit(
                    "LIMIT has no bound".to_string(),
                ));
            }
            _ => {
                return Err(RejectionReason::MissingOrExcessiveLimit(
                    "LIMIT must be a literal integer ending the statement".to_string(),
                ));
            }
        };

        if bound > u64::from(self.policy.row_ceiling()) {
            return Err(RejectionReason::MissingOrExcessiveLimit(format!(
                "LIMIT {} exceeds ceiling {}",
                bound,
                self.policy.row_ceiling()
            )));
        }
        Ok(())
    }

    fn check_literals(&self, tokens: &[Token]) -> Check {
        let first = analyzer::first_statement(tokens);
        // the bound right after the top-level LIMIT was checked already
        let limit_bound = analyzer::top_level_limit(first).and_then(|at| {
            first[at + 1..]
                .iter()
                .position(|t| !analyzer::is_trivia(t))
                .map(|offset| at + 1 + offset)
        });

        let mut previous: Option<&Token> = None;
        for (i, token) in tokens.iter().enumerate() {
            if Some(i) == limit_bound {
                previous = Some(token);
                continue;
            }
            if analyzer::is_comment(token) {
                return Err(RejectionReason::SuspiciousLiteralSubstitution(
                    "comment in statement".to_string(),
                ));
            }
            if is_exotic_literal(token) {
                return Err(RejectionReason::SuspiciousLiteralSubstitution(
                    "unsupported literal form".to_string(),
                ));
            }
            if let Some(literal) = Literal::from_token(token) {
                if !self.policy.is_allowed_literal(previous, &literal) {
                    return Err(RejectionReason::SuspiciousLiteralSubstitution(format!(
                        "literal {:?} does not belong to any template",
                        literal
                    )));
                }
            }
            if !analyzer::is_trivia(token) {
                previous = Some(token);
            }
        }
        Ok(())
    }
}

fn check_write(tokens: &[Token], statements: Option<&[Statement]>) -> Check {
    if let Some(keyword) = tokens.iter().find_map(|t| {
        WRITE_KEYWORDS
            .iter()
            .find(|k| analyzer::is_keyword(t, k))
            .copied()
    }) {
        return Err(RejectionReason::WriteClauseDetected(format!(
            "keyword {}",
            keyword
        )));
    }
    if let Some(stmts) = statements {
        if stmts.iter().any(|s| !matches!(s, Statement::Query(_))) {
            return Err(RejectionReason::WriteClauseDetected(
                "statement is not a query".to_string(),
            ));
        }
    }
    Ok(())
}

fn check_single_statement(tokens: &[Token], statements: Option<&[Statement]>) -> Check {
    if let Some(sep) = tokens.iter().position(|t| matches!(t, Token::SemiColon)) {
        if tokens[sep + 1..].iter().any(|t| !analyzer::is_trivia(t)) {
            return Err(RejectionReason::MultipleStatements(
                "statement separator followed by more SQL".to_string(),
            ));
        }
    }
    if statements.is_some_and(|s| s.len() > 1) {
        return Err(RejectionReason::MultipleStatements(
            "more than one statement".to_string(),
        ));
    }
    Ok(())
}

fn is_exotic_literal(token: &Token) -> bool {
    matches!(
        token,
        Token::NationalStringLiteral(_)
            | Token::EscapedStringLiteral(_)
            | Token::HexStringLiteral(_)
            | Token::DollarQuotedString(_)
            | Token::DoubleQuotedString(_)
            | Token::UnicodeStringLiteral(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use datatalk_core::{ErrorKind, IntentKey};
    use pretty_assertions::assert_eq;

    const VIEW: &str = "odoo_replica.vw_invoices_semantic";

    fn validator() -> GuardrailValidator {
        GuardrailValidator::new(
            GuardrailPolicy::new(200, [VIEW])
                .allow_literals_from(["SELECT round(amount_residual, 2) FROM odoo_replica.vw_invoices_semantic WHERE customer ILIKE ('%' || $1 || '%')"]),
        )
    }

    fn kind(sql: &str) -> Option<ErrorKind> {
        validator().validate_sql(sql).reason().map(|r| r.kind())
    }

    #[test]
    fn test_accepts_template_shape() {
        let verdict = validator().validate_sql(
            "SELECT customer, round(amount_residual, 2) FROM odoo_replica.vw_invoices_semantic \
             WHERE customer ILIKE ('%' || $1 || '%')\nLIMIT 50",
        );
        assert!(verdict.is_accepted());
        assert_eq!(verdict.reason(), None);
    }

    #[test]
    fn test_write_clauses() {
        assert_eq!(kind("DELETE FROM odoo_replica.vw_invoices_semantic"), Some(ErrorKind::WriteClauseDetected));
        assert_eq!(
            kind("SELECT * INTO backup FROM odoo_replica.vw_invoices_semantic LIMIT 5"),
            Some(ErrorKind::WriteClauseDetected)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic FOR UPDATE"),
            Some(ErrorKind::WriteClauseDetected)
        );
        assert_eq!(kind("SHOW search_path"), Some(ErrorKind::WriteClauseDetected));
        assert_eq!(
            kind("WITH d AS (DELETE FROM t RETURNING *) SELECT * FROM d"),
            Some(ErrorKind::WriteClauseDetected)
        );
    }

    #[test]
    fn test_quoted_keywords_are_not_writes() {
        assert_eq!(
            kind("SELECT \"update\" FROM odoo_replica.vw_invoices_semantic LIMIT 5"),
            None
        );
    }

    #[test]
    fn test_multiple_statements_win_over_limit() {
        assert_eq!(
            kind("SELECT 1; SELECT 2"),
            Some(ErrorKind::MultipleStatements)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic LIMIT 5; SELECT 1"),
            Some(ErrorKind::MultipleStatements)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic LIMIT 5;"),
            None
        );
    }

    #[test]
    fn test_unauthorized_sources() {
        assert_eq!(
            kind("SELECT * FROM odoo_replica.account_move LIMIT 5"),
            Some(ErrorKind::UnauthorizedSource)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic v JOIN res_users u ON true LIMIT 5"),
            Some(ErrorKind::UnauthorizedSource)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic WHERE customer IN (SELECT usename FROM pg_user)"),
            Some(ErrorKind::UnauthorizedSource)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic UNION ALL TABLE res_partner LIMIT 5"),
            Some(ErrorKind::UnauthorizedSource)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic INTERSECT (TABLE public.res_users) LIMIT 5"),
            Some(ErrorKind::UnauthorizedSource)
        );
        assert_eq!(
            kind("SELECT current_setting('x') FROM odoo_replica.vw_invoices_semantic LIMIT 5"),
            Some(ErrorKind::UnauthorizedSource)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic WHERE ("),
            Some(ErrorKind::UnauthorizedSource)
        );
    }

    #[test]
    fn test_limit_rules() {
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic"),
            Some(ErrorKind::MissingOrExcessiveLimit)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic LIMIT 201"),
            Some(ErrorKind::MissingOrExcessiveLimit)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic LIMIT ALL"),
            Some(ErrorKind::MissingOrExcessiveLimit)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic LIMIT $1"),
            Some(ErrorKind::MissingOrExcessiveLimit)
        );
        assert_eq!(
            kind("SELECT * FROM (SELECT * FROM odoo_replica.vw_invoices_semantic LIMIT 5) s"),
            Some(ErrorKind::MissingOrExcessiveLimit)
        );
        assert_eq!(kind("SELECT * FROM odoo_replica.vw_invoices_semantic LIMIT 200"), None);
    }

    #[test]
    fn test_suspicious_literals() {
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic WHERE customer = 'ACME' LIMIT 5"),
            Some(ErrorKind::SuspiciousLiteralSubstitution)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic WHERE 1 = 1 LIMIT 5"),
            Some(ErrorKind::SuspiciousLiteralSubstitution)
        );
        // `2` appears in the template, but only as the round() precision
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic WHERE EXTRACT(DAY FROM due_date) = 2 LIMIT 5"),
            Some(ErrorKind::SuspiciousLiteralSubstitution)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic -- x\nLIMIT 5"),
            Some(ErrorKind::SuspiciousLiteralSubstitution)
        );
        assert_eq!(
            kind("SELECT * FROM odoo_replica.vw_invoices_semantic WHERE customer = E'a' LIMIT 5"),
            Some(ErrorKind::SuspiciousLiteralSubstitution)
        );
    }

    #[test]
    fn test_approve_wraps_only_accepted() {
        let v = validator();
        let ok = ResolvedQuery {
            sql: "SELECT * FROM odoo_replica.vw_invoices_semantic\nLIMIT 10".into(),
            params: vec![],
            source_intent: IntentKey::new("x"),
            row_cap: 10,
        };
        let approved = v.approve(ok.clone()).unwrap();
        assert_eq!(approved.sql(), ok.sql);

        let bad = ResolvedQuery {
            sql: "SELECT * FROM secrets LIMIT 10".into(),
            ..ok
        };
        assert_eq!(v.approve(bad).unwrap_err().kind(), ErrorKind::UnauthorizedSource);
    }
}
