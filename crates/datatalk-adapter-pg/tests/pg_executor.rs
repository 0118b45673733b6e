//! Executor tests against a live Postgres. Skipped unless `DATABASE_URL`
//! is set.

use datatalk_core::{BoundParam, CellValue, ErrorKind, IntentKey, ParamType, ParamValue, ResolvedQuery};
use datatalk_guard::{GuardrailPolicy, GuardrailValidator};
use datatalk_adapter_pg::{PgExecutorOptions, PgQueryExecutor};
use datatalk_runtime::QueryExecutor;
use std::time::Duration;

fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty())
}

fn approve(sql: &str, views: &[&str], params: Vec<BoundParam>) -> datatalk_guard::ApprovedQuery {
    let policy = GuardrailPolicy::new(200, views.iter().copied()).allow_literals_from([sql]);
    GuardrailValidator::new(policy)
        .approve(ResolvedQuery {
            sql: sql.to_string(),
            params,
            source_intent: IntentKey::new("test"),
            row_cap: 5,
        })
        .unwrap()
}

#[tokio::test]
async fn reads_typed_rows_with_bound_params() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let executor = PgQueryExecutor::connect(&url, PgExecutorOptions::default())
        .await
        .unwrap();

    let query = approve(
        "SELECT relname::text AS name, $1::int AS n, $2::text IS NULL AS missing, current_date AS today\n\
         FROM pg_catalog.pg_class\n\
         WHERE relname = 'pg_class'\n\
         LIMIT 5",
        &["pg_catalog.pg_class"],
        vec![
            BoundParam {
                name: "n".into(),
                value: ParamValue::Integer(42),
            },
            BoundParam {
                name: "t".into(),
                value: ParamValue::Null(ParamType::Text),
            },
        ],
    );
    let result = executor.execute(&query).await.unwrap();

    assert_eq!(result.columns, vec!["name", "n", "missing", "today"]);
    assert_eq!(result.stats.row_count, 1);
    assert_eq!(result.rows[0][0], CellValue::Text("pg_class".into()));
    assert_eq!(result.rows[0][1], CellValue::Int(42));
    assert_eq!(result.rows[0][2], CellValue::Bool(true));
    assert!(matches!(result.rows[0][3], CellValue::Date(_)));
}

#[tokio::test]
async fn slow_statement_times_out() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let options = PgExecutorOptions {
        statement_timeout: Duration::from_millis(50),
        ..PgExecutorOptions::default()
    };
    let executor = PgQueryExecutor::connect(&url, options).await.unwrap();

    let query = approve(
        "SELECT count(*) AS n\n\
         FROM generate_series(1, $1) a, generate_series(1, $1) b\n\
         LIMIT 1",
        &["generate_series"],
        vec![BoundParam {
            name: "n".into(),
            value: ParamValue::Integer(1_000_000),
        }],
    );
    let err = executor.execute(&query).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExecutionTimeout);
}
