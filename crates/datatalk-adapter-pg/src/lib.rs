//! Postgres executor.
//!
//! Every approved statement runs inside its own read-only transaction with a
//! transaction-local `statement_timeout`, and the transaction is always
//! rolled back. Values travel only as bound parameters.

use async_trait::async_trait;
use datatalk_core::{CellValue, DatabaseConfig, ParamType, ParamValue, QueryStats};
use datatalk_guard::ApprovedQuery;
use datatalk_runtime::{ExecutionError, ExecutionResult, QueryExecutor};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{Arguments, Column, Row, TypeInfo};
use std::time::{Duration, Instant};

/// SQLSTATE raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";

fn args_add<T>(args: &mut PgArguments, v: T) -> Result<(), ExecutionError>
where
    T: Send + Sync + 'static,
    for<'q> T: sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    args.add(v).map_err(|e| ExecutionError::Database {
        cause: format!("failed to bind parameter: {}", e),
    })
}

#[derive(Debug, Clone, Copy)]
pub struct PgExecutorOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

impl Default for PgExecutorOptions {
    fn default() -> Self {
        Self::from(&DatabaseConfig::default())
    }
}

impl From<&DatabaseConfig> for PgExecutorOptions {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections.max(1),
            acquire_timeout: Duration::from_millis(config.acquire_timeout_ms),
            statement_timeout: Duration::from_millis(config.statement_timeout_ms),
        }
    }
}

pub struct PgQueryExecutor {
    pool: sqlx::PgPool,
    options: PgExecutorOptions,
}

impl PgQueryExecutor {
    /// Connect a bounded pool. Waiting longer than `acquire_timeout` for a
    /// connection fails with `PoolExhausted` instead of growing the pool.
    pub async fn connect(database_url: &str, options: PgExecutorOptions) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(database_url)
            .await?;
        Ok(Self { pool, options })
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        tracing::info!(
            database = %config.display_target(),
            max_connections = config.max_connections,
            "connecting to database"
        );
        Self::connect(&config.connection_string(), PgExecutorOptions::from(config)).await
    }

    pub fn options(&self) -> &PgExecutorOptions {
        &self.options
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn run(&self, query: &ApprovedQuery) -> Result<Vec<PgRow>, ExecutionError> {
        let mut args = PgArguments::default();
        for param in query.params() {
            bind(&mut args, &param.value)?;
        }

        let mut tx = self.pool.begin().await.map_err(|e| self.map_error(e))?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| self.map_error(e))?;
        sqlx::query("SELECT set_config('statement_timeout', $1, true)")
            .bind(format!("{}ms", self.options.statement_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(|e| self.map_error(e))?;

        let rows = sqlx::query_with(query.sql(), args)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| self.map_error(e))?;

        if let Err(e) = tx.rollback().await {
            tracing::warn!(error = %e, "rollback of read-only transaction failed");
        }
        Ok(rows)
    }

    fn map_error(&self, e: sqlx::Error) -> ExecutionError {
        match &e {
            sqlx::Error::PoolTimedOut => ExecutionError::PoolExhausted {
                waited_ms: self.options.acquire_timeout.as_millis() as u64,
            },
            sqlx::Error::Database(db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                ExecutionError::Timeout {
                    timeout_ms: self.options.statement_timeout.as_millis() as u64,
                }
            }
            _ => ExecutionError::Database {
                cause: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl QueryExecutor for PgQueryExecutor {
    async fn execute(&self, query: &ApprovedQuery) -> Result<ExecutionResult, ExecutionError> {
        let started = Instant::now();
        // client-side bound on top of the server-side statement_timeout
        let budget = self.options.acquire_timeout + self.options.statement_timeout;
        let rows = match tokio::time::timeout(budget, self.run(query)).await {
            Ok(rows) => rows?,
            Err(_) => {
                return Err(ExecutionError::Timeout {
                    timeout_ms: self.options.statement_timeout.as_millis() as u64,
                });
            }
        };

        let columns = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => Vec::new(),
        };
        let decoded = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()?;

        let stats = QueryStats {
            duration_ms: started.elapsed().as_millis() as u64,
            row_count: decoded.len() as u64,
        };
        tracing::debug!(
            intent = %query.query().source_intent,
            rows = stats.row_count,
            duration_ms = stats.duration_ms,
            "statement executed"
        );

        Ok(ExecutionResult {
            columns,
            rows: decoded,
            stats,
        })
    }
}

fn bind(args: &mut PgArguments, value: &ParamValue) -> Result<(), ExecutionError> {
    match value {
        ParamValue::Integer(n) => args_add(args, *n),
        ParamValue::Date(d) => args_add(args, *d),
        ParamValue::Text(s) => args_add(args, s.clone()),
        ParamValue::Null(ParamType::Integer) => args_add(args, Option::<i64>::None),
        ParamValue::Null(ParamType::Date) => args_add(args, Option::<chrono::NaiveDate>::None),
        ParamValue::Null(ParamType::Text) => args_add(args, Option::<String>::None),
    }
}

fn decode_row(row: &PgRow) -> Result<Vec<CellValue>, ExecutionError> {
    (0..row.columns().len()).map(|i| decode_cell(row, i)).collect()
}

fn decode_cell(row: &PgRow, i: usize) -> Result<CellValue, ExecutionError> {
    let type_name = row.columns()[i].type_info().name().to_string();
    let cell = match type_name.as_str() {
        "BOOL" => row.try_get::<Option<bool>, _>(i).map(|v| v.map(CellValue::Bool)),
        "INT2" => row
            .try_get::<Option<i16>, _>(i)
            .map(|v| v.map(|n| CellValue::Int(i64::from(n)))),
        "INT4" => row
            .try_get::<Option<i32>, _>(i)
            .map(|v| v.map(|n| CellValue::Int(i64::from(n)))),
        "INT8" => row.try_get::<Option<i64>, _>(i).map(|v| v.map(CellValue::Int)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(i)
            .map(|v| v.map(|f| CellValue::Float(f64::from(f)))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(i).map(|v| v.map(CellValue::Float)),
        "NUMERIC" => row
            .try_get::<Option<sqlx::types::BigDecimal>, _>(i)
            .map(|v| v.map(|d| CellValue::Decimal(d.to_string()))),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(i)
            .map(|v| v.map(CellValue::Date)),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i)
            .map(|v| v.map(CellValue::Timestamp)),
        // naive timestamps are taken as UTC
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(i)
            .map(|v| v.map(|ts| CellValue::Timestamp(ts.and_utc()))),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(i)
            .map(|v| v.map(|id| CellValue::Text(id.to_string()))),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(i)
            .map(|v| v.map(|j| CellValue::Text(j.to_string()))),
        _ => row.try_get::<Option<String>, _>(i).map(|v| v.map(CellValue::Text)),
    };

    cell.map(|v| v.unwrap_or(CellValue::Null))
        .map_err(|e| ExecutionError::Database {
            cause: format!("cannot decode column {} of type {}: {}", i, type_name, e),
        })
}
