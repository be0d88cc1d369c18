//! Query execution engine.
//!
//! This module provides query execution functionality with support for:
//! - Row limits (enforced via streaming - only fetches needed rows)
//! - Query timeouts
//! - Column names for empty results, taken from the prepared statement
//!
//! Each backend submodule provides identical functionality adapted to the
//! database's row type.

use crate::db::pool::DbPool;
use crate::db::types::RowDecode;
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnMetadata, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, ResultSet,
};
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Query executor that handles database query execution.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    default_timeout: Duration,
    default_limit: u32,
}

impl QueryExecutor {
    /// Create a new query executor with default settings.
    pub fn new() -> Self {
        Self {
            default_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            default_limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Create a new query executor with custom settings.
    pub fn with_defaults(timeout_secs: u64, row_limit: u32) -> Self {
        Self {
            default_timeout: Duration::from_secs(timeout_secs),
            // Clamp limit to [1, MAX_ROW_LIMIT]; a zero limit would mark every result truncated
            default_limit: row_limit.clamp(1, MAX_ROW_LIMIT),
        }
    }

    pub fn row_limit(&self) -> u32 {
        self.default_limit
    }

    /// Execute a statement and return its rows in column order.
    pub async fn execute(&self, pool: &DbPool, sql: &str) -> DbResult<ResultSet> {
        let start = Instant::now();
        let row_limit = self.default_limit;
        let query_timeout = self.default_timeout;

        debug!(
            sql = %sql,
            limit = row_limit,
            timeout_secs = query_timeout.as_secs(),
            "Executing query"
        );

        let mut result = match pool {
            DbPool::MySql(p) => {
                let rows = mysql::fetch_rows(p, sql, row_limit, query_timeout).await?;
                process_rows(rows, row_limit)?
            }
            DbPool::Postgres(p) => {
                let rows = postgres::fetch_rows(p, sql, row_limit, query_timeout).await?;
                process_rows(rows, row_limit)?
            }
            DbPool::SQLite(p) => {
                let rows = sqlite::fetch_rows(p, sql, row_limit, query_timeout).await?;
                process_rows(rows, row_limit)?
            }
        };

        if result.columns.is_empty() {
            result.columns = self.describe_columns(pool, sql).await;
        }

        result.execution_time_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Column names of a statement without fetching rows.
    ///
    /// Failures are logged and produce an empty list.
    async fn describe_columns(&self, pool: &DbPool, sql: &str) -> Vec<ColumnMetadata> {
        let described = match pool {
            DbPool::MySql(p) => timeout(self.default_timeout, mysql::describe_columns(p, sql)).await,
            DbPool::Postgres(p) => {
                timeout(self.default_timeout, postgres::describe_columns(p, sql)).await
            }
            DbPool::SQLite(p) => {
                timeout(self.default_timeout, sqlite::describe_columns(p, sql)).await
            }
        };

        match described {
            Ok(Ok(columns)) => columns,
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to describe result columns");
                Vec::new()
            }
            Err(_) => {
                warn!("Timed out describing result columns");
                Vec::new()
            }
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Process rows from any database type into a ResultSet.
fn process_rows<R: RowDecode>(rows: Vec<R>, row_limit: u32) -> DbResult<ResultSet> {
    let Some(first) = rows.first() else {
        return Ok(ResultSet::default());
    };

    let columns = first.column_metadata();
    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;

    let values = rows
        .iter()
        .take(row_limit as usize)
        .map(RowDecode::decode_values)
        .collect::<DbResult<Vec<_>>>()?;

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    Ok(ResultSet {
        columns,
        rows: values,
        execution_time_ms: 0,
        truncated,
    })
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    results
        .into_iter()
        .map(|result| result.map_err(DbError::from))
        .collect()
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout.as_secs() as u32)
}

fn statement_columns<C: sqlx::Column>(columns: &[C]) -> Vec<ColumnMetadata> {
    use sqlx::TypeInfo;

    columns
        .iter()
        .map(|c| ColumnMetadata::new(c.name(), c.type_info().name()))
        .collect()
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// Raw SQL is sent without arguments to avoid prepared statement issues.

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{Executor, MySqlPool, Statement};

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<MySqlRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn describe_columns(pool: &MySqlPool, sql: &str) -> DbResult<Vec<ColumnMetadata>> {
        let statement = pool.prepare(sql).await?;
        Ok(statement_columns(statement.columns()))
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::PgRow;
    use sqlx::{Executor, PgPool, Statement};

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<PgRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn describe_columns(pool: &PgPool, sql: &str) -> DbResult<Vec<ColumnMetadata>> {
        let statement = pool.prepare(sql).await?;
        Ok(statement_columns(statement.columns()))
    }
}

mod sqlite {
    use super::*;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Executor, SqlitePool, Statement};

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<SqliteRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>();

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }

    pub async fn describe_columns(pool: &SqlitePool, sql: &str) -> DbResult<Vec<ColumnMetadata>> {
        let statement = pool.prepare(sql).await?;
        Ok(statement_columns(statement.columns()))
    }
}
