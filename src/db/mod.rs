//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management
//! - Query execution
//! - Schema introspection
//! - Type mappings
//! - SQL dialect helpers
//!
//! Agents only see the [`Database`] trait. [`SqlxDatabase`] implements it for
//! PostgreSQL, MySQL and SQLite.

pub mod dialect;
pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use dialect::SqlDialect;
pub use executor::QueryExecutor;
pub use pool::{DbPool, PoolOptions};
pub use schema::SchemaInspector;

use crate::error::DbResult;
use crate::models::{ConstraintUsage, ResultSet, TableRef, masked_connection_string};
use async_trait::async_trait;
use tracing::info;

/// Read access to one relational database.
#[async_trait]
pub trait Database: Send + Sync {
    /// Dialect of the backend, used for generated column checks and sample SQL.
    fn dialect(&self) -> SqlDialect;

    /// Execute a statement and return its rows.
    async fn execute(&self, sql: &str) -> DbResult<ResultSet>;

    /// All base tables, each with its owning schema.
    async fn list_tables(&self) -> DbResult<Vec<TableRef>>;

    /// Constraint-column usage rows for `table`.
    async fn constraint_usage(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> DbResult<Vec<ConstraintUsage>>;

    /// Some other table whose key constraints use `column`.
    async fn linked_table(&self, column: &str, exclude_table: &str) -> DbResult<Option<String>>;
}

/// [`Database`] backed by a sqlx pool.
#[derive(Debug, Clone)]
pub struct SqlxDatabase {
    pool: DbPool,
    executor: QueryExecutor,
    dialect: SqlDialect,
}

impl SqlxDatabase {
    /// Connect using a `postgres://`, `mysql://` or `sqlite:` URL.
    pub async fn connect(
        connection_string: &str,
        options: PoolOptions,
        executor: QueryExecutor,
    ) -> DbResult<Self> {
        info!(
            database = %masked_connection_string(connection_string),
            "Opening database connection"
        );
        let pool = DbPool::connect(connection_string, options).await?;
        Ok(Self::from_pool(pool, executor))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: DbPool, executor: QueryExecutor) -> Self {
        let dialect = pool.db_type().dialect();
        Self {
            pool,
            executor,
            dialect,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Database for SqlxDatabase {
    fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    async fn execute(&self, sql: &str) -> DbResult<ResultSet> {
        self.executor.execute(&self.pool, sql).await
    }

    async fn list_tables(&self) -> DbResult<Vec<TableRef>> {
        SchemaInspector::list_tables(&self.pool).await
    }

    async fn constraint_usage(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> DbResult<Vec<ConstraintUsage>> {
        SchemaInspector::constraint_usage(&self.pool, table, schema).await
    }

    async fn linked_table(&self, column: &str, exclude_table: &str) -> DbResult<Option<String>> {
        SchemaInspector::linked_table(&self.pool, column, exclude_table).await
    }
}
