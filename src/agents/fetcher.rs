//! The single path by which generated SQL reaches the database.

use crate::db::Database;
use crate::error::DbResult;
use crate::models::ResultSet;
use crate::tools::validate_readonly;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ResultFetcher {
    db: Arc<dyn Database>,
}

impl ResultFetcher {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Validate `sql` as read-only, then execute it.
    pub async fn execute(&self, sql: &str) -> DbResult<ResultSet> {
        validate_readonly(sql, self.db.dialect())?;

        let result = self.db.execute(sql).await?;
        info!(
            rows = result.row_count(),
            truncated = result.truncated,
            elapsed_ms = result.execution_time_ms,
            "Query executed"
        );
        Ok(result)
    }
}
