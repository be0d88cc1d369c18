//! Table catalogue: one natural-language summary per base table.
//!
//! For each table, strictly one at a time: detect which columns the driver
//! can read, describe its key relationships, sample a few rows, ask the
//! language model for a summary and persist it. A failing table is counted
//! and skipped; it never aborts the run.

use super::walker::SchemaWalker;
use crate::db::Database;
use crate::error::AgentResult;
use crate::llm::LanguageModel;
use crate::models::{TableMetadata, TableRef};
use crate::store::{SchemaIndex, SummaryStore};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Rows sampled per table for the prompt.
pub const DEFAULT_SAMPLE_ROWS: u32 = 20;

pub const NO_DATA_AVAILABLE: &str = "No data available.";

#[derive(Debug)]
pub struct TableFailure {
    pub table: TableRef,
    pub error: crate::error::AgentError,
}

/// Outcome of one catalog run.
#[derive(Debug, Default)]
pub struct CatalogReport {
    /// Table name to generated summary, for every processed table
    pub summaries: BTreeMap<String, String>,
    /// Index of every base table seen
    pub index: SchemaIndex,
    pub total: usize,
    pub processed: usize,
    pub failed: Vec<TableFailure>,
}

impl CatalogReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// One-line outcome shown to the user.
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "Processing complete: {}/{} tables processed successfully.",
            self.processed, self.total
        );
        if !self.failed.is_empty() {
            line.push_str(&format!(" {} tables failed to process.", self.failed.len()));
        }
        line
    }
}

pub struct CatalogBuilder {
    db: Arc<dyn Database>,
    llm: Arc<dyn LanguageModel>,
    walker: SchemaWalker,
    store: SummaryStore,
    sample_rows: u32,
    schema_index_path: Option<PathBuf>,
}

impl CatalogBuilder {
    pub fn new(db: Arc<dyn Database>, llm: Arc<dyn LanguageModel>, store: SummaryStore) -> Self {
        Self {
            walker: SchemaWalker::new(Arc::clone(&db)),
            db,
            llm,
            store,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            schema_index_path: None,
        }
    }

    pub fn with_sample_rows(mut self, rows: u32) -> Self {
        self.sample_rows = rows.max(1);
        self
    }

    /// Write the schema index to `path` after every run.
    pub fn with_schema_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_index_path = Some(path.into());
        self
    }

    pub fn store(&self) -> &SummaryStore {
        &self.store
    }

    /// Summarize every base table.
    ///
    /// Fails only when the table list itself cannot be read or the schema
    /// index cannot be written.
    pub async fn summarize_all_tables(&self) -> AgentResult<CatalogReport> {
        let tables = self.db.list_tables().await?;
        let mut report = CatalogReport {
            index: SchemaIndex::from_tables(&tables),
            total: tables.len(),
            ..CatalogReport::default()
        };

        for table in &tables {
            info!(table = %table, "Processing table");
            match self.summarize_table(table).await {
                Ok(summary) => {
                    report.summaries.insert(table.name.clone(), summary);
                    report.processed += 1;
                }
                Err(error) => {
                    warn!(
                        table = %table,
                        kind = error.kind(),
                        error = %error,
                        "Failed to process table"
                    );
                    report.failed.push(TableFailure {
                        table: table.clone(),
                        error,
                    });
                }
            }
        }

        if let Some(path) = &self.schema_index_path {
            report.index.save(path).await?;
        }

        info!(
            total = report.total,
            processed = report.processed,
            failed = report.failed_count(),
            "Catalog run complete"
        );
        Ok(report)
    }

    /// Build, generate and persist the summary of one table.
    pub async fn summarize_table(&self, table: &TableRef) -> AgentResult<String> {
        let metadata = self.table_metadata(table).await?;
        let relationships = self.walker.discover_relationships(table).await.render();
        let samples = self.sample_rows(&metadata).await;

        let prompt = build_prompt(&metadata, &samples, &relationships);
        let summary = self.llm.complete(&prompt).await?;
        self.store.save(&table.name, &summary).await?;
        Ok(summary)
    }

    /// Read column names with a zero-row query, then try each column.
    ///
    /// A column whose one-row read fails is unsupported.
    pub async fn table_metadata(&self, table: &TableRef) -> AgentResult<TableMetadata> {
        let dialect = self.db.dialect();
        let shape = self.db.execute(&dialect.empty_projection(table)).await?;
        let columns: Vec<String> = shape.columns.into_iter().map(|c| c.name).collect();

        let mut supported_columns = Vec::new();
        let mut unsupported_columns = Vec::new();
        for column in &columns {
            let check = dialect.select_limited(std::slice::from_ref(column), table, 1);
            match self.db.execute(&check).await {
                Ok(_) => supported_columns.push(column.clone()),
                Err(error) => {
                    debug!(table = %table, column = %column, error = %error, "Unsupported column");
                    unsupported_columns.push(column.clone());
                }
            }
        }

        Ok(TableMetadata {
            table: table.clone(),
            columns,
            supported_columns,
            unsupported_columns,
        })
    }

    /// Up to `sample_rows` rows over the supported columns, one line per row.
    pub async fn sample_rows(&self, metadata: &TableMetadata) -> String {
        if metadata.supported_columns.is_empty() {
            return NO_DATA_AVAILABLE.to_string();
        }

        let sql = self.db.dialect().select_limited(
            &metadata.supported_columns,
            &metadata.table,
            self.sample_rows,
        );
        match self.db.execute(&sql).await {
            Ok(result) if !result.is_empty() => result.flatten_rows().join("\n"),
            Ok(_) => NO_DATA_AVAILABLE.to_string(),
            Err(error) => {
                warn!(table = %metadata.table, error = %error, "Failed to retrieve sample rows");
                NO_DATA_AVAILABLE.to_string()
            }
        }
    }
}

/// Summary prompt for one table.
pub fn build_prompt(metadata: &TableMetadata, samples: &str, relationships: &str) -> String {
    format!(
        "You are tasked with analyzing the table '{table}' from the database. \
The table contains the following columns: {columns}.
Here are the first few rows of data from the table to help you understand its structure and business context:

Column Data: {samples}

The table also has the following relationships (such as Primary Keys and Foreign Keys) that define its role in the database structure:

Relationships: {relationships}

Your task is to review this data and generate detailed descriptions for each column in a natural language format.
For each column, provide a description that explains what the column represents, its data type, and its role within the table.
The description should reflect the meaning of the column as inferred from the data and its business context.

Use the following format for each column description:

Column Name: <Descriptive sentence about the column>.

Once the descriptions for each column are complete, generate a 3-4 sentence summary of the table's overall purpose.
This summary should explain how the table is used in a business context, describe how the columns work together, \
and highlight the key relationships between columns (like PK/FK relationships).

Use the following format for the table description:

Table Description: <3-4 sentence description of the table's purpose, columns, and business context>.

Additionally, based on the column descriptions and table summary, provide 3 unique tag words that summarize this table's content and significance.

Table Tags: Tag1, Tag2, Tag3
",
        table = metadata.table.name,
        columns = metadata.supported_columns.join(", "),
        samples = samples,
        relationships = relationships,
    )
}
