//! SQL generation from a question and the table catalogue.

use crate::db::SqlDialect;
use crate::error::LlmResult;
use crate::llm::LanguageModel;
use crate::store::SchemaIndex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns a user question into SQL text with one language-model call.
pub struct QueryComposer {
    llm: Arc<dyn LanguageModel>,
    summaries: BTreeMap<String, String>,
    index: SchemaIndex,
    dialect: SqlDialect,
}

impl QueryComposer {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        summaries: BTreeMap<String, String>,
        index: SchemaIndex,
        dialect: SqlDialect,
    ) -> Self {
        Self {
            llm,
            summaries,
            index,
            dialect,
        }
    }

    /// Replace the loaded catalogue, e.g. after a catalog run.
    pub fn set_catalog(&mut self, summaries: BTreeMap<String, String>, index: SchemaIndex) {
        self.summaries = summaries;
        self.index = index;
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Number of tables that make it into the prompt.
    pub fn table_count(&self) -> usize {
        self.summaries
            .keys()
            .filter(|table| self.index.contains(table))
            .count()
    }

    /// Prompt for `question`. Only tables present in both the summaries and
    /// the schema index are described.
    pub fn build_prompt(&self, question: &str) -> String {
        let summary_text = self
            .summaries
            .iter()
            .filter_map(|(table, summary)| {
                self.index
                    .qualify(table)
                    .map(|qualified| format!("Table: {}\n{}", qualified, summary))
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "The user has asked the following question: '{question}'.

You have access to the following database tables and their summaries:
{summary_text}

Your task is to generate a valid SQL query based on the user's question and the provided table summaries.
{rules}
",
            question = question,
            summary_text = summary_text,
            rules = self.dialect.prompt_rules(),
        )
    }

    /// Raw completion text, fences and all.
    pub async fn compose_query(&self, question: &str) -> LlmResult<String> {
        info!(question = %question, tables = self.table_count(), "Generating SQL query");
        let prompt = self.build_prompt(question);
        let sql = self.llm.complete(&prompt).await?;
        debug!(sql = %sql, "Generated SQL");
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl LanguageModel for Echo {
        async fn complete(&self, prompt: &str) -> LlmResult<String> {
            Ok(prompt.to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl LanguageModel for Failing {
        async fn complete(&self, _prompt: &str) -> LlmResult<String> {
            Err(LlmError::EmptyCompletion)
        }
    }

    fn composer(llm: Arc<dyn LanguageModel>) -> QueryComposer {
        let mut summaries = BTreeMap::new();
        summaries.insert("Customers".to_string(), "Customer master data.".to_string());
        summaries.insert("Orders".to_string(), "Order headers.".to_string());
        summaries.insert("Orphan".to_string(), "Not in the index.".to_string());
        let index = SchemaIndex::parse("Customers: Sales\nOrders: Sales\n");
        QueryComposer::new(llm, summaries, index, SqlDialect::SqlServer)
    }

    #[test]
    fn test_prompt_lists_indexed_tables_only() {
        let prompt = composer(Arc::new(Echo)).build_prompt("Top 5 customers?");
        assert!(prompt.starts_with("The user has asked the following question: 'Top 5 customers?'."));
        assert!(prompt.contains(
            "Table: Sales.Customers\nCustomer master data.\n\nTable: Sales.Orders\nOrder headers."
        ));
        assert!(!prompt.contains("Orphan"));
        assert!(prompt.contains("Use `TOP` instead of `LIMIT`"));
        assert!(prompt.trim_end().ends_with("only return the SQL query without any extra text."));
    }

    #[tokio::test]
    async fn test_compose_returns_raw_completion() {
        let composer = composer(Arc::new(Echo));
        let sql = composer.compose_query("q").await.unwrap();
        assert_eq!(sql, composer.build_prompt("q"));
        assert_eq!(composer.table_count(), 2);
    }

    #[tokio::test]
    async fn test_compose_propagates_model_error() {
        let composer = composer(Arc::new(Failing));
        assert!(matches!(
            composer.compose_query("q").await,
            Err(LlmError::EmptyCompletion)
        ));
    }
}
