//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use nlsql_agents::agents::AgentSelector;
use nlsql_agents::db::{Database, SqlDialect};
use nlsql_agents::error::{DbError, DbResult, LlmResult};
use nlsql_agents::llm::LanguageModel;
use nlsql_agents::models::{
    AgentRole, ColumnMetadata, ConstraintKind, ConstraintUsage, Message, ResultSet, TableRef,
};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Executor = Box<dyn Fn(&str) -> DbResult<ResultSet> + Send + Sync>;

/// In-memory [`Database`] with scripted metadata and query results.
pub struct FakeDatabase {
    pub dialect: SqlDialect,
    tables: Vec<TableRef>,
    list_fails: bool,
    constraints: HashMap<String, Vec<ConstraintUsage>>,
    failing_constraints: HashSet<String>,
    /// column -> table owning it as a key
    links: HashMap<String, String>,
    failing_links: HashSet<String>,
    executor: Executor,
    pub constraint_calls: Mutex<Vec<String>>,
    pub executed: Mutex<Vec<String>>,
}

impl Default for FakeDatabase {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::SQLite,
            tables: Vec::new(),
            list_fails: false,
            constraints: HashMap::new(),
            failing_constraints: HashSet::new(),
            links: HashMap::new(),
            failing_links: HashSet::new(),
            executor: Box::new(|sql| Err(DbError::database(format!("no result for {}", sql), None, ""))),
            constraint_calls: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
        }
    }
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, schema: &str, name: &str) -> Self {
        self.tables.push(TableRef::new(schema, name));
        self
    }

    pub fn with_failing_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn with_primary_key(mut self, table: &str, column: &str) -> Self {
        self.constraints.entry(table.to_string()).or_default().push(ConstraintUsage::new(
            table,
            column,
            format!("PK_{}", table),
            ConstraintKind::PrimaryKey,
        ));
        self
    }

    /// Foreign key whose target the catalog reports directly.
    pub fn with_foreign_key(mut self, table: &str, column: &str, referenced: &str) -> Self {
        self.constraints.entry(table.to_string()).or_default().push(
            ConstraintUsage::new(
                table,
                column,
                format!("FK_{}_{}", table, referenced),
                ConstraintKind::ForeignKey,
            )
            .with_referenced_table(referenced),
        );
        self
    }

    /// Foreign key resolved only through the column-name lookup.
    pub fn with_unreferenced_foreign_key(mut self, table: &str, column: &str) -> Self {
        self.constraints.entry(table.to_string()).or_default().push(ConstraintUsage::new(
            table,
            column,
            format!("FK_{}_{}", table, column),
            ConstraintKind::ForeignKey,
        ));
        self
    }

    pub fn with_link(mut self, column: &str, owner: &str) -> Self {
        self.links.insert(column.to_string(), owner.to_string());
        self
    }

    pub fn with_failing_constraints(mut self, table: &str) -> Self {
        self.failing_constraints.insert(table.to_string());
        self
    }

    pub fn with_failing_link(mut self, column: &str) -> Self {
        self.failing_links.insert(column.to_string());
        self
    }

    pub fn with_executor(
        mut self,
        executor: impl Fn(&str) -> DbResult<ResultSet> + Send + Sync + 'static,
    ) -> Self {
        self.executor = Box::new(executor);
        self
    }

    pub fn constraint_calls(&self) -> Vec<String> {
        self.constraint_calls.lock().unwrap().clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Database for FakeDatabase {
    fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    async fn execute(&self, sql: &str) -> DbResult<ResultSet> {
        self.executed.lock().unwrap().push(sql.to_string());
        (self.executor)(sql)
    }

    async fn list_tables(&self) -> DbResult<Vec<TableRef>> {
        if self.list_fails {
            return Err(DbError::connection("connection reset", "reconnect"));
        }
        Ok(self.tables.clone())
    }

    async fn constraint_usage(
        &self,
        table: &str,
        _schema: Option<&str>,
    ) -> DbResult<Vec<ConstraintUsage>> {
        self.constraint_calls.lock().unwrap().push(table.to_string());
        if self.failing_constraints.contains(table) {
            return Err(DbError::database("metadata unavailable", None, ""));
        }
        Ok(self.constraints.get(table).cloned().unwrap_or_default())
    }

    async fn linked_table(&self, column: &str, exclude_table: &str) -> DbResult<Option<String>> {
        if self.failing_links.contains(column) {
            return Err(DbError::database("lookup failed", None, ""));
        }
        Ok(self
            .links
            .get(column)
            .filter(|owner| owner.as_str() != exclude_table)
            .cloned())
    }
}

/// Result set with the given column names and rows.
pub fn result_set(columns: &[&str], rows: Vec<Vec<JsonValue>>) -> ResultSet {
    ResultSet::new(
        columns
            .iter()
            .map(|name| ColumnMetadata::new(*name, "TEXT"))
            .collect(),
        rows,
    )
}

type Responder = Box<dyn Fn(&str) -> LlmResult<String> + Send + Sync>;

/// Language model answering through a closure, recording every prompt.
pub struct ScriptedModel {
    responder: Responder,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(responder: impl Fn(&str) -> LlmResult<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.responder)(prompt)
    }
}

/// Language model that never answers in time.
pub struct SlowModel;

#[async_trait]
impl LanguageModel for SlowModel {
    async fn complete(&self, _prompt: &str) -> LlmResult<String> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Ok("SELECT 1".to_string())
    }
}

/// Selector replaying a fixed list of roles (the last one repeats), counting calls.
pub struct ScriptedSelector {
    roles: Vec<AgentRole>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSelector {
    pub fn new(roles: Vec<AgentRole>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                roles,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl AgentSelector for ScriptedSelector {
    async fn select(&self, _history: &[Message], _last_result_present: bool) -> AgentRole {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.roles
            .get(n)
            .or_else(|| self.roles.last())
            .copied()
            .unwrap_or_default()
    }
}
