//! Foreign-key relationship discovery.
//!
//! The top-level listing reports every primary and foreign key of one table.
//! Each foreign key starts a nested walk through the linked tables. A nested
//! walk keeps its own visited set, so no table is expanded twice within it and
//! cyclic or self-referencing graphs terminate.

use crate::db::Database;
use crate::error::DbError;
use crate::models::{ConstraintKind, ConstraintUsage, LinkedTable, RelationshipEdge, TableRef};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub const NO_RELATIONSHIPS: &str = "No relationships found.";
pub const NO_NESTED_RELATIONSHIPS: &str = "No further nested relationships.";
pub const RELATIONSHIPS_ERROR: &str = "Error retrieving relationships.";
pub const NESTED_RELATIONSHIPS_ERROR: &str = "Error checking nested relationships.";
pub const LINK_LOOKUP_ERROR: &str = "Error retrieving FK relationship.";

/// A metadata lookup that failed during a walk.
#[derive(Debug)]
pub enum WalkIssue {
    /// Top-level constraint listing failed
    Relationships { table: String, error: DbError },
    /// Constraint listing of a linked table failed
    NestedRelationships { table: String, error: DbError },
    /// Linked-table lookup for a foreign-key column failed
    LinkLookup {
        table: String,
        column: String,
        error: DbError,
    },
}

impl WalkIssue {
    /// Fixed sentence rendered into the relationship text.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Relationships { .. } => RELATIONSHIPS_ERROR,
            Self::NestedRelationships { .. } => NESTED_RELATIONSHIPS_ERROR,
            Self::LinkLookup { .. } => LINK_LOOKUP_ERROR,
        }
    }

    pub fn error(&self) -> &DbError {
        match self {
            Self::Relationships { error, .. }
            | Self::NestedRelationships { error, .. }
            | Self::LinkLookup { error, .. } => error,
        }
    }
}

/// Everything one top-level walk found.
#[derive(Debug, Default)]
pub struct RelationshipReport {
    /// Edges in discovery order
    pub edges: Vec<RelationshipEdge>,
    /// Rendered sentences, depth-first
    pub lines: Vec<String>,
    pub issues: Vec<WalkIssue>,
}

impl RelationshipReport {
    /// Relationship text handed to the catalog prompt.
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            NO_RELATIONSHIPS.to_string()
        } else {
            self.lines.join("\n")
        }
    }

    fn push_issue(&mut self, issue: WalkIssue) {
        self.lines.push(issue.placeholder().to_string());
        self.issues.push(issue);
    }
}

enum Step {
    Expand(String),
    Emit {
        line: String,
        edge: Option<RelationshipEdge>,
    },
}

#[derive(Clone)]
pub struct SchemaWalker {
    db: Arc<dyn Database>,
}

impl SchemaWalker {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// List the keys of `table` and expand every foreign key it holds.
    pub async fn discover_relationships(&self, table: &TableRef) -> RelationshipReport {
        let mut report = RelationshipReport::default();

        let rows = match self
            .db
            .constraint_usage(&table.name, Some(&table.schema))
            .await
        {
            Ok(rows) => rows,
            Err(error) => {
                warn!(table = %table, error = %error, "Failed to retrieve relationships");
                report.push_issue(WalkIssue::Relationships {
                    table: table.name.clone(),
                    error,
                });
                return report;
            }
        };

        for row in &rows {
            match row.kind {
                ConstraintKind::ForeignKey => {
                    let linked = self.resolve_link(row, &table.name, &mut report).await;
                    report.lines.push(format!(
                        "Table {} has a Foreign Key on column {} linked with table {}.",
                        table.name, row.column, linked
                    ));
                    report.edges.push(RelationshipEdge::foreign_key(
                        &table.name,
                        &row.column,
                        linked.clone(),
                    ));
                    if let LinkedTable::Resolved(next) = linked {
                        self.expand_nested(next, &mut report).await;
                    }
                }
                ConstraintKind::PrimaryKey => {
                    report.lines.push(format!(
                        "Table {} has a Primary Key on column {}.",
                        table.name, row.column
                    ));
                    report
                        .edges
                        .push(RelationshipEdge::primary_key(&table.name, &row.column));
                }
                ConstraintKind::Other => {}
            }
        }

        debug!(
            table = %table,
            edges = report.edges.len(),
            issues = report.issues.len(),
            "Relationship discovery finished"
        );
        report
    }

    /// Depth-first walk from `start` with a fresh visited set.
    async fn expand_nested(&self, start: String, report: &mut RelationshipReport) {
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack = vec![Step::Expand(start)];

        while let Some(step) = stack.pop() {
            let table = match step {
                Step::Emit { line, edge } => {
                    report.lines.push(line);
                    report.edges.extend(edge);
                    continue;
                }
                Step::Expand(table) => table,
            };

            if !visited.insert(table.clone()) {
                continue;
            }

            let rows = match self.db.constraint_usage(&table, None).await {
                Ok(rows) => rows,
                Err(error) => {
                    warn!(table = %table, error = %error, "Failed to check nested relationships");
                    report.push_issue(WalkIssue::NestedRelationships { table, error });
                    continue;
                }
            };

            let mut pending = Vec::new();
            for row in rows.iter().filter(|r| r.kind == ConstraintKind::ForeignKey) {
                let linked = self.resolve_link(row, &table, report).await;
                pending.push(Step::Emit {
                    line: format!(
                        "Table {} contains a Foreign Key on column {}, further linked with {}.",
                        table, row.column, linked
                    ),
                    edge: Some(RelationshipEdge::foreign_key(
                        &table,
                        &row.column,
                        linked.clone(),
                    )),
                });
                if let LinkedTable::Resolved(next) = linked {
                    pending.push(Step::Expand(next));
                }
            }

            if pending.is_empty() {
                report.lines.push(NO_NESTED_RELATIONSHIPS.to_string());
            }
            // Reversed so the stack pops in discovery order
            stack.extend(pending.into_iter().rev());
        }
    }

    /// Target of a foreign-key row. A failed lookup is recorded as an issue
    /// and still yields a sentence.
    async fn resolve_link(
        &self,
        row: &ConstraintUsage,
        table: &str,
        report: &mut RelationshipReport,
    ) -> LinkedTable {
        if let Some(referenced) = &row.referenced_table {
            return LinkedTable::Resolved(referenced.clone());
        }

        match self.db.linked_table(&row.column, table).await {
            Ok(Some(name)) => LinkedTable::Resolved(name),
            Ok(None) => LinkedTable::Unresolved,
            Err(error) => {
                warn!(
                    table = %table,
                    column = %row.column,
                    error = %error,
                    "Failed to retrieve FK relationship"
                );
                report.issues.push(WalkIssue::LinkLookup {
                    table: table.to_string(),
                    column: row.column.clone(),
                    error,
                });
                LinkedTable::LookupFailed
            }
        }
    }
}
