//! Schema-related data models.
//!
//! Table references, per-table column support, and the constraint rows the
//! relationship walk consumes.

use serde::{Deserialize, Serialize};

/// A base table and the schema that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// `schema.table`, or the bare name when the schema is empty.
    pub fn qualified_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// Column support for one table, computed once per catalog run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub table: TableRef,
    /// All columns, in table order
    pub columns: Vec<String>,
    /// Columns the driver reads without error
    pub supported_columns: Vec<String>,
    pub unsupported_columns: Vec<String>,
}

impl TableMetadata {
    pub fn is_supported(&self, column: &str) -> bool {
        self.supported_columns.iter().any(|c| c == column)
    }
}

/// Kind of key constraint a column participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    /// UNIQUE, CHECK and anything else the walk ignores
    Other,
}

impl ConstraintKind {
    /// Classify a constraint row.
    ///
    /// The catalog's constraint type wins when present. Otherwise the name is
    /// inspected for the conventional `FK` / `PK` markers, foreign key first.
    pub fn classify(constraint_name: &str, constraint_type: Option<&str>) -> Self {
        if let Some(kind) = constraint_type {
            return match kind.trim().to_uppercase().as_str() {
                "PRIMARY KEY" => Self::PrimaryKey,
                "FOREIGN KEY" => Self::ForeignKey,
                _ => Self::Other,
            };
        }

        let upper = constraint_name.to_uppercase();
        if upper.contains("FK") {
            Self::ForeignKey
        } else if upper.contains("PK") {
            Self::PrimaryKey
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrimaryKey => write!(f, "Primary Key"),
            Self::ForeignKey => write!(f, "Foreign Key"),
            Self::Other => write!(f, "Constraint"),
        }
    }
}

/// One row of constraint-column usage metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintUsage {
    pub table: String,
    pub column: String,
    pub constraint_name: String,
    pub kind: ConstraintKind,
    /// Referenced table, when the catalog reports it directly
    pub referenced_table: Option<String>,
}

impl ConstraintUsage {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        constraint_name: impl Into<String>,
        kind: ConstraintKind,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            constraint_name: constraint_name.into(),
            kind,
            referenced_table: None,
        }
    }

    pub fn with_referenced_table(mut self, table: impl Into<String>) -> Self {
        self.referenced_table = Some(table.into());
        self
    }
}

/// Target of a foreign key as far as metadata lookup could tell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkedTable {
    Resolved(String),
    /// Lookup succeeded but found no other table using the column
    Unresolved,
    /// Lookup itself failed
    LookupFailed,
}

impl LinkedTable {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Resolved(name) => Some(name),
            Self::Unresolved | Self::LookupFailed => None,
        }
    }
}

impl std::fmt::Display for LinkedTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved(name) => write!(f, "{}", name),
            Self::Unresolved => write!(f, "No linked table found"),
            Self::LookupFailed => write!(f, "Error retrieving FK relationship"),
        }
    }
}

/// A discovered key relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub from_table: String,
    pub from_column: String,
    pub kind: ConstraintKind,
    /// `None` for primary keys; foreign keys always carry a lookup outcome
    pub to_table: Option<LinkedTable>,
}

impl RelationshipEdge {
    pub fn primary_key(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            from_table: table.into(),
            from_column: column.into(),
            kind: ConstraintKind::PrimaryKey,
            to_table: None,
        }
    }

    pub fn foreign_key(
        table: impl Into<String>,
        column: impl Into<String>,
        linked: LinkedTable,
    ) -> Self {
        Self {
            from_table: table.into(),
            from_column: column.into(),
            kind: ConstraintKind::ForeignKey,
            to_table: Some(linked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        assert_eq!(TableRef::new("Sales", "Orders").qualified_name(), "Sales.Orders");
        assert_eq!(TableRef::new("", "Orders").qualified_name(), "Orders");
    }

    #[test]
    fn test_classify_by_constraint_type() {
        assert_eq!(
            ConstraintKind::classify("anything", Some("PRIMARY KEY")),
            ConstraintKind::PrimaryKey
        );
        assert_eq!(
            ConstraintKind::classify("PK_looks_primary", Some("FOREIGN KEY")),
            ConstraintKind::ForeignKey
        );
        assert_eq!(
            ConstraintKind::classify("uq_email", Some("UNIQUE")),
            ConstraintKind::Other
        );
    }

    #[test]
    fn test_classify_by_name() {
        assert_eq!(
            ConstraintKind::classify("FK_SalesOrderHeader_Customer_CustomerID", None),
            ConstraintKind::ForeignKey
        );
        assert_eq!(
            ConstraintKind::classify("PK_Customer_CustomerID", None),
            ConstraintKind::PrimaryKey
        );
        assert_eq!(
            ConstraintKind::classify("AK_Customer_rowguid", None),
            ConstraintKind::Other
        );
    }

    #[test]
    fn test_linked_table_display() {
        assert_eq!(LinkedTable::Resolved("Orders".into()).to_string(), "Orders");
        assert_eq!(LinkedTable::Unresolved.to_string(), "No linked table found");
        assert_eq!(LinkedTable::Unresolved.name(), None);
        assert_eq!(LinkedTable::LookupFailed.name(), None);
    }

    #[test]
    fn test_table_metadata_is_supported() {
        let meta = TableMetadata {
            table: TableRef::new("dbo", "Docs"),
            columns: vec!["id".into(), "body".into()],
            supported_columns: vec!["id".into()],
            unsupported_columns: vec!["body".into()],
        };
        assert!(meta.is_supported("id"));
        assert!(!meta.is_supported("body"));
    }
}
