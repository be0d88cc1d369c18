//! Table-to-schema index.
//!
//! The on-disk form is one `table: schema` pair per line. Lines that do not
//! split into exactly two parts on `:` are skipped.

use crate::db::Database;
use crate::error::{DbResult, StorageError};
use crate::models::TableRef;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Default location of the index file.
pub const DEFAULT_SCHEMA_INDEX_PATH: &str = "schema_details/db_names.txt";

/// Mapping from bare table name to owning schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaIndex {
    tables: BTreeMap<String, String>,
}

impl SchemaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse index file contents.
    pub fn parse(contents: &str) -> Self {
        let mut tables = BTreeMap::new();
        for (line_no, line) in contents.lines().enumerate() {
            let parts: Vec<&str> = line.split(':').collect();
            let [table, schema] = parts.as_slice() else {
                if !line.trim().is_empty() {
                    debug!(line = line_no + 1, "Skipping malformed schema index line");
                }
                continue;
            };

            let table = table.trim();
            if table.is_empty() {
                debug!(line = line_no + 1, "Skipping schema index line without table");
                continue;
            }
            tables.insert(table.to_string(), schema.trim().to_string());
        }
        Self { tables }
    }

    /// Read an index file. A missing file yields `None`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Option<Self>, StorageError> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(Self::parse(&contents))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io("read", path, e)),
        }
    }

    /// Write the index, creating parent directories as needed.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io("create directory", parent, e))?;
        }
        tokio::fs::write(path, self.to_file_contents())
            .await
            .map_err(|e| StorageError::io("write", path, e))
    }

    /// Build the index from table references. The first schema seen for a name wins.
    pub fn from_tables(tables: &[TableRef]) -> Self {
        let mut index = Self::new();
        for table in tables {
            if index.tables.contains_key(&table.name) {
                debug!(table = %table.name, schema = %table.schema, "Duplicate table name in index");
                continue;
            }
            index.insert(table.name.clone(), table.schema.clone());
        }
        index
    }

    /// Build the index from the database's base tables.
    pub async fn from_database(db: &dyn Database) -> DbResult<Self> {
        let tables = db.list_tables().await?;
        Ok(Self::from_tables(&tables))
    }

    pub fn insert(&mut self, table: impl Into<String>, schema: impl Into<String>) {
        self.tables.insert(table.into(), schema.into());
    }

    pub fn schema_of(&self, table: &str) -> Option<&str> {
        self.tables.get(table).map(String::as_str)
    }

    /// `schema.table` for an indexed table.
    pub fn qualify(&self, table: &str) -> Option<String> {
        self.schema_of(table).map(|schema| {
            if schema.is_empty() {
                table.to_string()
            } else {
                format!("{}.{}", schema, table)
            }
        })
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// `(table, schema)` pairs in table-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tables.iter().map(|(t, s)| (t.as_str(), s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn to_file_contents(&self) -> String {
        self.tables
            .iter()
            .map(|(table, schema)| format!("{}: {}\n", table, schema))
            .collect()
    }
}
