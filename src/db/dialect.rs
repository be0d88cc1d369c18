//! SQL dialect knowledge: identifier quoting, row limiting, parser dialects
//! and the dialect rules handed to the language model.

use crate::models::TableRef;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sqlparser::dialect::{Dialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[value(name = "sqlserver")]
    SqlServer,
    #[value(name = "postgresql")]
    PostgreSQL,
    #[value(name = "mysql")]
    MySQL,
    #[value(name = "sqlite")]
    SQLite,
}

impl SqlDialect {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SqlServer => "SQL Server",
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Quote an identifier, doubling any embedded closing quote.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Self::SqlServer => format!("[{}]", ident.replace(']', "]]")),
            Self::MySQL => format!("`{}`", ident.replace('`', "``")),
            Self::PostgreSQL | Self::SQLite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Quoted `schema.table`, or just the table when the schema is empty.
    pub fn qualified_table(&self, table: &TableRef) -> String {
        if table.schema.is_empty() {
            self.quote_ident(&table.name)
        } else {
            format!(
                "{}.{}",
                self.quote_ident(&table.schema),
                self.quote_ident(&table.name)
            )
        }
    }

    /// `SELECT` of the given columns capped at `limit` rows.
    pub fn select_limited(&self, columns: &[String], table: &TableRef, limit: u32) -> String {
        let projection = if columns.is_empty() {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|c| self.quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let from = self.qualified_table(table);

        match self {
            Self::SqlServer => format!("SELECT TOP {} {} FROM {}", limit, projection, from),
            _ => format!("SELECT {} FROM {} LIMIT {}", projection, from, limit),
        }
    }

    /// Zero-row projection used to read a table's column names.
    pub fn empty_projection(&self, table: &TableRef) -> String {
        format!("SELECT * FROM {} WHERE 1=0", self.qualified_table(table))
    }

    pub fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            Self::SqlServer => Box::new(MsSqlDialect {}),
            Self::PostgreSQL => Box::new(PostgreSqlDialect {}),
            Self::MySQL => Box::new(MySqlDialect {}),
            Self::SQLite => Box::new(SQLiteDialect {}),
        }
    }

    /// Dialect rules appended to every SQL-generation prompt.
    pub fn prompt_rules(&self) -> &'static str {
        match self {
            Self::SqlServer => SQL_SERVER_RULES,
            Self::PostgreSQL => POSTGRES_RULES,
            Self::MySQL => MYSQL_RULES,
            Self::SQLite => SQLITE_RULES,
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

const SQL_SERVER_RULES: &str = "\
Ensure that the SQL query is compatible with SQL Server syntax.
IMPORTANT INSTRUCTIONS:
- Use `TOP` instead of `LIMIT` to limit results.
- Use `+` for string concatenation.
- Use `GETDATE()` instead of `NOW()` for current date and time.
- Use `ISNULL(expression, replacement)` instead of `IFNULL()`.
- Use `IDENTITY` instead of `AUTO_INCREMENT` for auto-increment columns.
- Every non-aggregated column in the SELECT list must appear in the `GROUP BY` clause.
- Use `BIT` for boolean values (`1` for true, `0` for false).
- Use single quotes (`'`) for string literals.
- Avoid redundant prefixes when referencing tables.
Use the table names exactly as given.
The output will be executed directly, so only return the SQL query without any extra text.";

const POSTGRES_RULES: &str = "\
Ensure that the SQL query is compatible with PostgreSQL syntax.
IMPORTANT INSTRUCTIONS:
- Use `LIMIT` to limit results.
- Use `||` for string concatenation.
- Use `NOW()` for current date and time.
- Use `COALESCE(expression, replacement)` for NULL handling.
- Every non-aggregated column in the SELECT list must appear in the `GROUP BY` clause.
- Use `TRUE` and `FALSE` for boolean values.
- Use single quotes (`'`) for string literals.
- Avoid redundant prefixes when referencing tables.
Use the table names exactly as given.
The output will be executed directly, so only return the SQL query without any extra text.";

const MYSQL_RULES: &str = "\
Ensure that the SQL query is compatible with MySQL syntax.
IMPORTANT INSTRUCTIONS:
- Use `LIMIT` to limit results.
- Use `CONCAT()` for string concatenation.
- Use `NOW()` for current date and time.
- Use `IFNULL(expression, replacement)` for NULL handling.
- Every non-aggregated column in the SELECT list must appear in the `GROUP BY` clause.
- Use `TRUE` and `FALSE` for boolean values.
- Use single quotes (`'`) for string literals.
- Avoid redundant prefixes when referencing tables.
Use the table names exactly as given.
The output will be executed directly, so only return the SQL query without any extra text.";

const SQLITE_RULES: &str = "\
Ensure that the SQL query is compatible with SQLite syntax.
IMPORTANT INSTRUCTIONS:
- Use `LIMIT` to limit results.
- Use `||` for string concatenation.
- Use `datetime('now')` for current date and time.
- Use `IFNULL(expression, replacement)` for NULL handling.
- Every non-aggregated column in the SELECT list must appear in the `GROUP BY` clause.
- Use `1` and `0` for boolean values.
- Use single quotes (`'`) for string literals.
- Avoid redundant prefixes when referencing tables.
Use the table names exactly as given.
The output will be executed directly, so only return the SQL query without any extra text.";
