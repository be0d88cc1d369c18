//! SQL statement validation for read-only enforcement.
//!
//! Every statement that reaches the database on behalf of a user passes
//! through [`validate_readonly`]. Only queries (SELECT, WITH, VALUES and
//! EXPLAIN of those, plus SHOW TABLES/COLUMNS) are allowed. Anything else is
//! rejected with a permission error naming the operation.
//!
//! Uses [sqlparser](https://docs.rs/sqlparser/) for accurate SQL parsing,
//! ensuring that no write operation can bypass validation through formatting
//! tricks or SQL dialect variations.

use crate::db::SqlDialect;
use crate::error::{DbError, DbResult};
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::parser::Parser;

const READ_ONLY_REASON: &str =
    "Only read-only queries can be executed. The assistant never modifies the database.";

/// Validate SQL for read-only execution.
///
/// Returns `Ok(())` if every statement is a query, `Err(DbError::Permission)`
/// for anything that could write, and `Err(DbError::InvalidInput)` when the
/// text does not parse.
///
/// # Examples
///
/// ```
/// use nlsql_agents::db::SqlDialect;
/// use nlsql_agents::tools::sql_validator::validate_readonly;
///
/// assert!(validate_readonly("SELECT * FROM users", SqlDialect::PostgreSQL).is_ok());
/// assert!(validate_readonly("DELETE FROM users", SqlDialect::PostgreSQL).is_err());
/// ```
pub fn validate_readonly(sql: &str, dialect: SqlDialect) -> DbResult<()> {
    let parser_dialect = dialect.parser_dialect();

    let statements = Parser::parse_sql(parser_dialect.as_ref(), sql).map_err(|e| {
        DbError::invalid_input(format!("Failed to parse SQL statement. Error: {}", e))
    })?;

    if statements.is_empty() {
        return Err(DbError::invalid_input("Empty SQL statement"));
    }

    for stmt in &statements {
        if !is_read_only(stmt) {
            return Err(DbError::permission(operation_name(stmt), READ_ONLY_REASON));
        }
    }

    Ok(())
}

/// True when the text starts like a query and parses in the given dialect.
///
/// Used to tell raw SQL apart from natural-language requests.
pub fn looks_like_sql(text: &str, dialect: SqlDialect) -> bool {
    let first = first_keyword(text).to_uppercase();
    if !matches!(first.as_str(), "SELECT" | "WITH") {
        return false;
    }
    Parser::parse_sql(dialect.parser_dialect().as_ref(), text).is_ok()
}

fn is_read_only(stmt: &Statement) -> bool {
    match stmt {
        Statement::Query(query) => match query.body.as_ref() {
            // SELECT ... INTO creates a table
            SetExpr::Select(select) => select.into.is_none(),
            SetExpr::Query(_)
            | SetExpr::SetOperation { .. }
            | SetExpr::Values(_)
            | SetExpr::Table(_) => true,
            _ => false,
        },
        Statement::Explain { statement, .. } => is_read_only(statement),
        Statement::ShowTables { .. } | Statement::ShowColumns { .. } => true,
        _ => false,
    }
}

/// Leading keyword(s) of a statement, used in error messages.
fn operation_name(stmt: &Statement) -> String {
    let rendered = stmt.to_string();
    let mut words = rendered.split_whitespace();
    match (words.next(), words.next()) {
        (Some(first), Some(second))
            if matches!(
                first.to_uppercase().as_str(),
                "CREATE" | "DROP" | "ALTER" | "TRUNCATE"
            ) =>
        {
            format!("{} {}", first.to_uppercase(), second.to_uppercase())
        }
        (Some(first), _) => first.to_uppercase(),
        (None, _) => "UNKNOWN".to_string(),
    }
}

fn first_keyword(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or("")
}
