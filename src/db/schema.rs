//! Schema introspection module.
//!
//! Base-table listing and key-constraint metadata for SQLite, PostgreSQL and
//! MySQL. SQL queries live in the `queries` submodule; each backend submodule
//! provides the same interface.

use crate::db::pool::DbPool;
use crate::error::DbResult;
use crate::models::{ConstraintKind, ConstraintUsage, TableRef};
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List every base table visible to the connection.
    pub async fn list_tables(pool: &DbPool) -> DbResult<Vec<TableRef>> {
        match pool {
            DbPool::Postgres(p) => postgres::list_tables(p).await,
            DbPool::MySql(p) => mysql::list_tables(p).await,
            DbPool::SQLite(p) => sqlite::list_tables(p).await,
        }
    }

    /// Key-constraint rows for one table, optionally restricted to a schema.
    pub async fn constraint_usage(
        pool: &DbPool,
        table_name: &str,
        schema: Option<&str>,
    ) -> DbResult<Vec<ConstraintUsage>> {
        match pool {
            DbPool::Postgres(p) => postgres::constraint_usage(p, table_name, schema).await,
            DbPool::MySql(p) => mysql::constraint_usage(p, table_name, schema).await,
            // SQLite has a single schema per attached file
            DbPool::SQLite(p) => sqlite::constraint_usage(p, table_name).await,
        }
    }

    /// Another table whose key constraints use `column_name`.
    ///
    /// Tables owning the column as a primary key come first.
    pub async fn linked_table(
        pool: &DbPool,
        column_name: &str,
        exclude_table: &str,
    ) -> DbResult<Option<String>> {
        match pool {
            DbPool::Postgres(p) => postgres::linked_table(p, column_name, exclude_table).await,
            DbPool::MySql(p) => mysql::linked_table(p, column_name, exclude_table).await,
            DbPool::SQLite(p) => sqlite::linked_table(p, column_name, exclude_table).await,
        }
    }
}

/// Only foreign keys carry a referenced table.
fn usage_row(
    table: String,
    column: String,
    constraint_name: String,
    constraint_type: Option<&str>,
    referenced_table: Option<String>,
) -> ConstraintUsage {
    let kind = ConstraintKind::classify(&constraint_name, constraint_type);
    let usage = ConstraintUsage::new(table, column, constraint_name, kind);
    match (kind, referenced_table) {
        (ConstraintKind::ForeignKey, Some(referenced)) if !referenced.is_empty() => {
            usage.with_referenced_table(referenced)
        }
        _ => usage,
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_schema::text AS table_schema, table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE'
            AND table_schema NOT IN ('pg_catalog', 'information_schema')
            ORDER BY table_schema, table_name
            "#;

        pub const CONSTRAINT_USAGE: &str = r#"
            SELECT
                kcu.table_name::text AS table_name,
                kcu.column_name::text AS column_name,
                kcu.constraint_name::text AS constraint_name,
                tc.constraint_type::text AS constraint_type,
                (
                    SELECT ccu.table_name::text
                    FROM information_schema.constraint_column_usage ccu
                    WHERE ccu.constraint_schema = kcu.constraint_schema
                    AND ccu.constraint_name = kcu.constraint_name
                    LIMIT 1
                ) AS referenced_table
            FROM information_schema.key_column_usage kcu
            JOIN information_schema.table_constraints tc
                ON tc.constraint_schema = kcu.constraint_schema
                AND tc.constraint_name = kcu.constraint_name
                AND tc.table_name = kcu.table_name
            WHERE kcu.table_name = $1
            AND ($2::text IS NULL OR kcu.table_schema = $2::text)
            ORDER BY kcu.constraint_name, kcu.ordinal_position
            "#;

        pub const LINKED_TABLE: &str = r#"
            SELECT kcu.table_name::text AS table_name
            FROM information_schema.key_column_usage kcu
            JOIN information_schema.table_constraints tc
                ON tc.constraint_schema = kcu.constraint_schema
                AND tc.constraint_name = kcu.constraint_name
                AND tc.table_name = kcu.table_name
            WHERE kcu.column_name = $1
            AND kcu.table_name <> $2
            ORDER BY
                CASE WHEN tc.constraint_type = 'PRIMARY KEY' THEN 0 ELSE 1 END,
                kcu.table_name
            LIMIT 1
            "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT TABLE_SCHEMA, TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_TYPE = 'BASE TABLE'
            AND TABLE_SCHEMA = DATABASE()
            ORDER BY TABLE_NAME
            "#;

        pub const CONSTRAINT_USAGE: &str = r#"
            SELECT
                CONVERT(kcu.TABLE_NAME USING utf8mb4) AS TABLE_NAME,
                CONVERT(kcu.COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
                CONVERT(kcu.CONSTRAINT_NAME USING utf8mb4) AS CONSTRAINT_NAME,
                CONVERT(tc.CONSTRAINT_TYPE USING utf8mb4) AS CONSTRAINT_TYPE,
                CONVERT(kcu.REFERENCED_TABLE_NAME USING utf8mb4) AS REFERENCED_TABLE_NAME
            FROM information_schema.KEY_COLUMN_USAGE kcu
            JOIN information_schema.TABLE_CONSTRAINTS tc
                ON tc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
                AND tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
                AND tc.TABLE_NAME = kcu.TABLE_NAME
            WHERE kcu.TABLE_NAME = ?
            AND kcu.TABLE_SCHEMA = COALESCE(?, DATABASE())
            ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
            "#;

        pub const LINKED_TABLE: &str = r#"
            SELECT CONVERT(kcu.TABLE_NAME USING utf8mb4) AS TABLE_NAME
            FROM information_schema.KEY_COLUMN_USAGE kcu
            JOIN information_schema.TABLE_CONSTRAINTS tc
                ON tc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
                AND tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
                AND tc.TABLE_NAME = kcu.TABLE_NAME
            WHERE kcu.COLUMN_NAME = ?
            AND kcu.TABLE_NAME <> ?
            AND kcu.TABLE_SCHEMA = DATABASE()
            ORDER BY
                CASE WHEN tc.CONSTRAINT_TYPE = 'PRIMARY KEY' THEN 0 ELSE 1 END,
                kcu.TABLE_NAME
            LIMIT 1
            "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;

        pub const PRIMARY_KEY_COLUMNS: &str = r#"
            SELECT name FROM pragma_table_info(?) WHERE pk > 0 ORDER BY pk
            "#;

        pub const FOREIGN_KEY_COLUMNS: &str = r#"
            SELECT id, "from" AS column_name, "table" AS referenced_table
            FROM pragma_foreign_key_list(?)
            ORDER BY id, seq
            "#;

        pub const LINKED_TABLE: &str = r#"
            SELECT table_name FROM (
                SELECT m.name AS table_name, 0 AS rank
                FROM sqlite_master m, pragma_table_info(m.name) p
                WHERE m.type = 'table' AND p.pk > 0 AND p.name = ?1 AND m.name <> ?2
                UNION ALL
                SELECT m.name AS table_name, 1 AS rank
                FROM sqlite_master m, pragma_foreign_key_list(m.name) f
                WHERE m.type = 'table' AND f."from" = ?1 AND m.name <> ?2
            )
            ORDER BY rank, table_name
            LIMIT 1
            "#;
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn list_tables(pool: &PgPool) -> DbResult<Vec<TableRef>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let tables = rows
            .iter()
            .map(|row| {
                TableRef::new(
                    row.get::<String, _>("table_schema"),
                    row.get::<String, _>("table_name"),
                )
            })
            .collect::<Vec<_>>();

        debug!(count = tables.len(), "Listed PostgreSQL tables");
        Ok(tables)
    }

    pub async fn constraint_usage(
        pool: &PgPool,
        table_name: &str,
        schema: Option<&str>,
    ) -> DbResult<Vec<ConstraintUsage>> {
        let rows = sqlx::query(queries::postgres::CONSTRAINT_USAGE)
            .bind(table_name)
            .bind(schema)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let constraint_type: Option<String> = row.try_get("constraint_type").ok().flatten();
                usage_row(
                    row.get("table_name"),
                    row.get("column_name"),
                    row.get("constraint_name"),
                    constraint_type.as_deref(),
                    row.try_get("referenced_table").ok().flatten(),
                )
            })
            .collect())
    }

    pub async fn linked_table(
        pool: &PgPool,
        column_name: &str,
        exclude_table: &str,
    ) -> DbResult<Option<String>> {
        let row = sqlx::query(queries::postgres::LINKED_TABLE)
            .bind(column_name)
            .bind(exclude_table)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|r| r.get("table_name")))
    }
}

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{MySqlPool, Row};

    /// Safely get an optional string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_optional_string(row: &MySqlRow, column: &str) -> Option<String> {
        row.try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get::<Option<Vec<u8>>, _>(column)
                    .ok()
                    .flatten()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
    }

    fn get_string(row: &MySqlRow, column: &str) -> String {
        get_optional_string(row, column).unwrap_or_default()
    }

    pub async fn list_tables(pool: &MySqlPool) -> DbResult<Vec<TableRef>> {
        let rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let tables = rows
            .iter()
            .map(|row| {
                TableRef::new(get_string(row, "TABLE_SCHEMA"), get_string(row, "TABLE_NAME"))
            })
            .filter(|t| !t.name.is_empty())
            .collect::<Vec<_>>();

        debug!(count = tables.len(), "Listed MySQL tables");
        Ok(tables)
    }

    pub async fn constraint_usage(
        pool: &MySqlPool,
        table_name: &str,
        schema: Option<&str>,
    ) -> DbResult<Vec<ConstraintUsage>> {
        let rows = sqlx::query(queries::mysql::CONSTRAINT_USAGE)
            .bind(table_name)
            .bind(schema)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let constraint_type = get_optional_string(row, "CONSTRAINT_TYPE");
                usage_row(
                    get_string(row, "TABLE_NAME"),
                    get_string(row, "COLUMN_NAME"),
                    get_string(row, "CONSTRAINT_NAME"),
                    constraint_type.as_deref(),
                    get_optional_string(row, "REFERENCED_TABLE_NAME"),
                )
            })
            .collect())
    }

    pub async fn linked_table(
        pool: &MySqlPool,
        column_name: &str,
        exclude_table: &str,
    ) -> DbResult<Option<String>> {
        let row = sqlx::query(queries::mysql::LINKED_TABLE)
            .bind(column_name)
            .bind(exclude_table)
            .fetch_optional(pool)
            .await?;
        Ok(row.and_then(|r| get_optional_string(&r, "TABLE_NAME")))
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    /// Default schema of the main database file.
    const MAIN_SCHEMA: &str = "main";

    pub async fn list_tables(pool: &SqlitePool) -> DbResult<Vec<TableRef>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let tables = rows
            .iter()
            .map(|row| TableRef::new(MAIN_SCHEMA, row.get::<String, _>("name")))
            .collect::<Vec<_>>();

        debug!(count = tables.len(), "Listed SQLite tables");
        Ok(tables)
    }

    /// SQLite keeps no constraint names for inline keys, so names are synthesized.
    pub async fn constraint_usage(
        pool: &SqlitePool,
        table_name: &str,
    ) -> DbResult<Vec<ConstraintUsage>> {
        let pk_rows = sqlx::query(queries::sqlite::PRIMARY_KEY_COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;
        let fk_rows = sqlx::query(queries::sqlite::FOREIGN_KEY_COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        let mut usage = Vec::with_capacity(pk_rows.len() + fk_rows.len());
        for row in &pk_rows {
            usage.push(ConstraintUsage::new(
                table_name,
                row.get::<String, _>("name"),
                format!("pk_{}", table_name),
                ConstraintKind::PrimaryKey,
            ));
        }
        for row in &fk_rows {
            let id: i64 = row.get("id");
            let referenced: String = row.get("referenced_table");
            usage.push(
                ConstraintUsage::new(
                    table_name,
                    row.get::<String, _>("column_name"),
                    format!("fk_{}_{}", table_name, id),
                    ConstraintKind::ForeignKey,
                )
                .with_referenced_table(referenced),
            );
        }

        Ok(usage)
    }

    pub async fn linked_table(
        pool: &SqlitePool,
        column_name: &str,
        exclude_table: &str,
    ) -> DbResult<Option<String>> {
        let row = sqlx::query(queries::sqlite::LINKED_TABLE)
            .bind(column_name)
            .bind(exclude_table)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|r| r.get("table_name")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_row_keeps_reference_only_for_foreign_keys() {
        let fk = usage_row(
            "Orders".into(),
            "CustomerId".into(),
            "FK_Orders_Customers".into(),
            Some("FOREIGN KEY"),
            Some("Customers".into()),
        );
        assert_eq!(fk.kind, ConstraintKind::ForeignKey);
        assert_eq!(fk.referenced_table.as_deref(), Some("Customers"));

        let pk = usage_row(
            "Orders".into(),
            "Id".into(),
            "PK_Orders".into(),
            Some("PRIMARY KEY"),
            Some("Orders".into()),
        );
        assert_eq!(pk.kind, ConstraintKind::PrimaryKey);
        assert_eq!(pk.referenced_table, None);
    }

    #[test]
    fn test_usage_row_classifies_by_name_without_type() {
        let row = usage_row(
            "Orders".into(),
            "CustomerId".into(),
            "FK_Orders_Customers".into(),
            None,
            None,
        );
        assert_eq!(row.kind, ConstraintKind::ForeignKey);
        assert_eq!(row.referenced_table, None);
    }
}
