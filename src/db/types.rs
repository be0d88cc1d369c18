//! Database-agnostic type mappings.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! Decoding is fallible. A non-NULL cell that no decoder accepts, not even as
//! text or raw bytes, yields [`DbError::UnsupportedColumn`]. The catalog relies
//! on this to sort columns into supported and unsupported sets.

use crate::error::{DbError, DbResult};
use crate::models::{ColumnMetadata, DatabaseType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, ColumnIndex, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Temporal,
    Text,
    Binary,
    Json,
    Uuid,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    if lower == "interval" {
        return TypeCategory::Unknown;
    }

    if lower.contains("timestamp")
        || lower.contains("datetime")
        || lower == "date"
        || lower == "time"
        || lower == "timetz"
    {
        return TypeCategory::Temporal;
    }

    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") || lower == "name" {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Value Helpers
// =============================================================================

/// Binary cells become text when they are valid UTF-8, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn is_null<R>(row: &R, idx: usize) -> DbResult<bool>
where
    R: Row,
    usize: ColumnIndex<R>,
{
    Ok(row.try_get_raw(idx)?.is_null())
}

/// Last resort for any column: text, then raw bytes.
fn decode_fallback<'r, R>(row: &'r R, idx: usize) -> DbResult<JsonValue>
where
    R: Row,
    usize: ColumnIndex<R>,
    String: Decode<'r, R::Database> + Type<R::Database>,
    Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return Ok(JsonValue::String(v));
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
        return Ok(decode_binary_value(&v));
    }

    let column = &row.columns()[idx];
    Err(DbError::unsupported_column(
        column.name(),
        column.type_info().name(),
    ))
}

fn decode_temporal<'r, R>(row: &'r R, idx: usize) -> Option<JsonValue>
where
    R: Row,
    usize: ColumnIndex<R>,
    NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
    DateTime<Utc>: Decode<'r, R::Database> + Type<R::Database>,
    NaiveDate: Decode<'r, R::Database> + Type<R::Database>,
    NaiveTime: Decode<'r, R::Database> + Type<R::Database>,
{
    if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
        return Some(JsonValue::String(v.to_string()));
    }
    if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
        return Some(JsonValue::String(v.to_rfc3339()));
    }
    if let Ok(v) = row.try_get::<NaiveDate, _>(idx) {
        return Some(JsonValue::String(v.to_string()));
    }
    row.try_get::<NaiveTime, _>(idx)
        .ok()
        .map(|v| JsonValue::String(v.to_string()))
}

fn column_metadata<R: Row>(row: &R) -> Vec<ColumnMetadata> {
    row.columns()
        .iter()
        .map(|col| ColumnMetadata::new(col.name(), col.type_info().name()))
        .collect()
}

// =============================================================================
// Row Decoding Trait
// =============================================================================

/// Conversion of a backend row into positional JSON cells.
pub trait RowDecode {
    fn column_metadata(&self) -> Vec<ColumnMetadata>;
    fn decode_values(&self) -> DbResult<Vec<JsonValue>>;
}

impl RowDecode for MySqlRow {
    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        column_metadata(self)
    }

    fn decode_values(&self) -> DbResult<Vec<JsonValue>> {
        (0..self.len())
            .map(|idx| mysql::decode_column(self, idx))
            .collect()
    }
}

impl RowDecode for PgRow {
    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        column_metadata(self)
    }

    fn decode_values(&self) -> DbResult<Vec<JsonValue>> {
        (0..self.len())
            .map(|idx| postgres::decode_column(self, idx))
            .collect()
    }
}

impl RowDecode for SqliteRow {
    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        column_metadata(self)
    }

    fn decode_values(&self) -> DbResult<Vec<JsonValue>> {
        (0..self.len())
            .map(|idx| sqlite::decode_column(self, idx))
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize) -> DbResult<JsonValue> {
        if is_null(row, idx)? {
            return Ok(JsonValue::Null);
        }

        let type_name = row.columns()[idx].type_info().name();
        let decoded = match categorize_type(type_name, DatabaseType::MySQL) {
            TypeCategory::Decimal => row
                .try_get::<RawDecimal, _>(idx)
                .ok()
                .map(|v| JsonValue::String(v.0)),
            TypeCategory::Integer => row
                .try_get::<i64, _>(idx)
                .map(JsonValue::from)
                .or_else(|_| row.try_get::<u64, _>(idx).map(JsonValue::from))
                .ok(),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(JsonValue::Bool),
            TypeCategory::Float => row
                .try_get::<f64, _>(idx)
                .or_else(|_| row.try_get::<f32, _>(idx).map(f64::from))
                .ok()
                .map(float_value),
            TypeCategory::Json => row.try_get::<JsonValue, _>(idx).ok(),
            TypeCategory::Temporal => decode_temporal(row, idx),
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| decode_binary_value(&v)),
            TypeCategory::Text | TypeCategory::Uuid | TypeCategory::Unknown => None,
        };

        match decoded {
            Some(value) => Ok(value),
            None => decode_fallback(row, idx),
        }
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize) -> DbResult<JsonValue> {
        if is_null(row, idx)? {
            return Ok(JsonValue::Null);
        }

        let type_name = row.columns()[idx].type_info().name();
        let decoded = match categorize_type(type_name, DatabaseType::PostgreSQL) {
            TypeCategory::Decimal => row
                .try_get::<RawDecimal, _>(idx)
                .ok()
                .map(|v| JsonValue::String(v.0)),
            TypeCategory::Integer => row
                .try_get::<i64, _>(idx)
                .or_else(|_| row.try_get::<i32, _>(idx).map(i64::from))
                .or_else(|_| row.try_get::<i16, _>(idx).map(i64::from))
                .ok()
                .map(JsonValue::from),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(JsonValue::Bool),
            TypeCategory::Float => row
                .try_get::<f64, _>(idx)
                .or_else(|_| row.try_get::<f32, _>(idx).map(f64::from))
                .ok()
                .map(float_value),
            TypeCategory::Json => row.try_get::<JsonValue, _>(idx).ok(),
            TypeCategory::Uuid => row
                .try_get::<sqlx::types::Uuid, _>(idx)
                .ok()
                .map(|v| JsonValue::String(v.to_string())),
            TypeCategory::Temporal => decode_temporal(row, idx),
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| decode_binary_value(&v)),
            TypeCategory::Text | TypeCategory::Unknown => None,
        };

        match decoded {
            Some(value) => Ok(value),
            None => decode_fallback(row, idx),
        }
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize) -> DbResult<JsonValue> {
        if is_null(row, idx)? {
            return Ok(JsonValue::Null);
        }

        // SQLite reports the storage class of the value, so text stays text
        let type_name = row.columns()[idx].type_info().name();
        let decoded = match categorize_type(type_name, DatabaseType::SQLite) {
            TypeCategory::Integer => row.try_get::<i64, _>(idx).ok().map(JsonValue::from),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(JsonValue::Bool),
            TypeCategory::Float | TypeCategory::Decimal => {
                row.try_get::<f64, _>(idx).ok().map(float_value)
            }
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| decode_binary_value(&v)),
            _ => None,
        };

        match decoded {
            Some(value) => Ok(value),
            None => decode_fallback(row, idx),
        }
    }
}
