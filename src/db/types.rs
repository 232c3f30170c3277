//! Row decoding into JSON values.
//!
//! Generated SQL can return any column type, so every value is decoded in two
//! steps: the column's type name is classified into a [`TypeCategory`], then a
//! backend-specific decoder extracts the value. Anything unrecognised falls
//! back to its text representation.

use crate::models::{ColumnMetadata, DatabaseType};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo};

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Temporal,
    Json,
    Binary,
    Text,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite has no exact decimal storage
        return if db == DatabaseType::SQLite {
            TypeCategory::Float
        } else {
            TypeCategory::Decimal
        };
    }

    if lower == "date" || lower.starts_with("time") || lower.starts_with("datetime") {
        return TypeCategory::Temporal;
    }

    match lower.as_str() {
        "bool" | "boolean" => TypeCategory::Boolean,
        "year" => TypeCategory::Integer,
        "real" | "float4" | "float8" | "double precision" => TypeCategory::Float,
        "json" | "jsonb" => TypeCategory::Json,
        "bytea" => TypeCategory::Binary,
        _ if lower.contains("int") || lower.contains("serial") => TypeCategory::Integer,
        _ if lower.contains("float") || lower.contains("double") => TypeCategory::Float,
        _ if lower.contains("blob") || lower.contains("binary") => TypeCategory::Binary,
        _ => TypeCategory::Text,
    }
}

/// DECIMAL/NUMERIC values kept as their exact textual representation.
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

/// Binary data as text when it is valid UTF-8, base64 otherwise.
pub fn binary_to_json(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

fn float_to_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Conversion of a fetched row into column metadata and positional JSON values.
pub trait RowToJson {
    fn column_metadata(&self) -> Vec<ColumnMetadata>;
    fn to_json_values(&self) -> Vec<JsonValue>;
}

macro_rules! impl_row_to_json {
    ($row:ty, $db:expr, $decode:path) => {
        impl RowToJson for $row {
            fn column_metadata(&self) -> Vec<ColumnMetadata> {
                self.columns()
                    .iter()
                    .map(|col| ColumnMetadata::new(col.name(), col.type_info().name()))
                    .collect()
            }

            fn to_json_values(&self) -> Vec<JsonValue> {
                self.columns()
                    .iter()
                    .enumerate()
                    .map(|(idx, col)| {
                        let category = categorize_type(col.type_info().name(), $db);
                        $decode(self, idx, category)
                    })
                    .collect()
            }
        }
    };
}

impl_row_to_json!(MySqlRow, DatabaseType::MySQL, mysql::decode_column);
impl_row_to_json!(PgRow, DatabaseType::PostgreSQL, postgres::decode_column);
impl_row_to_json!(SqliteRow, DatabaseType::SQLite, sqlite::decode_column);

mod mysql {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Decimal => match row.try_get::<Option<RawDecimal>, _>(idx) {
                Ok(Some(v)) => JsonValue::String(v.0),
                Ok(None) => JsonValue::Null,
                Err(_) => decode_text(row, idx),
            },
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => match row.try_get::<Option<bool>, _>(idx) {
                Ok(v) => v.map(JsonValue::Bool).unwrap_or(JsonValue::Null),
                Err(_) => decode_integer(row, idx),
            },
            TypeCategory::Float => {
                if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
                    return v.map(float_to_json).unwrap_or(JsonValue::Null);
                }
                if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
                    return v.map(|f| float_to_json(f as f64)).unwrap_or(JsonValue::Null);
                }
                decode_text(row, idx)
            }
            TypeCategory::Temporal => decode_temporal(row, idx),
            TypeCategory::Json => row
                .try_get::<Option<JsonValue>, _>(idx)
                .ok()
                .flatten()
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| binary_to_json(&v))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Text => decode_text(row, idx),
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
            return v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<u32>, _>(idx) {
            return v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<u16>, _>(idx) {
            return v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i8>, _>(idx) {
            return v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<u8>, _>(idx) {
            return v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null);
        }
        decode_text(row, idx)
    }

    fn decode_temporal(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            return v.map(|t| JsonValue::String(t.to_string())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return v.map(|t| JsonValue::String(t.to_rfc3339())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
            return v.map(|t| JsonValue::String(t.to_string())).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
            return v.map(|t| JsonValue::String(t.to_string())).unwrap_or(JsonValue::Null);
        }
        decode_text(row, idx)
    }

    /// MySQL may report text as VARBINARY depending on the connection charset.
    fn decode_text(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            return v.map(|b| binary_to_json(&b)).unwrap_or(JsonValue::Null);
        }
        row.try_get_unchecked::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null)
    }
}

mod postgres {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Decimal => match row.try_get::<Option<RawDecimal>, _>(idx) {
                Ok(Some(v)) => JsonValue::String(v.0),
                Ok(None) => JsonValue::Null,
                Err(_) => decode_text(row, idx),
            },
            TypeCategory::Integer => {
                if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
                    return v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null);
                }
                if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
                    return v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null);
                }
                if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
                    return v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null);
                }
                decode_text(row, idx)
            }
            TypeCategory::Boolean => row
                .try_get::<Option<bool>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Float => {
                if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
                    return v.map(float_to_json).unwrap_or(JsonValue::Null);
                }
                if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
                    return v.map(|f| float_to_json(f as f64)).unwrap_or(JsonValue::Null);
                }
                decode_text(row, idx)
            }
            TypeCategory::Temporal => {
                if let Ok(v) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
                    return v.map(|t| JsonValue::String(t.to_rfc3339())).unwrap_or(JsonValue::Null);
                }
                if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
                    return v.map(|t| JsonValue::String(t.to_string())).unwrap_or(JsonValue::Null);
                }
                if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(idx) {
                    return v.map(|t| JsonValue::String(t.to_string())).unwrap_or(JsonValue::Null);
                }
                if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(idx) {
                    return v.map(|t| JsonValue::String(t.to_string())).unwrap_or(JsonValue::Null);
                }
                decode_text(row, idx)
            }
            TypeCategory::Json => row
                .try_get::<Option<JsonValue>, _>(idx)
                .ok()
                .flatten()
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| binary_to_json(&v))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Text => decode_text(row, idx),
        }
    }

    // Raw statements use the simple query protocol, so every value arrives as text
    // and the unchecked decode covers types without a Rust mapping (uuid, inet, interval).
    fn decode_text(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
        }
        row.try_get_unchecked::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null)
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Integer => match row.try_get::<Option<i64>, _>(idx) {
                Ok(v) => v.map(|n| JsonValue::Number(n.into())).unwrap_or(JsonValue::Null),
                Err(_) => decode_text(row, idx),
            },
            TypeCategory::Boolean => match row.try_get::<Option<bool>, _>(idx) {
                Ok(v) => v.map(JsonValue::Bool).unwrap_or(JsonValue::Null),
                Err(_) => decode_text(row, idx),
            },
            TypeCategory::Float | TypeCategory::Decimal => {
                match row.try_get::<Option<f64>, _>(idx) {
                    Ok(v) => v.map(float_to_json).unwrap_or(JsonValue::Null),
                    Err(_) => decode_text(row, idx),
                }
            }
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| binary_to_json(&v))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Json => match decode_text(row, idx) {
                JsonValue::String(s) => serde_json::from_str(&s).unwrap_or(JsonValue::String(s)),
                other => other,
            },
            TypeCategory::Temporal | TypeCategory::Text => decode_text(row, idx),
        }
    }

    /// Declared types are advisory in SQLite; a TEXT column may hold numbers.
    fn decode_text(row: &SqliteRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return float_to_json(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            return binary_to_json(&v);
        }
        JsonValue::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_integers() {
        assert_eq!(categorize_type("INT", DatabaseType::MySQL), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT", DatabaseType::PostgreSQL), TypeCategory::Integer);
        assert_eq!(categorize_type("INT8", DatabaseType::PostgreSQL), TypeCategory::Integer);
        assert_eq!(categorize_type("INTEGER", DatabaseType::SQLite), TypeCategory::Integer);
        assert_eq!(categorize_type("YEAR", DatabaseType::MySQL), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_decimal_per_backend() {
        assert_eq!(categorize_type("DECIMAL", DatabaseType::MySQL), TypeCategory::Decimal);
        assert_eq!(categorize_type("NUMERIC", DatabaseType::PostgreSQL), TypeCategory::Decimal);
        assert_eq!(categorize_type("NUMERIC", DatabaseType::SQLite), TypeCategory::Float);
    }

    #[test]
    fn test_categorize_temporal() {
        assert_eq!(categorize_type("DATE", DatabaseType::MySQL), TypeCategory::Temporal);
        assert_eq!(categorize_type("DATETIME", DatabaseType::MySQL), TypeCategory::Temporal);
        assert_eq!(categorize_type("TIMESTAMPTZ", DatabaseType::PostgreSQL), TypeCategory::Temporal);
        assert_eq!(categorize_type("TIME", DatabaseType::PostgreSQL), TypeCategory::Temporal);
    }

    #[test]
    fn test_categorize_other() {
        assert_eq!(categorize_type("BOOLEAN", DatabaseType::PostgreSQL), TypeCategory::Boolean);
        assert_eq!(categorize_type("DOUBLE", DatabaseType::MySQL), TypeCategory::Float);
        assert_eq!(categorize_type("REAL", DatabaseType::SQLite), TypeCategory::Float);
        assert_eq!(categorize_type("jsonb", DatabaseType::PostgreSQL), TypeCategory::Json);
        assert_eq!(categorize_type("BLOB", DatabaseType::SQLite), TypeCategory::Binary);
        assert_eq!(categorize_type("BYTEA", DatabaseType::PostgreSQL), TypeCategory::Binary);
        assert_eq!(categorize_type("VARCHAR", DatabaseType::MySQL), TypeCategory::Text);
        assert_eq!(categorize_type("UUID", DatabaseType::PostgreSQL), TypeCategory::Text);
    }

    #[test]
    fn test_binary_to_json() {
        assert_eq!(
            binary_to_json(b"hello world"),
            JsonValue::String("hello world".to_string())
        );
        assert_eq!(
            binary_to_json(&[0xFF, 0xFE, 0x00, 0x01]),
            JsonValue::String("//4AAQ==".to_string())
        );
    }

    #[test]
    fn test_non_finite_float_falls_back_to_string() {
        assert_eq!(float_to_json(f64::NAN), JsonValue::String("NaN".to_string()));
        assert_eq!(float_to_json(1.5), serde_json::json!(1.5));
    }
}
