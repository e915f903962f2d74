//! Driver-specific row decoding into JSON values.
//!
//! Each engine gets its own decoder keyed on the column's declared type name.
//! The three functions are intentionally parallel so dialect differences stay
//! obvious.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo};

/// Column names of a row, in ordinal order.
pub fn column_names<R: Row>(row: &R) -> Vec<String> {
    row.columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect()
}

pub fn sqlite_row_values(row: &SqliteRow) -> Vec<JsonValue> {
    row.columns()
        .iter()
        .map(|col| {
            let idx = col.ordinal();
            match col.type_info().name().to_lowercase().as_str() {
                "integer" | "int" | "int8" => opt(row.try_get::<Option<i64>, _>(idx)),
                "real" | "numeric" => opt(row.try_get::<Option<f64>, _>(idx)),
                "boolean" | "bool" => opt(row.try_get::<Option<bool>, _>(idx)),
                "blob" => bytes_value(row.try_get::<Option<Vec<u8>>, _>(idx)),
                "text" | "date" | "datetime" | "time" => {
                    opt(row.try_get::<Option<String>, _>(idx))
                }
                // Expression columns and anything else: sqlite is dynamically
                // typed, so probe the usual affinities in order.
                _ => sqlite_dynamic(row, idx),
            }
        })
        .collect()
}

fn sqlite_dynamic(row: &SqliteRow, idx: usize) -> JsonValue {
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return v.into();
    }
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return v.into();
    }
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
        return v.into();
    }
    JsonValue::Null
}

pub fn mysql_row_values(row: &MySqlRow) -> Vec<JsonValue> {
    row.columns()
        .iter()
        .map(|col| {
            let idx = col.ordinal();
            let ty = col.type_info().name().to_lowercase();
            match ty.as_str() {
                "boolean" | "bool" => opt(row.try_get::<Option<bool>, _>(idx)),
                t if t.contains("unsigned") => opt(row.try_get::<Option<u64>, _>(idx)),
                "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" => {
                    opt(row.try_get::<Option<i64>, _>(idx))
                }
                "float" | "double" => opt(row.try_get::<Option<f64>, _>(idx)),
                "decimal" | "numeric" => decimal_value(row.try_get::<Option<RawDecimal>, _>(idx)),
                "date" => text_of(row.try_get::<Option<chrono::NaiveDate>, _>(idx)),
                "time" => text_of(row.try_get::<Option<chrono::NaiveTime>, _>(idx)),
                "datetime" => text_of(row.try_get::<Option<chrono::NaiveDateTime>, _>(idx)),
                "timestamp" => {
                    text_of(row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx))
                }
                "json" => opt(row.try_get::<Option<JsonValue>, _>(idx)),
                t if t.contains("blob") || t.contains("binary") => {
                    bytes_value(row.try_get::<Option<Vec<u8>>, _>(idx))
                }
                _ => opt(row.try_get::<Option<String>, _>(idx)),
            }
        })
        .collect()
}

pub fn pg_row_values(row: &PgRow) -> Vec<JsonValue> {
    row.columns()
        .iter()
        .map(|col| {
            let idx = col.ordinal();
            let ty = col.type_info().name().to_lowercase();
            match ty.as_str() {
                "bool" => opt(row.try_get::<Option<bool>, _>(idx)),
                "int2" | "smallint" => opt(row.try_get::<Option<i16>, _>(idx)),
                "int4" | "int" | "integer" => opt(row.try_get::<Option<i32>, _>(idx)),
                "int8" | "bigint" => opt(row.try_get::<Option<i64>, _>(idx)),
                "float4" => opt(row.try_get::<Option<f32>, _>(idx)),
                "float8" | "double precision" => opt(row.try_get::<Option<f64>, _>(idx)),
                "numeric" | "decimal" => decimal_value(row.try_get::<Option<RawDecimal>, _>(idx)),
                "date" => text_of(row.try_get::<Option<chrono::NaiveDate>, _>(idx)),
                "time" => text_of(row.try_get::<Option<chrono::NaiveTime>, _>(idx)),
                "timestamp" => text_of(row.try_get::<Option<chrono::NaiveDateTime>, _>(idx)),
                "timestamptz" => {
                    text_of(row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx))
                }
                "json" | "jsonb" => opt(row.try_get::<Option<JsonValue>, _>(idx)),
                "bytea" => bytes_value(row.try_get::<Option<Vec<u8>>, _>(idx)),
                _ => opt(row.try_get::<Option<String>, _>(idx)),
            }
        })
        .collect()
}

fn opt<T: Into<JsonValue>>(value: Result<Option<T>, sqlx::Error>) -> JsonValue {
    match value {
        Ok(Some(v)) => v.into(),
        _ => JsonValue::Null,
    }
}

fn text_of<T: ToString>(value: Result<Option<T>, sqlx::Error>) -> JsonValue {
    match value {
        Ok(Some(v)) => JsonValue::String(v.to_string()),
        _ => JsonValue::Null,
    }
}

fn bytes_value(value: Result<Option<Vec<u8>>, sqlx::Error>) -> JsonValue {
    match value {
        Ok(Some(bytes)) => JsonValue::String(STANDARD.encode(&bytes)),
        _ => JsonValue::Null,
    }
}

fn decimal_value(value: Result<Option<RawDecimal>, sqlx::Error>) -> JsonValue {
    match value {
        Ok(Some(d)) => JsonValue::String(d.0),
        _ => JsonValue::Null,
    }
}

/// DECIMAL/NUMERIC values fetched as their exact textual representation so no
/// precision is lost on the way to JSON.
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
