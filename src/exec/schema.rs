//! Schema introspection for the three supported engines.
//!
//! sqlite reads `sqlite_master` plus the table pragmas; mysql and postgresql
//! go through `information_schema`. The report shape is the same for all
//! three so the UI and API callers never branch on engine.

use crate::exec::engine::DbEngine;
use crate::exec::ExecError;
use serde::Serialize;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, MySqlConnection, PgConnection, Row, SqliteConnection};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

#[derive(Debug, Serialize)]
pub struct ForeignKeyInfo {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

#[derive(Debug, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

#[derive(Debug, Serialize)]
pub struct SchemaReport {
    pub db_engine: DbEngine,
    pub tables: Vec<TableInfo>,
}

pub async fn sqlite_schema(path: &Path) -> Result<SchemaReport, ExecError> {
    // Nothing executed yet means nothing to describe.
    if !path.exists() {
        return Ok(SchemaReport {
            db_engine: DbEngine::Sqlite,
            tables: Vec::new(),
        });
    }

    let options = SqliteConnectOptions::new().filename(path);
    let mut conn = SqliteConnection::connect_with(&options)
        .await
        .map_err(|e| ExecError::Connection(e.to_string()))?;

    let names: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' \
         AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&mut conn)
    .await?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        // PRAGMA arguments cannot be bound, so the identifier is quoted inline.
        let quoted = name.replace('"', "\"\"");

        let column_rows = sqlx::query(&format!("PRAGMA table_info(\"{}\")", quoted))
            .fetch_all(&mut conn)
            .await?;
        let columns = column_rows
            .iter()
            .map(|row| ColumnInfo {
                name: row.try_get::<String, _>("name").unwrap_or_default(),
                data_type: row.try_get::<String, _>("type").unwrap_or_default(),
                nullable: row.try_get::<i64, _>("notnull").unwrap_or(0) == 0,
                primary_key: row.try_get::<i64, _>("pk").unwrap_or(0) > 0,
            })
            .collect();

        let fk_rows = sqlx::query(&format!("PRAGMA foreign_key_list(\"{}\")", quoted))
            .fetch_all(&mut conn)
            .await?;
        let foreign_keys = fk_rows
            .iter()
            .map(|row| ForeignKeyInfo {
                column: row.try_get::<String, _>("from").unwrap_or_default(),
                referenced_table: row.try_get::<String, _>("table").unwrap_or_default(),
                referenced_column: row.try_get::<String, _>("to").unwrap_or_default(),
            })
            .collect();

        tables.push(TableInfo {
            name,
            columns,
            foreign_keys,
        });
    }

    let _ = conn.close().await;
    Ok(SchemaReport {
        db_engine: DbEngine::Sqlite,
        tables,
    })
}

pub async fn mysql_schema(url: &str) -> Result<SchemaReport, ExecError> {
    let mut conn = MySqlConnection::connect(url)
        .await
        .map_err(|e| ExecError::Connection(e.to_string()))?;

    let column_rows = sqlx::query(
        "SELECT TABLE_NAME AS table_name, COLUMN_NAME AS column_name, \
                COLUMN_TYPE AS column_type, IS_NULLABLE AS is_nullable, \
                COLUMN_KEY AS column_key \
         FROM information_schema.columns \
         WHERE TABLE_SCHEMA = DATABASE() \
         ORDER BY TABLE_NAME, ORDINAL_POSITION",
    )
    .fetch_all(&mut conn)
    .await?;

    let mut tables: BTreeMap<String, TableInfo> = BTreeMap::new();
    for row in &column_rows {
        let table: String = row.try_get("table_name").unwrap_or_default();
        let entry = tables.entry(table.clone()).or_insert_with(|| TableInfo {
            name: table,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        });
        entry.columns.push(ColumnInfo {
            name: row.try_get::<String, _>("column_name").unwrap_or_default(),
            data_type: row.try_get::<String, _>("column_type").unwrap_or_default(),
            nullable: row
                .try_get::<String, _>("is_nullable")
                .map(|v| v.eq_ignore_ascii_case("yes"))
                .unwrap_or(true),
            primary_key: row
                .try_get::<String, _>("column_key")
                .map(|v| v == "PRI")
                .unwrap_or(false),
        });
    }

    let fk_rows = sqlx::query(
        "SELECT TABLE_NAME AS table_name, COLUMN_NAME AS column_name, \
                REFERENCED_TABLE_NAME AS referenced_table, \
                REFERENCED_COLUMN_NAME AS referenced_column \
         FROM information_schema.key_column_usage \
         WHERE TABLE_SCHEMA = DATABASE() AND REFERENCED_TABLE_NAME IS NOT NULL",
    )
    .fetch_all(&mut conn)
    .await?;

    for row in &fk_rows {
        let table: String = row.try_get("table_name").unwrap_or_default();
        if let Some(entry) = tables.get_mut(&table) {
            entry.foreign_keys.push(ForeignKeyInfo {
                column: row.try_get::<String, _>("column_name").unwrap_or_default(),
                referenced_table: row
                    .try_get::<String, _>("referenced_table")
                    .unwrap_or_default(),
                referenced_column: row
                    .try_get::<String, _>("referenced_column")
                    .unwrap_or_default(),
            });
        }
    }

    let _ = conn.close().await;
    Ok(SchemaReport {
        db_engine: DbEngine::Mysql,
        tables: tables.into_values().collect(),
    })
}

pub async fn postgres_schema(url: &str) -> Result<SchemaReport, ExecError> {
    let mut conn = PgConnection::connect(url)
        .await
        .map_err(|e| ExecError::Connection(e.to_string()))?;

    let column_rows = sqlx::query(
        "SELECT table_name, column_name, data_type, is_nullable \
         FROM information_schema.columns \
         WHERE table_schema = 'public' \
         ORDER BY table_name, ordinal_position",
    )
    .fetch_all(&mut conn)
    .await?;

    let pk_rows = sqlx::query(
        "SELECT kcu.table_name, kcu.column_name \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON tc.constraint_name = kcu.constraint_name \
          AND tc.table_schema = kcu.table_schema \
         WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = 'public'",
    )
    .fetch_all(&mut conn)
    .await?;

    let primary: Vec<(String, String)> = pk_rows
        .iter()
        .map(|row| {
            (
                row.try_get::<String, _>("table_name").unwrap_or_default(),
                row.try_get::<String, _>("column_name").unwrap_or_default(),
            )
        })
        .collect();

    let mut tables: BTreeMap<String, TableInfo> = BTreeMap::new();
    for row in &column_rows {
        let table: String = row.try_get("table_name").unwrap_or_default();
        let column: String = row.try_get("column_name").unwrap_or_default();
        let is_pk = primary
            .iter()
            .any(|(t, c)| t == &table && c == &column);
        let entry = tables.entry(table.clone()).or_insert_with(|| TableInfo {
            name: table,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        });
        entry.columns.push(ColumnInfo {
            name: column,
            data_type: row.try_get::<String, _>("data_type").unwrap_or_default(),
            nullable: row
                .try_get::<String, _>("is_nullable")
                .map(|v| v.eq_ignore_ascii_case("yes"))
                .unwrap_or(true),
            primary_key: is_pk,
        });
    }

    let fk_rows = sqlx::query(
        "SELECT kcu.table_name, kcu.column_name, \
                ccu.table_name AS referenced_table, \
                ccu.column_name AS referenced_column \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON tc.constraint_name = kcu.constraint_name \
          AND tc.table_schema = kcu.table_schema \
         JOIN information_schema.constraint_column_usage ccu \
           ON tc.constraint_name = ccu.constraint_name \
          AND tc.table_schema = ccu.table_schema \
         WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = 'public'",
    )
    .fetch_all(&mut conn)
    .await?;

    for row in &fk_rows {
        let table: String = row.try_get("table_name").unwrap_or_default();
        if let Some(entry) = tables.get_mut(&table) {
            entry.foreign_keys.push(ForeignKeyInfo {
                column: row.try_get::<String, _>("column_name").unwrap_or_default(),
                referenced_table: row
                    .try_get::<String, _>("referenced_table")
                    .unwrap_or_default(),
                referenced_column: row
                    .try_get::<String, _>("referenced_column")
                    .unwrap_or_default(),
            });
        }
    }

    let _ = conn.close().await;
    Ok(SchemaReport {
        db_engine: DbEngine::Postgresql,
        tables: tables.into_values().collect(),
    })
}
