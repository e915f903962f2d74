use crate::config::ExecutionConfig;
use crate::exec::engine::DbEngine;
use crate::exec::schema::{self, SchemaReport};
use crate::exec::{splitter, types, ExecError};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, MySqlConnection, PgConnection, SqliteConnection};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// One SELECT-style statement's output.
#[derive(Debug, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

/// Outcome of running a SQL script. SQL-level failures land here rather than
/// in an Err so callers can render the partial log alongside the message.
#[derive(Debug, Serialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub log: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<ResultSet>,
}

/// Runs SQL scripts against the engine selected per request. Connections are
/// opened for the duration of a single call and dropped afterwards.
#[derive(Debug, Clone)]
pub struct SqlExecutor {
    config: ExecutionConfig,
    data_dir: PathBuf,
}

impl SqlExecutor {
    pub fn new(config: ExecutionConfig, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            data_dir: data_dir.into(),
        }
    }

    /// The sqlite scratch database file DDL accumulates in between calls.
    pub fn sqlite_path(&self) -> PathBuf {
        self.config
            .sqlite_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.data_dir.join("scratch.db"))
    }

    pub fn engine_configured(&self, engine: DbEngine) -> bool {
        match engine {
            DbEngine::Sqlite => true,
            DbEngine::Mysql => self.config.mysql_url.is_some(),
            DbEngine::Postgresql => self.config.postgres_url.is_some(),
        }
    }

    fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    pub async fn execute(
        &self,
        sql: &str,
        engine: DbEngine,
    ) -> Result<ExecutionReport, ExecError> {
        let statements = splitter::split_statements(sql);
        if statements.is_empty() {
            return Ok(ExecutionReport {
                success: true,
                log: "no executable statements found".to_string(),
                error: None,
                results: Vec::new(),
            });
        }

        info!(engine = %engine, statements = statements.len(), "executing sql script");

        match engine {
            DbEngine::Sqlite => self.execute_sqlite(statements).await,
            DbEngine::Mysql => {
                let url = self.config.mysql_url.clone().ok_or_else(|| {
                    ExecError::Unconfigured(
                        "mysql execution requires execution.mysql_url".to_string(),
                    )
                })?;
                match MySqlConnection::connect(&url).await {
                    Ok(conn) => Ok(self.run_mysql(conn, statements).await),
                    Err(e) => Ok(connect_failure(engine, e)),
                }
            }
            DbEngine::Postgresql => {
                let url = self.config.postgres_url.clone().ok_or_else(|| {
                    ExecError::Unconfigured(
                        "postgresql execution requires execution.postgres_url".to_string(),
                    )
                })?;
                match PgConnection::connect(&url).await {
                    Ok(conn) => Ok(self.run_postgres(conn, statements).await),
                    Err(e) => Ok(connect_failure(engine, e)),
                }
            }
        }
    }

    /// Schema of whatever the selected engine currently holds.
    pub async fn schema(&self, engine: DbEngine) -> Result<SchemaReport, ExecError> {
        match engine {
            DbEngine::Sqlite => schema::sqlite_schema(&self.sqlite_path()).await,
            DbEngine::Mysql => {
                let url = self.config.mysql_url.as_deref().ok_or_else(|| {
                    ExecError::Unconfigured(
                        "mysql introspection requires execution.mysql_url".to_string(),
                    )
                })?;
                schema::mysql_schema(url).await
            }
            DbEngine::Postgresql => {
                let url = self.config.postgres_url.as_deref().ok_or_else(|| {
                    ExecError::Unconfigured(
                        "postgresql introspection requires execution.postgres_url".to_string(),
                    )
                })?;
                schema::postgres_schema(url).await
            }
        }
    }

    async fn execute_sqlite(
        &self,
        statements: Vec<String>,
    ) -> Result<ExecutionReport, ExecError> {
        // Ephemeral mode runs against a throwaway file that dies with the
        // guard; otherwise DDL accumulates in the scratch database.
        let (path, _guard) = if self.config.ephemeral {
            let tmp = tempfile::Builder::new()
                .prefix("db-architect-")
                .suffix(".db")
                .tempfile()
                .map_err(|e| {
                    ExecError::Connection(format!("failed to create throwaway database: {}", e))
                })?;
            (tmp.path().to_path_buf(), Some(tmp))
        } else {
            let path = self.sqlite_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ExecError::Connection(format!(
                        "failed to create data directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
            (path, None)
        };

        debug!(path = %path.display(), ephemeral = self.config.ephemeral, "opening sqlite database");

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .foreign_keys(true);

        match SqliteConnection::connect_with(&options).await {
            Ok(conn) => Ok(self.run_sqlite(conn, statements).await),
            Err(e) => Ok(connect_failure(DbEngine::Sqlite, e)),
        }
    }

    // The three runners below are intentionally parallel; only the row
    // decoding differs per driver.

    async fn run_sqlite(
        &self,
        mut conn: SqliteConnection,
        statements: Vec<String>,
    ) -> ExecutionReport {
        let per_stmt = self.statement_timeout();
        let mut log: Vec<String> = Vec::new();
        let mut results: Vec<ResultSet> = Vec::new();

        for stmt in &statements {
            let snip = splitter::snippet(stmt);
            if splitter::is_query(stmt) {
                match timeout(per_stmt, sqlx::query(stmt).fetch_all(&mut conn)).await {
                    Err(_) => return timeout_failure(log, &snip, per_stmt),
                    Ok(Err(e)) => return statement_failure(log, &snip, e.to_string()),
                    Ok(Ok(rows)) => {
                        let columns = rows.first().map(types::column_names).unwrap_or_default();
                        let values = rows
                            .iter()
                            .take(self.config.max_result_rows)
                            .map(types::sqlite_row_values)
                            .collect();
                        push_query_log(&mut log, &snip, rows.len(), self.config.max_result_rows);
                        results.push(ResultSet {
                            columns,
                            rows: values,
                        });
                    }
                }
            } else {
                match timeout(per_stmt, sqlx::query(stmt).execute(&mut conn)).await {
                    Err(_) => return timeout_failure(log, &snip, per_stmt),
                    Ok(Err(e)) => return statement_failure(log, &snip, e.to_string()),
                    Ok(Ok(done)) => {
                        log.push(format!("executed: {}", snip));
                        log.push(format!("{} rows affected", done.rows_affected()));
                    }
                }
            }
        }

        let _ = conn.close().await;
        success_report(log, results)
    }

    async fn run_mysql(
        &self,
        mut conn: MySqlConnection,
        statements: Vec<String>,
    ) -> ExecutionReport {
        let per_stmt = self.statement_timeout();
        let mut log: Vec<String> = Vec::new();
        let mut results: Vec<ResultSet> = Vec::new();

        for stmt in &statements {
            let snip = splitter::snippet(stmt);
            if splitter::is_query(stmt) {
                match timeout(per_stmt, sqlx::query(stmt).fetch_all(&mut conn)).await {
                    Err(_) => return timeout_failure(log, &snip, per_stmt),
                    Ok(Err(e)) => return statement_failure(log, &snip, e.to_string()),
                    Ok(Ok(rows)) => {
                        let columns = rows.first().map(types::column_names).unwrap_or_default();
                        let values = rows
                            .iter()
                            .take(self.config.max_result_rows)
                            .map(types::mysql_row_values)
                            .collect();
                        push_query_log(&mut log, &snip, rows.len(), self.config.max_result_rows);
                        results.push(ResultSet {
                            columns,
                            rows: values,
                        });
                    }
                }
            } else {
                match timeout(per_stmt, sqlx::query(stmt).execute(&mut conn)).await {
                    Err(_) => return timeout_failure(log, &snip, per_stmt),
                    Ok(Err(e)) => return statement_failure(log, &snip, e.to_string()),
                    Ok(Ok(done)) => {
                        log.push(format!("executed: {}", snip));
                        log.push(format!("{} rows affected", done.rows_affected()));
                    }
                }
            }
        }

        let _ = conn.close().await;
        success_report(log, results)
    }

    async fn run_postgres(
        &self,
        mut conn: PgConnection,
        statements: Vec<String>,
    ) -> ExecutionReport {
        let per_stmt = self.statement_timeout();
        let mut log: Vec<String> = Vec::new();
        let mut results: Vec<ResultSet> = Vec::new();

        for stmt in &statements {
            let snip = splitter::snippet(stmt);
            if splitter::is_query(stmt) {
                match timeout(per_stmt, sqlx::query(stmt).fetch_all(&mut conn)).await {
                    Err(_) => return timeout_failure(log, &snip, per_stmt),
                    Ok(Err(e)) => return statement_failure(log, &snip, e.to_string()),
                    Ok(Ok(rows)) => {
                        let columns = rows.first().map(types::column_names).unwrap_or_default();
                        let values = rows
                            .iter()
                            .take(self.config.max_result_rows)
                            .map(types::pg_row_values)
                            .collect();
                        push_query_log(&mut log, &snip, rows.len(), self.config.max_result_rows);
                        results.push(ResultSet {
                            columns,
                            rows: values,
                        });
                    }
                }
            } else {
                match timeout(per_stmt, sqlx::query(stmt).execute(&mut conn)).await {
                    Err(_) => return timeout_failure(log, &snip, per_stmt),
                    Ok(Err(e)) => return statement_failure(log, &snip, e.to_string()),
                    Ok(Ok(done)) => {
                        log.push(format!("executed: {}", snip));
                        log.push(format!("{} rows affected", done.rows_affected()));
                    }
                }
            }
        }

        let _ = conn.close().await;
        success_report(log, results)
    }
}

fn push_query_log(log: &mut Vec<String>, snippet: &str, total_rows: usize, cap: usize) {
    log.push(format!("executed: {}", snippet));
    if total_rows > cap {
        log.push(format!(
            "returned {} rows (showing first {})",
            total_rows, cap
        ));
    } else {
        log.push(format!("returned {} rows", total_rows));
    }
}

fn success_report(log: Vec<String>, results: Vec<ResultSet>) -> ExecutionReport {
    ExecutionReport {
        success: true,
        log: log.join("\n"),
        error: None,
        results,
    }
}

fn connect_failure(engine: DbEngine, err: impl std::fmt::Display) -> ExecutionReport {
    let message = format!("failed to connect to {}: {}", engine, err);
    ExecutionReport {
        success: false,
        log: String::new(),
        error: Some(message),
        results: Vec::new(),
    }
}

/// Remaining statements are not run; the log up to the failing statement is
/// kept so the caller can show how far the script got.
fn statement_failure(mut log: Vec<String>, snippet: &str, message: String) -> ExecutionReport {
    log.push(format!("error executing: {}", snippet));
    log.push(message.clone());
    ExecutionReport {
        success: false,
        log: log.join("\n"),
        error: Some(message),
        results: Vec::new(),
    }
}

fn timeout_failure(log: Vec<String>, snippet: &str, elapsed: Duration) -> ExecutionReport {
    let message = format!("statement timed out after {}s", elapsed.as_secs());
    statement_failure(log, snippet, message)
}
