//! Integration tests for the SQL execution adapter against sqlite.
//!
//! mysql/postgresql need a live server and are covered only for their
//! not-configured rejection path.

use db_architect::config::ExecutionConfig;
use db_architect::exec::{DbEngine, ExecError, SqlExecutor};
use tempfile::TempDir;

fn test_config() -> ExecutionConfig {
    ExecutionConfig {
        sqlite_path: None,
        ephemeral: false,
        mysql_url: None,
        postgres_url: None,
        timeout_secs: 10,
        max_result_rows: 100,
    }
}

fn executor(dir: &TempDir) -> SqlExecutor {
    SqlExecutor::new(test_config(), dir.path())
}

#[tokio::test]
async fn create_table_reports_success() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir);

    let report = exec
        .execute("CREATE TABLE t (id INTEGER);", DbEngine::Sqlite)
        .await
        .unwrap();

    assert!(report.success);
    assert!(report.error.is_none());
    assert!(report.log.contains("CREATE TABLE t"));
}

#[tokio::test]
async fn invalid_sql_reports_error_without_success_claim() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir);

    let report = exec
        .execute("CREATE TABEL t (id INTEGER);", DbEngine::Sqlite)
        .await
        .unwrap();

    assert!(!report.success);
    assert!(report.error.is_some());
    assert!(report.log.contains("error executing"));
    assert!(!report.log.contains("rows affected"));
}

#[tokio::test]
async fn select_returns_rows_and_columns() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir);

    let script = "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);\n\
                  INSERT INTO users VALUES (1, 'ada');\n\
                  INSERT INTO users VALUES (2, 'grace');\n\
                  SELECT id, name FROM users ORDER BY id;";
    let report = exec.execute(script, DbEngine::Sqlite).await.unwrap();

    assert!(report.success, "log was: {}", report.log);
    assert_eq!(report.results.len(), 1);
    let set = &report.results[0];
    assert_eq!(set.columns, vec!["id", "name"]);
    assert_eq!(set.rows.len(), 2);
    assert_eq!(set.rows[0][0], serde_json::json!(1));
    assert_eq!(set.rows[1][1], serde_json::json!("grace"));
    assert!(report.log.contains("returned 2 rows"));
}

#[tokio::test]
async fn stops_at_first_failing_statement() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir);

    let script = "CREATE TABLE a (id INTEGER);\n\
                  INSERT INTO missing VALUES (1);\n\
                  CREATE TABLE b (id INTEGER);";
    let report = exec.execute(script, DbEngine::Sqlite).await.unwrap();

    assert!(!report.success);
    assert!(report.error.is_some());

    // The statement after the failure never ran.
    let schema = exec.schema(DbEngine::Sqlite).await.unwrap();
    let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    assert!(names.contains(&"a"));
    assert!(!names.contains(&"b"));
}

#[tokio::test]
async fn semicolons_inside_literals_survive() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir);

    let script = "CREATE TABLE notes (v TEXT);\n\
                  INSERT INTO notes VALUES ('a;b');\n\
                  SELECT v FROM notes;";
    let report = exec.execute(script, DbEngine::Sqlite).await.unwrap();

    assert!(report.success, "log was: {}", report.log);
    assert_eq!(report.results[0].rows[0][0], serde_json::json!("a;b"));
}

#[tokio::test]
async fn scratch_database_persists_across_calls() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir);

    let first = exec
        .execute(
            "CREATE TABLE kept (id INTEGER); INSERT INTO kept VALUES (7);",
            DbEngine::Sqlite,
        )
        .await
        .unwrap();
    assert!(first.success);

    let second = exec
        .execute("SELECT id FROM kept;", DbEngine::Sqlite)
        .await
        .unwrap();
    assert!(second.success, "log was: {}", second.log);
    assert_eq!(second.results[0].rows[0][0], serde_json::json!(7));
}

#[tokio::test]
async fn ephemeral_mode_discards_state_between_calls() {
    let dir = TempDir::new().unwrap();
    let config = ExecutionConfig {
        ephemeral: true,
        ..test_config()
    };
    let exec = SqlExecutor::new(config, dir.path());

    let first = exec
        .execute("CREATE TABLE gone (id INTEGER);", DbEngine::Sqlite)
        .await
        .unwrap();
    assert!(first.success);

    let second = exec
        .execute("SELECT * FROM gone;", DbEngine::Sqlite)
        .await
        .unwrap();
    assert!(!second.success);
    assert!(second.error.is_some());
}

#[tokio::test]
async fn unconfigured_engines_are_rejected() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir);

    match exec.execute("SELECT 1;", DbEngine::Mysql).await {
        Err(ExecError::Unconfigured(msg)) => assert!(msg.contains("mysql_url")),
        other => panic!("expected Unconfigured, got {:?}", other.map(|r| r.success)),
    }

    match exec.execute("SELECT 1;", DbEngine::Postgresql).await {
        Err(ExecError::Unconfigured(msg)) => assert!(msg.contains("postgres_url")),
        other => panic!("expected Unconfigured, got {:?}", other.map(|r| r.success)),
    }
}

#[tokio::test]
async fn schema_reports_columns_and_foreign_keys() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir);

    let script = "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);\n\
                  CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, \
                  FOREIGN KEY (user_id) REFERENCES users (id));";
    let report = exec.execute(script, DbEngine::Sqlite).await.unwrap();
    assert!(report.success, "log was: {}", report.log);

    let schema = exec.schema(DbEngine::Sqlite).await.unwrap();
    assert_eq!(schema.db_engine, DbEngine::Sqlite);

    let users = schema.tables.iter().find(|t| t.name == "users").unwrap();
    let id = users.columns.iter().find(|c| c.name == "id").unwrap();
    assert!(id.primary_key);
    let name = users.columns.iter().find(|c| c.name == "name").unwrap();
    assert!(!name.nullable);

    let posts = schema.tables.iter().find(|t| t.name == "posts").unwrap();
    assert_eq!(posts.foreign_keys.len(), 1);
    assert_eq!(posts.foreign_keys[0].referenced_table, "users");
    assert_eq!(posts.foreign_keys[0].column, "user_id");
}

#[tokio::test]
async fn schema_of_untouched_engine_is_empty() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir);

    let schema = exec.schema(DbEngine::Sqlite).await.unwrap();
    assert!(schema.tables.is_empty());
}

#[tokio::test]
async fn comment_only_script_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let exec = executor(&dir);

    let report = exec
        .execute("-- just thinking out loud\n/* nothing */", DbEngine::Sqlite)
        .await
        .unwrap();

    assert!(report.success);
    assert!(report.results.is_empty());
    assert!(report.log.contains("no executable statements"));
}
