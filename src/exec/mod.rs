pub mod engine;
pub mod executor;
pub mod schema;
pub mod splitter;
pub mod types;

pub use engine::DbEngine;
pub use executor::{ExecutionReport, ResultSet, SqlExecutor};
pub use schema::SchemaReport;

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum ExecError {
    /// The selected engine has no connection configured.
    Unconfigured(String),
    Connection(String),
    Database(String),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Unconfigured(msg) => write!(f, "engine not configured: {}", msg),
            ExecError::Connection(msg) => write!(f, "database connection error: {}", msg),
            ExecError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl Error for ExecError {}

impl From<sqlx::Error> for ExecError {
    fn from(err: sqlx::Error) -> Self {
        ExecError::Database(err.to_string())
    }
}
