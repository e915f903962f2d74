pub mod models;
pub mod providers;

use crate::config::LlmConfig;
use crate::exec::DbEngine;
use async_trait::async_trait;
use regex::Regex;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum LlmError {
    ConnectionError(String),
    ResponseError(String),
    ConfigError(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ConnectionError(msg) => write!(f, "LLM connection error: {}", msg),
            LlmError::ResponseError(msg) => write!(f, "LLM response error: {}", msg),
            LlmError::ConfigError(msg) => write!(f, "LLM configuration error: {}", msg),
        }
    }
}

impl Error for LlmError {}

/// Turns a description or an ER-diagram image into SQL DDL for one dialect.
#[async_trait]
pub trait SchemaGenerator: Send + Sync {
    async fn sql_from_text(
        &self,
        description: &str,
        engine: DbEngine,
    ) -> Result<String, LlmError>;

    async fn sql_from_diagram(
        &self,
        image: &[u8],
        content_type: &str,
        engine: DbEngine,
    ) -> Result<String, LlmError>;
}

pub struct LlmManager {
    generator: Box<dyn SchemaGenerator + Send + Sync>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let generator: Box<dyn SchemaGenerator + Send + Sync> = match config.backend.as_str() {
            "openai" => Box::new(providers::openai::OpenAiProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self { generator })
    }

    /// Builds a manager around an arbitrary generator. Used by tests to swap
    /// in a canned implementation.
    pub fn with_generator(generator: Box<dyn SchemaGenerator + Send + Sync>) -> Self {
        Self { generator }
    }

    pub async fn sql_from_text(
        &self,
        description: &str,
        engine: DbEngine,
    ) -> Result<String, LlmError> {
        self.generator.sql_from_text(description, engine).await
    }

    pub async fn sql_from_diagram(
        &self,
        image: &[u8],
        content_type: &str,
        engine: DbEngine,
    ) -> Result<String, LlmError> {
        self.generator
            .sql_from_diagram(image, content_type, engine)
            .await
    }
}

/// Pulls the SQL out of a fenced ```sql block if the model wrapped it in one;
/// otherwise the trimmed response is returned as-is. No syntax validation.
pub fn extract_sql(content: &str) -> String {
    let re = Regex::new(r"(?s)```(?:sql)?\s*(.*?)```").unwrap();
    if let Some(captures) = re.captures(content) {
        if let Some(block) = captures.get(1) {
            return block.as_str().trim().to_string();
        }
    }
    content.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_sql() {
        let content = "Here you go:\n```sql\nCREATE TABLE t (id INTEGER);\n```\nDone.";
        assert_eq!(extract_sql(content), "CREATE TABLE t (id INTEGER);");
    }

    #[test]
    fn extracts_plain_fence() {
        let content = "```\nSELECT 1;\n```";
        assert_eq!(extract_sql(content), "SELECT 1;");
    }

    #[test]
    fn passes_unfenced_content_through() {
        let content = "  CREATE TABLE t (id INTEGER);  ";
        assert_eq!(extract_sql(content), "CREATE TABLE t (id INTEGER);");
    }

    #[test]
    fn takes_first_fence_when_several_present() {
        let content = "```sql\nSELECT 1;\n```\ntext\n```sql\nSELECT 2;\n```";
        assert_eq!(extract_sql(content), "SELECT 1;");
    }
}
