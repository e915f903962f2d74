use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target SQL dialect and driver for generation and execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbEngine {
    #[default]
    Sqlite,
    Mysql,
    Postgresql,
}

impl DbEngine {
    pub const ALL: [DbEngine; 3] = [DbEngine::Sqlite, DbEngine::Mysql, DbEngine::Postgresql];

    /// Dialect name as embedded in prompts and wire payloads.
    pub fn dialect_name(&self) -> &'static str {
        match self {
            DbEngine::Sqlite => "sqlite",
            DbEngine::Mysql => "mysql",
            DbEngine::Postgresql => "postgresql",
        }
    }
}

impl fmt::Display for DbEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dialect_name())
    }
}

impl FromStr for DbEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(DbEngine::Sqlite),
            "mysql" => Ok(DbEngine::Mysql),
            "postgresql" | "postgres" => Ok(DbEngine::Postgresql),
            other => Err(format!(
                "unknown db_engine '{}' (expected sqlite, mysql or postgresql)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_engines() {
        assert_eq!("sqlite".parse::<DbEngine>().unwrap(), DbEngine::Sqlite);
        assert_eq!("MySQL".parse::<DbEngine>().unwrap(), DbEngine::Mysql);
        assert_eq!("postgres".parse::<DbEngine>().unwrap(), DbEngine::Postgresql);
        assert_eq!(
            "postgresql".parse::<DbEngine>().unwrap(),
            DbEngine::Postgresql
        );
        assert!("oracle".parse::<DbEngine>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(
            serde_json::to_string(&DbEngine::Postgresql).unwrap(),
            "\"postgresql\""
        );
        let engine: DbEngine = serde_json::from_str("\"mysql\"").unwrap();
        assert_eq!(engine, DbEngine::Mysql);
    }

    #[test]
    fn display_matches_dialect_name() {
        for engine in DbEngine::ALL {
            assert_eq!(engine.to_string(), engine.dialect_name());
        }
    }
}
