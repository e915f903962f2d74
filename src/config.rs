use clap::Parser;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // currently only "openai" (or any OpenAI-compatible endpoint)
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutionConfig {
    /// Path of the sqlite scratch database. Defaults to <data_dir>/scratch.db.
    #[serde(default)]
    pub sqlite_path: Option<String>,
    /// When true, sqlite runs against a throwaway database that is deleted
    /// after each execute call instead of the scratch file.
    pub ephemeral: bool,
    #[serde(default)]
    pub mysql_url: Option<String>,
    #[serde(default)]
    pub postgres_url: Option<String>,
    /// Per-statement timeout in seconds.
    pub timeout_secs: u64,
    /// Cap on rows returned per result set.
    pub max_result_rows: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub execution: ExecutionConfig,
    pub data_dir: String,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory for the sqlite scratch database and other working files
    #[arg(long)]
    pub data_dir: Option<String>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        // Defaults first so the binary runs without a config file at all.
        let mut config_builder = Config::builder()
            .set_default("data_dir", "data")?
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 8000)?
            .set_default("llm.backend", "openai")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("execution.ephemeral", false)?
            .set_default("execution.timeout_secs", 30)?
            .set_default("execution.max_result_rows", 500)?;

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/db-architect/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        // Build the config
        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(data_dir) = &args.data_dir {
            config.data_dir = data_dir.clone();
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            llm: LlmConfig {
                backend: "openai".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: None,
                api_url: None,
            },
            execution: ExecutionConfig {
                sqlite_path: None,
                ephemeral: false,
                mysql_url: None,
                postgres_url: None,
                timeout_secs: 30,
                max_result_rows: 500,
            },
            data_dir: "data".to_string(),
        }
    }
}
