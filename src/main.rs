use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use db_architect::config::{AppConfig, CliArgs};
use db_architect::llm::LlmManager;
use db_architect::util::logging::init_tracing;
use db_architect::web::{self, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Ensure data directory exists (holds the sqlite scratch database)
    let data_dir = PathBuf::from(&config.data_dir);
    if !data_dir.exists() {
        info!("Creating data directory: {}", config.data_dir);
        std::fs::create_dir_all(&data_dir)?;
    }

    // Initialize LLM manager; fails fast when no API key is available
    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let llm_manager = LlmManager::new(&config.llm)?;

    // Create application state
    let app_state = Arc::new(AppState::new(config.clone(), llm_manager));

    // Start the web server
    info!(
        "Starting db-architect server on {}:{}",
        config.web.host, config.web.port
    );
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
