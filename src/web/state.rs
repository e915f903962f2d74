use crate::config::AppConfig;
use crate::exec::SqlExecutor;
use crate::llm::LlmManager;
use minijinja::Environment;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state for the web server. Nothing in here mutates after
/// startup; each request gets its own adapter calls and connections.
pub struct AppState {
    pub config: AppConfig,
    pub template_env: Environment<'static>,
    pub llm_manager: Arc<LlmManager>,
    pub executor: SqlExecutor,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, llm_manager: LlmManager) -> Self {
        let mut env = Environment::new();

        env.add_template("base.html", include_str!("../../templates/base.html"))
            .expect("Failed to add base template");
        env.add_template("index.html", include_str!("../../templates/index.html"))
            .expect("Failed to add index template");
        env.add_template("diagram.html", include_str!("../../templates/diagram.html"))
            .expect("Failed to add diagram template");

        env.add_filter("json", |value: minijinja::value::Value| {
            serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string())
        });

        let executor = SqlExecutor::new(
            config.execution.clone(),
            PathBuf::from(&config.data_dir),
        );

        Self {
            config,
            template_env: env,
            llm_manager: Arc::new(llm_manager),
            executor,
            startup_time: chrono::Utc::now(),
        }
    }
}
