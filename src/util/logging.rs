use tracing_subscriber::{fmt, EnvFilter};

/// Initializes tracing based on RUST_LOG, defaulting to info for everything
/// and debug for our own crate.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,db_architect=debug"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();
}
