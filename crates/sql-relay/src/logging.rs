use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout stays clean for the MCP stdio transport.
pub fn init(log_level: &str) {
    // RUST_LOG wins over --log-level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn default_directives(log_level: &str) -> String {
    format!("{log_level},tower_http={log_level},hyper=warn")
}
