use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

pub const DEFAULT_CATALOG_QUERY: &str = "SELECT name AS TABLE_NAME, sql AS COMMENTS \
     FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

#[derive(Parser, Debug, Clone)]
#[command(name = "sql-relay", version)]
pub struct Args {
    /// Run as MCP server (JSON-RPC 2.0 over stdio) instead of HTTP.
    #[arg(long)]
    pub mcp: bool,

    /// SQLite database file. Created on first open if missing.
    #[arg(long, env = "SQL_RELAY_DB", default_value = "sql-relay.db")]
    pub db: PathBuf,

    /// Address the HTTP server binds to.
    #[arg(long, env = "SQL_RELAY_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// How long SQLite waits on a locked database before failing.
    #[arg(long, default_value_t = 2_000)]
    pub busy_timeout_ms: u64,

    /// Query behind the `get_true_tables` tool. Must yield table names and descriptions.
    #[arg(long, env = "SQL_RELAY_CATALOG_QUERY", default_value = DEFAULT_CATALOG_QUERY)]
    pub catalog_query: String,
}
