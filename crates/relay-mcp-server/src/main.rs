//! # Relay MCP bridge server
//!
//! Serves the built-in tools over streamable HTTP (`POST /mcp`, `POST /http`)
//! and HTTP+SSE (`GET /sse`, `POST /messages?sessionId=..`).
//!
//! ```bash
//! MCP_API_KEYS=dev-key cargo run --package relay-mcp-server
//!
//! curl -X POST http://127.0.0.1:3000/mcp \
//!   -H "Authorization: Bearer dev-key" \
//!   -H "Content-Type: application/json" \
//!   -d '{"jsonrpc":"2.0","id":1,"method":"tools/list"}'
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use relay_http_mcp_server::{AllowedKeys, BridgeServer};
use relay_mcp_core::{EchoTool, ServerInfo, ToolRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "MCP_BIND_ADDRESS", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Comma-separated API keys accepted as Bearer token or X-API-Key
    #[arg(long, env = "MCP_API_KEYS", hide_env_values = true)]
    api_keys: String,

    /// Seconds without activity before an SSE session is closed
    #[arg(long, env = "MCP_SESSION_IDLE_SECS", default_value = "30")]
    session_idle_secs: u64,

    /// Seconds between idle-session sweeps
    #[arg(long, env = "MCP_REAPER_INTERVAL_SECS", default_value = "10")]
    reaper_interval_secs: u64,

    /// Largest accepted request body in bytes
    #[arg(long, env = "MCP_MAX_BODY_BYTES", default_value = "1048576")]
    max_body_bytes: usize,

    /// Send permissive CORS headers
    #[arg(long, env = "MCP_CORS", default_value = "true", action = clap::ArgAction::Set)]
    cors: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,relay_http_mcp_server=info,relay_mcp_session=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let keys = AllowedKeys::from_csv(&args.api_keys);
    if !keys.is_configured() {
        bail!("MCP_API_KEYS must list at least one key");
    }
    info!(keys = keys.len(), "API keys loaded");

    let tools = ToolRegistry::default().with_tool(EchoTool);
    let server = BridgeServer::builder()
        .bind_address(args.bind)
        .cors(args.cors)
        .max_body_size(args.max_body_bytes)
        .idle_threshold(Duration::from_secs(args.session_idle_secs))
        .sweep_interval(Duration::from_secs(args.reaper_interval_secs))
        .allowed_keys(keys)
        .tools(
            ServerInfo::new("relay-mcp-server", env!("CARGO_PKG_VERSION")),
            tools,
        )
        .build()
        .context("invalid server configuration")?;

    server
        .run_until(shutdown_signal())
        .await
        .context("server terminated with an error")?;

    info!("Goodbye");
    Ok(())
}
