//! Edge deployment with the built-in `echo` module.
//!
//! ```bash
//! MCP_API_KEYS=dev-key cargo lambda watch --package relay-mcp-lambda
//! ```

use std::env;
use std::sync::Arc;

use lambda_http::{run_with_streaming_response, service_fn};
use relay_mcp_core::{ApiClient, EchoTool, ServerInfo, ToolHandler};
use relay_mcp_lambda::{EdgeCoreBuilder, EdgeSessionBinder, EdgeSettings};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct BuiltinModules;

impl EdgeCoreBuilder for BuiltinModules {
    fn server_info(&self) -> ServerInfo {
        ServerInfo::new("relay-mcp-lambda", env!("CARGO_PKG_VERSION"))
    }

    fn tools(
        &self,
        settings: &EdgeSettings,
        _client: Option<Arc<dyn ApiClient>>,
    ) -> Vec<Arc<dyn ToolHandler>> {
        let mut tools: Vec<Arc<dyn ToolHandler>> = Vec::new();
        if settings.module_enabled("echo") {
            tools.push(Arc::new(EchoTool));
        }
        tools
    }
}

/// JSON for CloudWatch inside Lambda, human-readable locally.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env::var("AWS_EXECUTION_ENV").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), lambda_http::Error> {
    init_logging();

    let binder = Arc::new(EdgeSessionBinder::new(BuiltinModules));
    info!("relay MCP edge handler ready");

    run_with_streaming_response(service_fn(move |req| {
        let binder = binder.clone();
        async move { binder.handle_lambda(req).await }
    }))
    .await
}
