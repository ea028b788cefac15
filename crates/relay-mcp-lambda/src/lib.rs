//! # Edge deployment of the relay MCP bridge
//!
//! Runs the same Auth Gate, router and transports as the standalone server
//! inside `lambda_http`. The difference is how the tool-invocation core is
//! obtained: an [`EdgeSessionBinder`] reads [`EdgeSettings`] from the runtime
//! environment on first use, builds one core with every enabled tool
//! registered, and hands each request or SSE session a lease on it.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lambda_http::{run_with_streaming_response, service_fn};
//! use relay_mcp_core::{EchoTool, ToolHandler};
//! use relay_mcp_lambda::{EdgeCoreBuilder, EdgeSessionBinder, EdgeSettings};
//!
//! struct Echo;
//!
//! impl EdgeCoreBuilder for Echo {
//!     fn tools(
//!         &self,
//!         _settings: &EdgeSettings,
//!         _client: Option<Arc<dyn relay_mcp_core::ApiClient>>,
//!     ) -> Vec<Arc<dyn ToolHandler>> {
//!         vec![Arc::new(EchoTool)]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_http::Error> {
//!     let binder = Arc::new(EdgeSessionBinder::new(Echo));
//!     run_with_streaming_response(service_fn(move |req| {
//!         let binder = binder.clone();
//!         async move { binder.handle_lambda(req).await }
//!     }))
//!     .await
//! }
//! ```

pub mod adapter;
pub mod binder;
pub mod error;
pub mod settings;

pub use adapter::{hyper_to_lambda_streaming, lambda_to_hyper_request};
pub use binder::{EdgeCoreBuilder, EdgeSessionBinder, edge_server_config};
pub use error::{LambdaError, Result};
pub use settings::{ConfigError, EdgeSettings};
