//! # Tool-invocation core
//!
//! The bridge never interprets tool calls itself. It talks to a [`ToolCore`]:
//! something that accepts one JSON-RPC message at a time and may answer it.
//! Transports obtain cores from a [`CoreFactory`], which lets the HTTP layer
//! build a fresh core per stateless request while the edge binder hands out
//! leases on a single long-lived instance.
//!
//! [`McpCore`] is the stock implementation: an MCP method dispatcher over an
//! injected [`ToolRegistry`].

pub mod api;
pub mod builtin;
pub mod error;
pub mod tool;
pub mod tool_core;
pub mod version;

pub use api::{ApiClient, ApiError, ApiRequest};
pub use builtin::EchoTool;
pub use tool_core::{
    CoreFactory, CoreLease, McpCore, RegistryCoreFactory, ServerInfo, SharedCoreFactory, ToolCore,
};
pub use error::{CoreError, ToolError};
pub use tool::{ToolHandler, ToolRegistry};
pub use version::McpVersion;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
