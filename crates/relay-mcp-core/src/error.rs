use relay_mcp_json_rpc::{JsonRpcErrorObject, ToJsonRpcError};
use thiserror::Error;

use crate::api::ApiError;

/// Failures of the tool-invocation core itself
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Tool-invocation core is closed")]
    Closed,

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Failed to construct tool-invocation core: {0}")]
    Construction(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToJsonRpcError for CoreError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            CoreError::MethodNotFound(method) => JsonRpcErrorObject::method_not_found(method),
            CoreError::InvalidParams(_) | CoreError::UnknownTool(_) => {
                JsonRpcErrorObject::invalid_params(&self.to_string())
            }
            // Internal detail stays in the logs.
            CoreError::Closed | CoreError::Construction(_) | CoreError::Internal(_) => {
                JsonRpcErrorObject::internal_error(None)
            }
        }
    }
}

/// Failures raised by individual tool handlers
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Failed(String),
}
