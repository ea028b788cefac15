use async_trait::async_trait;
use relay_mcp_json_rpc::SessionContext;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::tool::ToolHandler;

/// Returns its `text` argument unchanged. Handy for smoke-testing a deployment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo back the supplied text"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Text to echo" }
            },
            "required": ["text"]
        })
    }

    async fn call(
        &self,
        arguments: Value,
        _session: Option<&SessionContext>,
    ) -> Result<Value, ToolError> {
        arguments
            .get("text")
            .and_then(Value::as_str)
            .map(|text| Value::String(text.to_string()))
            .ok_or_else(|| ToolError::InvalidArguments("'text' must be a string".to_string()))
    }
}
