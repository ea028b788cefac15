use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use relay_mcp_json_rpc::SessionContext;
use serde_json::{Value, json};

use crate::error::ToolError;

/// A single callable tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the `arguments` object
    fn input_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    async fn call(
        &self,
        arguments: Value,
        session: Option<&SessionContext>,
    ) -> Result<Value, ToolError>;
}

/// The set of enabled tool handlers, fixed at construction.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new(handlers: impl IntoIterator<Item = Arc<dyn ToolHandler>>) -> Self {
        let tools = handlers
            .into_iter()
            .map(|handler| (handler.name().to_string(), handler))
            .collect();
        Self { tools }
    }

    pub fn with_tool<T: ToolHandler + 'static>(mut self, tool: T) -> Self {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// `tools/list` descriptors in name order
    pub fn descriptors(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::EchoTool;

    #[test]
    fn test_registry_lists_in_name_order() {
        struct Zed;

        #[async_trait]
        impl ToolHandler for Zed {
            fn name(&self) -> &str {
                "zed"
            }
            fn description(&self) -> &str {
                "last"
            }
            async fn call(&self, _: Value, _: Option<&SessionContext>) -> Result<Value, ToolError> {
                Ok(Value::Null)
            }
        }

        let registry = ToolRegistry::default().with_tool(Zed).with_tool(EchoTool);
        assert_eq!(registry.names(), vec!["echo", "zed"]);

        let descriptors = registry.descriptors();
        assert_eq!(descriptors[0]["name"], "echo");
        assert_eq!(descriptors[1]["inputSchema"], json!({"type": "object"}));
    }
}
