//! MCP protocol revisions understood by [`crate::McpCore`].

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum McpVersion {
    /// HTTP+SSE transport only
    #[serde(rename = "2024-11-05")]
    V2024_11_05,
    /// Introduced streamable HTTP
    #[serde(rename = "2025-03-26")]
    V2025_03_26,
    #[serde(rename = "2025-06-18")]
    V2025_06_18,
}

impl McpVersion {
    pub const LATEST: McpVersion = McpVersion::V2025_06_18;

    const KNOWN: [McpVersion; 3] = [
        McpVersion::V2024_11_05,
        McpVersion::V2025_03_26,
        McpVersion::V2025_06_18,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            McpVersion::V2024_11_05 => "2024-11-05",
            McpVersion::V2025_03_26 => "2025-03-26",
            McpVersion::V2025_06_18 => "2025-06-18",
        }
    }

    pub fn parse(revision: &str) -> Option<Self> {
        Self::KNOWN.into_iter().find(|known| known.as_str() == revision)
    }

    /// Echo the client's revision when we speak it, otherwise offer the latest.
    pub fn negotiate(requested: Option<&str>) -> Self {
        requested.and_then(Self::parse).unwrap_or_default()
    }
}

impl fmt::Display for McpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for McpVersion {
    fn default() -> Self {
        Self::LATEST
    }
}
