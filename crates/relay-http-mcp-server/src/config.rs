use std::net::SocketAddr;

use crate::transport::SseSettings;

/// Listener, routing and transport settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    /// Paths served by the stateless streamable-HTTP transport
    pub streamable_paths: Vec<String>,
    /// Path that opens an SSE session
    pub sse_path: String,
    /// Paths accepting SSE message posts; the first is advertised to clients
    pub message_paths: Vec<String>,
    /// Unauthenticated liveness probe, if exposed
    pub health_path: Option<String>,
    pub enable_cors: bool,
    pub max_body_size: usize,
    pub sse: SseSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            streamable_paths: vec!["/mcp".to_string(), "/http".to_string()],
            sse_path: "/sse".to_string(),
            message_paths: vec!["/messages".to_string()],
            health_path: None,
            enable_cors: true,
            max_body_size: 1024 * 1024, // 1MB
            sse: SseSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Endpoint announced in the first SSE event
    pub fn advertised_message_path(&self) -> &str {
        self.message_paths
            .first()
            .map(String::as_str)
            .unwrap_or("/messages")
    }

    pub fn is_public_path(&self, path: &str) -> bool {
        self.health_path.as_deref() == Some(path)
    }

    /// Every path that requires a credential
    pub fn protected_paths(&self) -> Vec<&str> {
        self.streamable_paths
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.sse_path.as_str()))
            .chain(self.message_paths.iter().map(String::as_str))
            .collect()
    }
}
