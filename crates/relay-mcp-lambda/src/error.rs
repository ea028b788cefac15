//! Error handling for the edge deployment

use thiserror::Error;

use crate::settings::ConfigError;

pub type Result<T> = std::result::Result<T, LambdaError>;

#[derive(Error, Debug)]
pub enum LambdaError {
    /// Environment could not be turned into settings
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tool-invocation core or its API client could not be built
    #[error("Core construction failed: {0}")]
    Core(#[from] relay_mcp_core::CoreError),

    #[error("Session registry error: {0}")]
    Registry(#[from] relay_mcp_session::RegistryError),
}
