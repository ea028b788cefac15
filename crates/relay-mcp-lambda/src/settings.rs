//! Runtime settings of an edge deployment, read from the environment.

use std::fmt;

use relay_http_mcp_server::AllowedKeys;
use thiserror::Error;

pub const API_KEYS_VAR: &str = "MCP_API_KEYS";
pub const ENABLED_MODULES_VAR: &str = "MCP_ENABLED_MODULES";
pub const API_BASE_URL_VAR: &str = "MCP_API_BASE_URL";
pub const API_TOKEN_VAR: &str = "MCP_API_TOKEN";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be an http(s) URL, got '{value}'")]
    InvalidUrl { name: &'static str, value: String },

    #[error("{0} is set but {1} is not")]
    Incomplete(&'static str, &'static str),
}

/// Credentials, tool modules and outbound API endpoint of one deployment.
///
/// Missing API keys are not an error here: the Auth Gate answers every
/// protected request with "not configured" instead.
#[derive(Clone, Default)]
pub struct EdgeSettings {
    pub api_keys: AllowedKeys,
    /// Tool modules to register; empty enables every module the builder knows
    pub enabled_modules: Vec<String>,
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
}

impl EdgeSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_keys = var(API_KEYS_VAR)
            .map(|raw| AllowedKeys::from_csv(&raw))
            .unwrap_or_default();

        let enabled_modules = var(ENABLED_MODULES_VAR)
            .map(|raw| {
                raw.split(',')
                    .map(|module| module.trim().to_ascii_lowercase())
                    .filter(|module| !module.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let api_base_url = var(API_BASE_URL_VAR)
            .map(|url| {
                if url.starts_with("https://") || url.starts_with("http://") {
                    Ok(url.trim_end_matches('/').to_string())
                } else {
                    Err(ConfigError::InvalidUrl {
                        name: API_BASE_URL_VAR,
                        value: url,
                    })
                }
            })
            .transpose()?;

        let api_token = var(API_TOKEN_VAR);
        if api_token.is_some() && api_base_url.is_none() {
            return Err(ConfigError::Incomplete(API_TOKEN_VAR, API_BASE_URL_VAR));
        }

        Ok(Self {
            api_keys,
            enabled_modules,
            api_base_url,
            api_token,
        })
    }

    pub fn module_enabled(&self, module: &str) -> bool {
        self.enabled_modules.is_empty()
            || self
                .enabled_modules
                .iter()
                .any(|enabled| enabled.eq_ignore_ascii_case(module))
    }
}

impl fmt::Debug for EdgeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeSettings")
            .field("api_keys", &self.api_keys)
            .field("enabled_modules", &self.enabled_modules)
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
