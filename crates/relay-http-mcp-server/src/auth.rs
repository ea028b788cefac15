//! Credential check that runs before any routing or session work.
//!
//! Token sources, in order: `Authorization: Bearer <token>`, then
//! `x-api-key: <token>`. The first one present is the candidate; a wrong
//! bearer token is not rescued by a correct API key.

use std::fmt;
use std::sync::Arc;

use hyper::HeaderMap;
use hyper::header::AUTHORIZATION;
use subtle::{Choice, ConstantTimeEq};
use tracing::debug;

use crate::error::BridgeError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Immutable set of accepted tokens.
///
/// An empty set is "not configured", which is not the same as "configured
/// but no match": the gate reports the two differently.
#[derive(Clone, Default)]
pub struct AllowedKeys {
    keys: Option<Arc<[String]>>,
}

impl AllowedKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys
            .into_iter()
            .map(Into::into)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();

        if keys.is_empty() {
            Self::not_configured()
        } else {
            Self {
                keys: Some(keys.into()),
            }
        }
    }

    /// Parse a comma-separated list such as `MCP_API_KEYS=abc,def`.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn not_configured() -> Self {
        Self { keys: None }
    }

    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.as_ref().map_or(0, |keys| keys.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compares against every key without short-circuiting.
    pub fn contains(&self, token: &str) -> bool {
        let Some(keys) = &self.keys else {
            return false;
        };
        let found = keys.iter().fold(Choice::from(0u8), |found, key| {
            found | key.as_bytes().ct_eq(token.as_bytes())
        });
        bool::from(found)
    }
}

impl fmt::Debug for AllowedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowedKeys")
            .field("configured", &self.is_configured())
            .field("count", &self.len())
            .finish()
    }
}

/// Candidate token from the request headers, if any.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| {
        headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    keys: AllowedKeys,
}

impl AuthGate {
    pub fn new(keys: AllowedKeys) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &AllowedKeys {
        &self.keys
    }

    /// Allow or reject; never touches session state.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), BridgeError> {
        if !self.keys.is_configured() {
            return Err(BridgeError::AuthNotConfigured);
        }

        match extract_token(headers) {
            Some(token) if self.keys.contains(&token) => Ok(()),
            Some(_) => {
                debug!("credential did not match any allowed key");
                Err(BridgeError::Unauthorized)
            }
            None => {
                debug!("request carried no credential");
                Err(BridgeError::Unauthorized)
            }
        }
    }
}
