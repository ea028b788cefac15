//! # Session tracking for long-lived transports
//!
//! [`SessionRegistry`] maps session ids to the transport serving them and
//! the last time the client was heard from. [`Reaper`] sweeps it on a timer
//! and closes whatever has gone quiet.
//!
//! Both are plain objects: create one registry per server, share it through
//! an `Arc`, and hand the same `Arc` to the reaper.

pub mod reaper;
pub mod registry;

pub use reaper::{Reaper, ReaperConfig};
pub use registry::{SessionInfo, SessionRegistry};

use std::fmt;

use thiserror::Error;

/// Wire protocol a session's transport speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Request/response streaming HTTP (`/mcp`, `/http`)
    StreamableHttp,
    /// Legacy long-lived event stream plus message POSTs (`/sse`, `/messages`)
    Sse,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::StreamableHttp => "streamable-http",
            TransportKind::Sse => "sse",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the registry needs from a transport.
///
/// `close` is synchronous and idempotent so the registry can call it while
/// holding its lock.
pub trait SessionTransport: Send + Sync + 'static {
    fn kind(&self) -> TransportKind;

    fn close(&self);

    fn is_closed(&self) -> bool;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Session {0} is already registered")]
    DuplicateSession(String),

    #[error("Invalid reaper configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
