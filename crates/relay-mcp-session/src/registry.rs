use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{RegistryError, Result, SessionTransport, TransportKind};

struct Session<T> {
    transport: Arc<T>,
    opened_at: DateTime<Utc>,
    created_at: Instant,
    last_activity: Instant,
}

/// Point-in-time view of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: String,
    pub kind: TransportKind,
    /// Wall-clock open time, for reporting
    pub opened_at: DateTime<Utc>,
    pub age: Duration,
    pub idle: Duration,
}

/// Process-wide map of live sessions.
///
/// Every mutation takes the write lock, and a close always shuts the
/// transport down before the entry disappears. A reader therefore sees a
/// session either fully live or not at all.
pub struct SessionRegistry<T: SessionTransport> {
    sessions: RwLock<HashMap<String, Session<T>>>,
}

impl<T: SessionTransport> SessionRegistry<T> {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh session id. Time-ordered UUIDs, so an id is never handed out twice.
    pub fn new_session_id() -> String {
        Uuid::now_v7().to_string()
    }

    pub async fn insert(&self, session_id: &str, transport: Arc<T>) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session_id) {
            return Err(RegistryError::DuplicateSession(session_id.to_string()));
        }

        let now = Instant::now();
        let kind = transport.kind();
        sessions.insert(
            session_id.to_string(),
            Session {
                transport,
                opened_at: Utc::now(),
                created_at: now,
                last_activity: now,
            },
        );
        info!(session_id, %kind, total = sessions.len(), "session registered");
        Ok(())
    }

    /// Look up a session without counting it as activity.
    pub async fn get(&self, session_id: &str) -> Option<Arc<T>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|session| session.transport.clone())
    }

    /// Record inbound activity and return the session's transport.
    pub async fn touch(&self, session_id: &str) -> Option<Arc<T>> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id)?;
        session.last_activity = Instant::now();
        Some(session.transport.clone())
    }

    pub async fn kind_of(&self, session_id: &str) -> Option<TransportKind> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|session| session.transport.kind())
    }

    pub async fn info(&self, session_id: &str) -> Option<SessionInfo> {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|session| SessionInfo {
                session_id: session_id.to_string(),
                kind: session.transport.kind(),
                opened_at: session.opened_at,
                age: now.saturating_duration_since(session.created_at),
                idle: now.saturating_duration_since(session.last_activity),
            })
    }

    /// Close the session's transport and drop the entry.
    ///
    /// Returns `false` if the session was already gone, which makes repeated
    /// closes from the reaper and a disconnect watcher harmless.
    pub async fn close(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(session) => {
                session.transport.close();
                sessions.remove(session_id);
                info!(session_id, total = sessions.len(), "session closed");
                true
            }
            None => {
                debug!(session_id, "close for unknown session ignored");
                false
            }
        }
    }

    /// Close every session idle for longer than `idle_threshold`, and any whose
    /// transport already shut itself down. Returns the evicted ids.
    pub async fn sweep(&self, idle_threshold: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| {
                session.transport.is_closed()
                    || now.saturating_duration_since(session.last_activity) > idle_threshold
            })
            .map(|(session_id, _)| session_id.clone())
            .collect();

        for session_id in &expired {
            if let Some(session) = sessions.get(session_id) {
                session.transport.close();
            }
            sessions.remove(session_id);
            info!(session_id = %session_id, "session expired");
        }

        expired
    }

    /// Shutdown path: close everything. Returns how many sessions were live.
    pub async fn close_all(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        for session in sessions.values() {
            session.transport.close();
        }
        sessions.clear();
        if count > 0 {
            info!(count, "all sessions closed");
        }
        count
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl<T: SessionTransport> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
