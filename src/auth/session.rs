//! Login sessions keyed by random cookie tokens.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Session {
    username: String,
    issued_at: Instant,
}

/// Thread-safe session table.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Start a session for `username` and return its token.
    pub fn issue(&self, username: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.inner.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                issued_at: Instant::now(),
            },
        );
        token
    }

    /// The username behind `token`, if the session is live.
    pub fn validate(&self, token: &str) -> Option<String> {
        let session = self.inner.get(token)?.value().clone();
        if session.issued_at.elapsed() >= self.ttl {
            self.inner.remove(token);
            return None;
        }
        Some(session.username)
    }

    /// End a session. Unknown tokens are ignored.
    pub fn revoke(&self, token: &str) {
        self.inner.remove(token);
    }

    /// Drop expired sessions; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, s| s.issued_at.elapsed() < self.ttl);
        before - self.inner.len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Periodically evict expired sessions until shutdown.
pub async fn purge_periodically(
    sessions: SessionStore,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = sessions.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, active = sessions.len(), "Expired sessions purged");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
