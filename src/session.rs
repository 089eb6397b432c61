use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// The authenticated identity held by the client: an opaque bearer token plus
/// the cached profile fields returned by the gateway at login time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

/// Persistence boundary for the session.
///
/// No expiry logic lives here; a session survives until it is overwritten,
/// explicitly cleared, or invalidated by a failed identity probe.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The stored session, or `None` if absent.
    async fn current(&self) -> Option<Session>;

    /// Persist `session`, overwriting any prior one.
    async fn save(&self, session: Session);

    /// Remove all stored fields. Subsequent `current()` calls return `None`.
    async fn clear(&self);
}

/// In-memory store, used in tests and wherever persistence is not wanted.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn current(&self) -> Option<Session> {
        self.inner.read().await.clone()
    }

    async fn save(&self, session: Session) {
        *self.inner.write().await = Some(session);
    }

    async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

/// On-disk JSON layout. Flat string keys, matching what earlier client
/// revisions stored: `token`, `username`, `email`, `userId`, plus `user`
/// holding the serialized full profile.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
    username: String,
    email: String,
    #[serde(rename = "userId")]
    user_id: Uuid,
    user: String,
}

/// File-backed store so a session survives process restarts.
///
/// Storage is treated as best-effort: write failures are logged and
/// swallowed, and an unreadable or malformed file reads as "no session".
#[derive(Clone)]
pub struct FileSessionStore {
    path: Arc<PathBuf>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Arc::new(path.into()) }
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn current(&self) -> Option<Session> {
        let bytes = match tokio::fs::read(self.path.as_ref()).await {
            Ok(b) => b,
            Err(_) => return None,
        };
        match serde_json::from_slice::<StoredSession>(&bytes) {
            Ok(s) => Some(Session {
                token: s.token,
                user_id: s.user_id,
                username: s.username,
                email: s.email,
            }),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session file is malformed; ignoring");
                None
            }
        }
    }

    async fn save(&self, session: Session) {
        let profile = serde_json::json!({
            "id": session.user_id,
            "username": session.username.clone(),
            "email": session.email.clone(),
        });
        let stored = StoredSession {
            token: session.token,
            username: session.username,
            email: session.email,
            user_id: session.user_id,
            user: profile.to_string(),
        };
        let content = match serde_json::to_vec_pretty(&stored) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "failed to serialize session");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(self.path.as_ref(), &content).await {
            warn!(path = %self.path.display(), error = %e, "failed to write session file");
        } else {
            debug!(path = %self.path.display(), "session saved");
        }
    }

    async fn clear(&self) {
        if let Err(e) = tokio::fs::remove_file(self.path.as_ref()).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove session file");
            }
        }
    }
}
