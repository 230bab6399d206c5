use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::errors::{WebScoutError, WebScoutResult};
use crate::explorer::state::ExplorationSession;

/// Owned handle to one session: the session body behind its own async lock
/// plus the stop flag the run loop polls between iterations.
#[derive(Clone)]
pub struct SessionHandle {
    pub session: Arc<AsyncMutex<ExplorationSession>>,
    pub stop: Arc<AtomicBool>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl SessionHandle {
    fn new(session: ExplorationSession) -> Self {
        Self {
            session: Arc::new(AsyncMutex::new(session)),
            stop: Arc::new(AtomicBool::new(false)),
            created_at: chrono::Utc::now(),
        }
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Thread-safe registry of live sessions. Hands out owned handles; the
/// per-session state itself is only ever touched through the handle's lock,
/// so concurrent loops never share mutable session state.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: ExplorationSession) -> SessionHandle {
        let id = session.session_id.clone();
        let handle = SessionHandle::new(session);
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .insert(id, handle.clone());
        handle
    }

    pub fn get(&self, session_id: &str) -> WebScoutResult<SessionHandle> {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .get(session_id)
            .cloned()
            .ok_or_else(|| WebScoutError::SessionNotFound(session_id.to_string()))
    }

    pub fn remove(&self, session_id: &str) -> WebScoutResult<SessionHandle> {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .remove(session_id)
            .ok_or_else(|| WebScoutError::SessionNotFound(session_id.to_string()))
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop terminal sessions older than the retention window. Live sessions
    /// are never swept, however old.
    pub async fn sweep(&self, retention: chrono::Duration) -> usize {
        let cutoff = chrono::Utc::now() - retention;
        let handles: Vec<(String, SessionHandle)> = {
            let guard = self.sessions.lock().expect("session store lock poisoned");
            guard
                .iter()
                .map(|(id, handle)| (id.clone(), handle.clone()))
                .collect()
        };

        let mut expired = Vec::new();
        for (id, handle) in handles {
            if handle.created_at > cutoff {
                continue;
            }
            let session = handle.session.lock().await;
            if session.status.is_terminal() {
                expired.push(id);
            }
        }

        let mut guard = self.sessions.lock().expect("session store lock poisoned");
        let mut removed = 0;
        for id in expired {
            if guard.remove(&id).is_some() {
                tracing::debug!(session = %id, "terminal session swept");
                removed += 1;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::state::{CompletionReason, SessionStatus};

    fn session(id: &str) -> ExplorationSession {
        ExplorationSession::new(id.into(), "https://example.com".into())
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let store = SessionStore::new();
        store.insert(session("s1"));

        assert_eq!(store.len(), 1);
        let handle = store.get("s1").unwrap();
        assert_eq!(handle.session.lock().await.session_id, "s1");

        store.remove("s1").unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            store.get("s1"),
            Err(WebScoutError::SessionNotFound(_))
        ));
    }

    #[test]
    fn unknown_id_is_not_found_never_created() {
        let store = SessionStore::new();
        assert!(store.get("ghost").is_err());
        assert!(store.remove("ghost").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn stop_flag_round_trip() {
        let store = SessionStore::new();
        let handle = store.insert(session("s1"));
        assert!(!handle.stop_requested());
        handle.request_stop();
        assert!(handle.stop_requested());
        // The flag is shared with handles fetched later.
        assert!(store.get("s1").unwrap().stop_requested());
    }

    #[tokio::test]
    async fn sweep_only_takes_old_terminal_sessions() {
        let store = SessionStore::new();

        let done = store.insert(session("done"));
        done.session.lock().await.status = SessionStatus::Completed {
            reason: CompletionReason::Exhausted,
        };
        let live = store.insert(session("live"));
        live.session.lock().await.status = SessionStatus::Running;

        // Zero retention: everything currently in the store is "old".
        let removed = store.sweep(chrono::Duration::zero()).await;
        assert_eq!(removed, 1);
        assert!(store.get("done").is_err());
        assert!(store.get("live").is_ok());
    }

    #[tokio::test]
    async fn sweep_respects_retention_window() {
        let store = SessionStore::new();
        let handle = store.insert(session("recent"));
        handle.session.lock().await.status = SessionStatus::Stopped;

        let removed = store.sweep(chrono::Duration::minutes(60)).await;
        assert_eq!(removed, 0);
        assert!(store.get("recent").is_ok());
    }
}
