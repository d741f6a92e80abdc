use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

use crate::models::{Movie, Preference};

/// Scope of cached batching state: one room/user pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub room: String,
    pub user: String,
}

impl SessionKey {
    pub fn new(room: &str, user: &str) -> Self {
        Self {
            room: room.to_string(),
            user: user.to_string(),
        }
    }
}

/// Per-session cached suggestion state
///
/// Invariants: `cursor <= list.len()`; at most one refresh in flight
/// (`refreshing`); the list is replaced wholesale on refresh, never merged.
#[derive(Default)]
pub struct Session {
    pub list: Vec<Movie>,
    pub cursor: usize,
    pub refreshed_at: Option<Instant>,
    pub refreshing: bool,
    /// Preference snapshot reused across a refresh cycle; cleared when the
    /// user records a new like
    pub cached_prefs: Option<Vec<Preference>>,
}

struct SessionEntry {
    session: Arc<AsyncMutex<Session>>,
    last_access: Instant,
}

/// Owns every live session, evicting the least recently used once the cap
/// is exceeded so memory stays bounded across many rooms and users
pub struct SessionManager {
    max_sessions: usize,
    sessions: Mutex<HashMap<SessionKey, SessionEntry>>,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            max_sessions: max_sessions.max(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session for the key, creating it on first use.
    /// Touches the entry's last-access stamp either way.
    pub fn get_or_create(&self, key: &SessionKey) -> Arc<AsyncMutex<Session>> {
        let mut sessions = self.lock();
        let now = Instant::now();

        if let Some(entry) = sessions.get_mut(key) {
            entry.last_access = now;
            return entry.session.clone();
        }

        let session = Arc::new(AsyncMutex::new(Session::default()));
        sessions.insert(
            key.clone(),
            SessionEntry {
                session: session.clone(),
                last_access: now,
            },
        );

        if sessions.len() > self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(k, _)| *k != key)
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::debug!(room = %oldest.room, user = %oldest.user, "Evicted idle session");
            }
        }

        session
    }

    /// Returns the session only if it already exists
    pub fn peek(&self, key: &SessionKey) -> Option<Arc<AsyncMutex<Session>>> {
        let mut sessions = self.lock();
        sessions.get_mut(key).map(|entry| {
            entry.last_access = Instant::now();
            entry.session.clone()
        })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionKey, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
