//! In-memory sessions keyed by the `sessionid` cookie.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// Name of the cookie carrying the session identifier.
pub const SESSION_COOKIE: &str = "sessionid";

/// Default idle lifetime of a session (2 weeks).
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Generates a new opaque session identifier.
pub fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    data: Mutex<HashMap<String, Value>>,
}

/// A server-side attribute bag shared by all requests presenting the same
/// session cookie.
///
/// Cloning is cheap; clones refer to the same underlying bag.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    fn new(id: &str) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: id.to_string(),
                data: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns the session identifier.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Gets a value, deserialized into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_value(key)
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Gets the raw JSON value stored under `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        lock(&self.inner.data).get(key).cloned()
    }

    /// Stores a value, replacing any previous one.
    ///
    /// Values that cannot be represented as JSON are ignored.
    pub fn set<T: Serialize>(&self, key: impl Into<String>, value: T) {
        if let Ok(value) = serde_json::to_value(value) {
            lock(&self.inner.data).insert(key.into(), value);
        }
    }

    /// Removes a value, returning it if present.
    pub fn remove(&self, key: &str) -> Option<Value> {
        lock(&self.inner.data).remove(key)
    }

    /// Returns whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.inner.data).contains_key(key)
    }

    /// Returns the stored keys.
    pub fn keys(&self) -> Vec<String> {
        lock(&self.inner.data).keys().cloned().collect()
    }

    /// Returns whether both handles refer to the same session.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

#[derive(Debug)]
struct StoredSession {
    session: Session,
    last_access: Instant,
}

/// Process-wide session storage.
///
/// Sessions live in memory only. Entries idle for longer than the
/// configured limit are discarded when looked up or swept with
/// [`SessionStore::clear_expired`].
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, StoredSession>>,
    max_idle: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Creates an empty store with the default idle limit.
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Creates an empty store with a custom idle limit.
    pub fn with_max_idle(max_idle: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_idle,
        }
    }

    /// Returns the idle limit.
    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    /// Looks up a live session without creating one.
    pub fn get(&self, id: &str) -> Option<Session> {
        let now = Instant::now();
        let mut sessions = lock(&self.sessions);
        let expired = match sessions.get_mut(id) {
            Some(stored) if now.duration_since(stored.last_access) <= self.max_idle => {
                stored.last_access = now;
                return Some(stored.session.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!(session_id = %id, "Session expired");
            sessions.remove(id);
        }
        None
    }

    /// Returns the session for `id`, creating an empty one if needed.
    ///
    /// The check and the insert happen under one lock, so concurrent
    /// callers for the same id always share a single session.
    pub fn get_or_create(&self, id: &str) -> Session {
        let now = Instant::now();
        let mut sessions = lock(&self.sessions);

        if let Some(stored) = sessions.get_mut(id) {
            if now.duration_since(stored.last_access) <= self.max_idle {
                stored.last_access = now;
                return stored.session.clone();
            }
            debug!(session_id = %id, "Session expired, starting over");
        }

        let session = Session::new(id);
        sessions.insert(
            id.to_string(),
            StoredSession {
                session: session.clone(),
                last_access: now,
            },
        );
        debug!(session_id = %id, "Session created");
        session
    }

    /// Removes a session.
    pub fn remove(&self, id: &str) -> Option<Session> {
        lock(&self.sessions).remove(id).map(|stored| stored.session)
    }

    /// Drops every session idle for longer than the limit.
    ///
    /// Returns the number of sessions removed.
    pub fn clear_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = lock(&self.sessions);
        let before = sessions.len();
        sessions.retain(|_, stored| now.duration_since(stored.last_access) <= self.max_idle);
        before - sessions.len()
    }

    /// Returns the number of stored sessions.
    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    /// Returns whether the store is empty.
    pub fn is_empty(&self) -> bool {
        lock(&self.sessions).is_empty()
    }
}
