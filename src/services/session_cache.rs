//! Session-scoped cache.
//!
//! Values live in the arena owned by each [`SessionContext`]; this facade only
//! routes calls and keeps weak references for diagnostics. When the last clone
//! of a session handle is dropped its cached values go with it, so callers
//! never need to tear sessions down by hand. [`SessionScopedCache::clear_session`]
//! exists for immediate cleanup such as logout.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::models::session::{SessionContext, WeakSessionContext};

/// Session cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Sessions that have cached something and are still referenced somewhere.
    pub live_sessions: usize,
}

/// Cache keyed by session handle, then by string key
#[derive(Debug, Default)]
pub struct SessionScopedCache {
    sessions: Mutex<Vec<WeakSessionContext>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SessionScopedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached value of type `T`
    ///
    /// A value stored under `key` with a different type is reported as a miss.
    pub fn get<T>(&self, session: &SessionContext, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let value = session
            .arena()
            .get(key)
            .and_then(|entry| entry.value().downcast_ref::<T>().cloned());

        match value {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a value for this session only
    pub fn set<T>(&self, session: &SessionContext, key: &str, value: T)
    where
        T: Send + Sync + 'static,
    {
        if session.arena().is_empty() {
            self.register(session);
        }
        session.arena().insert(key.to_string(), Box::new(value));
    }

    pub fn has(&self, session: &SessionContext, key: &str) -> bool {
        session.arena().contains_key(key)
    }

    pub fn delete(&self, session: &SessionContext, key: &str) -> bool {
        session.arena().remove(key).is_some()
    }

    /// Drop every value cached for the session right away
    pub fn clear_session(&self, session: &SessionContext) -> usize {
        let removed = session.arena().len();
        session.arena().clear();
        debug!(
            "Cleared {} cached values for session {}",
            removed,
            session.session_id()
        );
        removed
    }

    pub fn entry_count(&self, session: &SessionContext) -> usize {
        session.arena().len()
    }

    /// Number of sessions with cached values that are still referenced
    pub fn live_sessions(&self) -> usize {
        let mut sessions = self.sessions.lock();
        sessions.retain(WeakSessionContext::is_alive);
        sessions.len()
    }

    pub fn stats(&self) -> SessionCacheStats {
        SessionCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            live_sessions: self.live_sessions(),
        }
    }

    fn register(&self, session: &SessionContext) {
        let mut sessions = self.sessions.lock();
        sessions.retain(WeakSessionContext::is_alive);
        let known = sessions
            .iter()
            .filter_map(WeakSessionContext::upgrade)
            .any(|s| s.same_session(session));
        if !known {
            sessions.push(session.downgrade());
        }
    }
}
