//! Concurrent session store.
//!
//! ## Design
//!
//! - `DashMap` indexes sessions by id. Its shard locks are held only long
//!   enough to clone an `Arc` out; they are never held while a session is
//!   being worked on.
//! - Each session sits behind its own `parking_lot::Mutex`. That mutex is
//!   the per-id critical section: [`SessionStore::update`] runs the caller's
//!   closure under it, and [`SessionStore::get`] snapshots under it, so a
//!   reader sees a session either before or after an update, never halfway.
//! - Memory is bounded two ways: a soft capacity that evicts the oldest
//!   sessions on insert, and a TTL swept by [`SessionStore::expire_old`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use super::QkdSession;
use crate::config::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};
use crate::transaction::{Transaction, TransactionStatus};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Capacity and lifetime limits.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Soft cap on live sessions. Concurrent inserts may overshoot it by at
    /// most the number of in-flight inserts.
    pub max_sessions: usize,
    /// Age after which [`SessionStore::expire_old`] removes a session.
    pub ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            ttl: DEFAULT_SESSION_TTL,
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// Everything stored under one transaction id.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub session: QkdSession,
    pub status: TransactionStatus,
    /// Present once processing has finished.
    pub transaction: Option<Transaction>,
}

impl SessionEntry {
    /// A freshly keyed session, not yet processed.
    pub fn new(session: QkdSession) -> Self {
        Self {
            session,
            status: TransactionStatus::KeyGenerated,
            transaction: None,
        }
    }
}

struct Slot {
    inserted_at: Instant,
    entry: Mutex<SessionEntry>,
}

/// Errors returned by store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A session with this id already exists.
    #[error("session {0} already exists")]
    DuplicateSession(String),
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Thread-safe map from transaction id to [`SessionEntry`].
pub struct SessionStore {
    sessions: DashMap<String, Arc<Slot>>,
    evicted: AtomicU64,
    config: StoreConfig,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("size", &self.sessions.len())
            .field("config", &self.config)
            .finish()
    }
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            evicted: AtomicU64::new(0),
            config,
        }
    }

    /// Inserts a new session in state `KeyGenerated`.
    ///
    /// Makes room first if the store is at capacity by evicting the oldest
    /// sessions.
    pub fn create(&self, session: QkdSession) -> Result<(), StoreError> {
        if self.sessions.len() >= self.config.max_sessions {
            let excess = self.sessions.len() + 1 - self.config.max_sessions;
            self.evict_oldest(excess);
        }

        let id = session.transaction_id.clone();
        match self.sessions.entry(id) {
            Entry::Occupied(occupied) => Err(StoreError::DuplicateSession(occupied.key().clone())),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Slot {
                    inserted_at: Instant::now(),
                    entry: Mutex::new(SessionEntry::new(session)),
                }));
                Ok(())
            }
        }
    }

    /// Returns a snapshot of the session, or `None` if unknown.
    pub fn get(&self, id: &str) -> Option<SessionEntry> {
        let slot = self.slot(id)?;
        let entry = slot.entry.lock();
        Some(entry.clone())
    }

    /// Runs `f` on the session while holding its lock and returns the
    /// closure's result, or `None` if the id is unknown.
    ///
    /// Updates to the same id are serialized; updates to different ids run
    /// in parallel.
    pub fn update<T>(&self, id: &str, f: impl FnOnce(&mut SessionEntry) -> T) -> Option<T> {
        let slot = self.slot(id)?;
        let mut entry = slot.entry.lock();
        Some(f(&mut *entry))
    }

    /// Returns `true` if a session with this id exists.
    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Removes a session, returning its final snapshot.
    #[cfg(test)]
    pub fn remove(&self, id: &str) -> Option<SessionEntry> {
        let (_, slot) = self.sessions.remove(id)?;
        let entry = slot.entry.lock().clone();
        Some(entry)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Total sessions removed by capacity eviction or TTL expiry.
    pub fn evicted_total(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Removes sessions older than the configured TTL. Returns how many
    /// were removed.
    pub fn expire_old(&self) -> usize {
        let ttl = self.config.ttl;

        // Collect first; never mutate the map while iterating it.
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|slot| slot.value().inserted_at.elapsed() >= ttl)
            .map(|slot| slot.key().clone())
            .collect();

        let mut removed = 0;
        for id in &expired {
            if self.sessions.remove(id).is_some() {
                removed += 1;
            }
        }
        self.evicted.fetch_add(removed as u64, Ordering::Relaxed);

        if removed > 0 {
            debug!(removed, remaining = self.sessions.len(), "expired sessions");
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn slot(&self, id: &str) -> Option<Arc<Slot>> {
        self.sessions.get(id).map(|slot| Arc::clone(slot.value()))
    }

    fn evict_oldest(&self, count: usize) {
        let mut by_age: Vec<(Instant, String)> = self
            .sessions
            .iter()
            .map(|slot| (slot.value().inserted_at, slot.key().clone()))
            .collect();
        by_age.sort_unstable();

        let mut removed = 0u64;
        for (_, id) in by_age.into_iter().take(count) {
            if self.sessions.remove(&id).is_some() {
                removed += 1;
            }
        }
        self.evicted.fetch_add(removed, Ordering::Relaxed);

        warn!(
            removed,
            capacity = self.config.max_sessions,
            "session store full, evicted oldest sessions"
        );
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
