//! Session Persistence
//!
//! The store is the only place session state is mutated. Each mutating
//! operation is atomic per session key: `append_guess` checks the finished
//! flag and attempt count and appends under the same per-session lock that
//! `mark_finished` takes. Different sessions never contend.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::game::session::{LockReason, SessionId, SessionRecord};

pub use memory::MemoryStore;

/// Result of a compare-and-append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Guess recorded.
    Appended {
        /// Guesses recorded after the append.
        count: usize,
        /// Attempts left under the limit passed to the append.
        remaining: usize,
    },
    /// Guess refused; nothing was written.
    Locked(LockReason),
}

/// Store errors.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A record with this id already exists.
    #[error("session {0} already exists")]
    DuplicateSession(SessionId),

    /// Backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Durable session storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new record.
    async fn insert(&self, record: SessionRecord) -> Result<(), StoreError>;

    /// Load a snapshot of a record.
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError>;

    /// Append a guess if the session is unfinished and has fewer than
    /// `max_attempts` guesses, atomically with respect to every other
    /// mutation of the same session.
    ///
    /// Returns `Ok(None)` if the session does not exist.
    async fn append_guess(
        &self,
        id: &SessionId,
        guess: &str,
        max_attempts: usize,
    ) -> Result<Option<AppendOutcome>, StoreError>;

    /// Set the finished flag and return the updated record.
    ///
    /// Returns `Ok(None)` if the session does not exist.
    async fn mark_finished(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError>;

    /// Number of stored sessions.
    async fn count(&self) -> Result<usize, StoreError>;

    /// Drop sessions not updated since `cutoff`. Returns how many were removed.
    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}
