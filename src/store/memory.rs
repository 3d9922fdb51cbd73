//! In-Memory Store
//!
//! Sessions live in a BTreeMap behind an RwLock; each record has its own
//! Mutex. Mutations hold the map read lock while they lock a record, so
//! eviction (which takes the write lock) never removes a record out from
//! under a pending write. Mutations on different sessions run in parallel.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::{AppendOutcome, SessionStore, StoreError};
use crate::game::session::{SessionId, SessionRecord};

/// Process-local session store.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<BTreeMap<SessionId, Arc<Mutex<SessionRecord>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, id: &SessionId) -> Option<Arc<Mutex<SessionRecord>>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, record: SessionRecord) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&record.id) {
            return Err(StoreError::DuplicateSession(record.id));
        }
        sessions.insert(record.id, Arc::new(Mutex::new(record)));
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        match self.entry(id).await {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn append_guess(
        &self,
        id: &SessionId,
        guess: &str,
        max_attempts: usize,
    ) -> Result<Option<AppendOutcome>, StoreError> {
        let sessions = self.sessions.read().await;
        let Some(entry) = sessions.get(id) else {
            return Ok(None);
        };

        let mut record = entry.lock().await;
        if let Some(reason) = record.lock_reason(max_attempts) {
            debug!("Append refused for session {}: {}", id.short(), reason);
            return Ok(Some(AppendOutcome::Locked(reason)));
        }

        record.push_guess(guess.to_string());
        Ok(Some(AppendOutcome::Appended {
            count: record.guesses.len(),
            remaining: record.attempts_remaining(max_attempts),
        }))
    }

    async fn mark_finished(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let sessions = self.sessions.read().await;
        let Some(entry) = sessions.get(id) else {
            return Ok(None);
        };

        let mut record = entry.lock().await;
        record.mark_finished();
        Ok(Some(record.clone()))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.sessions.read().await.len())
    }

    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut sessions = self.sessions.write().await;
        let mut to_remove = Vec::new();

        for (id, entry) in sessions.iter() {
            let record = entry.lock().await;
            if record.updated_at < cutoff {
                to_remove.push(*id);
            }
        }

        for id in &to_remove {
            sessions.remove(id);
        }

        Ok(to_remove.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credential::Credential;
    use crate::game::session::LockReason;

    fn record(byte: u8) -> SessionRecord {
        SessionRecord::new(
            SessionId::new([byte; 16]),
            Credential::new("key").digest(),
            "86-4".into(),
            None,
        )
    }

    #[tokio::test]
    async fn test_insert_and_load() {
        let store = MemoryStore::new();
        store.insert(record(1)).await.unwrap();

        let loaded = store.load(&SessionId::new([1; 16])).await.unwrap().unwrap();
        assert_eq!(loaded.target, "86-4");
        assert!(store.load(&SessionId::new([2; 16])).await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = MemoryStore::new();
        store.insert(record(1)).await.unwrap();
        let result = store.insert(record(1)).await;
        assert!(matches!(result, Err(StoreError::DuplicateSession(_))));
    }

    #[tokio::test]
    async fn test_append_respects_limit() {
        let store = MemoryStore::new();
        let id = SessionId::new([1; 16]);
        store.insert(record(1)).await.unwrap();

        for n in 1..=3 {
            let outcome = store.append_guess(&id, "87-6", 3).await.unwrap();
            assert_eq!(outcome, Some(AppendOutcome::Appended { count: n, remaining: 3 - n }));
        }

        let outcome = store.append_guess(&id, "87-6", 3).await.unwrap();
        assert_eq!(outcome, Some(AppendOutcome::Locked(LockReason::AttemptsExhausted)));
        assert_eq!(store.load(&id).await.unwrap().unwrap().guesses.len(), 3);
    }

    #[tokio::test]
    async fn test_append_after_finish_refused() {
        let store = MemoryStore::new();
        let id = SessionId::new([1; 16]);
        store.insert(record(1)).await.unwrap();

        let finished = store.mark_finished(&id).await.unwrap().unwrap();
        assert!(finished.finished);

        let outcome = store.append_guess(&id, "87-6", 6).await.unwrap();
        assert_eq!(outcome, Some(AppendOutcome::Locked(LockReason::Finished)));
    }

    #[tokio::test]
    async fn test_missing_session() {
        let store = MemoryStore::new();
        let id = SessionId::new([9; 16]);
        assert!(store.append_guess(&id, "87-6", 6).await.unwrap().is_none());
        assert!(store.mark_finished(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evict_idle() {
        let store = MemoryStore::new();
        store.insert(record(1)).await.unwrap();
        store.insert(record(2)).await.unwrap();

        let removed = store.evict_idle(Utc::now() - chrono::Duration::hours(1)).await.unwrap();
        assert_eq!(removed, 0);

        let removed = store.evict_idle(Utc::now() + chrono::Duration::seconds(1)).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_eviction_waits_for_pending_append() {
        let store = Arc::new(MemoryStore::new());
        let id = SessionId::new([1; 16]);
        store.insert(record(1)).await.unwrap();

        // Hold the record so the append parks inside the store
        let entry = store.entry(&id).await.unwrap();
        let held = entry.lock().await;

        let append = {
            let store = store.clone();
            tokio::spawn(async move { store.append_guess(&id, "87-6", 6).await })
        };
        while store.sessions.try_write().is_ok() {
            tokio::task::yield_now().await;
        }

        let evict = {
            let store = store.clone();
            tokio::spawn(async move {
                store.evict_idle(Utc::now() + chrono::Duration::hours(1)).await
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!evict.is_finished());

        drop(held);
        let outcome = append.await.unwrap().unwrap();
        assert_eq!(outcome, Some(AppendOutcome::Appended { count: 1, remaining: 5 }));

        // The appended record is the one eviction then removes
        assert_eq!(evict.await.unwrap().unwrap(), 1);
        assert!(store.load(&id).await.unwrap().is_none());
    }
}
