//! Game Service
//!
//! Session lifecycle: create, guess, finish. Credential and lock checks
//! happen here; atomicity of the check-and-append is delegated to the
//! store's per-session primitives.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::core::credential::Credential;
use crate::core::feedback::{self, FeedbackError, Verdict};
use crate::game::session::{LockReason, SessionId, SessionRecord};
use crate::store::{AppendOutcome, SessionStore, StoreError};
use crate::{EXPRESSION_LENGTH, MAX_ATTEMPTS};

/// Game rules.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Guesses allowed per session.
    pub max_attempts: usize,
    /// Characters per target and guess.
    pub expression_length: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            expression_length: EXPRESSION_LENGTH,
        }
    }
}

/// Returned once when a session is created.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    /// New session id.
    pub id: SessionId,
    /// Secret the player must present on every later request.
    pub credential: Credential,
}

/// Feedback for an accepted guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessFeedback {
    /// One verdict per guess character.
    pub verdicts: Vec<Verdict>,
    /// Guesses still allowed after this one.
    pub attempts_remaining: usize,
}

/// Returned by finishing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedSession {
    /// The revealed target.
    pub target: String,
    /// Guesses recorded before finishing.
    pub attempts: usize,
}

/// Session operation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// Unknown session or wrong credential. The two are not distinguished.
    #[error("unknown session or invalid credential")]
    Unauthorized,

    /// Session refuses further guesses.
    #[error("session is locked: {0}")]
    Locked(LockReason),

    /// Guess shape did not match the target; the caller skipped validation.
    #[error("precondition violated: {0}")]
    PreconditionViolation(#[from] FeedbackError),

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Game session service.
pub struct GameService {
    store: Arc<dyn SessionStore>,
    config: GameConfig,
}

impl GameService {
    /// Create a service over a store.
    pub fn new(store: Arc<dyn SessionStore>, config: GameConfig) -> Self {
        Self { store, config }
    }

    /// Game rules in effect.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Start a session for the given target.
    #[instrument(skip(self, target))]
    pub async fn create_session(
        &self,
        target: String,
        target_ref: Option<u64>,
    ) -> Result<CreatedSession, SessionError> {
        let id = SessionId::generate();
        let credential = Credential::generate();
        let digest = credential.digest();

        self.store
            .insert(SessionRecord::new(id, digest, target, target_ref))
            .await?;

        info!("Session {} created (credential {})", id.short(), digest.fingerprint());
        Ok(CreatedSession { id, credential })
    }

    /// Submit a guess and return its feedback.
    #[instrument(skip(self, credential, guess), fields(session = %id.short()))]
    pub async fn submit_guess(
        &self,
        id: &SessionId,
        credential: &Credential,
        guess: &str,
    ) -> Result<GuessFeedback, SessionError> {
        let record = self.authorize(id, credential).await?;

        if let Some(reason) = record.lock_reason(self.config.max_attempts) {
            debug!("Guess rejected: {}", reason);
            return Err(SessionError::Locked(reason));
        }

        let verdicts = feedback::evaluate(&record.target, guess)?;

        match self.store.append_guess(id, guess, self.config.max_attempts).await? {
            Some(AppendOutcome::Appended { count, remaining }) => {
                debug!(
                    "Guess {}/{} recorded: {}",
                    count,
                    self.config.max_attempts,
                    feedback::render_marks(&verdicts)
                );
                Ok(GuessFeedback { verdicts, attempts_remaining: remaining })
            }
            // Lost a race with another guess or a finish on this session
            Some(AppendOutcome::Locked(reason)) => {
                debug!("Guess rejected at append: {}", reason);
                Err(SessionError::Locked(reason))
            }
            None => Err(SessionError::Unauthorized),
        }
    }

    /// Finish a session and reveal its target. Finishing twice is allowed.
    #[instrument(skip(self, credential), fields(session = %id.short()))]
    pub async fn finish_session(
        &self,
        id: &SessionId,
        credential: &Credential,
    ) -> Result<FinishedSession, SessionError> {
        self.authorize(id, credential).await?;

        let record = self
            .store
            .mark_finished(id)
            .await?
            .ok_or(SessionError::Unauthorized)?;

        info!("Session {} finished after {} guesses", id.short(), record.guesses.len());
        Ok(FinishedSession {
            target: record.target,
            attempts: record.guesses.len(),
        })
    }

    /// Number of stored sessions.
    pub async fn session_count(&self) -> Result<usize, SessionError> {
        Ok(self.store.count().await?)
    }

    /// Drop sessions idle since before `cutoff`.
    pub async fn evict_idle(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<usize, SessionError> {
        Ok(self.store.evict_idle(cutoff).await?)
    }

    async fn authorize(
        &self,
        id: &SessionId,
        credential: &Credential,
    ) -> Result<SessionRecord, SessionError> {
        match self.store.load(id).await? {
            Some(record) if record.credential.verify(credential) => Ok(record),
            Some(_) => {
                warn!("Credential mismatch for session {}", id.short());
                Err(SessionError::Unauthorized)
            }
            None => {
                warn!("Unknown session {}", id.short());
                Err(SessionError::Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feedback::Mark;
    use crate::store::MemoryStore;

    fn create_test_service() -> GameService {
        GameService::new(Arc::new(MemoryStore::new()), GameConfig::default())
    }

    #[tokio::test]
    async fn test_reference_guess() {
        let service = create_test_service();
        let session = service.create_session("86-4".into(), None).await.unwrap();

        let result = service
            .submit_guess(&session.id, &session.credential, "87-6")
            .await
            .unwrap();
        let marks: Vec<Mark> = result.verdicts.iter().map(|v| v.mark).collect();
        assert_eq!(marks, vec![Mark::Correct, Mark::Absent, Mark::Correct, Mark::Present]);
        assert_eq!(result.attempts_remaining, MAX_ATTEMPTS - 1);
    }

    #[tokio::test]
    async fn test_seventh_guess_locked() {
        let service = create_test_service();
        let session = service.create_session("86-4".into(), None).await.unwrap();

        for _ in 0..MAX_ATTEMPTS {
            service
                .submit_guess(&session.id, &session.credential, "87-6")
                .await
                .unwrap();
        }

        let result = service
            .submit_guess(&session.id, &session.credential, "86-4")
            .await;
        assert!(matches!(result, Err(SessionError::Locked(LockReason::AttemptsExhausted))));
    }

    #[tokio::test]
    async fn test_finish_locks_and_reveals() {
        let service = create_test_service();
        let session = service.create_session("86-4".into(), Some(11)).await.unwrap();

        service
            .submit_guess(&session.id, &session.credential, "87-6")
            .await
            .unwrap();

        let finished = service
            .finish_session(&session.id, &session.credential)
            .await
            .unwrap();
        assert_eq!(finished.target, "86-4");
        assert_eq!(finished.attempts, 1);

        let result = service
            .submit_guess(&session.id, &session.credential, "86-4")
            .await;
        assert!(matches!(result, Err(SessionError::Locked(LockReason::Finished))));

        // Finishing again re-reveals the same target
        let again = service
            .finish_session(&session.id, &session.credential)
            .await
            .unwrap();
        assert_eq!(again, finished);
    }

    #[tokio::test]
    async fn test_finish_exhausted_session() {
        let service = create_test_service();
        let session = service.create_session("86-4".into(), None).await.unwrap();
        for _ in 0..MAX_ATTEMPTS {
            service
                .submit_guess(&session.id, &session.credential, "12+3")
                .await
                .unwrap();
        }

        let finished = service
            .finish_session(&session.id, &session.credential)
            .await
            .unwrap();
        assert_eq!(finished.attempts, MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_wrong_credential_rejected() {
        let service = create_test_service();
        let session = service.create_session("86-4".into(), None).await.unwrap();
        let wrong = Credential::new("not-the-key");

        let guess = service.submit_guess(&session.id, &wrong, "87-6").await;
        assert!(matches!(guess, Err(SessionError::Unauthorized)));

        let finish = service.finish_session(&session.id, &wrong).await;
        assert!(matches!(finish, Err(SessionError::Unauthorized)));

        // Nothing was mutated
        let result = service
            .submit_guess(&session.id, &session.credential, "86-4")
            .await
            .unwrap();
        assert!(feedback::is_solved(&result.verdicts));
        assert_eq!(result.attempts_remaining, MAX_ATTEMPTS - 1);
    }

    #[tokio::test]
    async fn test_wrong_credential_on_locked_session() {
        let service = create_test_service();
        let wrong = Credential::new("not-the-key");

        let finished = service.create_session("86-4".into(), None).await.unwrap();
        service
            .finish_session(&finished.id, &finished.credential)
            .await
            .unwrap();

        let exhausted = service.create_session("86-4".into(), None).await.unwrap();
        for _ in 0..MAX_ATTEMPTS {
            service
                .submit_guess(&exhausted.id, &exhausted.credential, "87-6")
                .await
                .unwrap();
        }

        // Credential is checked before the lock, so locked sessions leak nothing
        for id in [finished.id, exhausted.id] {
            let guess = service.submit_guess(&id, &wrong, "86-4").await;
            assert!(matches!(guess, Err(SessionError::Unauthorized)));

            let finish = service.finish_session(&id, &wrong).await;
            assert!(matches!(finish, Err(SessionError::Unauthorized)));
        }
    }

    #[tokio::test]
    async fn test_unknown_session_rejected() {
        let service = create_test_service();
        let id = SessionId::generate();
        let result = service
            .submit_guess(&id, &Credential::generate(), "87-6")
            .await;
        assert!(matches!(result, Err(SessionError::Unauthorized)));

        let result = service.finish_session(&id, &Credential::generate()).await;
        assert!(matches!(result, Err(SessionError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_length_mismatch_not_recorded() {
        let service = create_test_service();
        let session = service.create_session("86-4".into(), None).await.unwrap();

        let result = service
            .submit_guess(&session.id, &session.credential, "86-41")
            .await;
        assert!(matches!(result, Err(SessionError::PreconditionViolation(_))));

        let finished = service
            .finish_session(&session.id, &session.credential)
            .await
            .unwrap();
        assert_eq!(finished.attempts, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_guesses_respect_limit() {
        let service = Arc::new(create_test_service());
        let session = service.create_session("86-4".into(), None).await.unwrap();
        let extra = 10;

        let handles: Vec<_> = (0..MAX_ATTEMPTS + extra)
            .map(|_| {
                let service = service.clone();
                let id = session.id;
                let credential = session.credential.clone();
                tokio::spawn(async move {
                    service.submit_guess(&id, &credential, "87-6").await
                })
            })
            .collect();

        let mut accepted = 0;
        let mut locked = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(SessionError::Locked(_)) => locked += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(accepted, MAX_ATTEMPTS);
        assert_eq!(locked, extra);

        let finished = service
            .finish_session(&session.id, &session.credential)
            .await
            .unwrap();
        assert_eq!(finished.attempts, MAX_ATTEMPTS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_finish_races_guesses() {
        for _ in 0..20 {
            let service = Arc::new(create_test_service());
            let session = service.create_session("86-4".into(), None).await.unwrap();
            let guesses = 12;

            let finish = {
                let service = service.clone();
                let id = session.id;
                let credential = session.credential.clone();
                tokio::spawn(async move { service.finish_session(&id, &credential).await })
            };
            let handles: Vec<_> = (0..guesses)
                .map(|_| {
                    let service = service.clone();
                    let id = session.id;
                    let credential = session.credential.clone();
                    tokio::spawn(async move {
                        service.submit_guess(&id, &credential, "87-6").await
                    })
                })
                .collect();

            let mut accepted = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(_) => accepted += 1,
                    Err(SessionError::Locked(_)) => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            let finished = finish.await.unwrap().unwrap();

            assert!(accepted <= MAX_ATTEMPTS);
            assert_eq!(finished.target, "86-4");

            // Nothing was appended once the session finished
            assert_eq!(finished.attempts, accepted);

            let late = service
                .submit_guess(&session.id, &session.credential, "86-4")
                .await;
            assert!(matches!(late, Err(SessionError::Locked(LockReason::Finished))));

            let again = service
                .finish_session(&session.id, &session.credential)
                .await
                .unwrap();
            assert_eq!(again, finished);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sessions_are_independent() {
        let service = Arc::new(create_test_service());
        let a = service.create_session("86-4".into(), None).await.unwrap();
        let b = service.create_session("12+3".into(), None).await.unwrap();

        service.finish_session(&a.id, &a.credential).await.unwrap();

        let result = service.submit_guess(&b.id, &b.credential, "12+3").await.unwrap();
        assert!(feedback::is_solved(&result.verdicts));

        // Credentials are not interchangeable
        let cross = service.submit_guess(&b.id, &a.credential, "12+3").await;
        assert!(matches!(cross, Err(SessionError::Unauthorized)));
        assert_eq!(service.session_count().await.unwrap(), 2);
    }
}
