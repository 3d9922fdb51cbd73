//! Session Records
//!
//! The durable state of one game: hidden target, credential digest,
//! guess history and finished flag.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::core::credential::CredentialDigest;

// =============================================================================
// SESSION ID
// =============================================================================

/// Unique session identifier (UUID as bytes).
///
/// Implements Ord so sessions can live in a BTreeMap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub [u8; 16]);

impl SessionId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Allocate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().into_bytes())
    }

    /// Parse from a UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s)
            .ok()
            .map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }

    /// Short hex prefix for logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_uuid_string())
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Lifecycle status, derived from guess count and finished flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No guesses yet.
    Created,
    /// Some guesses, attempts remaining.
    InProgress,
    /// Attempt limit reached without finishing.
    Exhausted,
    /// Finished by the player.
    Finished,
}

/// Why a session refuses guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    /// Session was finished.
    Finished,
    /// All attempts used.
    AttemptsExhausted,
}

impl std::fmt::Display for LockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockReason::Finished => f.write_str("game is already finished"),
            LockReason::AttemptsExhausted => f.write_str("no attempts left"),
        }
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// Persisted state of one game session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier.
    pub id: SessionId,
    /// Digest of the credential issued at creation.
    pub credential: CredentialDigest,
    /// Hidden target expression.
    pub target: String,
    /// Target provider reference for the target, if any.
    pub target_ref: Option<u64>,
    /// Guesses in submission order.
    pub guesses: Vec<String>,
    /// Set once, never cleared.
    pub finished: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a fresh record with no guesses.
    pub fn new(
        id: SessionId,
        credential: CredentialDigest,
        target: String,
        target_ref: Option<u64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            credential,
            target,
            target_ref,
            guesses: Vec::new(),
            finished: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Current status under the given attempt limit.
    pub fn status(&self, max_attempts: usize) -> SessionStatus {
        if self.finished {
            SessionStatus::Finished
        } else if self.guesses.len() >= max_attempts {
            SessionStatus::Exhausted
        } else if self.guesses.is_empty() {
            SessionStatus::Created
        } else {
            SessionStatus::InProgress
        }
    }

    /// Reason this session refuses guesses, if it does.
    pub fn lock_reason(&self, max_attempts: usize) -> Option<LockReason> {
        match self.status(max_attempts) {
            SessionStatus::Finished => Some(LockReason::Finished),
            SessionStatus::Exhausted => Some(LockReason::AttemptsExhausted),
            _ => None,
        }
    }

    /// Attempts left under the given limit.
    pub fn attempts_remaining(&self, max_attempts: usize) -> usize {
        max_attempts.saturating_sub(self.guesses.len())
    }

    /// Append a guess. Callers check the lock first.
    pub(crate) fn push_guess(&mut self, guess: String) {
        self.guesses.push(guess);
        self.updated_at = Utc::now();
    }

    /// Set the finished flag.
    pub(crate) fn mark_finished(&mut self) {
        if !self.finished {
            self.finished = true;
            self.updated_at = Utc::now();
        }
    }
}
