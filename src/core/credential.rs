//! Session Credentials
//!
//! A credential is an opaque secret handed to the player when a session
//! starts. Only its SHA-256 digest is stored; presented credentials are
//! hashed and compared digest to digest.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Digest output (256 bits / 32 bytes).
pub type DigestBytes = [u8; 32];

/// Domain separator for credential digests.
const CREDENTIAL_DOMAIN: &[u8] = b"EXPRDLE_CREDENTIAL_V1";

/// Opaque session secret, as issued to and presented by the player.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Issue a fresh random credential.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap a presented credential.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw credential text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digest for storage.
    pub fn digest(&self) -> CredentialDigest {
        let mut hasher = Sha256::new();
        hasher.update(CREDENTIAL_DOMAIN);
        hasher.update(self.0.as_bytes());
        CredentialDigest(hasher.finalize().into())
    }
}

// Never print the secret itself
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// Stored digest of a credential.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDigest(DigestBytes);

impl CredentialDigest {
    /// Check a presented credential against this digest.
    ///
    /// Compares every byte regardless of where the first difference is.
    pub fn verify(&self, presented: &Credential) -> bool {
        let other = presented.digest();
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Short hex fingerprint for logs.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl std::fmt::Debug for CredentialDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialDigest({})", self.fingerprint())
    }
}
