//! Core primitives.
//!
//! Pure building blocks with no I/O: guess feedback, expression
//! evaluation, credential digests and target selection randomness.

pub mod feedback;
pub mod expression;
pub mod credential;
pub mod rng;

// Re-export core types
pub use feedback::{evaluate, Mark, Verdict, FeedbackError};
pub use credential::{Credential, CredentialDigest};
pub use rng::SelectionRng;
