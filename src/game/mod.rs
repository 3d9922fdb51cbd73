//! Game Logic Module
//!
//! ## Module Structure
//!
//! - `session`: Session records, ids and lifecycle status
//! - `service`: Create / guess / finish operations
//! - `target`: Target providers (corpus selection)
//! - `validator`: Guess validation used at the request boundary

pub mod session;
pub mod service;
pub mod target;
pub mod validator;

// Re-export key types
pub use session::{SessionId, SessionRecord, SessionStatus, LockReason};
pub use service::{GameService, GameConfig, CreatedSession, FinishedSession, GuessFeedback, SessionError};
pub use target::{Target, TargetProvider, CorpusTargetProvider, TargetError};
pub use validator::{ExpressionValidator, ArithmeticValidator};
