//! # Exprdle Game Server
//!
//! Guess the hidden arithmetic expression in six tries.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     EXPRDLE SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Pure primitives (no I/O)                │
//! │  ├── feedback.rs   - Per-character guess feedback            │
//! │  ├── expression.rs - Expression tokenizer and evaluator      │
//! │  ├── credential.rs - Session credentials and digests         │
//! │  └── rng.rs        - Xorshift128+ target selection           │
//! │                                                              │
//! │  game/             - Session lifecycle                       │
//! │  ├── session.rs    - Session records and status              │
//! │  ├── service.rs    - Create / guess / finish                 │
//! │  ├── target.rs     - Target providers                        │
//! │  └── validator.rs  - Guess validation                        │
//! │                                                              │
//! │  store/            - Session persistence                     │
//! │  └── memory.rs     - In-memory store, per-session locks      │
//! │                                                              │
//! │  network/          - Networking                              │
//! │  ├── server.rs     - WebSocket server                        │
//! │  ├── router.rs     - Request validation and routing          │
//! │  └── protocol.rs   - Message types                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session Guarantees
//!
//! - A session never records more than [`MAX_ATTEMPTS`] guesses, even
//!   under concurrent submissions.
//! - Once finished, a session accepts no further guesses.
//! - The target is only ever returned by finishing the session.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod store;

// Re-export commonly used types
pub use crate::core::feedback::{evaluate, Mark, Verdict};
pub use crate::core::credential::Credential;
pub use game::service::{GameService, GameConfig, SessionError};
pub use game::session::{SessionId, SessionRecord, SessionStatus};
pub use store::{SessionStore, MemoryStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Characters per expression.
pub const EXPRESSION_LENGTH: usize = 8;

/// Guesses allowed per session.
pub const MAX_ATTEMPTS: usize = 6;
