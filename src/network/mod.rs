//! Network Layer
//!
//! WebSocket server, wire protocol and request routing.
//! All game rules live in `game/`; this layer only validates and translates.

pub mod protocol;
pub mod router;
pub mod server;

pub use protocol::{
    ClientMessage, ServerMessage, GuessRequest, FinishRequest, GameStartedInfo,
    GuessResultInfo, LetterState, ServerError, ErrorCode,
};
pub use router::{Router, RequestError, ValidatedGuess};
pub use server::{GameServer, ServerConfig, ConfigError, GameServerError};
