//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON objects tagged with a snake_case `type` field.

use serde::{Serialize, Deserialize};

use crate::core::feedback::{Mark, Verdict};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a new game.
    StartGame,

    /// Submit a guess.
    Guess(GuessRequest),

    /// Give up or close the game and reveal the answer.
    FinishGame(FinishRequest),

    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

/// Guess submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuessRequest {
    /// Session id (UUID string).
    pub id: String,
    /// Session credential.
    pub key: String,
    /// Guessed expression.
    pub guess: String,
}

/// Finish request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishRequest {
    /// Session id (UUID string).
    pub id: String,
    /// Session credential.
    pub key: String,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A game was created.
    GameStarted(GameStartedInfo),

    /// Feedback for a guess.
    GuessResult(GuessResultInfo),

    /// Game finished; answer revealed.
    GameFinished { answer: String },

    /// Pong response.
    Pong { timestamp: u64, server_time: u64 },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// New game details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStartedInfo {
    /// Session id (UUID string).
    pub id: String,
    /// Credential to present with every later request.
    pub key: String,
    /// Corpus reference of the hidden expression.
    pub word_id: Option<u64>,
    /// Value the hidden expression evaluates to.
    pub result: i64,
    /// Characters per expression.
    pub length: usize,
    /// Guesses allowed.
    pub max_attempts: usize,
}

/// Feedback for one guess position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterState {
    /// The guessed character.
    pub letter: char,
    /// Its classification.
    pub state: Mark,
}

impl From<Verdict> for LetterState {
    fn from(v: Verdict) -> Self {
        Self { letter: v.ch, state: v.mark }
    }
}

/// Guess feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuessResultInfo {
    /// One entry per guess character, in guess order.
    pub verdicts: Vec<LetterState>,
    /// Whether every position is correct.
    pub solved: bool,
    /// Guesses still allowed in this session.
    pub attempts_remaining: usize,
}

/// Server error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Build an error message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Message could not be parsed.
    InvalidInput,
    /// Guess has the wrong length or is not a valid expression.
    InvalidExpression,
    /// Unknown session or wrong credential.
    AuthFailed,
    /// Session is finished or out of attempts.
    SessionLocked,
    /// Server overloaded.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Shorthand for an error message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError::new(code, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_guess_request() {
        let json = r#"{"type":"guess","id":"abc","key":"k","guess":"87-6"}"#;
        match ClientMessage::from_json(json).unwrap() {
            ClientMessage::Guess(req) => {
                assert_eq!(req.id, "abc");
                assert_eq!(req.key, "k");
                assert_eq!(req.guess, "87-6");
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_parse_unit_and_struct_variants() {
        assert!(matches!(
            ClientMessage::from_json(r#"{"type":"start_game"}"#).unwrap(),
            ClientMessage::StartGame
        ));
        assert!(matches!(
            ClientMessage::from_json(r#"{"type":"ping","timestamp":5}"#).unwrap(),
            ClientMessage::Ping { timestamp: 5 }
        ));
        assert!(matches!(
            ClientMessage::from_json(r#"{"type":"finish_game","id":"a","key":"b"}"#).unwrap(),
            ClientMessage::FinishGame(_)
        ));
    }

    #[test]
    fn test_missing_field_rejected() {
        assert!(ClientMessage::from_json(r#"{"type":"guess","id":"abc","key":"k"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn test_guess_result_wire_shape() {
        let msg = ServerMessage::GuessResult(GuessResultInfo {
            verdicts: vec![
                LetterState::from(Verdict::new('8', Mark::Correct)),
                LetterState::from(Verdict::new('7', Mark::Absent)),
            ],
            solved: false,
            attempts_remaining: 5,
        });

        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "guess_result");
        assert_eq!(value["verdicts"][0]["letter"], "8");
        assert_eq!(value["verdicts"][0]["state"], "correct");
        assert_eq!(value["verdicts"][1]["state"], "absent");
        assert_eq!(value["attempts_remaining"], 5);
    }

    #[test]
    fn test_error_codes() {
        let msg = ServerMessage::error(ErrorCode::SessionLocked, "Game is already finished!");
        let json = msg.to_json().unwrap();
        assert!(json.contains("session_locked"));

        let msg = ServerMessage::error(ErrorCode::AuthFailed, "nope");
        assert!(msg.to_json().unwrap().contains("auth_failed"));
    }

    #[test]
    fn test_game_started_roundtrip() {
        let msg = ServerMessage::GameStarted(GameStartedInfo {
            id: "id".into(),
            key: "key".into(),
            word_id: Some(4),
            result: 1916,
            length: 8,
            max_attempts: 6,
        });

        let parsed = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        if let ServerMessage::GameStarted(info) = parsed {
            assert_eq!(info.result, 1916);
            assert_eq!(info.word_id, Some(4));
        } else {
            panic!("Wrong message type");
        }
    }
}
