//! Request Router
//!
//! Turns raw client messages into validated, typed requests, calls the
//! game service and maps every outcome to a server message. Guess length
//! and syntax are checked here, once, before the session core sees them.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::core::credential::Credential;
use crate::core::expression;
use crate::core::feedback;
use crate::game::service::{GameService, SessionError};
use crate::game::session::SessionId;
use crate::game::target::TargetProvider;
use crate::game::validator::ExpressionValidator;
use crate::network::protocol::{
    ClientMessage, ServerMessage, GuessRequest, FinishRequest, GameStartedInfo,
    GuessResultInfo, LetterState, ErrorCode,
};

/// A guess that passed boundary validation.
#[derive(Debug, Clone)]
pub struct ValidatedGuess {
    /// Target session.
    pub id: SessionId,
    /// Presented credential.
    pub credential: Credential,
    /// Well-formed guess of the configured length.
    pub guess: String,
}

/// Request validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// Session id is not a UUID. Reported like an unknown session.
    #[error("unknown session or invalid credential")]
    BadSessionId,

    /// Guess has the wrong number of characters.
    #[error("guess must be {expected} characters, got {actual}")]
    WrongLength {
        /// Required length.
        expected: usize,
        /// Submitted length.
        actual: usize,
    },

    /// Guess is not a valid expression.
    #[error("invalid expression")]
    InvalidExpression,
}

impl RequestError {
    /// Wire error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            RequestError::BadSessionId => ErrorCode::AuthFailed,
            RequestError::WrongLength { .. } | RequestError::InvalidExpression => {
                ErrorCode::InvalidExpression
            }
        }
    }
}

fn parse_session_id(raw: &str) -> Result<SessionId, RequestError> {
    SessionId::from_uuid_str(raw).ok_or(RequestError::BadSessionId)
}

impl GuessRequest {
    /// Validate shape and syntax.
    pub fn validate(
        self,
        length: usize,
        validator: &dyn ExpressionValidator,
    ) -> Result<ValidatedGuess, RequestError> {
        let actual = self.guess.chars().count();
        if actual != length {
            return Err(RequestError::WrongLength { expected: length, actual });
        }
        if !validator.is_well_formed(&self.guess) {
            return Err(RequestError::InvalidExpression);
        }

        Ok(ValidatedGuess {
            id: parse_session_id(&self.id)?,
            credential: Credential::new(self.key),
            guess: self.guess,
        })
    }
}

impl FinishRequest {
    /// Parse the session id.
    pub fn validate(self) -> Result<(SessionId, Credential), RequestError> {
        Ok((parse_session_id(&self.id)?, Credential::new(self.key)))
    }
}

/// Map a session error to its wire response.
pub fn session_error_response(err: &SessionError) -> ServerMessage {
    match err {
        SessionError::Unauthorized => ServerMessage::error(ErrorCode::AuthFailed, err.to_string()),
        SessionError::Locked(_) => ServerMessage::error(ErrorCode::SessionLocked, err.to_string()),
        SessionError::PreconditionViolation(_) => {
            ServerMessage::error(ErrorCode::InvalidExpression, err.to_string())
        }
        SessionError::Store(e) => {
            error!("Store failure: {}", e);
            ServerMessage::error(ErrorCode::InternalError, "Internal error")
        }
    }
}

/// Routes client messages to the game service.
pub struct Router {
    service: Arc<GameService>,
    targets: Arc<dyn TargetProvider>,
    validator: Arc<dyn ExpressionValidator>,
}

impl Router {
    /// Create a router.
    pub fn new(
        service: Arc<GameService>,
        targets: Arc<dyn TargetProvider>,
        validator: Arc<dyn ExpressionValidator>,
    ) -> Self {
        Self { service, targets, validator }
    }

    /// The underlying service.
    pub fn service(&self) -> &Arc<GameService> {
        &self.service
    }

    /// Handle one client message and produce the reply.
    pub async fn handle(&self, msg: ClientMessage) -> ServerMessage {
        #[cfg(feature = "debug-tracing")]
        debug!("Routing {:?}", msg);

        match msg {
            ClientMessage::StartGame => self.start_game().await,
            ClientMessage::Guess(req) => self.guess(req).await,
            ClientMessage::FinishGame(req) => self.finish(req).await,
            ClientMessage::Ping { timestamp } => ServerMessage::Pong {
                timestamp,
                server_time: chrono::Utc::now().timestamp_millis().max(0) as u64,
            },
        }
    }

    async fn start_game(&self) -> ServerMessage {
        let target = match self.targets.next_target() {
            Ok(t) => t,
            Err(e) => {
                error!("Target selection failed: {}", e);
                return ServerMessage::error(ErrorCode::InternalError, "Could not start a game");
            }
        };

        let result = match expression::evaluate(&target.expression) {
            Ok(v) => v,
            Err(e) => {
                error!("Target {} does not evaluate: {}", target.reference, e);
                return ServerMessage::error(ErrorCode::InternalError, "Could not start a game");
            }
        };

        match self
            .service
            .create_session(target.expression, Some(target.reference))
            .await
        {
            Ok(created) => {
                let config = self.service.config();
                ServerMessage::GameStarted(GameStartedInfo {
                    id: created.id.to_uuid_string(),
                    key: created.credential.as_str().to_string(),
                    word_id: Some(target.reference),
                    result,
                    length: config.expression_length,
                    max_attempts: config.max_attempts,
                })
            }
            Err(e) => session_error_response(&e),
        }
    }

    async fn guess(&self, req: GuessRequest) -> ServerMessage {
        let length = self.service.config().expression_length;
        let request = match req.validate(length, self.validator.as_ref()) {
            Ok(r) => r,
            Err(e) => {
                debug!("Rejected guess: {}", e);
                return ServerMessage::error(e.code(), e.to_string());
            }
        };

        match self
            .service
            .submit_guess(&request.id, &request.credential, &request.guess)
            .await
        {
            Ok(result) => ServerMessage::GuessResult(GuessResultInfo {
                solved: feedback::is_solved(&result.verdicts),
                verdicts: result.verdicts.into_iter().map(LetterState::from).collect(),
                attempts_remaining: result.attempts_remaining,
            }),
            Err(e) => session_error_response(&e),
        }
    }

    async fn finish(&self, req: FinishRequest) -> ServerMessage {
        let (id, credential) = match req.validate() {
            Ok(v) => v,
            Err(e) => {
                warn!("Rejected finish: {}", e);
                return ServerMessage::error(e.code(), e.to_string());
            }
        };

        match self.service.finish_session(&id, &credential).await {
            Ok(finished) => ServerMessage::GameFinished { answer: finished.target },
            Err(e) => session_error_response(&e),
        }
    }
}
