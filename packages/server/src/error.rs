use thiserror::Error;

use crate::models::game::GamePhase;

/// Errors reported back to the player or host that triggered an event.
/// None of them ends the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("operation `{operation}` is not valid during {phase:?}")]
    InvalidState {
        operation: &'static str,
        phase: GamePhase,
    },
    #[error("player {0} is not allowed to do that")]
    Unauthorized(String),
    #[error("at least 4 players are required, found {found}")]
    InsufficientPlayers { found: usize },
    #[error("player {0} already acted this night")]
    DuplicateAction(String),
    #[error("player {0} already voted today")]
    DuplicateVote(String),
    #[error("no active session for room {0}")]
    UnknownSession(String),
    #[error("invalid target {0}")]
    InvalidTarget(String),
    #[error("room {0} already has an active session")]
    SessionAlreadyActive(String),
    #[error("player {0} already joined")]
    DuplicatePlayer(String),
    #[error("unrecognised choice `{0}`")]
    InvalidChoice(String),
}

/// Failures of the platform adapter. Logged and otherwise ignored.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("unknown message {0}")]
    UnknownMessage(String),
    #[error("room channel closed")]
    Closed,
}
