//! Error types for gridhunt

use crate::types::Phase;
use thiserror::Error;

/// A structured refusal of an otherwise well-formed action.
///
/// Rejections are reported only to the requesting connection; they never
/// mutate room state and never broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Reject {
    #[error("only the host can do that")]
    NotHost,

    #[error("action not allowed in the {actual} phase")]
    WrongPhase { actual: Phase },

    #[error("all players must be ready")]
    NotAllReady,

    #[error("you are not in this room")]
    NotInRoom,

    #[error("word limit reached")]
    WordLimitReached,

    #[error("game already finished")]
    AlreadyFinished,

    #[error("no game has been played in this room")]
    NoGame,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("room not found")]
    RoomNotFound,

    #[error(transparent)]
    Reject(#[from] Reject),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether this error is a per-requester refusal rather than a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(self, EngineError::Reject(_) | EngineError::Unauthorized(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
