use crate::types::GamePhase;

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Validation and lookup failures for room operations. None of these are
/// fatal: a rejected operation leaves room state untouched and the worst
/// recovery is a room reset to the lobby.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Room does not exist")]
    RoomNotFound,

    #[error("Player is not a member of this room")]
    PlayerNotInRoom,

    #[error("Only the host can do that")]
    NotHost,

    #[error("Need at least {needed} players to play, have {have}")]
    InsufficientPlayers { needed: usize, have: usize },

    #[error("Action not allowed in the {actual:?} phase")]
    WrongPhase { actual: GamePhase },

    #[error("Invalid phase transition from {from:?} to {to:?}")]
    InvalidTransition { from: GamePhase, to: GamePhase },

    #[error("No round is in progress")]
    NoActiveRound,

    #[error("The impersonated player sits this round out")]
    TargetCannotAct,

    #[error("Already submitted a response this round")]
    DuplicateResponse,

    #[error("Response text must be 1-200 characters")]
    InvalidResponseText,

    #[error("Already voted this round")]
    DuplicateVote,

    #[error("Vote references an unknown response")]
    UnknownResponse,
}

impl GameError {
    /// Stable error code for the wire protocol
    pub fn code(&self) -> &'static str {
        match self {
            GameError::RoomNotFound => "ROOM_NOT_FOUND",
            GameError::PlayerNotInRoom => "PLAYER_NOT_IN_ROOM",
            GameError::NotHost => "NOT_HOST",
            GameError::InsufficientPlayers { .. } => "INSUFFICIENT_PLAYERS",
            GameError::WrongPhase { .. } => "WRONG_PHASE",
            GameError::InvalidTransition { .. } => "INVALID_TRANSITION",
            GameError::NoActiveRound => "NO_ACTIVE_ROUND",
            GameError::TargetCannotAct => "TARGET_CANNOT_ACT",
            GameError::DuplicateResponse => "DUPLICATE_RESPONSE",
            GameError::InvalidResponseText => "INVALID_RESPONSE_TEXT",
            GameError::DuplicateVote => "DUPLICATE_VOTE",
            GameError::UnknownResponse => "UNKNOWN_RESPONSE",
        }
    }
}
