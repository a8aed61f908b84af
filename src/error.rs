//! Failures reported to the player that attempted an action.
//!
//! None of these affect the room or other players; the transport decides
//! how to present them.

use crate::types::CardId;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("not your turn")]
    NotYourTurn,

    #[error("already submitted a card this turn")]
    AlreadySubmitted,

    #[error("already voted this turn")]
    AlreadyVoted,

    #[error("card {0} can't be voted for")]
    InvalidVote(CardId),

    #[error("card {0} is not in your hand")]
    CardNotInHand(CardId),

    #[error("room not found")]
    RoomNotFound,

    #[error("player not found in the room")]
    PlayerNotInRoom,

    #[error("game in progress")]
    GameInProgress,

    #[error("not room owner")]
    NotRoomOwner,

    #[error("not every player is ready")]
    PlayersNotReady,

    #[error("need {required} players to start, have {players}")]
    NotEnoughPlayers { players: usize, required: usize },

    #[error("invalid token")]
    InvalidToken,

    #[error("can't find command {0}")]
    UnknownCommand(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid {0}")]
    InvalidArgument(&'static str),

    #[error("failed to sign session token")]
    Signing,
}

impl GameError {
    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotYourTurn => "NOT_YOUR_TURN",
            GameError::AlreadySubmitted => "ALREADY_SUBMITTED",
            GameError::AlreadyVoted => "ALREADY_VOTED",
            GameError::InvalidVote(_) => "INVALID_VOTE",
            GameError::CardNotInHand(_) => "CARD_NOT_IN_HAND",
            GameError::RoomNotFound => "ROOM_NOT_FOUND",
            GameError::PlayerNotInRoom => "PLAYER_NOT_IN_ROOM",
            GameError::GameInProgress => "GAME_IN_PROGRESS",
            GameError::NotRoomOwner => "NOT_ROOM_OWNER",
            GameError::PlayersNotReady => "PLAYERS_NOT_READY",
            GameError::NotEnoughPlayers { .. } => "NOT_ENOUGH_PLAYERS",
            GameError::InvalidToken => "INVALID_TOKEN",
            GameError::UnknownCommand(_) => "UNKNOWN_COMMAND",
            GameError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            GameError::InvalidArgument(_) => "INVALID_ARGUMENT",
            GameError::Signing => "SIGNING_FAILED",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GameError::RoomNotFound => StatusCode::NOT_FOUND,
            GameError::InvalidToken => StatusCode::UNAUTHORIZED,
            GameError::NotRoomOwner => StatusCode::FORBIDDEN,
            GameError::Signing => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    msg: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code(),
            msg: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
