use serde::{Deserialize, Serialize};

/// Opaque ID types
pub type PlayerId = String;
pub type RoomId = String;
pub type ConnectionId = String;

/// Card ids are sequential integers in `[0, card_count)`
pub type CardId = u32;

/// Room lifecycle, strictly one-way
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomState {
    #[serde(rename = "waiting")]
    WaitingForPlayers,
    #[serde(rename = "playing")]
    PlayingGame,
    #[serde(rename = "ended")]
    Ended,
}

/// Phase of a single turn. Ordered: a turn only ever moves to a later phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    NotStarted,
    WaitingForStory,
    SelectingCards,
    Voting,
    Scoring,
}
