use crate::error::GameError;
use crate::state::{ScoreDeltas, Submission, Vote};
use crate::types::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Body of `POST /join_room`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinRequest {
    pub player_id: PlayerId,
    pub player_name: String,
    pub room_name: String,
}

/// Wire form of a command: `{"command": "vote", "payload": {"cardId": 3}}`
#[derive(Debug, Clone, Deserialize)]
pub struct CommandEnvelope {
    pub command: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryPayload {
    pub story: String,
    pub card_id: CardId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPayload {
    pub card_id: CardId,
}

/// Everything a player can ask a room to do
#[derive(Debug, Clone, PartialEq)]
pub enum GameCommand {
    SubmitStory(StoryPayload),
    SubmitCard(CardPayload),
    Vote(CardPayload),
    Ready,
    Start,
    FetchHistory,
}

impl GameCommand {
    pub fn name(&self) -> &'static str {
        match self {
            GameCommand::SubmitStory(_) => "submit_story",
            GameCommand::SubmitCard(_) => "submit_card",
            GameCommand::Vote(_) => "vote",
            GameCommand::Ready => "ready",
            GameCommand::Start => "start",
            GameCommand::FetchHistory => "fetch_history",
        }
    }
}

fn payload<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, GameError> {
    serde_json::from_value(value).map_err(|e| GameError::MalformedPayload(e.to_string()))
}

impl TryFrom<CommandEnvelope> for GameCommand {
    type Error = GameError;

    fn try_from(envelope: CommandEnvelope) -> Result<Self, Self::Error> {
        match envelope.command.as_str() {
            "submit_story" => Ok(GameCommand::SubmitStory(payload(envelope.payload)?)),
            "submit_card" => Ok(GameCommand::SubmitCard(payload(envelope.payload)?)),
            "vote" => Ok(GameCommand::Vote(payload(envelope.payload)?)),
            "ready" => Ok(GameCommand::Ready),
            "start" => Ok(GameCommand::Start),
            "fetch_history" => Ok(GameCommand::FetchHistory),
            other => Err(GameError::UnknownCommand(other.to_string())),
        }
    }
}

/// Messages a client sends over its socket
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SocketMessage {
    Ping,
    Command(CommandEnvelope),
}

/// Result of a successful command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandReply {
    Story(StoryPayload),
    Submitted {
        #[serde(rename = "submittedCard")]
        submitted_card: CardId,
    },
    Voted(CardPayload),
    History {
        turns: Vec<TurnResult>,
    },
    Ack {},
}

/// Public view of a player; never includes the hand
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPlayer {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterSnapshot {
    pub players: Vec<PublicPlayer>,
}

/// Room state as seen by one recipient
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateSnapshot {
    pub id: RoomId,
    pub room_state: RoomState,
    pub turn_state: TurnPhase,
    pub turn_number: usize,
    pub story_player_id: Option<PlayerId>,
    pub story: String,
    /// The recipient's own hand
    pub cards: Vec<CardId>,
    /// Cards the recipient may vote for, shuffled
    pub cards_submitted: Vec<CardId>,
    /// Players that already acted in this phase
    pub submitted_by: Vec<PlayerId>,
    /// Only for the storyteller, or for everyone once the turn is scored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_card: Option<CardId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<PlayerId>,
}

/// A scored turn with everything revealed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub turn_number: usize,
    pub story_player_id: PlayerId,
    pub story: String,
    pub story_card: Option<CardId>,
    pub cards_submitted: Vec<Submission>,
    pub votes: Vec<Vote>,
    pub points: ScoreDeltas,
}

/// Reply of `POST /join_room`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub room_token: String,
    pub room_id: RoomId,
    pub owner_id: PlayerId,
    pub player_id: PlayerId,
    pub players: Vec<PublicPlayer>,
    #[serde(flatten)]
    pub state: RoomStateSnapshot,
}

/// Events pushed to connected players
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    OnPlayersUpdated(RosterSnapshot),
    OnRoomStateUpdated(RoomStateSnapshot),
    OnTurnResult(TurnResult),
    CommandResult {
        command: String,
        reply: CommandReply,
    },
    Pong,
    Error {
        code: String,
        msg: String,
    },
}

impl From<&GameError> for ServerMessage {
    fn from(e: &GameError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}
