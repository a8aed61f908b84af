mod ledger;
mod player;
mod registry;
mod room;
mod score;
mod snapshot;
mod turn;

pub use ledger::CardLedger;
pub use player::Player;
pub use registry::{room_key, RoomRegistry, RoomSweeper};
pub use room::{JoinView, Notify, Room, RoomGame};
pub use score::{find_winner, score_turn, ScoreDeltas};
pub use snapshot::{render, room_state_for, roster, turn_result};
pub use turn::{Submission, Turn, Vote};

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::protocol::{CommandReply, GameCommand, JoinRequest, JoinResponse};
use crate::session::{HmacSessions, SessionClaims, SessionIssuer};
use crate::types::PlayerId;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RoomRegistry>,
    pub sessions: Arc<dyn SessionIssuer>,
    pub config: Arc<GameConfig>,
}

impl AppState {
    pub fn new(config: GameConfig) -> Self {
        let sessions: Arc<dyn SessionIssuer> = match &config.session_secret {
            Some(secret) => Arc::new(HmacSessions::new(secret)),
            None => Arc::new(HmacSessions::random()),
        };
        Self::with_sessions(config, sessions)
    }

    pub fn with_sessions(config: GameConfig, sessions: Arc<dyn SessionIssuer>) -> Self {
        Self {
            rooms: Arc::new(RoomRegistry::new(config.rules.clone(), config.room_max_age)),
            sessions,
            config: Arc::new(config),
        }
    }

    /// Join or create a room. `token` is the caller's previous session, if
    /// any; when it names this room and player the player is re-seated and
    /// the same token is handed back.
    pub async fn join_room(
        &self,
        request: JoinRequest,
        token: Option<&str>,
    ) -> GameResult<JoinResponse> {
        let player_id = request.player_id.trim().to_string();
        let player_name = request.player_name.trim().to_string();
        if player_id.is_empty() {
            return Err(GameError::InvalidArgument("playerId"));
        }
        if player_name.is_empty() {
            return Err(GameError::InvalidArgument("playerName"));
        }
        if room_key(&request.room_name).is_empty() {
            return Err(GameError::InvalidArgument("roomName"));
        }

        let (room, _created) = self
            .rooms
            .find_or_create(&request.room_name, &player_id)
            .await;

        let session = token.and_then(|t| match self.sessions.verify(t) {
            Ok(claims)
                if claims.room_id == room.id
                    && claims.room_instance == room.instance
                    && claims.player_id == player_id =>
            {
                Some((t.to_string(), claims))
            }
            Ok(claims) => {
                tracing::debug!(
                    "Ignoring session for {} in room {}",
                    claims.player_id,
                    claims.room_id
                );
                None
            }
            Err(e) => {
                tracing::debug!("Ignoring session token: {}", e);
                None
            }
        });

        let view = room
            .join(&player_id, &player_name, session.is_some())
            .await?;

        let room_token = match session {
            Some((token, _)) => token,
            None => self
                .sessions
                .issue(&SessionClaims::new(
                    &room.id,
                    &room.instance,
                    &player_id,
                    &player_name,
                ))?,
        };

        Ok(JoinResponse {
            room_token,
            room_id: room.id.clone(),
            owner_id: room.owner_id.clone(),
            player_id,
            players: view.players,
            state: view.state,
        })
    }

    /// Find the room and player a session token belongs to
    pub async fn resolve(&self, token: &str) -> GameResult<(Arc<Room>, PlayerId)> {
        let claims = self.sessions.verify(token)?;
        let room = self
            .rooms
            .find(&claims.room_id)
            .await
            .ok_or(GameError::RoomNotFound)?;
        if claims.room_instance != room.instance {
            return Err(GameError::InvalidToken);
        }
        room.game().await.player(&claims.player_id)?;
        Ok((room, claims.player_id))
    }

    /// Run a command on behalf of the token's player
    pub async fn execute(&self, token: &str, command: GameCommand) -> GameResult<CommandReply> {
        let (room, player_id) = self.resolve(token).await?;
        tracing::debug!("{} runs {} in room {}", player_id, command.name(), room.id);
        crate::ws::handlers::handle_command(&room, &player_id, command).await
    }
}
