//! A room: roster, deck, turn history and the connections watching it.
//!
//! All game mutation goes through [`RoomGame`], which is plain synchronous
//! state. [`Room`] wraps it in the room lock and publishes whatever each
//! mutation reports before releasing the lock.

use super::ledger::CardLedger;
use super::player::Player;
use super::score::{find_winner, score_turn};
use super::snapshot;
use super::turn::Turn;
use crate::broadcast::{Connections, PlayerConn};
use crate::config::RoomRules;
use crate::error::{GameError, GameResult};
use crate::protocol::{PublicPlayer, RoomStateSnapshot, ServerMessage, TurnResult};
use crate::types::*;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::{Mutex, MutexGuard};

/// What changed, so the caller knows what to publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    Roster,
    RoomState,
    /// Index into the turn history
    TurnResult(usize),
}

#[derive(Debug)]
pub struct RoomGame {
    pub id: RoomId,
    pub owner_id: PlayerId,
    pub state: RoomState,
    /// Keyed by id, so iteration gives the deal and rotation order
    pub players: BTreeMap<PlayerId, Player>,
    pub ledger: CardLedger,
    pub turns: Vec<Turn>,
    pub winner: Option<PlayerId>,
    pub rules: RoomRules,
}

impl RoomGame {
    pub fn new(id: impl Into<RoomId>, owner_id: impl Into<PlayerId>, rules: RoomRules) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            state: RoomState::WaitingForPlayers,
            players: BTreeMap::new(),
            ledger: CardLedger::new(rules.card_count),
            turns: Vec::new(),
            winner: None,
            rules,
        }
    }

    /// The latest turn. None until the game starts.
    pub fn current_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn player(&self, player_id: &str) -> GameResult<&Player> {
        self.players.get(player_id).ok_or(GameError::PlayerNotInRoom)
    }

    /// Seat a player. An existing player may only come back with `rejoin`
    /// set, which the caller grants after checking their session; they keep
    /// their hand and score. Newcomers are refused once the game started.
    pub fn admit(&mut self, player_id: &str, name: &str, rejoin: bool) -> GameResult<Vec<Notify>> {
        if self.players.contains_key(player_id) {
            if !rejoin {
                return Err(GameError::InvalidToken);
            }
            tracing::info!("{} rejoined room {}", player_id, self.id);
            return Ok(vec![Notify::Roster]);
        }

        if self.state != RoomState::WaitingForPlayers {
            return Err(GameError::GameInProgress);
        }

        self.players
            .insert(player_id.to_string(), Player::new(player_id, name));
        tracing::info!(
            "{} ({}) joined room {}, {} players",
            name,
            player_id,
            self.id,
            self.players.len()
        );
        Ok(vec![Notify::Roster])
    }

    pub fn set_ready(&mut self, player_id: &str) -> GameResult<Vec<Notify>> {
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(GameError::PlayerNotInRoom)?;
        if player.set_ready() {
            tracing::debug!("{} is ready in room {}", player_id, self.id);
            Ok(vec![Notify::Roster])
        } else {
            Ok(Vec::new())
        }
    }

    pub fn start(&mut self, player_id: &str) -> GameResult<Vec<Notify>> {
        self.player(player_id)?;
        if player_id != self.owner_id {
            return Err(GameError::NotRoomOwner);
        }
        if self.state != RoomState::WaitingForPlayers {
            return Err(GameError::GameInProgress);
        }

        let required = self.rules.min_players.max(2);
        if self.players.len() < required {
            return Err(GameError::NotEnoughPlayers {
                players: self.players.len(),
                required,
            });
        }
        if self.players.values().any(|p| !p.ready) {
            return Err(GameError::PlayersNotReady);
        }

        self.state = RoomState::PlayingGame;
        self.ledger.deal(self.rules.hand_size, &mut self.players);
        self.next_turn();
        tracing::info!(
            "Room {} started with {} players",
            self.id,
            self.players.len()
        );
        Ok(vec![Notify::RoomState, Notify::Roster])
    }

    pub fn submit_story(
        &mut self,
        player_id: &str,
        story: String,
        card: CardId,
    ) -> GameResult<Vec<Notify>> {
        self.player(player_id)?;
        self.active_turn()?.ensure_can_tell_story(player_id)?;
        self.ensure_holds(player_id, card)?;

        let story = story.trim().to_string();
        if story.is_empty() {
            return Err(GameError::InvalidArgument("story"));
        }

        self.discard(player_id, card);
        self.active_turn_mut()?.record_story(player_id, story, card)?;
        tracing::info!("{} told a story in room {}", player_id, self.id);
        Ok(vec![Notify::RoomState])
    }

    pub fn submit_card(&mut self, player_id: &str, card: CardId) -> GameResult<Vec<Notify>> {
        self.player(player_id)?;
        self.active_turn()?.ensure_can_submit(player_id)?;
        self.ensure_holds(player_id, card)?;

        let required = self.players.len().saturating_sub(1);
        self.discard(player_id, card);
        self.active_turn_mut()?
            .record_submission(player_id, card, required)?;
        tracing::debug!("{} submitted card {} in room {}", player_id, card, self.id);
        Ok(vec![Notify::RoomState])
    }

    pub fn vote(&mut self, player_id: &str, card: CardId) -> GameResult<Vec<Notify>> {
        self.player(player_id)?;
        let required = self.players.len().saturating_sub(1);
        let complete = self.active_turn_mut()?.record_vote(player_id, card, required)?;
        tracing::debug!("{} voted for card {} in room {}", player_id, card, self.id);

        if complete {
            Ok(self.score_current_turn())
        } else {
            Ok(vec![Notify::RoomState])
        }
    }

    /// Every scored turn, oldest first
    pub fn history(&self) -> Vec<TurnResult> {
        self.turns
            .iter()
            .filter(|t| t.phase == TurnPhase::Scoring)
            .map(snapshot::turn_result)
            .collect()
    }

    /// Who tells the next story: the player after the current storyteller in
    /// id order, wrapping around. The lowest id starts.
    pub fn next_storyteller(&self) -> Option<PlayerId> {
        let first = self.players.keys().next();
        let Some(current) = self.current_turn() else {
            return first.cloned();
        };

        let mut ids = self.players.keys();
        if ids.position(|id| *id == current.story_player_id).is_none() {
            return first.cloned();
        }
        ids.next().or(first).cloned()
    }

    fn next_turn(&mut self) {
        let Some(story_player_id) = self.next_storyteller() else {
            return;
        };
        let number = self.turns.len() + 1;
        tracing::debug!(
            "Turn {} in room {}, {} tells the story",
            number,
            self.id,
            story_player_id
        );
        self.turns.push(Turn::new(number, story_player_id));
    }

    /// Apply the points of the current turn, then either end the game or
    /// deal one card each and move on to the next storyteller.
    fn score_current_turn(&mut self) -> Vec<Notify> {
        let Some(turn) = self.turns.last_mut() else {
            return Vec::new();
        };
        turn.phase = TurnPhase::Scoring;

        let deltas = score_turn(&turn.votes, &turn.story_player_id, self.players.keys());
        for (id, points) in &deltas {
            if let Some(player) = self.players.get_mut(id) {
                player.add_points(*points);
            }
        }
        tracing::info!("Scored turn {} in room {}: {:?}", turn.number, self.id, deltas);
        turn.points = deltas;

        let mut notices = vec![Notify::TurnResult(self.turns.len() - 1), Notify::Roster];

        if let Some(winner) = find_winner(&self.players, self.rules.max_score) {
            tracing::info!("{} won in room {}", winner, self.id);
            self.winner = Some(winner);
            self.state = RoomState::Ended;
        } else {
            self.ledger.deal(1, &mut self.players);
            self.next_turn();
        }
        notices.push(Notify::RoomState);
        notices
    }

    fn active_turn(&self) -> GameResult<&Turn> {
        if self.state != RoomState::PlayingGame {
            return Err(GameError::NotYourTurn);
        }
        self.turns.last().ok_or(GameError::NotYourTurn)
    }

    fn active_turn_mut(&mut self) -> GameResult<&mut Turn> {
        if self.state != RoomState::PlayingGame {
            return Err(GameError::NotYourTurn);
        }
        self.turns.last_mut().ok_or(GameError::NotYourTurn)
    }

    fn ensure_holds(&self, player_id: &str, card: CardId) -> GameResult<()> {
        if self.player(player_id)?.has_card(card) {
            Ok(())
        } else {
            Err(GameError::CardNotInHand(card))
        }
    }

    fn discard(&mut self, player_id: &str, card: CardId) {
        if let Some(player) = self.players.get_mut(player_id) {
            self.ledger.discard(player, card);
        }
    }
}

/// What a joining player gets back
#[derive(Debug, Clone)]
pub struct JoinView {
    pub players: Vec<PublicPlayer>,
    pub state: RoomStateSnapshot,
}

/// A room as shared between request handlers. The game lock is always taken
/// before the connection lock.
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    /// Unique per room object, so sessions can't outlive the room they were
    /// issued for
    pub instance: String,
    pub owner_id: PlayerId,
    pub created_at: DateTime<Utc>,
    game: Mutex<RoomGame>,
    connections: Connections,
}

impl Room {
    pub fn new(id: impl Into<RoomId>, owner_id: impl Into<PlayerId>, rules: RoomRules) -> Self {
        Self::from_game(RoomGame::new(id, owner_id, rules))
    }

    pub fn from_game(game: RoomGame) -> Self {
        Self {
            id: game.id.clone(),
            instance: ulid::Ulid::new().to_string(),
            owner_id: game.owner_id.clone(),
            created_at: Utc::now(),
            game: Mutex::new(game),
            connections: Connections::new(),
        }
    }

    /// Lock the game state directly
    pub async fn game(&self) -> MutexGuard<'_, RoomGame> {
        self.game.lock().await
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    /// Run a mutation under the room lock and publish what it reports.
    /// Delivery only enqueues, so per-player order matches mutation order.
    async fn mutate<F>(&self, f: F) -> GameResult<()>
    where
        F: FnOnce(&mut RoomGame) -> GameResult<Vec<Notify>>,
    {
        let mut game = self.game.lock().await;
        let notices = f(&mut game)?;
        self.publish(&game, &notices).await;
        Ok(())
    }

    async fn publish(&self, game: &RoomGame, notices: &[Notify]) {
        if notices.is_empty() {
            return;
        }
        let envelopes = snapshot::render(game, notices);
        let sent = self.connections.deliver(envelopes).await;
        tracing::debug!("Room {}: published {:?} ({} messages)", self.id, notices, sent);
    }

    pub async fn join(&self, player_id: &str, name: &str, rejoin: bool) -> GameResult<JoinView> {
        let mut game = self.game.lock().await;
        let notices = game.admit(player_id, name, rejoin)?;
        let view = JoinView {
            players: snapshot::roster(&game).players,
            state: snapshot::room_state_for(&game, player_id),
        };
        self.publish(&game, &notices).await;
        Ok(view)
    }

    pub async fn set_ready(&self, player_id: &str) -> GameResult<()> {
        self.mutate(|game| game.set_ready(player_id)).await
    }

    pub async fn start(&self, player_id: &str) -> GameResult<()> {
        self.mutate(|game| game.start(player_id)).await
    }

    pub async fn submit_story(&self, player_id: &str, story: String, card: CardId) -> GameResult<()> {
        self.mutate(|game| game.submit_story(player_id, story, card))
            .await
    }

    pub async fn submit_card(&self, player_id: &str, card: CardId) -> GameResult<()> {
        self.mutate(|game| game.submit_card(player_id, card)).await
    }

    pub async fn vote(&self, player_id: &str, card: CardId) -> GameResult<()> {
        self.mutate(|game| game.vote(player_id, card)).await
    }

    pub async fn history(&self) -> Vec<TurnResult> {
        self.game.lock().await.history()
    }

    pub async fn room_state_for(&self, player_id: &str) -> RoomStateSnapshot {
        snapshot::room_state_for(&*self.game.lock().await, player_id)
    }

    /// Attach a player's connection (replacing any older one) and send it the
    /// current roster and room state.
    pub async fn attach(&self, conn: PlayerConn) -> GameResult<()> {
        let game = self.game.lock().await;
        game.player(&conn.player_id)?;

        conn.send(ServerMessage::OnPlayersUpdated(snapshot::roster(&game)));
        conn.send(ServerMessage::OnRoomStateUpdated(snapshot::room_state_for(
            &game,
            &conn.player_id,
        )));
        tracing::info!(
            "{} connected to room {} ({})",
            conn.player_id,
            self.id,
            conn.id
        );
        self.connections.attach(conn).await;
        Ok(())
    }

    /// Closing a connection leaves the player, their hand and score in place
    pub async fn detach(&self, player_id: &str, conn_id: &str) {
        if self.connections.detach(player_id, conn_id).await {
            tracing::info!("{} disconnected from room {}", player_id, self.id);
        }
    }

    /// Drop every connection, which ends their sockets
    pub async fn disconnect_all(&self) {
        self.connections.clear().await;
    }
}
