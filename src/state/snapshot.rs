//! Per-recipient views of a room.
//!
//! Hands never leave the server except to their owner. The story card is
//! shown to the storyteller, or to everyone once the turn is scored.

use super::room::{Notify, RoomGame};
use super::turn::Turn;
use crate::broadcast::Envelope;
use crate::protocol::*;
use crate::types::TurnPhase;
use rand::seq::SliceRandom;

pub fn roster(game: &RoomGame) -> RosterSnapshot {
    RosterSnapshot {
        players: game
            .players
            .values()
            .map(|p| PublicPlayer {
                id: p.id.clone(),
                name: p.name.clone(),
                ready: p.ready,
                points: p.score,
            })
            .collect(),
    }
}

pub fn room_state_for(game: &RoomGame, viewer: &str) -> RoomStateSnapshot {
    let cards = game
        .players
        .get(viewer)
        .map(|p| p.hand.clone())
        .unwrap_or_default();

    let turn = game.current_turn();
    let mut cards_submitted = turn.map(|t| t.voting_cards(viewer)).unwrap_or_default();
    cards_submitted.shuffle(&mut rand::rng());

    let story_card = turn.and_then(|t| {
        if t.is_storyteller(viewer) || t.phase == TurnPhase::Scoring {
            t.story_card
        } else {
            None
        }
    });

    RoomStateSnapshot {
        id: game.id.clone(),
        room_state: game.state,
        turn_state: turn.map_or(TurnPhase::NotStarted, |t| t.phase),
        turn_number: game.turns.len(),
        story_player_id: turn.map(|t| t.story_player_id.clone()),
        story: turn.map(|t| t.story.clone()).unwrap_or_default(),
        cards,
        cards_submitted,
        submitted_by: turn.map(|t| t.acted()).unwrap_or_default(),
        story_card,
        winner_id: game.winner.clone(),
    }
}

pub fn turn_result(turn: &Turn) -> TurnResult {
    TurnResult {
        turn_number: turn.number,
        story_player_id: turn.story_player_id.clone(),
        story: turn.story.clone(),
        story_card: turn.story_card,
        cards_submitted: turn.submissions.clone(),
        votes: turn.votes.clone(),
        points: turn.points.clone(),
    }
}

/// Turn notices into messages. Room state is rendered once per roster
/// member, since its content depends on who receives it.
pub fn render(game: &RoomGame, notices: &[Notify]) -> Vec<Envelope> {
    let mut envelopes = Vec::new();
    for notice in notices {
        match notice {
            Notify::Roster => {
                envelopes.push(Envelope::All(ServerMessage::OnPlayersUpdated(roster(game))));
            }
            Notify::RoomState => {
                for id in game.players.keys() {
                    envelopes.push(Envelope::To(
                        id.clone(),
                        ServerMessage::OnRoomStateUpdated(room_state_for(game, id)),
                    ));
                }
            }
            Notify::TurnResult(idx) => {
                if let Some(turn) = game.turns.get(*idx) {
                    envelopes.push(Envelope::All(ServerMessage::OnTurnResult(turn_result(turn))));
                }
            }
        }
    }
    envelopes
}
