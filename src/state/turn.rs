use super::score::ScoreDeltas;
use crate::error::{GameError, GameResult};
use crate::types::{CardId, PlayerId, TurnPhase};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A card a non-storyteller offered for the story
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub player_id: PlayerId,
    pub card_id: CardId,
}

/// Which player a voter believed authored the card they picked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub voter_id: PlayerId,
    pub target_id: PlayerId,
    pub card_id: CardId,
}

/// One storytelling round. Phases only move forward; once the next turn
/// starts this one is kept untouched for history.
#[derive(Debug, Clone)]
pub struct Turn {
    /// 1-based
    pub number: usize,
    pub phase: TurnPhase,
    pub story_player_id: PlayerId,
    pub story: String,
    pub story_card: Option<CardId>,
    pub submissions: Vec<Submission>,
    pub votes: Vec<Vote>,
    /// Filled in when the turn is scored
    pub points: ScoreDeltas,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(number: usize, story_player_id: PlayerId) -> Self {
        Self {
            number,
            phase: TurnPhase::WaitingForStory,
            story_player_id,
            story: String::new(),
            story_card: None,
            submissions: Vec::new(),
            votes: Vec::new(),
            points: ScoreDeltas::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_storyteller(&self, player_id: &str) -> bool {
        self.story_player_id == player_id
    }

    pub fn ensure_can_tell_story(&self, player_id: &str) -> GameResult<()> {
        if !self.is_storyteller(player_id) || self.phase != TurnPhase::WaitingForStory {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    pub fn record_story(&mut self, player_id: &str, story: String, card: CardId) -> GameResult<()> {
        self.ensure_can_tell_story(player_id)?;
        self.story = story;
        self.story_card = Some(card);
        self.phase = TurnPhase::SelectingCards;
        Ok(())
    }

    pub fn has_submitted(&self, player_id: &str) -> bool {
        self.submissions.iter().any(|s| s.player_id == player_id)
    }

    pub fn has_voted(&self, player_id: &str) -> bool {
        self.votes.iter().any(|v| v.voter_id == player_id)
    }

    pub fn ensure_can_submit(&self, player_id: &str) -> GameResult<()> {
        if self.is_storyteller(player_id) {
            return Err(GameError::NotYourTurn);
        }
        if self.has_submitted(player_id) {
            return Err(GameError::AlreadySubmitted);
        }
        if self.phase != TurnPhase::SelectingCards {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    /// Record a submission. `required` is the number of non-storytellers;
    /// the last one moves the turn to voting.
    pub fn record_submission(
        &mut self,
        player_id: &str,
        card: CardId,
        required: usize,
    ) -> GameResult<()> {
        self.ensure_can_submit(player_id)?;
        self.submissions.push(Submission {
            player_id: player_id.to_string(),
            card_id: card,
        });
        if self.submissions.len() >= required {
            self.phase = TurnPhase::Voting;
        }
        Ok(())
    }

    /// Work out whose card a vote lands on. The story card points at the
    /// storyteller; a voter can never vote for their own submission.
    pub fn resolve_vote(&self, voter_id: &str, card: CardId) -> GameResult<PlayerId> {
        if self.phase != TurnPhase::Voting || self.is_storyteller(voter_id) {
            return Err(GameError::NotYourTurn);
        }
        if self.has_voted(voter_id) {
            return Err(GameError::AlreadyVoted);
        }
        if self.story_card == Some(card) {
            return Ok(self.story_player_id.clone());
        }
        self.submissions
            .iter()
            .find(|s| s.card_id == card && s.player_id != voter_id)
            .map(|s| s.player_id.clone())
            .ok_or(GameError::InvalidVote(card))
    }

    /// Record a vote; returns true once every non-storyteller has voted
    pub fn record_vote(&mut self, voter_id: &str, card: CardId, required: usize) -> GameResult<bool> {
        let target_id = self.resolve_vote(voter_id, card)?;
        self.votes.push(Vote {
            voter_id: voter_id.to_string(),
            target_id,
            card_id: card,
        });
        Ok(self.votes.len() >= required)
    }

    /// Players that already acted in the current phase
    pub fn acted(&self) -> Vec<PlayerId> {
        match self.phase {
            TurnPhase::SelectingCards => {
                self.submissions.iter().map(|s| s.player_id.clone()).collect()
            }
            TurnPhase::Voting => self.votes.iter().map(|v| v.voter_id.clone()).collect(),
            _ => Vec::new(),
        }
    }

    /// Cards `viewer` may vote for: everyone else's submissions plus the story
    /// card. Empty outside of voting. Unshuffled.
    pub fn voting_cards(&self, viewer: &str) -> Vec<CardId> {
        if self.phase != TurnPhase::Voting {
            return Vec::new();
        }
        let mut cards: Vec<CardId> = self
            .submissions
            .iter()
            .filter(|s| s.player_id != viewer)
            .map(|s| s.card_id)
            .collect();
        cards.extend(self.story_card);
        cards
    }
}
