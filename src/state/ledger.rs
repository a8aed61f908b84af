//! Draw and discard piles of a room.
//!
//! Every card id lives in exactly one place: a player's hand, the draw pile,
//! or the discard pile (which also holds the cards in play this turn).

use super::player::Player;
use crate::types::{CardId, PlayerId};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct CardLedger {
    /// Deal order; the top of the pile is the end of the vec
    draw_pile: Vec<CardId>,
    discard_pile: Vec<CardId>,
}

impl CardLedger {
    /// A fresh deck of `card_count` sequential ids in a uniformly random order
    pub fn new(card_count: u32) -> Self {
        let mut draw_pile: Vec<CardId> = (0..card_count).collect();
        draw_pile.shuffle(&mut rand::rng());
        Self {
            draw_pile,
            discard_pile: Vec::new(),
        }
    }

    /// Build a ledger with explicit piles, keeping the draw order as given
    pub fn from_piles(draw_pile: Vec<CardId>, discard_pile: Vec<CardId>) -> Self {
        Self {
            draw_pile,
            discard_pile,
        }
    }

    pub fn draw_pile(&self) -> &[CardId] {
        &self.draw_pile
    }

    pub fn discard_pile(&self) -> &[CardId] {
        &self.discard_pile
    }

    /// Deal up to `n` cards from the top of the draw pile to each player, in
    /// ascending id order.
    ///
    /// When the draw pile holds fewer cards than there are players, the whole
    /// discard pile is shuffled back into it first. Dealing stops for the rest
    /// of the pass as soon as one player would receive nothing.
    ///
    /// Returns the number of cards dealt.
    pub fn deal(&mut self, n: usize, players: &mut BTreeMap<PlayerId, Player>) -> usize {
        if self.draw_pile.len() < players.len() {
            self.recycle_discards();
        }

        let mut dealt = 0;
        for player in players.values_mut() {
            let take = n.min(self.draw_pile.len());
            if take == 0 {
                tracing::debug!("Draw pile exhausted, {} skipped", player.id);
                return dealt;
            }
            let start = self.draw_pile.len() - take;
            player.hand.extend(self.draw_pile.drain(start..));
            dealt += take;
        }
        dealt
    }

    /// Move a card from the player's hand to the discard pile.
    ///
    /// A card that isn't in the hand is logged and otherwise ignored.
    pub fn discard(&mut self, player: &mut Player, card: CardId) {
        match player.take_card(card) {
            Some(card) => {
                self.discard_pile.push(card);
                tracing::debug!(
                    "{} discarded card {}, {} left in hand",
                    player.id,
                    card,
                    player.hand.len()
                );
            }
            None => {
                tracing::warn!("Can't discard {}, not in hand of {}", card, player.id);
            }
        }
    }

    fn recycle_discards(&mut self) {
        tracing::info!(
            "Shuffling {} discarded cards back into the draw pile",
            self.discard_pile.len()
        );
        let mut recycled = std::mem::take(&mut self.discard_pile);
        recycled.shuffle(&mut rand::rng());
        self.draw_pile.extend(recycled);
    }
}
