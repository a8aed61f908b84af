use crate::types::{CardId, PlayerId};

/// A seat in a room. The hand is private to the server and its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Order carries no meaning
    pub hand: Vec<CardId>,
    pub ready: bool,
    pub score: u32,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hand: Vec::new(),
            ready: false,
            score: 0,
        }
    }

    pub fn has_card(&self, card: CardId) -> bool {
        self.hand.contains(&card)
    }

    /// Returns true if the flag changed
    pub fn set_ready(&mut self) -> bool {
        let changed = !self.ready;
        self.ready = true;
        changed
    }

    /// Remove a card by value. Swap-removal, since hand order doesn't matter.
    pub fn take_card(&mut self, card: CardId) -> Option<CardId> {
        let idx = self.hand.iter().position(|&c| c == card)?;
        Some(self.hand.swap_remove(idx))
    }

    pub fn add_points(&mut self, points: u32) {
        self.score += points;
    }
}
