//! Dixit scoring.
//!
//! If nobody or everybody finds the story card, the storyteller scores 0 and
//! everyone else scores 2. Otherwise the storyteller and whoever found the
//! card score 3. On top of that each non-storyteller scores 1 for every vote
//! their own card received.

use super::player::Player;
use super::turn::Vote;
use crate::types::PlayerId;
use std::collections::BTreeMap;

/// Points gained per player in one turn. Every roster member has an entry.
pub type ScoreDeltas = BTreeMap<PlayerId, u32>;

pub fn score_turn<'a>(
    votes: &[Vote],
    story_player_id: &str,
    roster: impl IntoIterator<Item = &'a PlayerId>,
) -> ScoreDeltas {
    let mut deltas: ScoreDeltas = roster.into_iter().map(|id| (id.clone(), 0)).collect();
    let guessers = deltas.len().saturating_sub(1);

    let votes_for_story = votes
        .iter()
        .filter(|v| v.target_id == story_player_id)
        .count();

    if votes_for_story == 0 || votes_for_story == guessers {
        for (id, points) in deltas.iter_mut() {
            if id != story_player_id {
                *points += 2;
            }
        }
    } else {
        if let Some(points) = deltas.get_mut(story_player_id) {
            *points += 3;
        }
        for vote in votes.iter().filter(|v| v.target_id == story_player_id) {
            if let Some(points) = deltas.get_mut(&vote.voter_id) {
                *points += 3;
            }
        }
    }

    for vote in votes.iter().filter(|v| v.target_id != story_player_id) {
        if let Some(points) = deltas.get_mut(&vote.target_id) {
            *points += 1;
        }
    }

    deltas
}

/// The highest scorer at or above `max_score`. Ties go to the lowest id.
pub fn find_winner(players: &BTreeMap<PlayerId, Player>, max_score: u32) -> Option<PlayerId> {
    let mut winner: Option<&Player> = None;
    for player in players.values() {
        if player.score >= max_score && winner.map_or(true, |w| w.score < player.score) {
            winner = Some(player);
        }
    }
    winner.map(|p| p.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<PlayerId> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    fn vote(voter: &str, target: &str, card: u32) -> Vote {
        Vote {
            voter_id: voter.to_string(),
            target_id: target.to_string(),
            card_id: card,
        }
    }

    #[test]
    fn test_all_wrong() {
        // "a" tells, b and c both pick each other's card
        let votes = vec![vote("b", "c", 30), vote("c", "b", 20)];
        let deltas = score_turn(&votes, "a", &roster());

        assert_eq!(deltas["a"], 0);
        assert_eq!(deltas["b"], 3);
        assert_eq!(deltas["c"], 3);
    }

    #[test]
    fn test_all_wrong_uneven_decoys() {
        // Four at the table, c's card draws two of the three votes
        let roster: Vec<PlayerId> = ["a", "b", "c", "d"].map(String::from).to_vec();
        let votes = vec![vote("b", "c", 30), vote("c", "b", 20), vote("d", "c", 30)];
        let deltas = score_turn(&votes, "a", &roster);

        assert_eq!(deltas["a"], 0);
        assert_eq!(deltas["b"], 3);
        assert_eq!(deltas["c"], 4);
        assert_eq!(deltas["d"], 2);
    }

    #[test]
    fn test_all_correct() {
        let votes = vec![vote("b", "a", 10), vote("c", "a", 10)];
        let deltas = score_turn(&votes, "a", &roster());

        assert_eq!(deltas["a"], 0);
        assert_eq!(deltas["b"], 2);
        assert_eq!(deltas["c"], 2);
    }

    #[test]
    fn test_split_vote() {
        // b finds the story card, c is fooled by b's card
        let votes = vec![vote("b", "a", 10), vote("c", "b", 20)];
        let deltas = score_turn(&votes, "a", &roster());

        assert_eq!(deltas["a"], 3);
        assert_eq!(deltas["b"], 4);
        assert_eq!(deltas["c"], 0);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let votes = vec![vote("b", "a", 10), vote("c", "b", 20)];
        assert_eq!(
            score_turn(&votes, "a", &roster()),
            score_turn(&votes, "a", &roster())
        );
    }

    #[test]
    fn test_larger_table() {
        let roster: Vec<PlayerId> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        let votes = vec![
            vote("b", "a", 1),
            vote("c", "d", 4),
            vote("d", "a", 1),
            vote("e", "d", 4),
        ];
        let deltas = score_turn(&votes, "a", &roster);

        assert_eq!(deltas["a"], 3);
        assert_eq!(deltas["b"], 3);
        assert_eq!(deltas["c"], 0);
        assert_eq!(deltas["d"], 5);
        assert_eq!(deltas["e"], 0);
    }

    #[test]
    fn test_find_winner() {
        let mut players: BTreeMap<PlayerId, Player> = roster()
            .into_iter()
            .map(|id| (id.clone(), Player::new(id.clone(), id)))
            .collect();
        assert_eq!(find_winner(&players, 30), None);

        players.get_mut("b").unwrap().score = 31;
        players.get_mut("c").unwrap().score = 33;
        players.get_mut("a").unwrap().score = 29;
        assert_eq!(find_winner(&players, 30), Some("c".to_string()));

        players.get_mut("b").unwrap().score = 33;
        assert_eq!(find_winner(&players, 30), Some("b".to_string()));
    }
}
