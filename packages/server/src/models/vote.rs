use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::player::PlayerId;
use crate::error::GameError;

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteRequest {
    pub voter_id: PlayerId,
    pub target_id: PlayerId,
}

/// Day ballots: who voted for whom, and the running count per target.
#[derive(Debug, Clone, Default)]
pub struct VoteTally {
    ballots: HashMap<PlayerId, PlayerId>,
    counts: HashMap<PlayerId, u32>,
}

impl VoteTally {
    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.ballots.contains_key(voter_id)
    }

    pub fn record(&mut self, voter_id: &str, target_id: &str) -> Result<(), GameError> {
        if self.has_voted(voter_id) {
            return Err(GameError::DuplicateVote(voter_id.to_string()));
        }
        self.ballots
            .insert(voter_id.to_string(), target_id.to_string());
        *self.counts.entry(target_id.to_string()).or_insert(0) += 1;
        Ok(())
    }

    pub fn ballots_cast(&self) -> usize {
        self.ballots.len()
    }

    /// The target with strictly more votes than anyone else.
    /// A tie for first place, or no votes at all, yields `None`.
    pub fn leader(&self) -> Option<(&PlayerId, u32)> {
        let mut best: Option<(&PlayerId, u32)> = None;
        let mut tied = false;
        for (target, &count) in &self.counts {
            match best {
                Some((_, top)) if count < top => {}
                Some((_, top)) if count == top => tied = true,
                _ => {
                    best = Some((target, count));
                    tied = false;
                }
            }
        }
        if tied {
            None
        } else {
            best.filter(|(_, count)| *count > 0)
        }
    }

    pub fn clear(&mut self) {
        self.ballots.clear();
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_majority_leads() {
        let mut tally = VoteTally::default();
        tally.record("a", "x").unwrap();
        tally.record("b", "x").unwrap();
        tally.record("c", "y").unwrap();

        assert_eq!(tally.leader(), Some((&"x".to_string(), 2)));
        assert_eq!(tally.ballots_cast(), 3);
    }

    #[test]
    fn tie_has_no_leader() {
        let mut tally = VoteTally::default();
        tally.record("a", "x").unwrap();
        tally.record("b", "y").unwrap();
        tally.record("c", "z").unwrap();
        tally.record("d", "z").unwrap();
        tally.record("e", "x").unwrap();

        assert_eq!(tally.leader(), None);
    }

    #[test]
    fn no_votes_has_no_leader() {
        assert_eq!(VoteTally::default().leader(), None);
    }

    #[test]
    fn voting_twice_is_rejected_and_leaves_counts_alone() {
        let mut tally = VoteTally::default();
        tally.record("a", "x").unwrap();

        assert_eq!(
            tally.record("a", "y"),
            Err(GameError::DuplicateVote("a".to_string()))
        );
        assert_eq!(tally.leader(), Some((&"x".to_string(), 1)));
        assert_eq!(tally.ballots_cast(), 1);
    }
}
