//! Vote accumulation and resolution.

use std::collections::HashMap;

/// Accumulated votes, one per voter. A voter's later vote overwrites their
/// earlier one ("last vote counts").
#[derive(Debug, Default)]
pub struct VoteTally {
    votes: HashMap<String, u32>,
    /// Options in the order their first vote arrived. Drives the tie-break.
    first_seen: Vec<u32>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote. Overwrites the sender's previous vote, if any.
    pub fn record(&mut self, sender: &str, option: u32) {
        if !self.first_seen.contains(&option) {
            self.first_seen.push(option);
        }
        self.votes.insert(sender.to_string(), option);
    }

    /// Number of voters with a recorded vote.
    pub fn voter_count(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// The vote recorded for a sender, if any.
    pub fn vote_of(&self, sender: &str) -> Option<u32> {
        self.votes.get(sender).copied()
    }

    /// Resolve the winning option.
    ///
    /// Counts are computed after collection closes; ties among max-count
    /// options resolve to the option whose first vote arrived earliest.
    pub fn winner(&self) -> Option<u32> {
        let mut counts: HashMap<u32, usize> = HashMap::new();
        for option in self.votes.values() {
            *counts.entry(*option).or_default() += 1;
        }

        let mut best: Option<(u32, usize)> = None;
        for option in &self.first_seen {
            let count = counts.get(option).copied().unwrap_or(0);
            if count == 0 {
                continue;
            }
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((*option, count)),
            }
        }
        best.map(|(option, _)| option)
    }
}
