//! The bracket topology exchanged with the caller: match ids grouped by
//! branch and round, plus generation metadata.

use crate::{Branch, MatchId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One round of one branch: an ordered list of the match ids it contains.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BracketRound {
    pub branch: Branch,
    /// 1-based round number within the branch.
    pub number: u32,
    pub label: String,
    pub matches: Vec<MatchId>,
}

/// The advancement topology of a tournament: a flat list of rounds grouped
/// by branch, in generation order.
///
/// Elimination formats read as a tree through the `WinnerOf`/`LoserOf` slot
/// references of the matches themselves; the structure only groups them for
/// the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BracketStructure {
    pub rounds: Vec<BracketRound>,
}

impl BracketStructure {
    #[inline]
    pub fn new() -> Self {
        Self { rounds: Vec::new() }
    }

    /// Appends a round to the structure.
    pub fn push_round<S>(&mut self, branch: Branch, number: u32, label: S, matches: Vec<MatchId>)
    where
        S: Into<String>,
    {
        self.rounds.push(BracketRound {
            branch,
            number,
            label: label.into(),
            matches,
        });
    }

    /// Returns the round of `branch` with the given number, if present.
    pub fn round(&self, branch: Branch, number: u32) -> Option<&BracketRound> {
        self.rounds
            .iter()
            .find(|r| r.branch == branch && r.number == number)
    }

    /// Returns the number of rounds in `branch`.
    pub fn rounds_in(&self, branch: Branch) -> usize {
        self.rounds.iter().filter(|r| r.branch == branch).count()
    }

    /// Total number of matches across all rounds.
    pub fn total_matches(&self) -> usize {
        self.rounds.iter().map(|r| r.matches.len()).sum()
    }
}

/// Summary metadata emitted by bracket generation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BracketMetadata {
    pub total_rounds: u32,
    pub total_matches: usize,
    /// Estimated total duration, derived from the per-match estimate and the
    /// tournament's short form setting.
    pub estimated_minutes: u64,
}

/// Returns the conventional label for an elimination round, given the number
/// of teams still in contention when the round is played.
pub(crate) fn elimination_label(teams_left: usize) -> String {
    match teams_left {
        2 => "Final".to_owned(),
        4 => "Semifinal".to_owned(),
        8 => "Quarterfinal".to_owned(),
        16 => "Round of 16".to_owned(),
        32 => "Round of 32".to_owned(),
        n => format!("Round of {}", n),
    }
}
