//! Barrage and consolation brackets.
//!
//! Both are small single elimination brackets played by a subset of a main
//! tournament's field: a barrage settles a tie straddling a qualification
//! boundary, a consolation bracket gives early-eliminated teams placement
//! matches. The bracket mechanics are the single elimination ones under a
//! different branch tag; this module adds the subset selection.

use crate::format::{single_elimination, GeneratedBracket};
use crate::standings::Standing;
use crate::{Branch, Match, MatchStatus, SeedingOptions, Team, TeamId, Tournament};

pub(super) fn generate(
    tournament: &Tournament,
    teams: Vec<Team>,
    options: &SeedingOptions,
    branch: Branch,
) -> GeneratedBracket {
    single_elimination::generate(tournament, teams, options, branch)
}

/// The teams whose tie straddles the qualification boundary of a standings
/// list: the rank group containing position `qualifier_count` when that
/// group spans the boundary. Empty when the boundary is clean and no
/// barrage is needed.
///
/// `standings` must be in rank order, as produced by
/// [`compute_standings`](crate::compute_standings).
pub fn qualification_pool(standings: &[Standing], qualifier_count: usize) -> Vec<TeamId> {
    if qualifier_count == 0 || qualifier_count >= standings.len() {
        return Vec::new();
    }

    // Positions are 0-based; the boundary sits between the last qualifying
    // spot and the first non-qualifying one.
    let inside = &standings[qualifier_count - 1];
    let outside = &standings[qualifier_count];
    if inside.rank != outside.rank {
        return Vec::new();
    }

    standings
        .iter()
        .filter(|s| s.rank == inside.rank)
        .map(|s| s.team)
        .collect()
}

/// The teams that lost their opening match of an elimination bracket,
/// candidates for a consolation bracket.
pub fn consolation_pool(matches: &[Match]) -> Vec<TeamId> {
    matches
        .iter()
        .filter(|m| m.branch == Branch::Winners && m.round == 1)
        .filter(|m| m.status == MatchStatus::Completed)
        .filter_map(Match::loser)
        .collect()
}
