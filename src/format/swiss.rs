//! Swiss system.
//!
//! Teams are never eliminated; each round pairs teams with equal or adjacent
//! scores against each other, avoiding repeat pairings. Round 1 pairs the
//! seed order top-down (1v2, 3v4, ...). Only the current round exists at any
//! time: the next round's pairings depend on results, so progression creates
//! it once every match of the current round is settled.
//!
//! With an odd team count the lowest-standing team without a previous bye
//! receives one each round, recorded as a pre-completed match against a bye
//! spot so standings count it as a win.

use std::collections::{HashMap, HashSet};

use crate::bracket::BracketRound;
use crate::format::{completed_match, metadata, structure_of, Advanced, GeneratedBracket};
use crate::standings::{self, ceil_log2, TieBreakConfig};
use crate::validator::ValidationWarning;
use crate::{
    seeding, Branch, Match, MatchId, MatchScore, MatchStatus, Result, SeedingOptions, Slot, Team,
    TeamId, Tournament,
};

fn rounds_for(tournament: &Tournament, team_count: usize) -> u32 {
    tournament
        .settings
        .swiss_rounds
        .unwrap_or_else(|| ceil_log2(team_count))
}

fn bye_match(id: MatchId, team: TeamId) -> Match {
    let mut m = Match::new(
        id,
        format!("Round {}", id.round()),
        [Slot::Team(team), Slot::Bye],
    );
    m.result = Some(MatchScore {
        scores: [0, 0],
        winner: team,
    });
    m.status = MatchStatus::Completed;
    m
}

pub(super) fn generate(
    tournament: &Tournament,
    teams: Vec<Team>,
    options: &SeedingOptions,
) -> GeneratedBracket {
    let seeded = seeding::seed(teams, options);
    let count = seeded.len();
    let total_rounds = rounds_for(tournament, count);

    let mut matches = Vec::with_capacity(count / 2 + 1);
    let mut index = 0;
    let mut i = 0;
    while i + 1 < count {
        let id = MatchId::new(Branch::Winners, 1, index);
        matches.push(Match::new(
            id,
            "Round 1",
            [Slot::Team(seeded[i].id), Slot::Team(seeded[i + 1].id)],
        ));
        index += 1;
        i += 2;
    }

    let mut bye_teams = Vec::new();
    let mut warnings = Vec::new();
    if i < count {
        let team = seeded[i].id;
        matches.push(bye_match(MatchId::new(Branch::Winners, 1, index), team));
        bye_teams.push(team);
        warnings.push(ValidationWarning::ByesRequired { count: 1 });
    }

    // The planned schedule: one pairing set per round.
    let total_matches = count.div_ceil(2) * total_rounds as usize;

    GeneratedBracket {
        structure: structure_of(&matches),
        metadata: metadata(tournament, total_rounds, total_matches),
        matches,
        seeded_teams: seeded,
        bye_teams,
        warnings,
    }
}

pub(super) fn advance(
    tournament: &Tournament,
    completed: MatchId,
    matches: &[Match],
) -> Result<Advanced> {
    completed_match(completed, matches)?;

    // The next round can only be paired once the current one is settled.
    if matches
        .iter()
        .any(|m| !matches!(m.status, MatchStatus::Completed | MatchStatus::Cancelled))
    {
        return Ok(Advanced::incomplete(Vec::new()));
    }

    let teams = team_ids(matches);
    let total_rounds = rounds_for(tournament, teams.len());
    let current_round = matches.iter().map(|m| m.round).max().unwrap_or(0);

    if current_round >= total_rounds {
        let final_rankings = standings::compute_for_matches(
            tournament,
            matches,
            &TieBreakConfig::for_format(tournament.format),
        );
        return Ok(Advanced {
            is_complete: true,
            final_rankings: Some(final_rankings),
            ..Advanced::incomplete(Vec::new())
        });
    }

    let round = current_round + 1;
    let mut order = standings_order(&teams, matches);

    let mut new_matches = Vec::new();
    let mut index = 0;

    // Bye first, so the pairing pool is even.
    if order.len() % 2 != 0 {
        let team = bye_recipient(&order, matches);
        order.retain(|id| *id != team);
        new_matches.push(bye_match(MatchId::new(Branch::Winners, round, index), team));
        index += 1;
    }

    let played = played_pairs(matches);
    let pairs = pair_avoiding(&mut order.clone(), &played)
        // Every rematch-free pairing is exhausted; late Swiss rounds of
        // small fields can force repeats.
        .unwrap_or_else(|| order.chunks(2).map(|p| (p[0], p[1])).collect());

    for (a, b) in pairs {
        let id = MatchId::new(Branch::Winners, round, index);
        new_matches.push(Match::new(
            id,
            format!("Round {}", round),
            [Slot::Team(a), Slot::Team(b)],
        ));
        index += 1;
    }

    let structure_updates = vec![BracketRound {
        branch: Branch::Winners,
        number: round,
        label: format!("Round {}", round),
        matches: new_matches.iter().map(|m| m.id).collect(),
    }];

    log::debug!(
        "Paired Swiss round {} with {} matches",
        round,
        new_matches.len()
    );

    Ok(Advanced {
        affected_matches: Vec::new(),
        new_matches,
        structure_updates,
        is_complete: false,
        final_rankings: None,
    })
}

pub(super) fn is_complete(tournament: &Tournament, matches: &[Match]) -> bool {
    if matches.is_empty() {
        return false;
    }

    let total_rounds = rounds_for(tournament, team_ids(matches).len());
    let current_round = matches.iter().map(|m| m.round).max().unwrap_or(0);

    current_round >= total_rounds
        && matches
            .iter()
            .all(|m| matches!(m.status, MatchStatus::Completed | MatchStatus::Cancelled))
}

/// Every team id appearing in the match list. Byes keep teams present, so
/// this recovers the full field.
fn team_ids(matches: &[Match]) -> Vec<TeamId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for m in matches {
        for id in m.slots.iter().filter_map(Slot::team) {
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Teams ordered by wins descending, breaking ties by the round 1 pairing
/// position so the order is stable across calls.
fn standings_order(teams: &[TeamId], matches: &[Match]) -> Vec<TeamId> {
    let mut wins: HashMap<TeamId, u32> = teams.iter().map(|id| (*id, 0)).collect();
    for m in matches {
        if m.status != MatchStatus::Completed {
            continue;
        }
        if let Some(winner) = m.winner() {
            *wins.entry(winner).or_default() += 1;
        }
    }

    let position: HashMap<TeamId, usize> = team_ids(matches)
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect();

    let mut order = teams.to_vec();
    order.sort_by_key(|id| (std::cmp::Reverse(wins[id]), position[id]));
    order
}

/// The lowest-standing team without a previous bye, or the lowest-standing
/// team outright once everyone has had one.
fn bye_recipient(order: &[TeamId], matches: &[Match]) -> TeamId {
    let had_bye: HashSet<TeamId> = matches
        .iter()
        .filter(|m| m.slots.contains(&Slot::Bye))
        .filter_map(|m| m.slots[0].team())
        .collect();

    order
        .iter()
        .rev()
        .find(|id| !had_bye.contains(id))
        .or_else(|| order.last())
        .copied()
        .unwrap()
}

fn played_pairs(matches: &[Match]) -> HashSet<(TeamId, TeamId)> {
    matches
        .iter()
        .filter_map(|m| {
            let a = m.slots[0].team()?;
            let b = m.slots[1].team()?;
            Some(pair_key(a, b))
        })
        .collect()
}

fn pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    (a.min(b), a.max(b))
}

/// Pairs the pool top-down without rematches, backtracking when a choice
/// leaves the remainder unpairable. Returns `None` if no rematch-free
/// pairing exists at all.
fn pair_avoiding(
    pool: &mut Vec<TeamId>,
    played: &HashSet<(TeamId, TeamId)>,
) -> Option<Vec<(TeamId, TeamId)>> {
    let mut out = Vec::with_capacity(pool.len() / 2);
    if backtrack(pool, played, &mut out) {
        Some(out)
    } else {
        None
    }
}

fn backtrack(
    pool: &mut Vec<TeamId>,
    played: &HashSet<(TeamId, TeamId)>,
    out: &mut Vec<(TeamId, TeamId)>,
) -> bool {
    if pool.is_empty() {
        return true;
    }

    let first = pool.remove(0);
    for i in 0..pool.len() {
        let candidate = pool[i];
        if played.contains(&pair_key(first, candidate)) {
            continue;
        }

        pool.remove(i);
        out.push((first, candidate));
        if backtrack(pool, played, out) {
            return true;
        }
        out.pop();
        pool.insert(i, candidate);
    }

    pool.insert(0, first);
    false
}
