//! # Standings
//!
//! Computes the ranked order of teams from the match list, applying a
//! configurable ordered chain of tie-break rules. Standings are always fully
//! recomputed from the matches, never incrementally patched, so corrected or
//! replayed results can never leave them drifted.

use std::collections::BTreeMap;

use crate::{Format, Match, MatchStatus, Team, TeamId, Tournament};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The length of the recent-results window kept on each standing.
pub const RECENT_WINDOW: usize = 5;

/// A single entry of a team's recent-results window.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MatchOutcome {
    Win,
    Loss,
}

/// The derived tournament status of a team.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StandingStatus {
    #[default]
    Active,
    Eliminated,
    Champion,
}

/// A team's computed standing.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Standing {
    pub team: TeamId,
    /// 1-based rank. Teams the tie-break chain cannot separate share a rank
    /// and the following rank is skipped accordingly.
    pub rank: u32,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub points_for: u32,
    pub points_against: u32,
    pub points_diff: i64,
    /// The last [`RECENT_WINDOW`] outcomes, oldest first.
    pub recent: Vec<MatchOutcome>,
    pub status: StandingStatus,
}

/// A single tie-break rule.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TieBreak {
    /// The mutual result, applied only when exactly two teams are tied and
    /// their mutual matches produce a decision.
    HeadToHead,
    /// Points differential, descending.
    PointsDiff,
    /// Points conceded, ascending.
    PointsAgainst,
    /// Sum of opponents' win counts, descending. Swiss-specific.
    Buchholz,
    /// Sum of defeated opponents' win counts, descending.
    SonnebornBerger,
    /// Average opponent win ratio, descending.
    StrengthOfSchedule,
}

/// The ordered tie-break chain applied after the primary key (wins). Applied
/// left to right until a total order is reached; tied teams share a rank
/// once the chain is exhausted.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TieBreakConfig {
    pub chain: Vec<TieBreak>,
}

impl TieBreakConfig {
    #[inline]
    pub fn new(chain: Vec<TieBreak>) -> Self {
        Self { chain }
    }

    /// The conventional chain for the given format.
    pub fn for_format(format: Format) -> Self {
        let chain = match format {
            Format::Swiss => vec![
                TieBreak::Buchholz,
                TieBreak::SonnebornBerger,
                TieBreak::PointsDiff,
            ],
            Format::RoundRobin => vec![
                TieBreak::HeadToHead,
                TieBreak::PointsDiff,
                TieBreak::PointsAgainst,
            ],
            // Elimination formats: byes can leave two finalists on equal
            // wins, and the mutual result must outweigh score margins or
            // the loser of the final could out-rank its winner.
            _ => vec![
                TieBreak::HeadToHead,
                TieBreak::PointsDiff,
                TieBreak::PointsAgainst,
            ],
        };

        Self { chain }
    }
}

impl Default for TieBreakConfig {
    fn default() -> Self {
        Self::new(vec![
            TieBreak::HeadToHead,
            TieBreak::PointsDiff,
            TieBreak::PointsAgainst,
        ])
    }
}

/// Computes standings for every team of the tournament.
///
/// Teams without any completed match are included with zeroed figures.
pub fn compute_standings(
    tournament: &Tournament,
    teams: &[Team],
    matches: &[Match],
    config: &TieBreakConfig,
) -> Vec<Standing> {
    compute(
        tournament,
        teams.iter().map(|t| t.id).collect(),
        matches,
        config,
    )
}

/// Computes standings for the teams appearing in `matches` only. Used by
/// progression, which operates without team records.
pub(crate) fn compute_for_matches(
    tournament: &Tournament,
    matches: &[Match],
    config: &TieBreakConfig,
) -> Vec<Standing> {
    compute(tournament, Vec::new(), matches, config)
}

#[derive(Clone, Debug, Default)]
struct Tally {
    played: u32,
    wins: u32,
    losses: u32,
    points_for: u32,
    points_against: u32,
    recent: Vec<MatchOutcome>,
    opponents: Vec<TeamId>,
    defeated: Vec<TeamId>,
}

fn compute(
    tournament: &Tournament,
    ids: Vec<TeamId>,
    matches: &[Match],
    config: &TieBreakConfig,
) -> Vec<Standing> {
    // BTreeMap keeps the iteration order deterministic.
    let mut tallies: BTreeMap<TeamId, Tally> = BTreeMap::new();

    for id in ids {
        tallies.entry(id).or_default();
    }
    for m in matches {
        for id in m.slots.iter().filter_map(|s| s.team()) {
            tallies.entry(id).or_default();
        }
    }

    // Tally completed matches only, in list order (the caller's chronology).
    for m in matches {
        if m.status != MatchStatus::Completed {
            continue;
        }
        let Some(result) = m.result else {
            continue;
        };

        for (i, slot) in m.slots.iter().enumerate() {
            let Some(id) = slot.team() else {
                continue;
            };
            let opponent = m.slots[1 - i].team();

            let tally = tallies.get_mut(&id).unwrap();
            tally.played += 1;
            tally.points_for += result.scores[i];
            tally.points_against += result.scores[1 - i];

            if result.winner == id {
                tally.wins += 1;
                tally.recent.push(MatchOutcome::Win);
                if let Some(opponent) = opponent {
                    tally.defeated.push(opponent);
                }
            } else {
                tally.losses += 1;
                tally.recent.push(MatchOutcome::Loss);
            }

            if let Some(opponent) = opponent {
                tally.opponents.push(opponent);
            }
        }
    }

    let team_count = tallies.len();
    let complete = tournament.format.is_complete(tournament, matches);

    // Primary key: wins, descending. Ties are grouped and handed to the
    // tie-break chain.
    let mut order: Vec<TeamId> = tallies.keys().copied().collect();
    order.sort_by(|a, b| tallies[b].wins.cmp(&tallies[a].wins).then(a.cmp(b)));

    let mut groups: Vec<Vec<TeamId>> = Vec::new();
    for id in order {
        match groups.last_mut() {
            Some(group) if tallies[&group[0]].wins == tallies[&id].wins => group.push(id),
            _ => groups.push(vec![id]),
        }
    }

    let mut resolved: Vec<Vec<TeamId>> = Vec::new();
    for group in groups {
        resolved.extend(resolve_group(group, &config.chain, &tallies, matches));
    }

    let mut standings = Vec::with_capacity(team_count);
    let mut position = 0u32;
    for group in resolved {
        let rank = position + 1;
        position += group.len() as u32;

        for id in group {
            let tally = &tallies[&id];
            let mut recent = tally.recent.clone();
            if recent.len() > RECENT_WINDOW {
                recent.drain(..recent.len() - RECENT_WINDOW);
            }

            standings.push(Standing {
                team: id,
                rank,
                played: tally.played,
                wins: tally.wins,
                losses: tally.losses,
                points_for: tally.points_for,
                points_against: tally.points_against,
                points_diff: i64::from(tally.points_for) - i64::from(tally.points_against),
                recent,
                status: StandingStatus::Active,
            });
        }
    }

    for standing in standings.iter_mut() {
        standing.status = derive_status(
            tournament,
            complete,
            standing,
            &tallies,
            team_count,
        );
    }

    standings
}

/// Orders a group of tied teams by applying the chain left to right.
/// Returns ordered sub-groups; a sub-group with multiple members is still
/// tied after the full chain and shares a rank.
fn resolve_group(
    group: Vec<TeamId>,
    chain: &[TieBreak],
    tallies: &BTreeMap<TeamId, Tally>,
    matches: &[Match],
) -> Vec<Vec<TeamId>> {
    if group.len() <= 1 || chain.is_empty() {
        return vec![group];
    }

    let (head, rest) = chain.split_first().unwrap();

    if *head == TieBreak::HeadToHead {
        if group.len() == 2 {
            if let Some(winner) = head_to_head(group[0], group[1], matches) {
                let loser = if winner == group[0] { group[1] } else { group[0] };
                return vec![vec![winner], vec![loser]];
            }
        }
        return resolve_group(group, rest, tallies, matches);
    }

    // Metric tie-breaks: higher value ranks first.
    let mut keyed: Vec<(TeamId, f64)> = group
        .into_iter()
        .map(|id| (id, metric(*head, id, tallies)))
        .collect();
    keyed.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut subgroups: Vec<Vec<TeamId>> = Vec::new();
    let mut last: Option<f64> = None;
    for (id, value) in keyed {
        match (subgroups.last_mut(), last) {
            (Some(group), Some(prev)) if prev.total_cmp(&value).is_eq() => group.push(id),
            _ => subgroups.push(vec![id]),
        }
        last = Some(value);
    }

    subgroups
        .into_iter()
        .flat_map(|g| resolve_group(g, rest, tallies, matches))
        .collect()
}

/// The mutual winner of two teams, if their completed matches against each
/// other produce a decision.
fn head_to_head(a: TeamId, b: TeamId, matches: &[Match]) -> Option<TeamId> {
    let mut wins_a = 0;
    let mut wins_b = 0;

    for m in matches {
        if m.status != MatchStatus::Completed {
            continue;
        }
        if m.slot_of(a).is_none() || m.slot_of(b).is_none() {
            continue;
        }
        match m.winner() {
            Some(w) if w == a => wins_a += 1,
            Some(w) if w == b => wins_b += 1,
            _ => (),
        }
    }

    if wins_a > wins_b {
        Some(a)
    } else if wins_b > wins_a {
        Some(b)
    } else {
        None
    }
}

fn metric(tie_break: TieBreak, id: TeamId, tallies: &BTreeMap<TeamId, Tally>) -> f64 {
    let tally = &tallies[&id];

    match tie_break {
        TieBreak::PointsDiff => {
            f64::from(tally.points_for) - f64::from(tally.points_against)
        }
        // Ascending: fewer points conceded ranks first.
        TieBreak::PointsAgainst => -f64::from(tally.points_against),
        TieBreak::Buchholz => tally
            .opponents
            .iter()
            .map(|o| f64::from(tallies[o].wins))
            .sum(),
        TieBreak::SonnebornBerger => tally
            .defeated
            .iter()
            .map(|o| f64::from(tallies[o].wins))
            .sum(),
        TieBreak::StrengthOfSchedule => {
            if tally.opponents.is_empty() {
                return 0.0;
            }
            let sum: f64 = tally
                .opponents
                .iter()
                .map(|o| {
                    let opp = &tallies[o];
                    if opp.played == 0 {
                        0.0
                    } else {
                        f64::from(opp.wins) / f64::from(opp.played)
                    }
                })
                .sum();
            sum / tally.opponents.len() as f64
        }
        TieBreak::HeadToHead => unreachable!("head-to-head is not a metric"),
    }
}

fn derive_status(
    tournament: &Tournament,
    complete: bool,
    standing: &Standing,
    tallies: &BTreeMap<TeamId, Tally>,
    team_count: usize,
) -> StandingStatus {
    if complete && standing.rank == 1 {
        return StandingStatus::Champion;
    }

    let eliminated = match tournament.format {
        Format::SingleElimination | Format::Barrage | Format::Consolation => standing.losses >= 1,
        Format::DoubleElimination => standing.losses >= 2,
        Format::Swiss | Format::RoundRobin => {
            mathematically_eliminated(tournament, standing, tallies, team_count)
        }
    };

    if eliminated {
        StandingStatus::Eliminated
    } else {
        StandingStatus::Active
    }
}

/// A team is mathematically out of qualification once more than
/// `qualifier_count - 1` teams already hold more wins than it can still
/// reach. Conservative: those teams are ahead no matter what remains.
fn mathematically_eliminated(
    tournament: &Tournament,
    standing: &Standing,
    tallies: &BTreeMap<TeamId, Tally>,
    team_count: usize,
) -> bool {
    let Some(qualifiers) = tournament.settings.qualifier_count else {
        return false;
    };

    let total_rounds = match tournament.format {
        Format::Swiss => tournament
            .settings
            .swiss_rounds
            .unwrap_or_else(|| ceil_log2(team_count)),
        _ => team_count.saturating_sub(1) as u32,
    };

    let remaining = total_rounds.saturating_sub(standing.played);
    let max_possible = standing.wins + remaining;

    let ahead = tallies
        .iter()
        .filter(|(id, tally)| **id != standing.team && tally.wins > max_possible)
        .count();

    ahead >= qualifiers
}

/// The base 2 logarithm of `n`, rounded up.
pub(crate) fn ceil_log2(n: usize) -> u32 {
    match n {
        0 => 0,
        n => n.next_power_of_two().trailing_zeros(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ceil_log2, compute_standings, MatchOutcome, StandingStatus, TieBreak, TieBreakConfig,
    };
    use crate::tests::complete;
    use crate::{teams, Format, Match, SeedingOptions, Team, TeamId, Tournament, TournamentId};

    fn round_robin(team_count: u64) -> (Tournament, Vec<Team>, Vec<Match>) {
        let t = Tournament::new(TournamentId(1), "test", Format::RoundRobin);
        let teams: Vec<Team> = (1..=team_count)
            .map(|i| {
                let mut team = Team::new(TeamId(i), format!("team-{}", i));
                team.ranking = i as u32;
                team
            })
            .collect();
        let bracket = Format::RoundRobin
            .generate(&t, teams.clone(), &SeedingOptions::default())
            .unwrap();
        (t, teams, bracket.matches)
    }

    /// Completes every match of a round robin schedule, choosing winners by
    /// the numeric pair of team ids.
    fn play_all<F>(matches: &mut Vec<Match>, mut winner_of: F)
    where
        F: FnMut(u64, u64) -> u64,
    {
        for m in matches.clone() {
            let (a, b) = (m.slots[0].team().unwrap().0, m.slots[1].team().unwrap().0);
            let winner = TeamId(winner_of(a.min(b), a.max(b)));
            complete(matches, m.id, winner, 10, 5);
        }
    }

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(8), 3);
        assert_eq!(ceil_log2(9), 4);
        assert_eq!(ceil_log2(16), 4);
    }

    #[test]
    fn test_tally_invariants() {
        let (t, teams, mut matches) = round_robin(4);

        // Play a partial schedule.
        let first_two: Vec<_> = matches
            .iter()
            .take(2)
            .map(|m| (m.id, m.slots[0].team().unwrap()))
            .collect();
        for (id, winner) in first_two {
            complete(&mut matches, id, winner, 11, 7);
        }

        let standings =
            compute_standings(&t, &teams, &matches, &TieBreakConfig::for_format(t.format));

        assert_eq!(standings.len(), 4);
        for s in &standings {
            assert_eq!(s.wins + s.losses, s.played);
            assert_eq!(
                s.points_diff,
                i64::from(s.points_for) - i64::from(s.points_against)
            );
        }
    }

    #[test]
    fn test_head_to_head_breaks_tie() {
        let (t, teams, mut matches) = round_robin(4);
        // Teams 1 and 2 both finish 2-1 with identical scores; team 1 won
        // their mutual match.
        play_all(&mut matches, |lo, hi| match (lo, hi) {
            (1, 2) => 1,
            (1, 3) => 3,
            (1, 4) => 1,
            (2, 3) => 2,
            (2, 4) => 2,
            (3, 4) => 4,
            _ => unreachable!(),
        });

        let standings = compute_standings(
            &t,
            &teams,
            &matches,
            &TieBreakConfig::new(vec![TieBreak::HeadToHead]),
        );

        assert_eq!(standings[0].team, TeamId(1));
        assert_eq!(standings[0].rank, 1);
        assert_eq!(standings[1].team, TeamId(2));
        assert_eq!(standings[1].rank, 2);
    }

    #[test]
    fn test_shared_rank_when_chain_exhausted() {
        let (t, teams, mut matches) = round_robin(4);
        // A 3-cycle among teams 1, 2, 3 who each also beat team 4, every
        // match with the same score: all three are 2-1 with identical
        // figures and no head-to-head decision.
        play_all(&mut matches, |lo, hi| match (lo, hi) {
            (1, 2) => 1,
            (2, 3) => 2,
            (1, 3) => 3,
            (_, 4) => lo,
            _ => unreachable!(),
        });

        let standings = compute_standings(
            &t,
            &teams,
            &matches,
            &TieBreakConfig::for_format(t.format),
        );

        // Ranks 1, 1, 1, 4: the tied group shares a rank and the skipped
        // ranks are not reused.
        let ranks: Vec<_> = standings.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, [1, 1, 1, 4]);
        assert_eq!(standings[3].team, TeamId(4));
    }

    #[test]
    fn test_recent_window_is_bounded() {
        let (t, teams, mut matches) = round_robin(8);
        play_all(&mut matches, |lo, _| lo);

        let standings =
            compute_standings(&t, &teams, &matches, &TieBreakConfig::default());

        // Every team played 7 matches; the window holds the last 5.
        for s in &standings {
            assert_eq!(s.played, 7);
            assert_eq!(s.recent.len(), 5);
        }
        // Team 1 won everything.
        let first = standings.iter().find(|s| s.team == TeamId(1)).unwrap();
        assert!(first.recent.iter().all(|o| *o == MatchOutcome::Win));
    }

    #[test]
    fn test_mathematical_elimination() {
        let mut t = Tournament::new(TournamentId(1), "test", Format::Swiss);
        t.settings.swiss_rounds = Some(3);
        t.settings.qualifier_count = Some(1);

        let teams = teams![1, 2, 3, 4];
        let bracket = Format::Swiss
            .generate(&t, teams.clone(), &SeedingOptions::default())
            .unwrap();
        let mut matches = bracket.matches;

        // Round 1: 1 beats 2, 3 beats 4.
        let r1: Vec<_> = matches.iter().map(|m| m.id).collect();
        complete(&mut matches, r1[0], TeamId(1), 1, 0);
        complete(&mut matches, r1[1], TeamId(3), 1, 0);
        let advanced = Format::Swiss.advance(&t, r1[1], &matches).unwrap();
        matches.extend(advanced.new_matches);

        // Round 2: 1 beats 3, 2 beats 4.
        let r2: Vec<_> = matches.iter().filter(|m| m.round == 2).map(|m| m.id).collect();
        for id in &r2 {
            let m = matches.iter().find(|m| m.id == *id).unwrap().clone();
            let winner = TeamId(m.slots[0].team().unwrap().0.min(m.slots[1].team().unwrap().0));
            complete(&mut matches, *id, winner, 1, 0);
        }

        let standings =
            compute_standings(&t, &teams, &matches, &TieBreakConfig::for_format(t.format));

        // Team 4 is 0-2 with one round left while team 1 is 2-0: with a
        // single qualifying spot, team 4 can at best reach 1 win.
        let last = standings.iter().find(|s| s.team == TeamId(4)).unwrap();
        assert_eq!(last.status, StandingStatus::Eliminated);

        let leader = standings.iter().find(|s| s.team == TeamId(1)).unwrap();
        assert_eq!(leader.status, StandingStatus::Active);
    }
}
