//! Round robin.
//!
//! Every team plays every other team exactly once. The schedule is built
//! with the circle method: one seat is fixed and the remaining seats rotate
//! by one position per round, which yields `n - 1` rounds for an even team
//! count. For an odd count a ghost seat joins the rotation; the team paired
//! against it simply sits the round out, no bye match is emitted.
//!
//! The whole schedule is concrete at generation. Progression never resolves
//! or creates anything, it only tallies completion.

use crate::format::{completed_match, metadata, structure_of, Advanced, GeneratedBracket};
use crate::standings::{self, TieBreakConfig};
use crate::{
    seeding, Branch, Match, MatchId, MatchStatus, Result, SeedingOptions, Slot, Team, Tournament,
};

pub(super) fn generate(
    tournament: &Tournament,
    teams: Vec<Team>,
    options: &SeedingOptions,
) -> GeneratedBracket {
    let seeded = seeding::seed(teams, options);
    let count = seeded.len();

    // The ghost seat, when present, takes the last rotation position.
    let seats = if count % 2 == 0 { count } else { count + 1 };
    let rounds = seats - 1;
    let ghost = if count % 2 == 0 { None } else { Some(count) };

    let mut matches = Vec::with_capacity(count * (count - 1) / 2);
    for round in 0..rounds {
        let mut index = 0;
        for i in 0..seats / 2 {
            let home = seat(i, round, seats);
            let away = seat(seats - 1 - i, round, seats);

            if Some(home) == ghost || Some(away) == ghost {
                continue;
            }

            let id = MatchId::new(Branch::Winners, round as u32 + 1, index);
            matches.push(Match::new(
                id,
                format!("Round {}", round + 1),
                [
                    Slot::Team(seeded[home].id),
                    Slot::Team(seeded[away].id),
                ],
            ));
            index += 1;
        }
    }

    let total_matches = matches.len();

    GeneratedBracket {
        structure: structure_of(&matches),
        metadata: metadata(tournament, rounds as u32, total_matches),
        matches,
        seeded_teams: seeded,
        bye_teams: Vec::new(),
        warnings: Vec::new(),
    }
}

/// The rotation position of `seat` in `round`. Seat 0 is fixed, the rest
/// shift by one per round.
fn seat(seat: usize, round: usize, seats: usize) -> usize {
    if seat == 0 {
        0
    } else {
        1 + (seat - 1 + round) % (seats - 1)
    }
}

pub(super) fn advance(
    tournament: &Tournament,
    completed: MatchId,
    matches: &[Match],
) -> Result<Advanced> {
    // No spot ever references another match here; the step only checks
    // integrity and detects completion.
    completed_match(completed, matches)?;

    let complete = is_complete(matches);
    let final_rankings = complete.then(|| {
        standings::compute_for_matches(
            tournament,
            matches,
            &TieBreakConfig::for_format(tournament.format),
        )
    });

    Ok(Advanced {
        is_complete: complete,
        final_rankings,
        ..Advanced::incomplete(Vec::new())
    })
}

pub(super) fn is_complete(matches: &[Match]) -> bool {
    // Cancelled fixtures are terminal: they no longer block completion.
    !matches.is_empty()
        && matches
            .iter()
            .all(|m| matches!(m.status, MatchStatus::Completed | MatchStatus::Cancelled))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::standings::StandingStatus;
    use crate::tests::complete;
    use crate::{teams, Format, MatchStatus, SeedingOptions, TeamId, Tournament, TournamentId};

    fn tournament() -> Tournament {
        Tournament::new(TournamentId(1), "test", Format::RoundRobin)
    }

    #[test]
    fn test_generate_even() {
        let t = tournament();
        let bracket = Format::RoundRobin
            .generate(&t, teams![1, 2, 3, 4], &SeedingOptions::default())
            .unwrap();

        assert_eq!(bracket.matches.len(), 6);
        assert_eq!(bracket.metadata.total_rounds, 3);
        assert!(bracket.bye_teams.is_empty());

        // Every pair meets exactly once.
        let mut pairs = HashSet::new();
        for m in &bracket.matches {
            let a = m.slots[0].team().unwrap().0;
            let b = m.slots[1].team().unwrap().0;
            assert!(pairs.insert((a.min(b), a.max(b))));
        }
        assert_eq!(pairs.len(), 6);

        // Every team plays exactly once per round.
        for round in 1..=3 {
            let mut seen = HashSet::new();
            for m in bracket.matches.iter().filter(|m| m.round == round) {
                for slot in &m.slots {
                    assert!(seen.insert(slot.team().unwrap()));
                }
            }
            assert_eq!(seen.len(), 4);
        }
    }

    #[test]
    fn test_generate_odd() {
        let t = tournament();
        let bracket = Format::RoundRobin
            .generate(&t, teams![1, 2, 3, 4, 5], &SeedingOptions::default())
            .unwrap();

        // 5 teams: 5 rounds of 2 matches, one team idle per round.
        assert_eq!(bracket.matches.len(), 10);
        assert_eq!(bracket.metadata.total_rounds, 5);

        for round in 1..=5 {
            let in_round: Vec<_> = bracket
                .matches
                .iter()
                .filter(|m| m.round == round)
                .collect();
            assert_eq!(in_round.len(), 2);
        }

        // Each team plays 4 matches in total.
        for id in 1..=5u64 {
            let played = bracket
                .matches
                .iter()
                .filter(|m| m.slot_of(TeamId(id)).is_some())
                .count();
            assert_eq!(played, 4);
        }
    }

    #[test]
    fn test_advance_to_completion() {
        let t = tournament();
        let bracket = Format::RoundRobin
            .generate(&t, teams![1, 2, 3], &SeedingOptions::default())
            .unwrap();
        let mut matches = bracket.matches;

        let schedule: Vec<_> = matches
            .iter()
            .map(|m| (m.id, m.slots[0].team().unwrap()))
            .collect();

        let mut last = None;
        for (id, winner) in schedule {
            complete(&mut matches, id, winner, 21, 15);
            let advanced = Format::RoundRobin.advance(&t, id, &matches).unwrap();
            assert!(advanced.affected_matches.is_empty());
            assert!(advanced.new_matches.is_empty());
            last = Some(advanced);
        }

        let advanced = last.unwrap();
        assert!(advanced.is_complete);

        let rankings = advanced.final_rankings.unwrap();
        assert_eq!(rankings.len(), 3);
        assert_eq!(rankings[0].rank, 1);
        assert_eq!(rankings[0].status, StandingStatus::Champion);
    }

    #[test]
    fn test_cancelled_match_does_not_block_completion() {
        let t = tournament();
        let bracket = Format::RoundRobin
            .generate(&t, teams![1, 2, 3, 4], &SeedingOptions::default())
            .unwrap();
        let mut matches = bracket.matches;

        // One fixture falls through; everything else is played.
        matches[0].status = MatchStatus::Cancelled;

        let remaining: Vec<_> = matches
            .iter()
            .skip(1)
            .map(|m| (m.id, m.slots[0].team().unwrap()))
            .collect();
        let last = remaining.last().unwrap().0;
        for (id, winner) in remaining {
            complete(&mut matches, id, winner, 9, 3);
        }

        assert!(Format::RoundRobin.is_complete(&t, &matches));

        let advanced = Format::RoundRobin.advance(&t, last, &matches).unwrap();
        assert!(advanced.is_complete);

        // The cancelled fixture contributes nothing to the tallies.
        let rankings = advanced.final_rankings.unwrap();
        let total_played: u32 = rankings.iter().map(|s| s.played).sum();
        assert_eq!(total_played, 10);
    }
}
