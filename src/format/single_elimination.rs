//! Single elimination.
//!
//! The bracket size is the next power of two at or above the team count.
//! Round 1 pairs seed 1 against seed N, seed 2 against seed N-1 and so on,
//! keeping the top seeds apart for as long as possible. Pairings against a
//! missing seed are byes: they are not emitted as matches, the bye holder is
//! written directly into its round 2 spot. Every later round exists from
//! generation as a skeleton of `WinnerOf` spots which progression resolves
//! in place, so the match count is always `teams - 1`.
//!
//! Barrage and consolation brackets reuse this module over a team subset
//! with a different branch tag.

use crate::bracket::elimination_label;
use crate::format::{
    completed_match, metadata, resolve_references, structure_of, Advanced, GeneratedBracket,
};
use crate::standings::{self, TieBreakConfig};
use crate::validator::ValidationWarning;
use crate::{
    seeding, Branch, Match, MatchId, MatchStatus, Result, SeedingOptions, Slot, StructuralError,
    Team, Tournament,
};

/// Returns the seed numbers in bracket-slot order for a bracket of `size`
/// (a power of two): consecutive pairs are the round 1 pairings, and the
/// recursive doubling keeps seeds 1 and 2 in opposite halves.
pub(super) fn slot_seeds(size: usize) -> Vec<u32> {
    let mut order = vec![1u32];
    let mut len = 1;
    while len < size {
        len *= 2;
        let mut next = Vec::with_capacity(len);
        for seed in &order {
            next.push(*seed);
            next.push(len as u32 + 1 - *seed);
        }
        order = next;
    }
    order
}

fn label(branch: Branch, teams_left: usize) -> String {
    let base = elimination_label(teams_left);
    match branch {
        Branch::Barrage => format!("Barrage {}", base),
        Branch::Consolation => format!("Consolation {}", base),
        _ => base,
    }
}

pub(super) fn generate(
    tournament: &Tournament,
    teams: Vec<Team>,
    options: &SeedingOptions,
    branch: Branch,
) -> GeneratedBracket {
    let seeded = seeding::seed(teams, options);
    let size = seeded.len().next_power_of_two();
    let bye_teams = seeding::assign_byes(&seeded, size);

    let mut matches = Vec::with_capacity(seeded.len().saturating_sub(1));

    // Round 1: real pairings only. A pairing against a missing seed is a
    // bye; the present team feeds its round 2 spot directly. Two missing
    // seeds in one pairing cannot happen since byes never reach half the
    // bracket.
    let order = slot_seeds(size);
    let mut feeds: Vec<Slot> = Vec::with_capacity(size / 2);
    let mut index = 0;
    for pair in order.chunks(2) {
        let first = seeded.get(pair[0] as usize - 1).map(|t| t.id);
        let second = seeded.get(pair[1] as usize - 1).map(|t| t.id);

        match (first, second) {
            (Some(a), Some(b)) => {
                let id = MatchId::new(branch, 1, index);
                matches.push(Match::new(
                    id,
                    label(branch, size),
                    [Slot::Team(a), Slot::Team(b)],
                ));
                feeds.push(Slot::WinnerOf(id));
                index += 1;
            }
            (Some(a), None) => feeds.push(Slot::Team(a)),
            (None, Some(b)) => feeds.push(Slot::Team(b)),
            (None, None) => unreachable!("a pairing of two byes"),
        }
    }

    // Later rounds: a full skeleton of placeholder spots.
    let mut round = 2;
    while feeds.len() >= 2 {
        let mut next = Vec::with_capacity(feeds.len() / 2);
        for (i, pair) in feeds.chunks(2).enumerate() {
            let id = MatchId::new(branch, round, i as u32);
            matches.push(Match::new(
                id,
                label(branch, feeds.len()),
                [pair[0], pair[1]],
            ));
            next.push(Slot::WinnerOf(id));
        }
        feeds = next;
        round += 1;
    }

    let total_rounds = matches.iter().map(|m| m.round).max().unwrap_or(0);
    let total_matches = matches.len();

    let mut warnings = Vec::new();
    if !bye_teams.is_empty() {
        warnings.push(ValidationWarning::ByesRequired {
            count: bye_teams.len(),
        });
    }

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
    branch: Branch,
) -> Result<Advanced> {
    let source = completed_match(completed, matches)?.clone();

    let mut all = matches.to_vec();
    let affected = resolve_references(&source, &mut all);

    if affected.is_empty() && !is_final(&source, &all, branch) {
        return Err(StructuralError::MissingReference(source.id).into());
    }

    let complete = is_complete(&all, branch);
    let final_rankings = if complete {
        Some(standings::compute_for_matches(
            tournament,
            &all,
            &TieBreakConfig::for_format(tournament.format),
        ))
    } else {
        None
    };

    Ok(Advanced {
        affected_matches: affected,
        new_matches: Vec::new(),
        structure_updates: Vec::new(),
        is_complete: complete,
        final_rankings,
    })
}

fn is_final(m: &Match, matches: &[Match], branch: Branch) -> bool {
    let last_round = matches
        .iter()
        .filter(|m| m.branch == branch)
        .map(|m| m.round)
        .max()
        .unwrap_or(0);

    m.branch == branch && m.round == last_round
}

pub(super) fn is_complete(matches: &[Match], branch: Branch) -> bool {
    let Some(last_round) = matches
        .iter()
        .filter(|m| m.branch == branch)
        .map(|m| m.round)
        .max()
    else {
        return false;
    };

    matches
        .iter()
        .filter(|m| m.branch == branch && m.round == last_round)
        .all(|m| m.status == MatchStatus::Completed)
}

#[cfg(test)]
mod tests {
    use super::slot_seeds;
    use crate::standings::StandingStatus;
    use crate::tests::complete;
    use crate::{
        teams, Branch, Format, MatchId, SeedingOptions, Slot, StructuralError, TeamId, Tournament,
        TournamentId,
    };

    fn tournament() -> Tournament {
        Tournament::new(TournamentId(1), "test", Format::SingleElimination)
    }

    #[test]
    fn test_slot_seeds() {
        assert_eq!(slot_seeds(2), [1, 2]);
        assert_eq!(slot_seeds(4), [1, 4, 2, 3]);
        assert_eq!(slot_seeds(8), [1, 8, 4, 5, 2, 7, 3, 6]);
    }

    #[test]
    fn test_generate_power_of_two() {
        let t = tournament();
        let bracket = Format::SingleElimination
            .generate(&t, teams![1, 2, 3, 4, 5, 6, 7, 8], &SeedingOptions::default())
            .unwrap();

        // N - 1 matches across log2(N) rounds, no byes.
        assert_eq!(bracket.matches.len(), 7);
        assert_eq!(bracket.metadata.total_rounds, 3);
        assert!(bracket.bye_teams.is_empty());

        // Standard seeding pairing: 1v8, 4v5, 2v7, 3v6.
        let r1: Vec<_> = bracket
            .matches
            .iter()
            .filter(|m| m.round == 1)
            .map(|m| (m.slots[0], m.slots[1]))
            .collect();
        assert_eq!(
            r1,
            [
                (Slot::Team(TeamId(1)), Slot::Team(TeamId(8))),
                (Slot::Team(TeamId(4)), Slot::Team(TeamId(5))),
                (Slot::Team(TeamId(2)), Slot::Team(TeamId(7))),
                (Slot::Team(TeamId(3)), Slot::Team(TeamId(6))),
            ]
        );

        // Exactly one match has no successor: the final.
        let finals: Vec<_> = bracket.matches.iter().filter(|m| m.round == 3).collect();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].label, "Final");

        let semis: Vec<_> = bracket.matches.iter().filter(|m| m.round == 2).collect();
        assert_eq!(semis[0].label, "Semifinal");
        assert_eq!(
            semis[0].slots,
            [
                Slot::WinnerOf(MatchId::new(Branch::Winners, 1, 0)),
                Slot::WinnerOf(MatchId::new(Branch::Winners, 1, 1)),
            ]
        );
    }

    #[test]
    fn test_generate_with_byes() {
        // 5 teams: bracket size 8, byes for seeds 1-3, one real round 1
        // match (4 vs 5).
        let t = tournament();
        let bracket = Format::SingleElimination
            .generate(&t, teams![1, 2, 3, 4, 5], &SeedingOptions::default())
            .unwrap();

        assert_eq!(bracket.matches.len(), 4);
        assert_eq!(bracket.bye_teams, [TeamId(1), TeamId(2), TeamId(3)]);

        let r1: Vec<_> = bracket.matches.iter().filter(|m| m.round == 1).collect();
        assert_eq!(r1.len(), 1);
        assert_eq!(
            r1[0].slots,
            [Slot::Team(TeamId(4)), Slot::Team(TeamId(5))]
        );

        // Byes are resolved into round 2 at generation.
        let r2: Vec<_> = bracket.matches.iter().filter(|m| m.round == 2).collect();
        assert_eq!(
            r2[0].slots,
            [
                Slot::Team(TeamId(1)),
                Slot::WinnerOf(MatchId::new(Branch::Winners, 1, 0)),
            ]
        );
        assert_eq!(
            r2[1].slots,
            [Slot::Team(TeamId(2)), Slot::Team(TeamId(3))]
        );
    }

    #[test]
    fn test_advance_resolves_placeholder() {
        let t = tournament();
        let bracket = Format::SingleElimination
            .generate(&t, teams![1, 2, 3, 4, 5], &SeedingOptions::default())
            .unwrap();

        let mut matches = bracket.matches;
        let r1 = MatchId::new(Branch::Winners, 1, 0);
        complete(&mut matches, r1, TeamId(4), 2, 1);

        let advanced = Format::SingleElimination.advance(&t, r1, &matches).unwrap();
        assert!(!advanced.is_complete);
        assert!(advanced.new_matches.is_empty());
        assert_eq!(advanced.affected_matches.len(), 1);

        let next = &advanced.affected_matches[0];
        assert_eq!(next.id, MatchId::new(Branch::Winners, 2, 0));
        assert_eq!(
            next.slots,
            [Slot::Team(TeamId(1)), Slot::Team(TeamId(4))]
        );
        assert!(next.is_ready());
    }

    #[test]
    fn test_advance_structural_errors() {
        let t = tournament();
        let bracket = Format::SingleElimination
            .generate(&t, teams![1, 2, 3, 4], &SeedingOptions::default())
            .unwrap();
        let matches = bracket.matches;

        let r1 = MatchId::new(Branch::Winners, 1, 0);
        let err = Format::SingleElimination
            .advance(&t, r1, &matches)
            .unwrap_err();
        assert_eq!(
            err,
            StructuralError::NotCompleted(r1).into()
        );

        let unknown = MatchId::new(Branch::Winners, 9, 0);
        let err = Format::SingleElimination
            .advance(&t, unknown, &matches)
            .unwrap_err();
        assert_eq!(err, StructuralError::UnknownMatch(unknown).into());
    }

    #[test]
    fn test_full_run_to_champion() {
        let t = tournament();
        let bracket = Format::SingleElimination
            .generate(&t, teams![1, 2, 3, 4], &SeedingOptions::default())
            .unwrap();
        let mut matches = bracket.matches;

        // Round 1: 1v4, 2v3.
        for (id, winner) in [
            (MatchId::new(Branch::Winners, 1, 0), TeamId(1)),
            (MatchId::new(Branch::Winners, 1, 1), TeamId(2)),
        ] {
            complete(&mut matches, id, winner, 2, 0);
            let advanced = Format::SingleElimination.advance(&t, id, &matches).unwrap();
            for m in advanced.affected_matches {
                let slot = matches.iter_mut().find(|x| x.id == m.id).unwrap();
                *slot = m;
            }
        }

        let final_id = MatchId::new(Branch::Winners, 2, 0);
        assert_eq!(
            matches.iter().find(|m| m.id == final_id).unwrap().slots,
            [Slot::Team(TeamId(1)), Slot::Team(TeamId(2))]
        );

        complete(&mut matches, final_id, TeamId(1), 3, 2);
        let advanced = Format::SingleElimination
            .advance(&t, final_id, &matches)
            .unwrap();

        assert!(advanced.is_complete);
        let rankings = advanced.final_rankings.unwrap();
        assert_eq!(rankings[0].team, TeamId(1));
        assert_eq!(rankings[0].status, StandingStatus::Champion);
        // Single elimination: one loss eliminates.
        assert!(rankings[1..]
            .iter()
            .all(|s| s.status == StandingStatus::Eliminated));
    }

    #[test]
    fn test_final_winner_outranks_higher_scoring_finalist() {
        // With byes both finalists can end on equal wins; the final's own
        // result must decide the title regardless of score margins.
        let t = tournament();
        let bracket = Format::SingleElimination
            .generate(&t, teams![1, 2, 3, 4, 5], &SeedingOptions::default())
            .unwrap();
        let mut matches = bracket.matches;

        // Team 4 blows out 5 and 1, team 2 edges 3, then 2 edges 4 in the
        // final. Teams 2 and 4 both finish on two wins, with team 4 far
        // ahead on points.
        for (id, winner, score_w, score_l) in [
            (MatchId::new(Branch::Winners, 1, 0), TeamId(4), 21, 0),
            (MatchId::new(Branch::Winners, 2, 0), TeamId(4), 21, 0),
            (MatchId::new(Branch::Winners, 2, 1), TeamId(2), 11, 10),
            (MatchId::new(Branch::Winners, 3, 0), TeamId(2), 11, 10),
        ] {
            complete(&mut matches, id, winner, score_w, score_l);
            let advanced = Format::SingleElimination.advance(&t, id, &matches).unwrap();
            for m in advanced.affected_matches {
                let mid = m.id;
                *matches.iter_mut().find(|x| x.id == mid).unwrap() = m;
            }
            if id == MatchId::new(Branch::Winners, 3, 0) {
                let rankings = advanced.final_rankings.unwrap();
                assert_eq!(rankings[0].team, TeamId(2));
                assert_eq!(rankings[0].status, StandingStatus::Champion);
                assert_eq!(rankings[1].team, TeamId(4));
                assert_eq!(rankings[1].status, StandingStatus::Eliminated);
            }
        }
    }
}
