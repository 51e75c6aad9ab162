//! Double elimination.
//!
//! Two brackets: the winner's bracket is a regular single elimination tree,
//! and every loser drops into the loser's bracket, which alternates between
//! minor rounds (loser's bracket survivors pair up) and major rounds (the
//! survivors meet the teams freshly dropped from the winner's bracket). The
//! drop order is reversed on alternating major rounds to delay rematches.
//! Both bracket champions meet in the grand final. If the loser's bracket
//! champion wins it, both teams stand at one loss and a single bracket reset
//! match decides the tournament; that match is created by progression only
//! when the upset actually happens.
//!
//! Byes collapse the same way as in single elimination: a pairing with only
//! one present side never becomes a match, the present side feeds through.

use crate::bracket::elimination_label;
use crate::format::single_elimination::slot_seeds;
use crate::format::{
    completed_match, metadata, resolve_references, structure_of, Advanced, GeneratedBracket,
};
use crate::standings::{self, TieBreakConfig};
use crate::validator::ValidationWarning;
use crate::{
    seeding, Branch, Match, MatchId, MatchStatus, Result, SeedingOptions, Slot, StructuralError,
    Team, Tournament,
};

const GRAND_FINAL: &str = "Grand Final";
const BRACKET_RESET: &str = "Bracket Reset";

pub(super) fn generate(
    tournament: &Tournament,
    teams: Vec<Team>,
    options: &SeedingOptions,
) -> GeneratedBracket {
    let seeded = seeding::seed(teams, options);
    let size = seeded.len().next_power_of_two();
    let wb_rounds = size.trailing_zeros();
    let bye_teams = seeding::assign_byes(&seeded, size);

    let mut matches = Vec::new();

    // Winner's bracket round 1, keeping the bye positions: the loser's
    // bracket needs to know which drop spots never materialize.
    let order = slot_seeds(size);
    let mut wb_feeds: Vec<Slot> = Vec::with_capacity(size / 2);
    let mut drops: Vec<Option<Slot>> = Vec::with_capacity(size / 2);
    let mut index = 0;
    for pair in order.chunks(2) {
        let first = seeded.get(pair[0] as usize - 1).map(|t| t.id);
        let second = seeded.get(pair[1] as usize - 1).map(|t| t.id);

        match (first, second) {
            (Some(a), Some(b)) => {
                let id = MatchId::new(Branch::Winners, 1, index);
                matches.push(Match::new(
                    id,
                    elimination_label(size),
                    [Slot::Team(a), Slot::Team(b)],
                ));
                wb_feeds.push(Slot::WinnerOf(id));
                drops.push(Some(Slot::LoserOf(id)));
                index += 1;
            }
            (Some(a), None) => {
                wb_feeds.push(Slot::Team(a));
                drops.push(None);
            }
            (None, Some(b)) => {
                wb_feeds.push(Slot::Team(b));
                drops.push(None);
            }
            (None, None) => unreachable!("a pairing of two byes"),
        }
    }

    // Remaining winner's bracket rounds, plus the loser's bracket built in
    // lockstep: each winner's bracket round past the first feeds its losers
    // into a major round.
    let mut survivors = collapse(&drops, 1, &mut matches, lb_label(1, wb_rounds));

    for wb_round in 2..=wb_rounds {
        let mut next = Vec::with_capacity(wb_feeds.len() / 2);
        let mut drops = Vec::with_capacity(wb_feeds.len() / 2);
        for (i, pair) in wb_feeds.chunks(2).enumerate() {
            let id = MatchId::new(Branch::Winners, wb_round, i as u32);
            matches.push(Match::new(
                id,
                elimination_label(wb_feeds.len()),
                [pair[0], pair[1]],
            ));
            next.push(Slot::WinnerOf(id));
            drops.push(Some(Slot::LoserOf(id)));
        }
        wb_feeds = next;

        // Alternate the drop order so early winner's bracket opponents land
        // in opposite halves of the loser's bracket.
        if wb_round % 2 == 0 {
            drops.reverse();
        }

        let major = 2 * (wb_round - 1);
        let interleaved: Vec<Option<Slot>> = survivors
            .iter()
            .zip(&drops)
            .flat_map(|(s, d)| [*s, *d])
            .collect();
        survivors = collapse(&interleaved, major, &mut matches, lb_label(major, wb_rounds));

        if wb_round < wb_rounds {
            let minor = major + 1;
            survivors = collapse(&survivors, minor, &mut matches, lb_label(minor, wb_rounds));
        }
    }

    // Both feeds are guaranteed present: the winner's bracket always has a
    // final, and the last major round always emits a match.
    let gf = MatchId::new(Branch::Winners, wb_rounds + 1, 0);
    matches.push(Match::new(
        gf,
        GRAND_FINAL,
        [wb_feeds[0], survivors[0].unwrap()],
    ));

    let structure = structure_of(&matches);
    let total_rounds = structure.rounds.len() as u32;
    let total_matches = matches.len();

    let mut warnings = Vec::new();
    if !bye_teams.is_empty() {
        warnings.push(ValidationWarning::ByesRequired {
            count: bye_teams.len(),
        });
    }

    GeneratedBracket {
        structure,
        metadata: metadata(tournament, total_rounds, total_matches),
        matches,
        seeded_teams: seeded,
        bye_teams,
        warnings,
    }
}

fn lb_label(round: u32, wb_rounds: u32) -> String {
    if round == 2 * (wb_rounds - 1) {
        "Losers Final".to_owned()
    } else {
        format!("Losers Round {}", round)
    }
}

/// Pairs consecutive feeds into loser's bracket matches. A pair with one
/// absent side collapses: the present side feeds through without a match.
fn collapse(
    feeds: &[Option<Slot>],
    round: u32,
    matches: &mut Vec<Match>,
    label: String,
) -> Vec<Option<Slot>> {
    let mut next = Vec::with_capacity(feeds.len() / 2);
    let mut index = 0;
    for pair in feeds.chunks(2) {
        let survivor = match (pair[0], pair[1]) {
            (Some(a), Some(b)) => {
                let id = MatchId::new(Branch::Losers, round, index);
                matches.push(Match::new(id, label.clone(), [a, b]));
                index += 1;
                Some(Slot::WinnerOf(id))
            }
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        next.push(survivor);
    }
    next
}

pub(super) fn advance(
    tournament: &Tournament,
    completed: MatchId,
    matches: &[Match],
) -> Result<Advanced> {
    let source = completed_match(completed, matches)?.clone();

    if source.label == GRAND_FINAL {
        return advance_grand_final(tournament, &source, matches);
    }

    if source.label == BRACKET_RESET {
        return Ok(Advanced {
            is_complete: true,
            final_rankings: Some(final_rankings(tournament, matches)),
            ..Advanced::incomplete(Vec::new())
        });
    }

    let mut all = matches.to_vec();
    let affected = resolve_references(&source, &mut all);

    // Every match short of the grand final feeds a winner spot and, for
    // winner's bracket matches, usually a loser spot too.
    if affected.is_empty() {
        return Err(StructuralError::MissingReference(source.id).into());
    }

    Ok(Advanced::incomplete(affected))
}

fn advance_grand_final(
    tournament: &Tournament,
    source: &Match,
    matches: &[Match],
) -> Result<Advanced> {
    // Spot 0 holds the winner's bracket champion.
    let upset = source.winner() != source.slots[0].team();

    if !upset {
        return Ok(Advanced {
            is_complete: true,
            final_rankings: Some(final_rankings(tournament, matches)),
            ..Advanced::incomplete(Vec::new())
        });
    }

    let reset = MatchId::new(Branch::Winners, source.round + 1, 0);
    if matches.iter().any(|m| m.label == BRACKET_RESET) {
        return Err(StructuralError::AlreadyResolved {
            target: reset,
            reference: source.id,
        }
        .into());
    }

    log::debug!("Grand final upset; creating bracket reset match");

    let reset = Match::new(reset, BRACKET_RESET, source.slots);
    let structure_updates = vec![crate::bracket::BracketRound {
        branch: Branch::Winners,
        number: reset.round,
        label: BRACKET_RESET.to_owned(),
        matches: vec![reset.id],
    }];

    Ok(Advanced {
        affected_matches: Vec::new(),
        new_matches: vec![reset],
        structure_updates,
        is_complete: false,
        final_rankings: None,
    })
}

fn final_rankings(tournament: &Tournament, matches: &[Match]) -> Vec<standings::Standing> {
    standings::compute_for_matches(
        tournament,
        matches,
        &TieBreakConfig::for_format(tournament.format),
    )
}

pub(super) fn is_complete(matches: &[Match]) -> bool {
    if let Some(reset) = matches.iter().find(|m| m.label == BRACKET_RESET) {
        return reset.status == MatchStatus::Completed;
    }

    // Without a reset, done iff the winner's bracket champion took the
    // grand final.
    match matches.iter().find(|m| m.label == GRAND_FINAL) {
        Some(gf) => {
            gf.status == MatchStatus::Completed && gf.winner().is_some() && gf.winner() == gf.slots[0].team()
        }
        None => false,
    }
}
