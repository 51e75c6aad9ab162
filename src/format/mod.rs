//! # Tournament formats
//!
//! The closed set of tournament systems supported by the engine. Every
//! operation dispatches through [`Format`] with an exhaustive match, so
//! adding an operation forces every format to handle it.

mod barrage;
mod double_elimination;
mod round_robin;
mod single_elimination;
mod swiss;

pub use barrage::{consolation_pool, qualification_pool};

use crate::bracket::{BracketMetadata, BracketRound, BracketStructure};
use crate::standings::{Standing, TieBreakConfig};
use crate::validator::{self, ValidationWarning, ValidatorReport};
use crate::{
    Branch, Error, Match, MatchId, MatchStatus, Result, SeedingOptions, StructuralError, Team,
    TeamId, Tournament,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A tournament system.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Format {
    #[default]
    SingleElimination,
    DoubleElimination,
    Swiss,
    RoundRobin,
    /// A qualification bracket played by a subset of teams tied at a
    /// qualification boundary. Single elimination over that subset.
    Barrage,
    /// A placement bracket played by teams eliminated early. Single
    /// elimination over that subset.
    Consolation,
}

/// The legality constraints a format declares for its team sets.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormatConstraints {
    pub min_teams: usize,
    pub max_teams: Option<usize>,
    pub preferred_team_counts: &'static [usize],
    pub supports_odd_team_count: bool,
    pub supports_byes: bool,
    pub max_rounds: Option<u32>,
}

/// The initial bracket produced by [`Format::generate`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeneratedBracket {
    pub matches: Vec<Match>,
    pub structure: BracketStructure,
    pub metadata: BracketMetadata,
    /// The input teams in seed order, with seed numbers assigned.
    pub seeded_teams: Vec<Team>,
    /// The teams granted an automatic advancement into round 2.
    pub bye_teams: Vec<TeamId>,
    pub warnings: Vec<ValidationWarning>,
}

/// The progression result of [`Format::advance`]. Shaped for the persistence
/// and broadcast collaborators: the engine performs neither storage nor
/// fan-out itself.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Advanced {
    /// Existing matches whose spots were resolved by this progression step.
    pub affected_matches: Vec<Match>,
    /// Matches that did not exist before this step (later Swiss rounds, the
    /// double elimination bracket reset).
    pub new_matches: Vec<Match>,
    /// Bracket rounds added by this step.
    pub structure_updates: Vec<BracketRound>,
    pub is_complete: bool,
    /// Final standings, present exactly when `is_complete` is `true`.
    pub final_rankings: Option<Vec<Standing>>,
}

impl Advanced {
    pub(crate) fn incomplete(affected: Vec<Match>) -> Self {
        Self {
            affected_matches: affected,
            new_matches: Vec::new(),
            structure_updates: Vec::new(),
            is_complete: false,
            final_rankings: None,
        }
    }
}

impl Format {
    /// Returns the legality constraints this format declares.
    pub fn constraints(&self) -> FormatConstraints {
        match self {
            Self::SingleElimination => FormatConstraints {
                min_teams: 2,
                max_teams: None,
                preferred_team_counts: &[4, 8, 16, 32, 64],
                supports_odd_team_count: false,
                supports_byes: true,
                max_rounds: None,
            },
            Self::DoubleElimination => FormatConstraints {
                min_teams: 4,
                max_teams: None,
                preferred_team_counts: &[4, 8, 16, 32],
                supports_odd_team_count: false,
                supports_byes: true,
                max_rounds: None,
            },
            Self::Swiss => FormatConstraints {
                min_teams: 4,
                max_teams: None,
                preferred_team_counts: &[6, 8, 10, 12, 16, 24, 32],
                supports_odd_team_count: true,
                supports_byes: true,
                max_rounds: Some(16),
            },
            Self::RoundRobin => FormatConstraints {
                min_teams: 3,
                max_teams: Some(20),
                preferred_team_counts: &[4, 6, 8, 10],
                supports_odd_team_count: true,
                supports_byes: false,
                max_rounds: None,
            },
            Self::Barrage => FormatConstraints {
                min_teams: 2,
                max_teams: Some(8),
                preferred_team_counts: &[2, 4, 8],
                supports_odd_team_count: false,
                supports_byes: true,
                max_rounds: None,
            },
            Self::Consolation => FormatConstraints {
                min_teams: 2,
                max_teams: Some(16),
                preferred_team_counts: &[4, 8],
                supports_odd_team_count: false,
                supports_byes: true,
                max_rounds: None,
            },
        }
    }

    /// Checks whether `teams` is a legal team set for this format.
    pub fn validate(&self, tournament: &Tournament, teams: &[Team]) -> ValidatorReport {
        validator::validate(tournament, teams, &self.constraints())
    }

    /// Builds the initial bracket for `teams`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] carrying every validation error when the
    /// team set is illegal for this format. Warnings do not fail generation;
    /// they are carried on the returned bracket.
    pub fn generate(
        &self,
        tournament: &Tournament,
        teams: Vec<Team>,
        options: &SeedingOptions,
    ) -> Result<GeneratedBracket> {
        let report = self.validate(tournament, teams.as_slice());
        if !report.is_valid() {
            return Err(Error::Rejected(report.errors));
        }

        log::debug!(
            "Generating {:?} bracket for {} teams",
            self,
            teams.len()
        );

        let mut bracket = match self {
            Self::SingleElimination => {
                single_elimination::generate(tournament, teams, options, Branch::Winners)
            }
            Self::DoubleElimination => double_elimination::generate(tournament, teams, options),
            Self::Swiss => swiss::generate(tournament, teams, options),
            Self::RoundRobin => round_robin::generate(tournament, teams, options),
            Self::Barrage => barrage::generate(tournament, teams, options, Branch::Barrage),
            Self::Consolation => barrage::generate(tournament, teams, options, Branch::Consolation),
        };

        // Warnings from validation ride along with the generated bracket.
        // Generation knows the exact bye count, so its warning supersedes
        // the validator's.
        let mut warnings = report.warnings;
        if !bracket.bye_teams.is_empty() {
            warnings.retain(|w| !matches!(w, ValidationWarning::ByesRequired { .. }));
        }
        warnings.append(&mut bracket.warnings);
        bracket.warnings = warnings;

        for warning in &bracket.warnings {
            log::warn!("{}", warning);
        }

        log::debug!(
            "Generated {:?} bracket with {} matches over {} rounds",
            self,
            bracket.metadata.total_matches,
            bracket.metadata.total_rounds
        );

        Ok(bracket)
    }

    /// Consumes the completed match with id `completed` and advances the
    /// tournament: resolves the participant spots referencing it, creates any
    /// newly unlocked matches and detects completion.
    ///
    /// Must be invoked exactly once per match transition into
    /// [`MatchStatus::Completed`]. The caller is responsible for serializing
    /// concurrent progressions of the same tournament.
    ///
    /// # Errors
    ///
    /// Returns a [`StructuralError`] when the supplied state is inconsistent:
    /// the match is unknown, not completed, missing its result, or its
    /// downstream spots were already resolved. These indicate corrupted
    /// caller state, not bad user input.
    pub fn advance(
        &self,
        tournament: &Tournament,
        completed: MatchId,
        matches: &[Match],
    ) -> Result<Advanced> {
        log::debug!("Advancing {:?} after match {}", self, completed);

        match self {
            Self::SingleElimination => {
                single_elimination::advance(tournament, completed, matches, Branch::Winners)
            }
            Self::DoubleElimination => double_elimination::advance(tournament, completed, matches),
            Self::Swiss => swiss::advance(tournament, completed, matches),
            Self::RoundRobin => round_robin::advance(tournament, completed, matches),
            Self::Barrage => {
                single_elimination::advance(tournament, completed, matches, Branch::Barrage)
            }
            Self::Consolation => {
                single_elimination::advance(tournament, completed, matches, Branch::Consolation)
            }
        }
    }

    /// Returns `true` if the tournament has concluded.
    pub fn is_complete(&self, tournament: &Tournament, matches: &[Match]) -> bool {
        match self {
            Self::SingleElimination => single_elimination::is_complete(matches, Branch::Winners),
            Self::DoubleElimination => double_elimination::is_complete(matches),
            Self::Swiss => swiss::is_complete(tournament, matches),
            Self::RoundRobin => round_robin::is_complete(matches),
            Self::Barrage => single_elimination::is_complete(matches, Branch::Barrage),
            Self::Consolation => single_elimination::is_complete(matches, Branch::Consolation),
        }
    }

    /// The tie-break chain used for this format's standings when the caller
    /// does not configure one.
    pub fn default_tie_breaks(&self) -> TieBreakConfig {
        TieBreakConfig::for_format(*self)
    }
}

/// Shared structural checks for `advance`: the match must exist, be
/// completed, carry a result, and its winner must occupy one of its spots.
pub(crate) fn completed_match(id: MatchId, matches: &[Match]) -> Result<&Match> {
    let m = matches
        .iter()
        .find(|m| m.id == id)
        .ok_or(StructuralError::UnknownMatch(id))?;

    if m.status != MatchStatus::Completed {
        return Err(StructuralError::NotCompleted(id).into());
    }

    let result = m.result.ok_or(StructuralError::MissingResult(id))?;

    if m.slot_of(result.winner).is_none() {
        return Err(StructuralError::ForeignWinner {
            id,
            team: result.winner,
        }
        .into());
    }

    // A bye spot is fine (pre-completed bye matches), a pending reference
    // is not.
    if m.slots.iter().any(|s| s.is_pending()) {
        return Err(StructuralError::UnresolvedSlot(id).into());
    }

    Ok(m)
}

/// Resolves every `WinnerOf(source)`/`LoserOf(source)` spot in `matches`
/// in place. Returns the resolved copies.
pub(crate) fn resolve_references(source: &Match, matches: &mut [Match]) -> Vec<Match> {
    let winner = source.winner();
    let loser = source.loser();

    let mut affected = Vec::new();
    for m in matches.iter_mut() {
        if !m.references(source.id) {
            continue;
        }

        for slot in m.slots.iter_mut() {
            match slot {
                crate::Slot::WinnerOf(id) if *id == source.id => {
                    if let Some(winner) = winner {
                        *slot = crate::Slot::Team(winner);
                    }
                }
                crate::Slot::LoserOf(id) if *id == source.id => {
                    if let Some(loser) = loser {
                        *slot = crate::Slot::Team(loser);
                    }
                }
                _ => (),
            }
        }

        affected.push(m.clone());
    }

    affected
}

/// Computes the bracket metadata for a generated match set.
pub(crate) fn metadata(
    tournament: &Tournament,
    total_rounds: u32,
    total_matches: usize,
) -> BracketMetadata {
    BracketMetadata {
        total_rounds,
        total_matches,
        estimated_minutes: total_matches as u64
            * u64::from(tournament.settings.minutes_per_match()),
    }
}

/// Groups a flat match list into a [`BracketStructure`], preserving the
/// generation order of rounds.
pub(crate) fn structure_of(matches: &[Match]) -> BracketStructure {
    let mut structure = BracketStructure::new();
    for m in matches {
        match structure
            .rounds
            .iter_mut()
            .find(|r| r.branch == m.branch && r.number == m.round)
        {
            Some(round) => round.matches.push(m.id),
            None => structure.push_round(m.branch, m.round, m.label.clone(), vec![m.id]),
        }
    }
    structure
}
