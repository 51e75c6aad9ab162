//! # Constraint validation
//!
//! Checks whether a team set is legal for a chosen format before any bracket
//! is generated. Errors block generation; warnings and suggestions accompany
//! a successful result and never block.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::format::FormatConstraints;
use crate::{Team, TeamId, Tournament};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A fatal input-legality error. Generation must not proceed while any of
/// these are present.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValidationError {
    #[error("{found} team(s) given but the format requires at least {min}")]
    TooFewTeams { found: usize, min: usize },
    #[error("{found} team(s) given but the format allows at most {max}")]
    TooManyTeams { found: usize, max: usize },
    #[error("duplicate team id {0}")]
    DuplicateTeam(TeamId),
    #[error("team {team} has {found} member(s) but the tournament requires {expected} per team")]
    WrongTeamSize {
        team: TeamId,
        found: usize,
        expected: usize,
    },
    #[error("an odd team count ({0}) is not supported by this format")]
    OddTeamCount(usize),
    #[error("{found} round(s) configured but the format allows at most {max}")]
    TooManyRounds { found: u32, max: u32 },
}

/// A non-fatal observation about the team set.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValidationWarning {
    /// The team count works, but the format prefers another count nearby.
    NonPreferredTeamCount { found: usize, nearest: usize },
    /// The bracket cannot be filled exactly; byes will be granted.
    ByesRequired { count: usize },
}

impl Display for ValidationWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPreferredTeamCount { found, nearest } => write!(
                f,
                "{} teams is not a preferred count for this format (nearest: {})",
                found, nearest
            ),
            Self::ByesRequired { count } => {
                write!(f, "{} bye(s) will be granted to the top seeds", count)
            }
        }
    }
}

/// The outcome of validating a team set against a format.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValidatorReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub suggestions: Vec<String>,
}

impl ValidatorReport {
    /// Returns `true` if generation may proceed.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates `teams` against the given format constraints.
pub fn validate(
    tournament: &Tournament,
    teams: &[Team],
    constraints: &FormatConstraints,
) -> ValidatorReport {
    let mut report = ValidatorReport::default();
    let count = teams.len();

    if count < constraints.min_teams {
        report.errors.push(ValidationError::TooFewTeams {
            found: count,
            min: constraints.min_teams,
        });
    }

    if let Some(max) = constraints.max_teams {
        if count > max {
            report
                .errors
                .push(ValidationError::TooManyTeams { found: count, max });
        }
    }

    let mut seen = HashSet::with_capacity(count);
    for team in teams {
        if !seen.insert(team.id) {
            report.errors.push(ValidationError::DuplicateTeam(team.id));
        }
    }

    if let Some(expected) = tournament.players_per_team {
        for team in teams {
            if team.members.len() != expected {
                report.errors.push(ValidationError::WrongTeamSize {
                    team: team.id,
                    found: team.members.len(),
                    expected,
                });
            }
        }
    }

    if count % 2 != 0 && !constraints.supports_odd_team_count && !constraints.supports_byes {
        report.errors.push(ValidationError::OddTeamCount(count));
    }

    if let (Some(found), Some(max)) = (tournament.settings.swiss_rounds, constraints.max_rounds) {
        if found > max {
            report
                .errors
                .push(ValidationError::TooManyRounds { found, max });
        }
    }

    // A non-preferred count is only worth a warning when no bound already
    // rejected it.
    if report.is_valid() && !constraints.preferred_team_counts.contains(&count) {
        if let Some(nearest) = nearest_preferred(constraints.preferred_team_counts, count) {
            report.warnings.push(ValidationWarning::NonPreferredTeamCount {
                found: count,
                nearest,
            });
            report
                .suggestions
                .push(format!("consider adjusting to {} teams", nearest));
        }
    }

    if report.is_valid()
        && count % 2 != 0
        && !constraints.supports_odd_team_count
        && constraints.supports_byes
    {
        report
            .warnings
            .push(ValidationWarning::ByesRequired { count: 1 });
    }

    if !report.is_valid() {
        log::debug!(
            "Validation of {} teams failed with {} error(s)",
            count,
            report.errors.len()
        );
    }

    report
}

fn nearest_preferred(preferred: &[usize], count: usize) -> Option<usize> {
    preferred
        .iter()
        .copied()
        .min_by_key(|p| p.abs_diff(count))
}
