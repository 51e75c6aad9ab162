//! # tournament-engine
//!
//! A pure, synchronous tournament format engine. Given a tournament descriptor
//! and a team list it generates a bracket, consumes match results one at a
//! time to advance the tournament, and derives standings with deterministic
//! tie-breaking. The engine holds no state and performs no I/O: every
//! operation is a function from an immutable snapshot to plain data, so it is
//! safe to call from any number of threads as long as each call receives a
//! consistent snapshot. Serializing concurrent writes to the same tournament
//! is the persistence layer's job, not the engine's.
//!
//! Important types:
//! - [`Format`]: the closed set of tournament systems. Every engine operation
//!   (`validate`, `generate`, `advance`, `is_complete`) dispatches through it.
//! - [`Team`] and [`Match`]: the records exchanged with the caller.
//! - [`Slot`]: a participant spot in a match, which is either a concrete
//!   team, a reference to a future result ("winner of match X"), or a bye.
//! - [`compute_standings`]: full recomputation of ranked standings from the
//!   match list.
//!
//! ## Feature flags
//!
//! `serde`: adds `Serialize` and `Deserialize` impls to all exchanged types.

pub mod bracket;
pub mod seeding;
pub mod standings;
pub mod validator;

mod format;
mod rng;

pub use bracket::{BracketMetadata, BracketRound, BracketStructure};
pub use format::{
    consolation_pool, qualification_pool, Advanced, Format, FormatConstraints, GeneratedBracket,
};
pub use rng::SeedRng;
pub use seeding::{SeedStrategy, SeedingOptions, TierMode};
pub use standings::{
    compute_standings, MatchOutcome, Standing, StandingStatus, TieBreak, TieBreakConfig,
};
pub use validator::{ValidationError, ValidationWarning, ValidatorReport};

use std::fmt::{self, Display, Formatter};
use std::result;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The unique identity of a team. Assigned by the caller, opaque to the
/// engine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TeamId(pub u64);

impl Display for TeamId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The unique identity of a tournament. Assigned by the caller, opaque to the
/// engine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TournamentId(pub u64);

/// The identity of a match within a tournament.
///
/// `MatchId` is structured: it packs the bracket branch, the round number and
/// the index of the match within its round. Matches created lazily during
/// progression (later Swiss rounds, the bracket reset) therefore receive
/// deterministic, collision-free ids without the engine holding any
/// id-allocator state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MatchId(u64);

impl MatchId {
    /// Creates a new `MatchId` from a branch, a 1-based round number and the
    /// 0-based index of the match within the round.
    pub const fn new(branch: Branch, round: u32, index: u32) -> Self {
        Self(((branch as u64) << 56) | ((round as u64) << 32) | index as u64)
    }

    /// Returns the branch this match belongs to.
    pub const fn branch(self) -> Branch {
        match self.0 >> 56 {
            0 => Branch::Winners,
            1 => Branch::Losers,
            2 => Branch::Consolation,
            _ => Branch::Barrage,
        }
    }

    /// Returns the 1-based round number of this match.
    pub const fn round(self) -> u32 {
        ((self.0 >> 32) & 0x00FF_FFFF) as u32
    }

    /// Returns the 0-based index of this match within its round.
    pub const fn index(self) -> u32 {
        self.0 as u32
    }
}

impl Display for MatchId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/R{}/{}",
            self.branch(),
            self.round(),
            self.index()
        )
    }
}

/// A tag distinguishing sub-brackets within a tournament.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Branch {
    /// The main (or winner's) bracket.
    #[default]
    Winners = 0,
    /// The loser's bracket of a double elimination tournament.
    Losers = 1,
    /// A placement bracket for teams eliminated early.
    Consolation = 2,
    /// A qualification bracket for teams tied at a qualification boundary.
    Barrage = 3,
}

/// A competing team.
///
/// Constructed by the caller before any engine operation. The engine only
/// ever writes the `seed` field; everything else, including the `branch` a
/// team currently occupies, is caller-maintained bookkeeping.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// The members of the team, in roster order.
    pub members: Vec<String>,
    /// Composite skill/ranking value. Lower is better.
    pub ranking: u32,
    /// Historical win percentage in `0.0..=1.0`, used as a seeding tie-break.
    pub win_pct: f64,
    /// Historical points differential, used as a seeding tie-break.
    pub points_diff: i64,
    pub club: Option<String>,
    pub region: Option<String>,
    /// The seed assigned by the seeder. 1-based; `None` until seeded.
    pub seed: Option<u32>,
    /// The sub-bracket the team currently occupies.
    pub branch: Branch,
}

impl Team {
    /// Creates a new team with the given identity and name and neutral
    /// attributes.
    pub fn new<S>(id: TeamId, name: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            id,
            name: name.into(),
            members: Vec::new(),
            ranking: 0,
            win_pct: 0.0,
            points_diff: 0,
            club: None,
            region: None,
            seed: None,
            branch: Branch::Winners,
        }
    }
}

/// A participant spot in a match.
///
/// A spot either holds a concrete team, names a future outcome of another
/// match, or marks a bye. `WinnerOf`/`LoserOf` spots are resolved in place to
/// `Team` exactly when the referenced match completes, never before.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Slot {
    Team(TeamId),
    WinnerOf(MatchId),
    LoserOf(MatchId),
    Bye,
}

impl Slot {
    /// Returns the contained team id if the spot is resolved.
    #[inline]
    pub fn team(&self) -> Option<TeamId> {
        match self {
            Self::Team(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns `true` if the spot holds a concrete team.
    #[inline]
    pub fn is_team(&self) -> bool {
        matches!(self, Self::Team(_))
    }

    /// Returns `true` if the spot is a pending reference to another match.
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::WinnerOf(_) | Self::LoserOf(_))
    }

    /// Returns the match referenced by a pending spot.
    #[inline]
    pub fn pending_on(&self) -> Option<MatchId> {
        match self {
            Self::WinnerOf(id) | Self::LoserOf(id) => Some(*id),
            _ => None,
        }
    }
}

/// The lifecycle status of a match.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MatchStatus {
    #[default]
    Scheduled,
    Active,
    Completed,
    Cancelled,
}

/// The recorded result of a played match: both scores plus the declared
/// winner.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchScore {
    /// The score of each slot, in slot order.
    pub scores: [u32; 2],
    pub winner: TeamId,
}

/// A match between two participant spots.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Match {
    pub id: MatchId,
    /// 1-based round number within the branch.
    pub round: u32,
    /// Human-readable round label, e.g. "Quarterfinal".
    pub label: String,
    pub branch: Branch,
    pub slots: [Slot; 2],
    /// `None` until the match has been played.
    pub result: Option<MatchScore>,
    pub status: MatchStatus,
}

impl Match {
    /// Creates a new scheduled match.
    pub fn new<S>(id: MatchId, label: S, slots: [Slot; 2]) -> Self
    where
        S: Into<String>,
    {
        Self {
            id,
            round: id.round(),
            label: label.into(),
            branch: id.branch(),
            slots,
            result: None,
            status: MatchStatus::Scheduled,
        }
    }

    /// Returns `true` if both spots hold concrete teams, i.e. the match can
    /// be played.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.slots[0].is_team() && self.slots[1].is_team()
    }

    /// Returns the winning team id, if the match has a result.
    #[inline]
    pub fn winner(&self) -> Option<TeamId> {
        self.result.map(|r| r.winner)
    }

    /// Returns the losing team id, if the match has a result and both spots
    /// are concrete.
    pub fn loser(&self) -> Option<TeamId> {
        let winner = self.winner()?;
        self.slots
            .iter()
            .filter_map(Slot::team)
            .find(|id| *id != winner)
    }

    /// Returns the slot index occupied by `team`, if present.
    pub fn slot_of(&self, team: TeamId) -> Option<usize> {
        self.slots.iter().position(|s| s.team() == Some(team))
    }

    /// Returns `true` if any spot references the given match.
    pub fn references(&self, id: MatchId) -> bool {
        self.slots.iter().any(|s| s.pending_on() == Some(id))
    }
}

/// Format-independent tournament settings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Settings {
    /// Number of Swiss rounds. Defaults to `ceil(log2(teams))` when unset.
    pub swiss_rounds: Option<u32>,
    /// Number of teams qualifying out of a Swiss or round robin stage. Used
    /// for mathematical elimination; no elimination is derived when unset.
    pub qualifier_count: Option<usize>,
    /// Estimated duration of a single match in minutes. Defaults to 25.
    pub match_minutes: Option<u32>,
    /// Short form halves the per-match duration estimate.
    pub short_form: bool,
}

impl Settings {
    /// The per-match duration estimate in minutes, after applying the short
    /// form adjustment.
    pub fn minutes_per_match(&self) -> u32 {
        let base = self.match_minutes.unwrap_or(25);
        if self.short_form {
            (base / 2).max(1)
        } else {
            base
        }
    }
}

/// The descriptor of a tournament, supplied by the caller on every call.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub format: Format,
    /// The declared number of players per team, e.g. `Some(2)` for doubles.
    /// Teams with a different member count fail validation. Unchecked when
    /// `None`.
    pub players_per_team: Option<usize>,
    pub settings: Settings,
}

impl Tournament {
    pub fn new<S>(id: TournamentId, name: S, format: Format) -> Self
    where
        S: Into<String>,
    {
        Self {
            id,
            name: name.into(),
            format,
            players_per_team: None,
            settings: Settings::default(),
        }
    }
}

/// A `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = result::Result<T, Error>;

/// A structural-integrity error raised by `advance`.
///
/// These indicate corrupted caller state (persisted matches that do not fit
/// the bracket), not bad user input. The caller must reconcile its stored
/// state; asking the user to change input will not help.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("match {0} does not exist in the supplied match list")]
    UnknownMatch(MatchId),
    #[error("match {0} is not completed; only completed matches can be advanced")]
    NotCompleted(MatchId),
    #[error("match {0} is completed but carries no result")]
    MissingResult(MatchId),
    #[error("winner {team} of match {id} occupies no slot of that match")]
    ForeignWinner { id: MatchId, team: TeamId },
    #[error("match {0} still has an unresolved participant spot")]
    UnresolvedSlot(MatchId),
    #[error("no spot references match {0}; the bracket structure is missing or corrupted")]
    MissingReference(MatchId),
    #[error("slot of match {target} referencing {reference} is already resolved")]
    AlreadyResolved { target: MatchId, reference: MatchId },
}

/// The top-level engine error.
///
/// Input-legality failures and structural-integrity failures are distinct
/// variants because recovery differs: re-validate user input for the former,
/// repair persisted state for the latter.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Bracket generation was rejected by the constraint validator.
    #[error("tournament rejected: {}", format_errors(.0))]
    Rejected(Vec<ValidationError>),
    #[error(transparent)]
    Structural(#[from] StructuralError),
}

fn format_errors(errors: &[ValidationError]) -> String {
    let mut out = String::new();
    for (i, err) in errors.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        out.push_str(&err.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Branch, Match, MatchId, MatchScore, MatchStatus, Slot, TeamId};

    /// Builds a `Vec<Team>` with ids and rankings `1..=n`.
    #[macro_export]
    macro_rules! teams {
        ($($id:expr),* $(,)?) => {{
            let mut teams = Vec::new();
            $(
                let mut team = $crate::Team::new($crate::TeamId($id), format!("team-{}", $id));
                team.ranking = $id as u32;
                teams.push(team);
            )*
            teams
        }};
    }

    /// Marks the match with the given id as completed with `winner` beating
    /// the other slot `score_w:score_l`.
    pub(crate) fn complete(
        matches: &mut [Match],
        id: MatchId,
        winner: TeamId,
        score_w: u32,
        score_l: u32,
    ) {
        let m = matches.iter_mut().find(|m| m.id == id).unwrap();
        let slot = m.slot_of(winner).unwrap();
        let mut scores = [score_l; 2];
        scores[slot] = score_w;
        m.result = Some(MatchScore { scores, winner });
        m.status = MatchStatus::Completed;
    }

    #[test]
    fn test_match_id_packing() {
        let id = MatchId::new(Branch::Losers, 3, 7);
        assert_eq!(id.branch(), Branch::Losers);
        assert_eq!(id.round(), 3);
        assert_eq!(id.index(), 7);

        let id = MatchId::new(Branch::Winners, 1, 0);
        assert_eq!(id.branch(), Branch::Winners);
        assert_eq!(id.round(), 1);
        assert_eq!(id.index(), 0);
    }

    #[test]
    fn test_match_winner_loser() {
        let id = MatchId::new(Branch::Winners, 1, 0);
        let mut m = Match::new(id, "Round 1", [Slot::Team(TeamId(1)), Slot::Team(TeamId(2))]);
        assert!(m.is_ready());
        assert_eq!(m.winner(), None);

        m.result = Some(MatchScore {
            scores: [3, 1],
            winner: TeamId(1),
        });
        m.status = MatchStatus::Completed;

        assert_eq!(m.winner(), Some(TeamId(1)));
        assert_eq!(m.loser(), Some(TeamId(2)));
        assert_eq!(m.slot_of(TeamId(2)), Some(1));
    }

    #[test]
    fn test_slot_pending() {
        let id = MatchId::new(Branch::Winners, 1, 0);
        let slot = Slot::WinnerOf(id);
        assert!(slot.is_pending());
        assert_eq!(slot.pending_on(), Some(id));
        assert_eq!(slot.team(), None);
        assert!(!Slot::Bye.is_pending());
    }
}
