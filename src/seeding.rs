//! # Seeding
//!
//! Orders a set of teams according to a chosen strategy before bracket
//! construction. Seeding is a pure permutation: no team is added or dropped,
//! and the assigned seed numbers `1..=n` follow the output order.
//!
//! Randomized strategies take an optional `random_seed`; with a seed the
//! produced permutation is exactly reproducible for the same input order.

use std::cmp::Ordering;

use crate::rng::SeedRng;
use crate::{Team, TeamId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The seeding strategy to apply.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SeedStrategy {
    /// Order by composite ranking, best first.
    #[default]
    Ranked,
    /// A uniform random permutation (Fisher-Yates).
    Random,
    /// Separate teams sharing a club as far as possible in seed order.
    ClubBalanced,
    /// Separate teams sharing a region as far as possible in seed order.
    Geographic,
    /// Rank, split into four contiguous skill tiers, then distribute tiers
    /// according to [`TierMode`].
    SkillBalanced,
}

/// The distribution mode used within skill tiers by
/// [`SeedStrategy::SkillBalanced`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TierMode {
    /// Serpentine assignment across a notional bracket width.
    #[default]
    Snake,
    /// Modulo-based round robin group assignment.
    Even,
    /// Seeded shuffle within each tier, preserving inter-tier order.
    Random,
}

/// Options controlling the seeder. Immutable input, never persisted by the
/// engine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SeedingOptions {
    pub strategy: SeedStrategy,
    /// Seed for the randomized strategies. A fresh entropy seed is drawn
    /// when unset, making the permutation non-reproducible.
    pub random_seed: Option<u64>,
    pub tier_mode: TierMode,
}

impl SeedingOptions {
    #[inline]
    pub fn new(strategy: SeedStrategy) -> Self {
        Self {
            strategy,
            random_seed: None,
            tier_mode: TierMode::default(),
        }
    }

    fn rng(&self) -> SeedRng {
        match self.random_seed {
            Some(seed) => SeedRng::new(seed),
            None => SeedRng::from_entropy(),
        }
    }
}

/// Orders `teams` according to `options` and assigns seed numbers `1..=n` in
/// output order. The output is always a permutation of the input.
pub fn seed(teams: Vec<Team>, options: &SeedingOptions) -> Vec<Team> {
    log::debug!(
        "Seeding {} teams using {:?}",
        teams.len(),
        options.strategy
    );

    let mut teams = match options.strategy {
        SeedStrategy::Ranked => ranked(teams),
        SeedStrategy::Random => {
            let mut teams = teams;
            options.rng().shuffle(&mut teams);
            teams
        }
        SeedStrategy::ClubBalanced => balanced(teams, |team| team.club.clone()),
        SeedStrategy::Geographic => balanced(teams, |team| team.region.clone()),
        SeedStrategy::SkillBalanced => skill_balanced(teams, options),
    };

    for (index, team) in teams.iter_mut().enumerate() {
        team.seed = Some(index as u32 + 1);
    }

    teams
}

/// Returns the teams receiving an automatic advancement into round 2 when a
/// bracket of `target_size` is played with fewer teams. Byes go to the top
/// seeds, in seed order, and never exceed the size gap.
pub fn assign_byes(ordered: &[Team], target_size: usize) -> Vec<TeamId> {
    let count = target_size.saturating_sub(ordered.len()).min(ordered.len());
    ordered.iter().take(count).map(|team| team.id).collect()
}

/// Compares two teams by composite ranking (lower is better), then win
/// percentage (higher is better), then points differential (higher is
/// better).
fn rank_order(a: &Team, b: &Team) -> Ordering {
    a.ranking
        .cmp(&b.ranking)
        .then_with(|| b.win_pct.total_cmp(&a.win_pct))
        .then_with(|| b.points_diff.cmp(&a.points_diff))
}

fn ranked(mut teams: Vec<Team>) -> Vec<Team> {
    // Stable: equal teams keep their input order.
    teams.sort_by(rank_order);
    teams
}

/// Groups teams by `key`, sorts each group internally by ranking, then
/// interleaves the groups round robin style so teams sharing a key are
/// maximally separated. Teams without a key are appended at the end.
fn balanced<F>(teams: Vec<Team>, key: F) -> Vec<Team>
where
    F: Fn(&Team) -> Option<String>,
{
    let mut groups: Vec<(String, Vec<Team>)> = Vec::new();
    let mut ungrouped = Vec::new();

    for team in teams {
        match key(&team) {
            Some(k) => match groups.iter_mut().find(|(name, _)| *name == k) {
                Some((_, group)) => group.push(team),
                None => groups.push((k, vec![team])),
            },
            None => ungrouped.push(team),
        }
    }

    for (_, group) in groups.iter_mut() {
        group.sort_by(rank_order);
    }
    ungrouped.sort_by(rank_order);

    // Take one team from every non-exhausted group per pass.
    let mut iters: Vec<_> = groups.into_iter().map(|(_, g)| g.into_iter()).collect();
    let mut out = Vec::new();
    loop {
        let mut exhausted = true;
        for iter in iters.iter_mut() {
            if let Some(team) = iter.next() {
                out.push(team);
                exhausted = false;
            }
        }
        if exhausted {
            break;
        }
    }

    out.extend(ungrouped);
    out
}

/// The number of contiguous skill tiers used by the skill balanced strategy.
const TIERS: usize = 4;

fn skill_balanced(teams: Vec<Team>, options: &SeedingOptions) -> Vec<Team> {
    let teams = ranked(teams);
    let len = teams.len();
    if len == 0 {
        return teams;
    }

    // Split into four contiguous tiers; the first `len % TIERS` tiers take
    // one extra team.
    let base = len / TIERS;
    let extra = len % TIERS;
    let mut tiers: Vec<Vec<Team>> = Vec::with_capacity(TIERS);
    let mut iter = teams.into_iter();
    for tier in 0..TIERS {
        let size = base + usize::from(tier < extra);
        tiers.push(iter.by_ref().take(size).collect());
    }

    match options.tier_mode {
        TierMode::Snake => {
            // Serpentine the tier rows, then read column by column so every
            // run of four seeds holds one team from each tier.
            let width = tiers.iter().map(Vec::len).max().unwrap_or(0);
            for row in tiers.iter_mut().skip(1).step_by(2) {
                row.reverse();
            }

            let mut rows: Vec<std::vec::IntoIter<Team>> =
                tiers.into_iter().map(Vec::into_iter).collect();

            let mut out = Vec::with_capacity(len);
            for _ in 0..width {
                for row in rows.iter_mut() {
                    if let Some(team) = row.next() {
                        out.push(team);
                    }
                }
            }
            out
        }
        TierMode::Even => {
            let flat: Vec<Team> = tiers.into_iter().flatten().collect();
            let groups = len.div_ceil(TIERS);
            let mut out = Vec::with_capacity(len);
            for group in 0..groups {
                for index in (group..len).step_by(groups) {
                    out.push(flat[index].clone());
                }
            }
            out
        }
        TierMode::Random => {
            let mut rng = options.rng();
            let mut out = Vec::with_capacity(len);
            for mut tier in tiers {
                rng.shuffle(&mut tier);
                out.extend(tier);
            }
            out
        }
    }
}
