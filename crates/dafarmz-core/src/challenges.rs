//! Daily challenges: generated goals, progress tracking, and rewards.
//!
//! A player holds a short list of [`ChallengeOption`]s. Accepting one starts
//! tracking progress for it; game actions (planting, harvesting, trading)
//! report progress through [`Challenges::record_progress`]. A completed
//! option can be claimed for its rewards and is replaced by a fresh one.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use dafarmz_farm::CropCatalog;
use dafarmz_types::{CropDefinition, ItemKey};

use crate::config::ChallengesConfig;

/// Item key whose reward amount is credited to the balance.
pub const COIN: &str = "item:coin";

/// Item key whose reward amount is credited as experience.
pub const XP: &str = "item:xp";

/// Goal key used for actions that count occurrences rather than items.
pub const COUNT: &str = "count";

/// Errors from challenge operations.
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    /// No option exists at the given index.
    #[error("there is no challenge #{0}")]
    NoSuchChallenge(usize),

    /// The option has already been accepted.
    #[error("challenge #{0} is already accepted")]
    AlreadyAccepted(usize),

    /// The player already has the maximum number of active options.
    #[error("you can only have {max} active challenge(s)")]
    TooManyActive {
        /// The configured limit.
        max: u32,
    },

    /// The option's goals are not met yet.
    #[error("challenge #{0} is not complete yet")]
    NotCompleted(usize),

    /// Refreshing again before the interval elapsed.
    #[error("challenges can be refreshed again at {next_at}")]
    TooSoon {
        /// Earliest time of the next refresh.
        next_at: DateTime<Utc>,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A kind of game action a challenge can track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeAction {
    /// Planting a seed. Goal items are seed keys.
    Plant,
    /// Harvesting the farm. The only goal item is [`COUNT`].
    Harvest,
    /// Buying from the shop. Goal items are item keys.
    Buy,
    /// Selling to the shop. Goal items are item keys.
    Sell,
}

impl ChallengeAction {
    /// Every action, in declaration order.
    pub const ALL: [Self; 4] = [Self::Plant, Self::Harvest, Self::Buy, Self::Sell];
}

/// Per-action, per-item amounts.
pub type GoalTable = BTreeMap<ChallengeAction, BTreeMap<String, u64>>;

/// One challenge a player can accept and complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeOption {
    /// Human-readable goal.
    #[serde(default)]
    pub description: String,
    /// Items granted on claim. [`COIN`] and [`XP`] go to balance and XP.
    #[serde(default)]
    pub rewards: BTreeMap<ItemKey, u64>,
    /// Progress so far.
    #[serde(default)]
    pub progress: GoalTable,
    /// Amounts needed to complete.
    #[serde(default)]
    pub goal_stats: GoalTable,
    /// Whether the player is working on it.
    #[serde(default)]
    pub accepted: bool,
}

impl ChallengeOption {
    /// Generate one option for a player of `level`.
    ///
    /// Goal amounts and rewards grow with the level. Goals naming items are
    /// drawn from seeds the player can grow. With no such seeds the option
    /// falls back to a harvest goal.
    pub fn generate(level: u32, catalog: &CropCatalog, rng: &mut impl Rng) -> Self {
        let seeds: Vec<&CropDefinition> = catalog.seeds_for_level(level).collect();
        let action = ChallengeAction::ALL
            .choose(rng)
            .copied()
            .unwrap_or(ChallengeAction::Harvest);
        let scale = u64::from(level).saturating_add(1);

        let seed = seeds.choose(rng).copied();
        let (action, item, label, amount) = match (action, seed) {
            (ChallengeAction::Plant, Some(seed)) => {
                let amount = rng.random_range(1..=3_u64).saturating_add(scale / 2);
                (action, seed.key.to_string(), seed.name.clone(), amount)
            }
            (ChallengeAction::Buy, Some(seed)) => {
                let amount = rng.random_range(2..=5_u64).saturating_add(scale / 2);
                (action, seed.key.to_string(), seed.name.clone(), amount)
            }
            (ChallengeAction::Sell, Some(seed)) => {
                let produce = seed.key.as_plant();
                let label = catalog
                    .get(&produce)
                    .map_or_else(|| produce.name.clone(), |item| item.name.clone());
                let amount = rng.random_range(2..=6_u64).saturating_add(scale);
                (action, produce.to_string(), label, amount)
            }
            _ => {
                let amount = rng.random_range(2..=4_u64).saturating_add(scale / 3);
                (ChallengeAction::Harvest, COUNT.to_owned(), String::new(), amount)
            }
        };

        let description = match action {
            ChallengeAction::Plant => format!("Plant {amount} {label}"),
            ChallengeAction::Harvest => format!("Harvest your farm {amount} times"),
            ChallengeAction::Buy => format!("Buy {amount} {label}"),
            ChallengeAction::Sell => format!("Sell {amount} {label}"),
        };

        let mut rewards = BTreeMap::new();
        rewards.insert(
            ItemKey::parse(COIN),
            amount.saturating_mul(scale).saturating_mul(50),
        );
        rewards.insert(ItemKey::parse(XP), amount.saturating_mul(scale).saturating_mul(10));

        let mut goal_stats = GoalTable::new();
        goal_stats.entry(action).or_default().insert(item, amount);

        Self {
            description,
            rewards,
            progress: GoalTable::new(),
            goal_stats,
            accepted: false,
        }
    }

    /// Whether every goal's progress has reached its amount.
    pub fn is_completed(&self) -> bool {
        self.goal_stats.iter().all(|(action, goals)| {
            goals.iter().all(|(item, needed)| {
                let done = self
                    .progress
                    .get(action)
                    .and_then(|items| items.get(item))
                    .copied()
                    .unwrap_or(0);
                done >= *needed
            })
        })
    }

    /// Advance progress if this option is accepted and tracks `item` for
    /// `action`. Returns whether anything changed.
    fn advance(&mut self, action: ChallengeAction, item: &str, by: u64) -> bool {
        let tracked = self
            .goal_stats
            .get(&action)
            .is_some_and(|goals| goals.contains_key(item));
        if !self.accepted || !tracked || by == 0 {
            return false;
        }
        let entry = self
            .progress
            .entry(action)
            .or_default()
            .entry(item.to_owned())
            .or_insert(0);
        *entry = entry.saturating_add(by);
        true
    }
}

/// A player's challenge board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenges {
    /// When the options were last regenerated.
    pub last_refreshed_at: DateTime<Utc>,
    /// How many options may be accepted at once.
    pub max_active: u32,
    /// The options on offer.
    #[serde(default)]
    pub options: Vec<ChallengeOption>,
}

impl Challenges {
    /// A fresh board for a player of `level`.
    pub fn generate(
        level: u32,
        config: &ChallengesConfig,
        catalog: &CropCatalog,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Self {
        let options = (0..config.options_per_refresh)
            .map(|_| ChallengeOption::generate(level, catalog, rng))
            .collect();
        Self {
            last_refreshed_at: now,
            max_active: config.max_active,
            options,
        }
    }

    /// Earliest time the board may be refreshed.
    pub fn next_refresh_at(&self, interval_hours: u32) -> DateTime<Utc> {
        self.last_refreshed_at
            .checked_add_signed(Duration::hours(i64::from(interval_hours)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Replace every option with freshly generated ones.
    pub fn refresh(
        &mut self,
        level: u32,
        config: &ChallengesConfig,
        catalog: &CropCatalog,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<(), ChallengeError> {
        let next_at = self.next_refresh_at(config.refresh_interval_hours);
        if now < next_at {
            return Err(ChallengeError::TooSoon { next_at });
        }
        *self = Self::generate(level, config, catalog, now, rng);
        Ok(())
    }

    /// Number of accepted options.
    pub fn active(&self) -> usize {
        self.options.iter().filter(|option| option.accepted).count()
    }

    /// Start working on the option at `index`.
    pub fn accept(&mut self, index: usize) -> Result<(), ChallengeError> {
        let active = self.active();
        let max = self.max_active;
        let option = self
            .options
            .get_mut(index)
            .ok_or(ChallengeError::NoSuchChallenge(index))?;
        if option.accepted {
            return Err(ChallengeError::AlreadyAccepted(index));
        }
        if u32::try_from(active).unwrap_or(u32::MAX) >= max {
            return Err(ChallengeError::TooManyActive { max });
        }
        option.accepted = true;
        Ok(())
    }

    /// Record progress on every accepted option that tracks `item` for
    /// `action`. Returns whether any option advanced.
    pub fn record_progress(&mut self, action: ChallengeAction, item: &str, by: u64) -> bool {
        self.options
            .iter_mut()
            .fold(false, |changed, option| option.advance(action, item, by) || changed)
    }

    /// Take a completed option off the board and put a new one in its place.
    ///
    /// Returns the claimed option so the caller can credit its rewards.
    pub fn claim(
        &mut self,
        index: usize,
        level: u32,
        catalog: &CropCatalog,
        rng: &mut impl Rng,
    ) -> Result<ChallengeOption, ChallengeError> {
        let option = self
            .options
            .get(index)
            .ok_or(ChallengeError::NoSuchChallenge(index))?;
        if !option.accepted || !option.is_completed() {
            return Err(ChallengeError::NotCompleted(index));
        }
        let claimed = self.options.remove(index);
        self.options
            .push(ChallengeOption::generate(level, catalog, rng));
        Ok(claimed)
    }
}
