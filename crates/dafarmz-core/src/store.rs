//! Persistence seam: owner-keyed documents and atomic counter updates.
//!
//! The game service talks to storage only through [`GameStore`]. The
//! production implementation lives in `dafarmz-db` (Dragonfly); the
//! in-memory [`MemoryStore`] backs tests and local runs.
//!
//! Plot documents are saved whole (last writer wins). Profile counters are
//! only ever changed through [`GameStore::credit`], which applies a whole
//! [`Credit`] atomically and refuses it if any counter would go negative.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use dafarmz_farm::{Plot, Scenario};
use dafarmz_types::{ItemKey, OwnerId};

use crate::challenges::Challenges;

/// Stat key holding a player's experience.
pub const XP_STAT: &str = "xp";

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No profile exists for the owner.
    #[error("no profile for owner {0}")]
    ProfileNotFound(OwnerId),

    /// A credit would drive a counter below zero.
    #[error("not enough {what}: have {available}, need {needed}")]
    Insufficient {
        /// The counter that ran short (`balance`, an item key, or a stat).
        what: String,
        /// Current value.
        available: u64,
        /// Amount the credit tried to remove.
        needed: u64,
    },

    /// A credit would overflow a counter.
    #[error("counter overflow on {0}")]
    Overflow(String),

    /// The storage backend failed.
    #[error("storage backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A player's farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    /// Who owns it.
    pub owner: OwnerId,
    /// The farm's cells.
    #[serde(default)]
    pub plot: Plot,
}

impl Farm {
    /// An empty farm in the default environment.
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            plot: Plot::default(),
        }
    }
}

/// A player's profile: balance, inventory, stats, and challenges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Who this is.
    pub owner: OwnerId,
    /// When the player registered.
    pub created_at: DateTime<Utc>,
    /// Balance in cents.
    #[serde(default)]
    pub balance: u64,
    /// Items held. Zero entries are removed.
    #[serde(default)]
    pub inventory: BTreeMap<ItemKey, u64>,
    /// Counters such as `xp`, `harvest.count`, `plant.seed:apple`.
    #[serde(default)]
    pub stats: BTreeMap<String, u64>,
    /// The challenge board.
    pub challenges: Challenges,
}

impl Profile {
    /// A new profile with an empty inventory and no stats.
    pub const fn new(
        owner: OwnerId,
        created_at: DateTime<Utc>,
        balance: u64,
        challenges: Challenges,
    ) -> Self {
        Self {
            owner,
            created_at,
            balance,
            inventory: BTreeMap::new(),
            stats: BTreeMap::new(),
            challenges,
        }
    }

    /// Experience earned so far.
    pub fn xp(&self) -> u64 {
        self.stat(XP_STAT)
    }

    /// Value of a stat, or 0.
    pub fn stat(&self, name: &str) -> u64 {
        self.stats.get(name).copied().unwrap_or(0)
    }

    /// How many of `item` the player holds.
    pub fn item_count(&self, item: &ItemKey) -> u64 {
        self.inventory.get(item).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Credit
// ---------------------------------------------------------------------------

/// A set of signed counter changes applied to a profile as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credit {
    /// Balance change in cents.
    pub balance: i64,
    /// Inventory changes.
    pub items: BTreeMap<ItemKey, i64>,
    /// Stat changes.
    pub stats: BTreeMap<String, i64>,
}

impl Credit {
    /// An empty credit.
    pub const fn new() -> Self {
        Self {
            balance: 0,
            items: BTreeMap::new(),
            stats: BTreeMap::new(),
        }
    }

    /// Add to the balance change.
    #[must_use]
    pub const fn balance(mut self, delta: i64) -> Self {
        self.balance = self.balance.saturating_add(delta);
        self
    }

    /// Add to an item change.
    #[must_use]
    pub fn item(mut self, key: ItemKey, delta: i64) -> Self {
        let entry = self.items.entry(key).or_insert(0);
        *entry = entry.saturating_add(delta);
        self
    }

    /// Add to a stat change.
    #[must_use]
    pub fn stat(mut self, name: impl Into<String>, delta: i64) -> Self {
        let entry = self.stats.entry(name.into()).or_insert(0);
        *entry = entry.saturating_add(delta);
        self
    }

    /// Whether applying this credit would change nothing.
    pub fn is_empty(&self) -> bool {
        self.balance == 0
            && self.items.values().all(|delta| *delta == 0)
            && self.stats.values().all(|delta| *delta == 0)
    }
}

/// Apply `delta` to `current`, or say why it cannot be applied.
fn adjusted(what: &str, current: u64, delta: i64) -> Result<u64, StoreError> {
    let magnitude = delta.unsigned_abs();
    if delta >= 0 {
        current
            .checked_add(magnitude)
            .ok_or_else(|| StoreError::Overflow(what.to_owned()))
    } else {
        current
            .checked_sub(magnitude)
            .ok_or_else(|| StoreError::Insufficient {
                what: what.to_owned(),
                available: current,
                needed: magnitude,
            })
    }
}

/// Apply a credit to a profile in memory, all or nothing.
///
/// Every change is validated before any is applied, so a failed credit
/// leaves the profile untouched. Inventory entries that reach zero are
/// removed.
pub fn apply_credit(profile: &mut Profile, credit: &Credit) -> Result<(), StoreError> {
    let balance = adjusted("balance", profile.balance, credit.balance)?;

    let mut items = Vec::with_capacity(credit.items.len());
    for (key, delta) in &credit.items {
        let next = adjusted(&key.to_string(), profile.item_count(key), *delta)?;
        items.push((key, next));
    }

    let mut stats = Vec::with_capacity(credit.stats.len());
    for (name, delta) in &credit.stats {
        let next = adjusted(name, profile.stat(name), *delta)?;
        stats.push((name, next));
    }

    profile.balance = balance;
    for (key, next) in items {
        if next == 0 {
            profile.inventory.remove(key);
        } else {
            profile.inventory.insert(key.clone(), next);
        }
    }
    for (name, next) in stats {
        profile.stats.insert(name.clone(), next);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GameStore
// ---------------------------------------------------------------------------

/// Owner-keyed persistence for farms, profiles, and scenarios.
///
/// Implementations must make [`credit`](GameStore::credit) atomic with
/// respect to other credits on the same profile.
pub trait GameStore: Send + Sync + 'static {
    /// Load an owner's farm.
    fn load_farm(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Option<Farm>, StoreError>> + Send;

    /// Save a farm, replacing whatever was stored.
    fn save_farm(&self, farm: &Farm) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Load an owner's profile.
    fn load_profile(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Option<Profile>, StoreError>> + Send;

    /// Store a new profile. Returns `false` if one already exists.
    fn create_profile(
        &self,
        profile: &Profile,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Apply a credit atomically and return the updated profile.
    ///
    /// Fails with [`StoreError::ProfileNotFound`] for unknown owners and
    /// [`StoreError::Insufficient`] when a counter would go negative; in
    /// both cases nothing changes.
    fn credit(
        &self,
        owner: OwnerId,
        credit: &Credit,
    ) -> impl Future<Output = Result<Profile, StoreError>> + Send;

    /// Replace an owner's challenge board.
    fn save_challenges(
        &self,
        owner: OwnerId,
        challenges: &Challenges,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Load the owner's active scenario.
    fn load_scenario(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<Option<Scenario>, StoreError>> + Send;

    /// Store the owner's active scenario, replacing any previous one.
    fn save_scenario(
        &self,
        owner: OwnerId,
        scenario: &Scenario,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Drop the owner's active scenario. Returns whether one existed.
    fn delete_scenario(
        &self,
        owner: OwnerId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    farms: BTreeMap<OwnerId, Farm>,
    profiles: BTreeMap<OwnerId, Profile>,
    scenarios: BTreeMap<OwnerId, Scenario>,
}

/// A [`GameStore`] that keeps everything in process memory.
///
/// All operations go through one lock, which makes credits trivially atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryStore {
    async fn load_farm(&self, owner: OwnerId) -> Result<Option<Farm>, StoreError> {
        Ok(self.state.lock().await.farms.get(&owner).cloned())
    }

    async fn save_farm(&self, farm: &Farm) -> Result<(), StoreError> {
        self.state.lock().await.farms.insert(farm.owner, farm.clone());
        Ok(())
    }

    async fn load_profile(&self, owner: OwnerId) -> Result<Option<Profile>, StoreError> {
        Ok(self.state.lock().await.profiles.get(&owner).cloned())
    }

    async fn create_profile(&self, profile: &Profile) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if state.profiles.contains_key(&profile.owner) {
            return Ok(false);
        }
        state.profiles.insert(profile.owner, profile.clone());
        Ok(true)
    }

    async fn credit(&self, owner: OwnerId, credit: &Credit) -> Result<Profile, StoreError> {
        let mut state = self.state.lock().await;
        let profile = state
            .profiles
            .get_mut(&owner)
            .ok_or(StoreError::ProfileNotFound(owner))?;
        apply_credit(profile, credit)?;
        Ok(profile.clone())
    }

    async fn save_challenges(
        &self,
        owner: OwnerId,
        challenges: &Challenges,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let profile = state
            .profiles
            .get_mut(&owner)
            .ok_or(StoreError::ProfileNotFound(owner))?;
        profile.challenges = challenges.clone();
        Ok(())
    }

    async fn load_scenario(&self, owner: OwnerId) -> Result<Option<Scenario>, StoreError> {
        Ok(self.state.lock().await.scenarios.get(&owner).cloned())
    }

    async fn save_scenario(&self, owner: OwnerId, scenario: &Scenario) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .scenarios
            .insert(owner, scenario.clone());
        Ok(())
    }

    async fn delete_scenario(&self, owner: OwnerId) -> Result<bool, StoreError> {
        Ok(self.state.lock().await.scenarios.remove(&owner).is_some())
    }
}
