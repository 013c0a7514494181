//! Core data structs shared by the farm simulation, persistence, and API.
//!
//! Everything here is plain data with `serde` derives. Behaviour lives in
//! `dafarmz-farm` (growth, yields, plots) and `dafarmz-core` (service).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Environment, ItemCategory};

/// Default visual lifecycle length: one growing image and one ripe image.
pub const DEFAULT_LIFECYCLE_STAGES: u32 = 2;

// ---------------------------------------------------------------------------
// ItemKey
// ---------------------------------------------------------------------------

/// A parsed item key of the form `<category>:<name>`.
///
/// Serialized as the plain string (`"seed:apple"`) so stored documents and
/// catalog files stay readable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ItemKey {
    /// What kind of item this is.
    pub category: ItemCategory,
    /// The item name within its category (`apple`). May be empty for keys
    /// that are a bare category such as `treasure`.
    pub name: String,
}

impl ItemKey {
    /// Build a key from its parts.
    pub fn new(category: ItemCategory, name: &str) -> Self {
        Self {
            category,
            name: name.to_owned(),
        }
    }

    /// Parse a `<category>:<name>` string. Strings without a colon are
    /// treated as a bare category.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, name)) => Self::new(ItemCategory::from_prefix(prefix), name),
            None => Self::new(ItemCategory::from_prefix(raw), ""),
        }
    }

    /// Whether this key names a plantable seed.
    pub fn is_seed(&self) -> bool {
        self.category == ItemCategory::Seed
    }

    /// The key of the plant a seed grows into. Non-seed keys are returned
    /// unchanged.
    pub fn as_plant(&self) -> Self {
        if self.is_seed() {
            Self::new(ItemCategory::Plant, &self.name)
        } else {
            self.clone()
        }
    }
}

impl core::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.name.is_empty() {
            f.write_str(self.category.prefix())
        } else {
            write!(f, "{}:{}", self.category.prefix(), self.name)
        }
    }
}

impl From<String> for ItemKey {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for ItemKey {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<ItemKey> for String {
    fn from(key: ItemKey) -> Self {
        key.to_string()
    }
}

// ---------------------------------------------------------------------------
// YieldSpec
// ---------------------------------------------------------------------------

/// A probabilistic reward produced by a harvest or a plant's death.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldSpec {
    /// Probability in `[0, 1]` that the yield triggers at all.
    #[serde(default = "default_odds")]
    pub odds: f64,
    /// Fixed amount, used when no range is set.
    #[serde(default)]
    pub amount: u32,
    /// Lower bound of a uniform range. Only used together with `max_amount`.
    #[serde(default)]
    pub min_amount: Option<u32>,
    /// Upper bound of a uniform range. Only used together with `min_amount`.
    #[serde(default)]
    pub max_amount: Option<u32>,
    /// Experience awarded whenever the owning plot item is harvested.
    #[serde(default)]
    pub xp: u32,
}

impl YieldSpec {
    /// A yield that always triggers with a fixed amount and no XP.
    pub const fn fixed(amount: u32) -> Self {
        Self {
            odds: 1.0,
            amount,
            min_amount: None,
            max_amount: None,
            xp: 0,
        }
    }

    /// A yield that always triggers with an amount drawn from `[min, max]`.
    pub const fn ranged(min: u32, max: u32) -> Self {
        Self {
            odds: 1.0,
            amount: 0,
            min_amount: Some(min),
            max_amount: Some(max),
            xp: 0,
        }
    }

    /// Replace the trigger odds.
    #[must_use]
    pub const fn with_odds(mut self, odds: f64) -> Self {
        self.odds = odds;
        self
    }

    /// Replace the XP reward.
    #[must_use]
    pub const fn with_xp(mut self, xp: u32) -> Self {
        self.xp = xp;
        self
    }
}

impl Default for YieldSpec {
    fn default() -> Self {
        Self::fixed(0)
    }
}

/// A yield table keyed by the item it produces.
pub type YieldTable = BTreeMap<ItemKey, YieldSpec>;

const fn default_odds() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// CropDefinition
// ---------------------------------------------------------------------------

/// Read-only reference data for a shop item. Seeds carry the growth and
/// yield parameters that are snapshotted into a plot item when planted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropDefinition {
    /// Unique key (`seed:apple`).
    pub key: ItemKey,
    /// Display name shown to players.
    #[serde(default)]
    pub name: String,
    /// Flavour text.
    #[serde(default)]
    pub description: String,
    /// Purchase price in cents. Zero means the shop does not sell it.
    #[serde(default)]
    pub cost: u64,
    /// Price the shop pays per unit, in cents.
    #[serde(default)]
    pub resell_price: u64,
    /// Hours per growth stage.
    #[serde(default = "default_grow_time_hr")]
    pub grow_time_hr: f64,
    /// Yields produced on every harvest.
    #[serde(default)]
    pub yields: YieldTable,
    /// Extra yields produced when the plant dies.
    #[serde(default)]
    pub death_yields: YieldTable,
    /// Number of harvests before the plant dies.
    #[serde(default)]
    pub total_yields: u32,
    /// Minimum player level to see and buy the item.
    #[serde(default)]
    pub level_required: u32,
    /// Length of the plant's visual lifecycle.
    #[serde(default = "default_lifecycle_stages")]
    pub lifecycle_stages: u32,
    /// Whether the plant has a distinct "just harvested" image as the last
    /// lifecycle entry.
    #[serde(default)]
    pub has_regrowth_visual: bool,
}

impl CropDefinition {
    /// A minimal definition with defaults for everything but the key.
    pub fn new(key: &str, name: &str) -> Self {
        Self {
            key: ItemKey::parse(key),
            name: name.to_owned(),
            description: String::new(),
            cost: 0,
            resell_price: 0,
            grow_time_hr: default_grow_time_hr(),
            yields: YieldTable::new(),
            death_yields: YieldTable::new(),
            total_yields: 0,
            level_required: 0,
            lifecycle_stages: DEFAULT_LIFECYCLE_STAGES,
            has_regrowth_visual: false,
        }
    }

    /// Whether the shop sells this item.
    pub const fn is_buyable(&self) -> bool {
        self.cost > 0
    }
}

const fn default_grow_time_hr() -> f64 {
    1.0
}

const fn default_lifecycle_stages() -> u32 {
    DEFAULT_LIFECYCLE_STAGES
}

// ---------------------------------------------------------------------------
// PlanetDefinition
// ---------------------------------------------------------------------------

/// A planet players can read about, with its biomes in order of progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetDefinition {
    /// Display name.
    pub name: String,
    /// Flavour text.
    #[serde(default)]
    pub description: String,
    /// Environments found on the planet, earliest first.
    #[serde(default)]
    pub biomes: Vec<Environment>,
}

// ---------------------------------------------------------------------------
// PlotItem
// ---------------------------------------------------------------------------

/// Growth and yield state attached to an occupied plot cell.
///
/// Crop parameters are copied in at planting time so later catalog edits do
/// not change plants already in the ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotItemData {
    /// When the item was planted (or placed, for scenario cells).
    pub planted_at: DateTime<Utc>,
    /// When the item was last harvested, if ever.
    #[serde(default)]
    pub last_harvested_at: Option<DateTime<Utc>>,
    /// Harvests left before the item dies. Never zero for a stored item.
    pub yields_remaining: u32,
    /// Yields produced on every harvest.
    #[serde(default)]
    pub yields: YieldTable,
    /// Yields produced when the item dies.
    #[serde(default)]
    pub death_yields: YieldTable,
    /// Hours per growth stage. `None` for items that do not grow.
    #[serde(default)]
    pub grow_time_hr: Option<f64>,
    /// Length of the visual lifecycle.
    #[serde(default = "default_lifecycle_stages")]
    pub lifecycle_stages: u32,
    /// Whether the last lifecycle entry is a "just harvested" image.
    #[serde(default)]
    pub has_regrowth_visual: bool,
    /// Stage shown when a player first arrives in a scenario. Cleared on
    /// the first harvest so the clock takes over.
    #[serde(default)]
    pub preset_stage: Option<u32>,
}

/// One occupied plot cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotItem {
    /// What occupies the cell (`plant:apple`, `obstruction:rock`).
    pub key: ItemKey,
    /// Growth state. `None` for static items such as obstructions.
    #[serde(default)]
    pub data: Option<PlotItemData>,
}

impl PlotItem {
    /// A cell with no growth state.
    pub const fn fixture(key: ItemKey) -> Self {
        Self { key, data: None }
    }
}
