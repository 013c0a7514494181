//! Enumeration types for the dafarmz game.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Item categories
// ---------------------------------------------------------------------------

/// The category half of an item key (`<category>:<name>`).
///
/// Categories decide what the game lets a player do with an item: only
/// seeds can be planted, only plants grow and yield, obstructions block a
/// scenario cell, treasures are one-shot finds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    /// A plantable seed bought from the shop (`seed:apple`).
    Seed,
    /// A growing plant occupying a plot cell, or its harvested produce (`plant:apple`).
    Plant,
    /// Scenery that blocks a scenario cell (`obstruction:rock`).
    Obstruction,
    /// A one-shot scenario find (`treasure:chest`).
    Treasure,
    /// A plain inventory item such as currency or XP tokens (`item:coin`).
    Item,
    /// Any prefix the game does not know about.
    Other(String),
}

impl ItemCategory {
    /// Parse the category prefix of an item key.
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "seed" => Self::Seed,
            "plant" => Self::Plant,
            "obstruction" => Self::Obstruction,
            "treasure" => Self::Treasure,
            "item" => Self::Item,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The prefix used when this category is written into an item key.
    pub fn prefix(&self) -> &str {
        match self {
            Self::Seed => "seed",
            Self::Plant => "plant",
            Self::Obstruction => "obstruction",
            Self::Treasure => "treasure",
            Self::Item => "item",
            Self::Other(prefix) => prefix,
        }
    }
}

// ---------------------------------------------------------------------------
// Environments
// ---------------------------------------------------------------------------

/// The environment a plot sits in. Purely thematic for now: it selects the
/// scenario backdrop and is shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Default environment for a new farm.
    #[default]
    BarrenWastelands,
    /// Open grassland.
    Grassland,
    /// A sealed greenhouse with enriched air.
    #[serde(rename = "co2_greenhouse")]
    Co2Greenhouse,
    /// Underground caverns.
    CavernousCaves,
    /// The crater around a radioactive meteor.
    RadioactiveMeteorSite,
    /// River banks strewn with boulders.
    RockyRivers,
    /// Frozen tundra.
    ArcticWasteland,
    /// Oversized jungle.
    GiantJungle,
}

impl Environment {
    /// Every environment, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::BarrenWastelands,
        Self::Grassland,
        Self::Co2Greenhouse,
        Self::CavernousCaves,
        Self::RadioactiveMeteorSite,
        Self::RockyRivers,
        Self::ArcticWasteland,
        Self::GiantJungle,
    ];
}

impl core::fmt::Display for Environment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::BarrenWastelands => "Barren Wastelands",
            Self::Grassland => "Grassland",
            Self::Co2Greenhouse => "CO2 Greenhouse",
            Self::CavernousCaves => "Cavernous Caves",
            Self::RadioactiveMeteorSite => "Radioactive Meteor Site",
            Self::RockyRivers => "Rocky Rivers",
            Self::ArcticWasteland => "Arctic Wasteland",
            Self::GiantJungle => "Giant Jungle",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_prefix_roundtrip() {
        for prefix in ["seed", "plant", "obstruction", "treasure", "item", "robot"] {
            assert_eq!(ItemCategory::from_prefix(prefix).prefix(), prefix);
        }
        assert_eq!(
            ItemCategory::from_prefix("robot"),
            ItemCategory::Other("robot".to_owned())
        );
    }

    #[test]
    fn environment_display_names() {
        assert_eq!(Environment::Co2Greenhouse.to_string(), "CO2 Greenhouse");
        assert_eq!(Environment::RockyRivers.to_string(), "Rocky Rivers");
    }

    #[test]
    fn environment_serde_names() {
        let json = serde_json::to_string(&Environment::Co2Greenhouse).ok();
        assert_eq!(json.as_deref(), Some("\"co2_greenhouse\""));
        let parsed: Result<Environment, _> = serde_json::from_str("\"giant_jungle\"");
        assert_eq!(parsed.ok(), Some(Environment::GiantJungle));
    }
}
