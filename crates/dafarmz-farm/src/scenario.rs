//! Explore scenarios: temporary, randomly stocked plots.
//!
//! A scenario reuses the plot mechanics. Plants are placed already grown to
//! a random stage, obstructions block cells, and treasures are one-shot
//! finds. Interacting with a cell harvests it on the spot.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dafarmz_types::{
    CropDefinition, Environment, ItemCategory, PlotItem, PlotItemData, ScenarioId,
};

use crate::catalog::CropCatalog;
use crate::error::FarmError;
use crate::growth;
use crate::location::Location;
use crate::plot::{HarvestOutcome, Plot, plant_item};

/// Knobs for scenario generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioSettings {
    /// Grid width.
    pub columns: u8,
    /// Grid height.
    pub rows: u32,
    /// Chance that a cell holds anything at all.
    pub fill_chance: f64,
    /// Chance that a filled cell is an obstruction.
    pub obstruction_chance: f64,
    /// Chance that a filled cell is a treasure.
    pub treasure_chance: f64,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            columns: 5,
            rows: 5,
            fill_chance: 0.5,
            obstruction_chance: 0.15,
            treasure_chance: 0.05,
        }
    }
}

/// A player's active explore scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique id of this scenario.
    pub id: ScenarioId,
    /// Player level the scenario was stocked for.
    pub level: u32,
    /// When the scenario was generated.
    pub created_at: DateTime<Utc>,
    /// The scenario's cells and environment.
    pub plot: Plot,
}

impl Scenario {
    /// Generate a scenario for a player of `level`.
    ///
    /// Plants, obstructions, and treasures are drawn from `catalog` items of
    /// the matching category. A roll that lands on a category the catalog has
    /// nothing for leaves the cell empty.
    pub fn generate(
        settings: &ScenarioSettings,
        level: u32,
        catalog: &CropCatalog,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Self {
        let environment = Environment::ALL
            .choose(rng)
            .copied()
            .unwrap_or_default();

        let seeds: Vec<&CropDefinition> = catalog.seeds_for_level(level).collect();
        let obstructions: Vec<&CropDefinition> =
            catalog.of_category(ItemCategory::Obstruction).collect();
        let treasures: Vec<&CropDefinition> = catalog
            .of_category(ItemCategory::Treasure)
            .filter(|item| item.level_required <= level)
            .collect();

        let mut plot = Plot::new(environment);
        for location in Location::grid(settings.columns, settings.rows) {
            if !chance(rng, settings.fill_chance) {
                continue;
            }

            let roll: f64 = rng.random();
            let item = if roll < settings.obstruction_chance {
                obstructions
                    .choose(rng)
                    .map(|def| PlotItem::fixture(def.key.clone()))
            } else if roll < settings.obstruction_chance + settings.treasure_chance {
                treasures.choose(rng).map(|def| treasure_item(def, now))
            } else {
                seeds.choose(rng).and_then(|def| grown_plant(def, now, rng))
            };

            if let Some(item) = item {
                debug!(%location, key = %item.key, "stocked scenario cell");
                plot.place(location, item);
            }
        }

        Self {
            id: ScenarioId::new(),
            level,
            created_at: now,
            plot,
        }
    }

    /// Harvest the cell at `location`.
    ///
    /// Fails on empty cells and on obstructions.
    pub fn interact(
        &mut self,
        location: Location,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<HarvestOutcome, FarmError> {
        self.plot.interact(location, now, rng)
    }
}

fn chance(rng: &mut impl Rng, probability: f64) -> bool {
    let roll: f64 = rng.random();
    roll < probability
}

/// A plant placed at a random point of its lifecycle.
fn grown_plant(seed: &CropDefinition, now: DateTime<Utc>, rng: &mut impl Rng) -> Option<PlotItem> {
    let mut item = plant_item(seed, now)?;
    if let Some(data) = item.data.as_mut() {
        let ready = growth::ready_stage(data.lifecycle_stages, data.has_regrowth_visual);
        data.preset_stage = Some(rng.random_range(0..=ready));
    }
    Some(item)
}

/// A one-shot treasure holding the definition's yields.
fn treasure_item(def: &CropDefinition, now: DateTime<Utc>) -> PlotItem {
    PlotItem {
        key: def.key.clone(),
        data: Some(PlotItemData {
            planted_at: now,
            last_harvested_at: None,
            yields_remaining: 1,
            yields: def.yields.clone(),
            death_yields: def.death_yields.clone(),
            grow_time_hr: None,
            lifecycle_stages: def.lifecycle_stages,
            has_regrowth_visual: false,
            preset_stage: None,
        }),
    }
}
