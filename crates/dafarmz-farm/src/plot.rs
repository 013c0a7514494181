//! Plot store: a sparse grid of occupied cells with plant, harvest, and
//! remove operations.
//!
//! A [`Plot`] is plain data. Loading it from storage and writing it back
//! after a mutation is the caller's job.
//!
//! Invariant: no stored cell has `yields_remaining == 0`. Planting clamps
//! the crop's yield count to at least 1, and the harvest that decrements a
//! cell to 0 also removes it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dafarmz_types::{CropDefinition, Environment, PlotItem, PlotItemData};

use crate::error::FarmError;
use crate::growth;
use crate::location::Location;
use crate::yields::{YieldTotals, table_xp};

// ---------------------------------------------------------------------------
// HarvestOutcome
// ---------------------------------------------------------------------------

/// What a harvest produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestOutcome {
    /// Items produced, merged across every harvested cell.
    pub yields: YieldTotals,
    /// Experience earned from the harvested cells' yield tables.
    pub xp: u32,
    /// Cells that were harvested, in location order.
    pub harvested: Vec<Location>,
    /// Harvested cells that died and were removed.
    pub died: Vec<Location>,
}

impl HarvestOutcome {
    /// Whether no cell was harvested.
    pub fn is_empty(&self) -> bool {
        self.harvested.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Planting
// ---------------------------------------------------------------------------

/// Build the plot item a seed grows into, snapshotting its growth and yield
/// parameters.
///
/// Returns `None` when `crop` is not a seed.
pub fn plant_item(crop: &CropDefinition, now: DateTime<Utc>) -> Option<PlotItem> {
    if !crop.key.is_seed() {
        return None;
    }
    Some(PlotItem {
        key: crop.key.as_plant(),
        data: Some(PlotItemData {
            planted_at: now,
            last_harvested_at: None,
            yields_remaining: crop.total_yields.max(1),
            yields: crop.yields.clone(),
            death_yields: crop.death_yields.clone(),
            grow_time_hr: Some(crop.grow_time_hr),
            lifecycle_stages: crop.lifecycle_stages,
            has_regrowth_visual: crop.has_regrowth_visual,
            preset_stage: None,
        }),
    })
}

// ---------------------------------------------------------------------------
// Plot
// ---------------------------------------------------------------------------

/// A sparse map of locations to occupied cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    /// The environment the plot sits in.
    #[serde(default)]
    pub environment: Environment,
    /// Occupied cells. Absent locations are empty.
    #[serde(default)]
    pub cells: BTreeMap<Location, PlotItem>,
}

impl Plot {
    /// An empty plot in the given environment.
    pub const fn new(environment: Environment) -> Self {
        Self {
            environment,
            cells: BTreeMap::new(),
        }
    }

    /// The item at `location`, if any.
    pub fn get(&self, location: Location) -> Option<&PlotItem> {
        self.cells.get(&location)
    }

    /// Whether `location` is occupied.
    pub fn is_occupied(&self, location: Location) -> bool {
        self.cells.contains_key(&location)
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether every cell is empty.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over occupied cells in location order.
    pub fn iter(&self) -> impl Iterator<Item = (Location, &PlotItem)> {
        self.cells.iter().map(|(location, item)| (*location, item))
    }

    /// Put an item into an empty cell. Returns `false` if it is occupied.
    pub fn place(&mut self, location: Location, item: PlotItem) -> bool {
        if self.is_occupied(location) {
            return false;
        }
        self.cells.insert(location, item);
        true
    }

    /// Plant a seed at `location`.
    ///
    /// Returns `false` without touching the plot when the location is
    /// occupied or `crop` is not a seed. On success the cell holds
    /// `plant:<name>` planted at `now`.
    pub fn plant(&mut self, location: Location, crop: &CropDefinition, now: DateTime<Utc>) -> bool {
        if self.is_occupied(location) {
            return false;
        }
        match plant_item(crop, now) {
            Some(item) => self.place(location, item),
            None => false,
        }
    }

    /// Clear a cell. Removing an empty cell is a no-op.
    pub fn remove_plant(&mut self, location: Location) -> Option<PlotItem> {
        self.cells.remove(&location)
    }

    /// Harvest every ready cell.
    ///
    /// Cells that are not ready, have no growth data, or have an empty yield
    /// table are skipped. Every call draws fresh randomness, so two calls on
    /// the same state can produce different amounts.
    pub fn harvest(&mut self, now: DateTime<Utc>, rng: &mut impl Rng) -> HarvestOutcome {
        let ready: Vec<Location> = self
            .cells
            .iter()
            .filter(|(_, item)| {
                item.data
                    .as_ref()
                    .is_some_and(|data| !data.yields.is_empty() && growth::is_ready(data, now))
            })
            .map(|(location, _)| *location)
            .collect();

        let mut outcome = HarvestOutcome::default();
        for location in ready {
            self.collect(location, now, rng, &mut outcome);
        }
        outcome
    }

    /// Harvest a single cell regardless of its growth stage.
    ///
    /// Used for scenario cells, which are found rather than grown. Cells
    /// without data or with an empty yield table are left untouched.
    pub fn interact(
        &mut self,
        location: Location,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<HarvestOutcome, FarmError> {
        let item = self.cells.get(&location).ok_or(FarmError::NothingHere(location))?;
        if item.data.as_ref().is_none_or(|data| data.yields.is_empty()) {
            return Err(FarmError::Blocked {
                location,
                key: item.key.clone(),
            });
        }

        let mut outcome = HarvestOutcome::default();
        self.collect(location, now, rng, &mut outcome);
        Ok(outcome)
    }

    /// Harvest one cell into `outcome`, removing it if it runs out of yields.
    fn collect(
        &mut self,
        location: Location,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
        outcome: &mut HarvestOutcome,
    ) {
        let Some(item) = self.cells.get_mut(&location) else {
            return;
        };
        let Some(data) = item.data.as_mut() else {
            return;
        };

        outcome.xp = outcome.xp.saturating_add(table_xp(&data.yields));
        data.yields_remaining = data.yields_remaining.saturating_sub(1);
        data.last_harvested_at = Some(now);
        data.preset_stage = None;
        outcome.yields.add_table(&data.yields, rng);
        outcome.harvested.push(location);

        let died = data.yields_remaining == 0;
        if died {
            outcome.yields.add_table(&data.death_yields, rng);
        }
        debug!(
            %location,
            key = %item.key,
            yields_remaining = data.yields_remaining,
            died,
            "harvested cell"
        );

        if died {
            self.cells.remove(&location);
            outcome.died.push(location);
        }
    }
}
