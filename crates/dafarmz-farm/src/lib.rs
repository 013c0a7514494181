//! Plant growth, harvest yields, and plots for the dafarmz farming game.
//!
//! This crate holds the game's simulation core. Growth is derived lazily from
//! timestamps (there is no tick loop), yields are drawn with an injected RNG,
//! and every type here is plain data that the caller loads and persists.
//!
//! # Modules
//!
//! - [`growth`] -- Elapsed time to growth stage, readiness, visual index.
//! - [`yields`] -- Resolving odds and ranges into concrete item counts.
//! - [`plot`] -- The sparse cell grid with plant, harvest, and remove.
//! - [`catalog`] -- Immutable crop and item reference data.
//! - [`scenario`] -- Randomly stocked explore plots.
//! - [`location`] -- Grid coordinates such as `A3`.
//! - [`error`] -- Error types for the above.

pub mod catalog;
pub mod error;
pub mod growth;
pub mod location;
pub mod plot;
pub mod scenario;
pub mod yields;

// Re-export primary types at crate root.
pub use catalog::CropCatalog;
pub use error::FarmError;
pub use growth::{can_harvest, current_stage, growth_stage, ready_stage, visual_stage};
pub use location::Location;
pub use plot::{HarvestOutcome, Plot, plant_item};
pub use scenario::{Scenario, ScenarioSettings};
pub use yields::{YieldTotals, resolve};
