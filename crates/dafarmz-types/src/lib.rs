//! Shared type definitions for the dafarmz farming game.
//!
//! This crate is the single source of truth for the data that flows between
//! the simulation (`dafarmz-farm`), the game service (`dafarmz-core`), the
//! store (`dafarmz-db`), and the HTTP surface (`dafarmz-api`).
//!
//! # Modules
//!
//! - [`ids`] -- Owner and scenario identifiers
//! - [`enums`] -- Item categories and plot environments
//! - [`structs`] -- Item keys, yield specs, crop and planet definitions, plot items

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Environment, ItemCategory};
pub use ids::{OwnerId, ScenarioId};
pub use structs::{
    CropDefinition, DEFAULT_LIFECYCLE_STAGES, ItemKey, PlanetDefinition, PlotItem, PlotItemData,
    YieldSpec, YieldTable,
};
