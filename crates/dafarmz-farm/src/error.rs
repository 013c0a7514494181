//! Error types for the `dafarmz-farm` crate.
//!
//! Growth and harvest never fail: bad reference data degrades to "not
//! ready". [`FarmError`] covers the operations that can reject input:
//! location parsing, catalog construction, and scenario interaction.

use dafarmz_types::ItemKey;

use crate::location::Location;

/// Errors that can occur in plot, catalog, and scenario operations.
#[derive(Debug, thiserror::Error)]
pub enum FarmError {
    /// A location label could not be parsed (expected e.g. `A3`).
    #[error("invalid location: {0:?}")]
    InvalidLocation(String),

    /// A location is outside the plot grid.
    #[error("location {location} is outside the {columns}x{rows} grid")]
    LocationOutOfBounds {
        /// The rejected location.
        location: Location,
        /// Number of columns in the grid.
        columns: u8,
        /// Number of rows in the grid.
        rows: u32,
    },

    /// An item key is not present in the catalog.
    #[error("unknown item: {0}")]
    UnknownItem(ItemKey),

    /// Two catalog entries share a key.
    #[error("duplicate catalog item: {0}")]
    DuplicateItem(ItemKey),

    /// Two planets share a name.
    #[error("duplicate planet: {0}")]
    DuplicatePlanet(String),

    /// A scenario cell is empty.
    #[error("there is nothing at {0}")]
    NothingHere(Location),

    /// A scenario cell holds something that cannot be interacted with.
    #[error("{key} at {location} cannot be interacted with")]
    Blocked {
        /// The blocked cell.
        location: Location,
        /// What occupies it.
        key: ItemKey,
    },
}
