//! Data layer for dafarmz (`Dragonfly`).
//!
//! Farms, profiles, and active scenarios live in `Dragonfly` keyed by owner.
//! [`DragonflyPool`] implements [`dafarmz_core::store::GameStore`], so the
//! game service runs unchanged against it or the in-memory store.
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` connection, key layout, and the
//!   atomic profile credit script
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyPool;
pub use error::DbError;
