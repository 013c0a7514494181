//! Configuration, progression, storage seam, and command orchestration for
//! dafarmz.
//!
//! The simulation itself lives in `dafarmz-farm`. This crate wraps it in
//! the things a running game needs: a clock, an XP curve, challenge boards,
//! a persistence trait, and [`GameService`], which turns player commands
//! into load, mutate, save, and credit steps.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `dafarmz-config.yaml` and the
//!   item catalog from `dafarmz-catalog.yaml`.
//! - [`clock`] -- Injectable wall clock.
//! - [`leveling`] -- XP to level conversion.
//! - [`challenges`] -- Challenge boards, progress, and claiming.
//! - [`store`] -- [`GameStore`] trait and the in-memory [`MemoryStore`].
//! - [`locks`] -- Per-owner command serialization.
//! - [`service`] -- [`GameService`], one method per player command.
//!
//! [`GameStore`]: store::GameStore
//! [`MemoryStore`]: store::MemoryStore
//! [`GameService`]: service::GameService

pub mod challenges;
pub mod clock;
pub mod config;
pub mod leveling;
pub mod locks;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, GameConfig};
pub use leveling::Leveling;
pub use service::{GameError, GameService};
pub use store::{Credit, Farm, GameStore, MemoryStore, Profile, StoreError};
