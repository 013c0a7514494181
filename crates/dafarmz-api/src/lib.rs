//! HTTP command API for dafarmz.
//!
//! This crate provides an Axum HTTP server that exposes every player
//! command (setup, plant, harvest, shop, challenges, scenarios) as a JSON
//! endpoint over a shared [`GameService`], plus the vote webhook.
//!
//! # Architecture
//!
//! Handlers are generic over the [`GameStore`] backend, so the same router
//! serves Dragonfly in production and the in-memory store in tests.
//! Failures become JSON `{error, status}` bodies via [`ApiError`].
//!
//! [`GameService`]: dafarmz_core::GameService
//! [`GameStore`]: dafarmz_core::GameStore
//! [`ApiError`]: error::ApiError

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod webhook;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
