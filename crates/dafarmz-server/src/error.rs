//! Error types for the server binary.
//!
//! [`ServerError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration or catalog loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: dafarmz_core::ConfigError,
    },

    /// Connecting to Dragonfly failed.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying data layer error.
        #[from]
        source: dafarmz_db::DbError,
    },

    /// The HTTP server failed to start or stopped with an error.
    #[error("api error: {source}")]
    Api {
        /// The underlying server error.
        #[from]
        source: dafarmz_api::ServerError,
    },
}
