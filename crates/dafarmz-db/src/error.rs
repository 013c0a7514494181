//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`fred`] and [`serde_json`] errors. At the [`GameStore`] boundary they
//! collapse into [`StoreError::Backend`].
//!
//! [`GameStore`]: dafarmz_core::store::GameStore

use dafarmz_core::store::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored document could not be decoded.
    #[error("Corrupt document at {key}: {reason}")]
    Corrupt {
        /// The key holding the document.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        tracing::error!(error = %err, "storage operation failed");
        Self::Backend {
            message: err.to_string(),
        }
    }
}
