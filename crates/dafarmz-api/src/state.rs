//! Shared application state for the command API.
//!
//! [`AppState`] holds the [`GameService`] behind an [`Arc`] and the path
//! the catalog is reloaded from. It is cloned into every request by
//! Axum's `State` extractor.

use std::path::PathBuf;
use std::sync::Arc;

use dafarmz_core::GameService;

/// Shared state for the Axum application.
///
/// Generic over the storage backend so tests can run the full router
/// against the in-memory store.
pub struct AppState<S> {
    /// The game service every handler delegates to.
    pub service: Arc<GameService<S>>,
    /// Catalog file read by `POST /api/catalog/reload`.
    pub catalog_path: PathBuf,
}

impl<S> AppState<S> {
    /// Wrap a service.
    pub fn new(service: GameService<S>, catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            service: Arc::new(service),
            catalog_path: catalog_path.into(),
        }
    }
}

// A derived Clone would require `S: Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            catalog_path: self.catalog_path.clone(),
        }
    }
}

impl<S> core::fmt::Debug for AppState<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.service)
            .field("catalog_path", &self.catalog_path)
            .finish()
    }
}
