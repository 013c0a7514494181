//! Server binary for dafarmz.
//!
//! Wires configuration, the item catalog, storage, and the HTTP command
//! API together and serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `dafarmz-config.yaml` (or `DAFARMZ_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Load the item catalog
//! 4. Connect to Dragonfly (or use the in-memory store when
//!    `DAFARMZ_STORE=memory`)
//! 5. Serve the API

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dafarmz_api::{AppState, ServerConfig};
use dafarmz_core::config::{self, GameConfig};
use dafarmz_core::{GameService, GameStore, MemoryStore, SystemClock};
use dafarmz_db::DragonflyPool;
use dafarmz_farm::CropCatalog;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "dafarmz-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the catalog, storage, or the HTTP
/// server fails.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config);
    info!("dafarmz-server starting");
    info!(
        farm_columns = config.farm.columns,
        farm_rows = config.farm.rows,
        leveling_k = config.leveling.k,
        catalog_path = config.infrastructure.catalog_path,
        "Configuration loaded"
    );

    // 3. Load the item catalog.
    let catalog_path = PathBuf::from(&config.infrastructure.catalog_path);
    let catalog = config::load_catalog(&catalog_path)?;
    info!(items = catalog.len(), "Catalog loaded");

    // 4. Storage.
    let server = ServerConfig::from_infrastructure(&config.infrastructure);
    if std::env::var("DAFARMZ_STORE").is_ok_and(|store| store == "memory") {
        info!("Using in-memory store; state is lost on exit");
        return serve(MemoryStore::new(), config, catalog, catalog_path, &server).await;
    }

    let url = config.infrastructure.dragonfly_url.clone();
    info!(dragonfly_url = url, "Connecting to Dragonfly");
    let store = DragonflyPool::connect(&url).await?;
    serve(store, config, catalog, catalog_path, &server).await
}

/// Build the service over `store` and serve the API until shutdown.
async fn serve<S: GameStore>(
    store: S,
    config: GameConfig,
    catalog: CropCatalog,
    catalog_path: PathBuf,
    server: &ServerConfig,
) -> Result<(), ServerError> {
    let service = GameService::new(store, config, catalog, Arc::new(SystemClock));
    let state = AppState::new(service, catalog_path);

    // 5. Serve.
    dafarmz_api::start_server(server, state).await?;
    info!("dafarmz-server shutdown complete");
    Ok(())
}

/// Load the game configuration.
///
/// Reads `DAFARMZ_CONFIG` if set, otherwise `dafarmz-config.yaml` in the
/// working directory. A missing file means defaults (with environment
/// overrides still applied).
fn load_config() -> Result<GameConfig, ServerError> {
    let path = std::env::var("DAFARMZ_CONFIG").unwrap_or_else(|_| CONFIG_FILE.to_owned());
    let path = Path::new(&path);
    if path.exists() {
        Ok(GameConfig::from_file(path)?)
    } else {
        Ok(GameConfig::parse("")?)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(config: &GameConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
