//! Configuration loading and typed config structures for dafarmz.
//!
//! The canonical configuration lives in `dafarmz-config.yaml` at the project
//! root, and the item catalog in `dafarmz-catalog.yaml`. This module defines
//! strongly-typed structs mirroring both files and loaders that read them.
//! A missing section (or an empty file) falls back to defaults.

use std::path::Path;

use serde::Deserialize;

use dafarmz_farm::{CropCatalog, FarmError, ScenarioSettings};
use dafarmz_types::{CropDefinition, PlanetDefinition};

/// Errors that can occur when loading configuration or the catalog.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The catalog parsed but is not a valid catalog.
    #[error("invalid catalog: {source}")]
    Catalog {
        /// What was wrong with it.
        #[from]
        source: FarmError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Top-level game configuration.
///
/// Mirrors the structure of `dafarmz-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Farm grid and planting rewards.
    #[serde(default)]
    pub farm: FarmConfig,

    /// Currency settings.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// XP curve.
    #[serde(default)]
    pub leveling: LevelingConfig,

    /// Daily challenge settings.
    #[serde(default)]
    pub challenges: ChallengesConfig,

    /// Explore scenario generation.
    #[serde(default)]
    pub scenario: ScenarioConfig,

    /// Connection strings and ports.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for infrastructure:
    /// - `DRAGONFLY_URL` overrides `infrastructure.dragonfly_url`
    /// - `API_PORT` overrides `infrastructure.api_port`
    /// - `DAFARMZ_CATALOG` overrides `infrastructure.catalog_path`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}

/// Farm grid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FarmConfig {
    /// Number of columns (`A`, `B`, ...).
    #[serde(default = "default_grid_columns")]
    pub columns: u8,

    /// Number of rows.
    #[serde(default = "default_grid_rows")]
    pub rows: u32,

    /// XP awarded for planting a seed.
    #[serde(default = "default_plant_xp")]
    pub plant_xp: u32,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            columns: default_grid_columns(),
            rows: default_grid_rows(),
            plant_xp: default_plant_xp(),
        }
    }
}

/// Currency configuration. Amounts are in cents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EconomyConfig {
    /// Balance a new player starts with.
    #[serde(default)]
    pub starting_balance: u64,

    /// Bonus for voting on a weekday.
    #[serde(default = "default_vote_bonus")]
    pub vote_bonus: u64,

    /// Bonus for voting on a weekend.
    #[serde(default = "default_weekend_vote_bonus")]
    pub weekend_vote_bonus: u64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_balance: 0,
            vote_bonus: default_vote_bonus(),
            weekend_vote_bonus: default_weekend_vote_bonus(),
        }
    }
}

/// XP curve configuration: `level = floor(k * sqrt(xp))`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LevelingConfig {
    /// Curve constant.
    #[serde(default = "default_level_k")]
    pub k: f64,
}

impl Default for LevelingConfig {
    fn default() -> Self {
        Self {
            k: default_level_k(),
        }
    }
}

/// Daily challenge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChallengesConfig {
    /// Options generated on each refresh.
    #[serde(default = "default_options_per_refresh")]
    pub options_per_refresh: u32,

    /// Minimum hours between refreshes.
    #[serde(default = "default_refresh_interval_hours")]
    pub refresh_interval_hours: u32,

    /// How many options may be accepted at once.
    #[serde(default = "default_max_active")]
    pub max_active: u32,
}

impl Default for ChallengesConfig {
    fn default() -> Self {
        Self {
            options_per_refresh: default_options_per_refresh(),
            refresh_interval_hours: default_refresh_interval_hours(),
            max_active: default_max_active(),
        }
    }
}

/// Explore scenario configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioConfig {
    /// Grid width.
    #[serde(default = "default_grid_columns")]
    pub columns: u8,

    /// Grid height.
    #[serde(default = "default_grid_rows")]
    pub rows: u32,

    /// Chance that a cell holds anything.
    #[serde(default = "default_fill_chance")]
    pub fill_chance: f64,

    /// Chance that a filled cell is an obstruction.
    #[serde(default = "default_obstruction_chance")]
    pub obstruction_chance: f64,

    /// Chance that a filled cell is a treasure.
    #[serde(default = "default_treasure_chance")]
    pub treasure_chance: f64,

    /// XP awarded on top of yields for each interaction.
    #[serde(default = "default_interact_xp")]
    pub interact_xp: u32,
}

impl ScenarioConfig {
    /// Generation knobs for [`dafarmz_farm::Scenario::generate`].
    pub const fn settings(&self) -> ScenarioSettings {
        ScenarioSettings {
            columns: self.columns,
            rows: self.rows,
            fill_chance: self.fill_chance,
            obstruction_chance: self.obstruction_chance,
            treasure_chance: self.treasure_chance,
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            columns: default_grid_columns(),
            rows: default_grid_rows(),
            fill_chance: default_fill_chance(),
            obstruction_chance: default_obstruction_chance(),
            treasure_chance: default_treasure_chance(),
            interact_xp: default_interact_xp(),
        }
    }
}

/// Infrastructure connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Dragonfly (Redis-compatible) URL.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,

    /// Address the HTTP API binds to.
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// Port the HTTP API listens on.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Path of the item catalog YAML.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
}

impl InfrastructureConfig {
    /// Override infrastructure settings with environment variables when set.
    ///
    /// An `API_PORT` that is not a valid port is ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.dragonfly_url = val;
        }
        if let Ok(val) = std::env::var("API_PORT") {
            match val.trim().parse() {
                Ok(port) => self.api_port = port,
                Err(e) => tracing::warn!(value = %val, error = %e, "ignoring invalid API_PORT"),
            }
        }
        if let Ok(val) = std::env::var("DAFARMZ_CATALOG") {
            self.catalog_path = val;
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            dragonfly_url: default_dragonfly_url(),
            api_host: default_api_host(),
            api_port: default_api_port(),
            catalog_path: default_catalog_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// On-disk shape of `dafarmz-catalog.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<CropDefinition>,
    #[serde(default)]
    planets: Vec<PlanetDefinition>,
}

/// Load the item catalog from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] or [`ConfigError::Yaml`] if the file cannot be
/// read or parsed, and [`ConfigError::Catalog`] on duplicate keys.
pub fn load_catalog(path: &Path) -> Result<CropCatalog, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_catalog(&contents)
}

/// Parse an item catalog from a YAML string.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] on malformed YAML and
/// [`ConfigError::Catalog`] on duplicate keys.
pub fn parse_catalog(yaml: &str) -> Result<CropCatalog, ConfigError> {
    let file: CatalogFile = if yaml.trim().is_empty() {
        CatalogFile::default()
    } else {
        serde_yml::from_str(yaml)?
    };
    Ok(CropCatalog::new(file.items)?.with_planets(file.planets)?)
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_grid_columns() -> u8 {
    5
}

const fn default_grid_rows() -> u32 {
    5
}

const fn default_plant_xp() -> u32 {
    10
}

const fn default_vote_bonus() -> u64 {
    500
}

const fn default_weekend_vote_bonus() -> u64 {
    1000
}

const fn default_level_k() -> f64 {
    0.07
}

const fn default_options_per_refresh() -> u32 {
    3
}

const fn default_refresh_interval_hours() -> u32 {
    24
}

const fn default_max_active() -> u32 {
    1
}

const fn default_fill_chance() -> f64 {
    0.5
}

const fn default_obstruction_chance() -> f64 {
    0.15
}

const fn default_treasure_chance() -> f64 {
    0.05
}

const fn default_interact_xp() -> u32 {
    10
}

fn default_dragonfly_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_api_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_api_port() -> u16 {
    8080
}

fn default_catalog_path() -> String {
    "dafarmz-catalog.yaml".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}
