//! REST endpoint handlers for the command API.
//!
//! Every handler is a thin adapter: extract the owner and body, call one
//! [`GameService`](dafarmz_core::GameService) method, and serialize the
//! result. Game rules live in the service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Health check |
//! | `POST` | `/api/users/{owner}` | Register a player |
//! | `GET` | `/api/users/{owner}` | Profile with level |
//! | `POST` | `/api/users/{owner}/buy` | Buy from the shop |
//! | `POST` | `/api/users/{owner}/sell` | Sell to the shop |
//! | `POST` | `/api/users/{owner}/pay` | Pay another player |
//! | `GET` | `/api/users/{owner}/challenges` | Challenge board |
//! | `POST` | `/api/users/{owner}/challenges/refresh` | New challenge options |
//! | `POST` | `/api/users/{owner}/challenges/{index}/accept` | Accept a challenge |
//! | `POST` | `/api/users/{owner}/challenges/{index}/claim` | Claim rewards |
//! | `GET` | `/api/farms/{owner}` | Farm plot view |
//! | `POST` | `/api/farms/{owner}/plant` | Plant a seed |
//! | `POST` | `/api/farms/{owner}/harvest` | Harvest ready cells |
//! | `DELETE` | `/api/farms/{owner}/plots/{location}` | Clear a cell |
//! | `GET` | `/api/shop` | Buyable items (`?owner=` filters by level) |
//! | `GET` | `/api/planets` | Planets and their biomes |
//! | `POST` | `/api/scenarios/{owner}/explore` | Start a scenario |
//! | `GET` | `/api/scenarios/{owner}` | Active scenario view |
//! | `POST` | `/api/scenarios/{owner}/interact` | Harvest a scenario cell |
//! | `DELETE` | `/api/scenarios/{owner}` | Leave the scenario |
//! | `POST` | `/api/catalog/reload` | Re-read the catalog file |

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use dafarmz_core::challenges::Challenges;
use dafarmz_core::config;
use dafarmz_core::service::{
    ClaimReport, HarvestReport, PaymentReport, PlantReport, PlotView, ProfileSummary,
    ScenarioView, TradeReport,
};
use dafarmz_core::GameStore;
use dafarmz_types::{CropDefinition, OwnerId, PlanetDefinition};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/farms/{owner}/plant`.
#[derive(Debug, Deserialize)]
pub struct PlantRequest {
    /// Target cell, e.g. `A1`.
    pub location: String,
    /// Seed key or display name.
    pub seed: String,
}

/// Body of the buy and sell endpoints.
#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    /// Item key or display name.
    pub item: String,
    /// Units to trade.
    #[serde(default = "default_quantity")]
    pub quantity: u64,
}

const fn default_quantity() -> u64 {
    1
}

/// Body of `POST /api/users/{owner}/pay`.
#[derive(Debug, Deserialize)]
pub struct PayRequest {
    /// The player receiving the coins.
    pub to: OwnerId,
    /// Cents to send.
    pub amount: u64,
}

/// Body of `POST /api/scenarios/{owner}/interact`.
#[derive(Debug, Deserialize)]
pub struct InteractRequest {
    /// Scenario cell, e.g. `C3`.
    pub location: String,
}

/// Query parameters for `GET /api/shop`.
#[derive(Debug, Deserialize)]
pub struct ShopQuery {
    /// Only show items this player's level allows.
    pub owner: Option<OwnerId>,
}

/// Response for `GET /api/shop`.
#[derive(Debug, Serialize)]
pub struct ShopResponse {
    /// Number of items.
    pub count: usize,
    /// The items on sale.
    pub items: Vec<CropDefinition>,
}

/// Response for `GET /api/planets`.
#[derive(Debug, Serialize)]
pub struct PlanetsResponse {
    /// Number of planets.
    pub count: usize,
    /// Planets in progression order.
    pub planets: Vec<PlanetDefinition>,
}

/// Response for endpoints that clear something.
#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    /// Whether anything was there.
    pub removed: bool,
}

/// Response for `POST /api/catalog/reload`.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    /// Items in the new catalog.
    pub items: usize,
}

// ---------------------------------------------------------------------------
// GET / -- health check
// ---------------------------------------------------------------------------

/// Report that the server is up.
pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Register a player with a profile and an empty farm.
pub async fn setup<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
) -> Result<(StatusCode, Json<ProfileSummary>), ApiError> {
    let summary = state.service.setup(owner).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Return a player's profile with level information.
pub async fn profile<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
) -> Result<Json<ProfileSummary>, ApiError> {
    Ok(Json(state.service.profile(owner).await?))
}

/// Buy items from the shop.
pub async fn buy<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
    Json(body): Json<TradeRequest>,
) -> Result<Json<TradeReport>, ApiError> {
    Ok(Json(
        state.service.buy(owner, &body.item, body.quantity).await?,
    ))
}

/// Sell items to the shop.
pub async fn sell<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
    Json(body): Json<TradeRequest>,
) -> Result<Json<TradeReport>, ApiError> {
    Ok(Json(
        state.service.sell(owner, &body.item, body.quantity).await?,
    ))
}

/// Send coins to another player.
pub async fn pay<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
    Json(body): Json<PayRequest>,
) -> Result<Json<PaymentReport>, ApiError> {
    Ok(Json(state.service.pay(owner, body.to, body.amount).await?))
}

// ---------------------------------------------------------------------------
// Challenges
// ---------------------------------------------------------------------------

/// Return the challenge board.
pub async fn challenges<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
) -> Result<Json<Challenges>, ApiError> {
    Ok(Json(state.service.challenges(owner).await?))
}

/// Replace the challenge options once the refresh interval has passed.
pub async fn refresh_challenges<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
) -> Result<Json<Challenges>, ApiError> {
    Ok(Json(state.service.refresh_challenges(owner).await?))
}

/// Accept a challenge option.
pub async fn accept_challenge<S: GameStore>(
    State(state): State<AppState<S>>,
    Path((owner, index)): Path<(OwnerId, usize)>,
) -> Result<Json<Challenges>, ApiError> {
    Ok(Json(state.service.accept_challenge(owner, index).await?))
}

/// Claim a completed challenge.
pub async fn claim_challenge<S: GameStore>(
    State(state): State<AppState<S>>,
    Path((owner, index)): Path<(OwnerId, usize)>,
) -> Result<Json<ClaimReport>, ApiError> {
    Ok(Json(state.service.claim_challenge(owner, index).await?))
}

// ---------------------------------------------------------------------------
// Farms
// ---------------------------------------------------------------------------

/// Return the farm as of now.
pub async fn farm<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
) -> Result<Json<PlotView>, ApiError> {
    Ok(Json(state.service.farm(owner).await?))
}

/// Plant a seed.
pub async fn plant<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
    Json(body): Json<PlantRequest>,
) -> Result<(StatusCode, Json<PlantReport>), ApiError> {
    let report = state
        .service
        .plant(owner, &body.location, &body.seed)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// Harvest every ready cell.
pub async fn harvest<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
) -> Result<Json<HarvestReport>, ApiError> {
    Ok(Json(state.service.harvest(owner).await?))
}

/// Clear a cell.
pub async fn remove_plant<S: GameStore>(
    State(state): State<AppState<S>>,
    Path((owner, location)): Path<(OwnerId, String)>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state.service.remove_plant(owner, &location).await?;
    Ok(Json(RemovedResponse { removed }))
}

// ---------------------------------------------------------------------------
// Shop
// ---------------------------------------------------------------------------

/// List buyable items.
pub async fn shop<S: GameStore>(
    State(state): State<AppState<S>>,
    Query(params): Query<ShopQuery>,
) -> Result<Json<ShopResponse>, ApiError> {
    let items = state.service.shop(params.owner).await?;
    Ok(Json(ShopResponse {
        count: items.len(),
        items,
    }))
}

/// List the planets.
pub async fn planets<S: GameStore>(State(state): State<AppState<S>>) -> Json<PlanetsResponse> {
    let planets = state.service.planets();
    Json(PlanetsResponse {
        count: planets.len(),
        planets,
    })
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Generate a new scenario, replacing the active one.
pub async fn explore<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
) -> Result<(StatusCode, Json<ScenarioView>), ApiError> {
    let view = state.service.explore(owner).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Return the active scenario.
pub async fn scenario<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
) -> Result<Json<ScenarioView>, ApiError> {
    Ok(Json(state.service.scenario(owner).await?))
}

/// Harvest one scenario cell.
pub async fn interact<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
    Json(body): Json<InteractRequest>,
) -> Result<Json<HarvestReport>, ApiError> {
    Ok(Json(state.service.interact(owner, &body.location).await?))
}

/// Leave the active scenario.
pub async fn leave_scenario<S: GameStore>(
    State(state): State<AppState<S>>,
    Path(owner): Path<OwnerId>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state.service.leave_scenario(owner).await?;
    Ok(Json(RemovedResponse { removed }))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Re-read the catalog file and swap it in.
///
/// A file that fails to parse leaves the current catalog in place.
pub async fn reload_catalog<S: GameStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let catalog = config::load_catalog(&state.catalog_path)?;
    let items = catalog.len();
    state.service.replace_catalog(catalog);
    Ok(Json(ReloadResponse { items }))
}
