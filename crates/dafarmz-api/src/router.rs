//! Axum router construction for the command API.
//!
//! Assembles every route into a single [`Router`] with CORS and request
//! tracing middleware.

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use dafarmz_core::GameStore;

use crate::state::AppState;
use crate::{handlers, webhook};

/// Build the complete Axum router.
///
/// See [`handlers`] for the endpoint table. The vote webhook is mounted at
/// `POST /webhook/topgg`.
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router<S: GameStore>(state: AppState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/", get(handlers::index))
        // Webhooks
        .route("/webhook/topgg", post(webhook::topgg::<S>))
        // Users
        .route(
            "/api/users/{owner}",
            get(handlers::profile::<S>).post(handlers::setup::<S>),
        )
        .route("/api/users/{owner}/buy", post(handlers::buy::<S>))
        .route("/api/users/{owner}/sell", post(handlers::sell::<S>))
        .route("/api/users/{owner}/pay", post(handlers::pay::<S>))
        .route(
            "/api/users/{owner}/challenges",
            get(handlers::challenges::<S>),
        )
        .route(
            "/api/users/{owner}/challenges/refresh",
            post(handlers::refresh_challenges::<S>),
        )
        .route(
            "/api/users/{owner}/challenges/{index}/accept",
            post(handlers::accept_challenge::<S>),
        )
        .route(
            "/api/users/{owner}/challenges/{index}/claim",
            post(handlers::claim_challenge::<S>),
        )
        // Farms
        .route("/api/farms/{owner}", get(handlers::farm::<S>))
        .route("/api/farms/{owner}/plant", post(handlers::plant::<S>))
        .route("/api/farms/{owner}/harvest", post(handlers::harvest::<S>))
        .route(
            "/api/farms/{owner}/plots/{location}",
            delete(handlers::remove_plant::<S>),
        )
        // Shop
        .route("/api/shop", get(handlers::shop::<S>))
        // Planets
        .route("/api/planets", get(handlers::planets::<S>))
        // Scenarios
        .route(
            "/api/scenarios/{owner}",
            get(handlers::scenario::<S>).delete(handlers::leave_scenario::<S>),
        )
        .route(
            "/api/scenarios/{owner}/explore",
            post(handlers::explore::<S>),
        )
        .route(
            "/api/scenarios/{owner}/interact",
            post(handlers::interact::<S>),
        )
        // Admin
        .route("/api/catalog/reload", post(handlers::reload_catalog::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
