//! Vote webhook from the bot listing site.
//!
//! The listing site posts one JSON body per vote. Only `upvote` events pay
//! out; test pings and unknown users are acknowledged with
//! `{"success": false}` rather than an HTTP error so the sender does not
//! retry them.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use dafarmz_core::{GameError, GameStore};
use dafarmz_types::OwnerId;

use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /webhook/topgg`.
#[derive(Debug, Deserialize)]
pub struct VotePayload {
    /// The voting user's snowflake, as a string.
    pub user: String,
    /// The bot that was voted for.
    #[serde(default)]
    pub bot: String,
    /// Event type; only `upvote` is paid.
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether the weekend multiplier is active.
    #[serde(rename = "isWeekend", default)]
    pub is_weekend: bool,
}

/// Response to the webhook sender.
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    /// Whether the vote was handled.
    pub success: bool,
}

/// Credit the vote bonus to the voting player.
pub async fn topgg<S: GameStore>(
    State(state): State<AppState<S>>,
    Json(vote): Json<VotePayload>,
) -> Result<Json<VoteResponse>, ApiError> {
    if vote.kind != "upvote" {
        debug!(kind = %vote.kind, "ignoring non-upvote webhook");
        return Ok(Json(VoteResponse { success: true }));
    }

    let Ok(owner) = vote.user.parse::<OwnerId>() else {
        warn!(user = %vote.user, "vote from unparseable user id");
        return Ok(Json(VoteResponse { success: false }));
    };

    match state.service.vote(owner, vote.is_weekend).await {
        Ok(bonus) => {
            info!(%owner, bot = %vote.bot, bonus, "vote bonus paid");
            Ok(Json(VoteResponse { success: true }))
        }
        Err(GameError::NotRegistered(_)) => {
            warn!(%owner, "vote from unregistered user");
            Ok(Json(VoteResponse { success: false }))
        }
        Err(err) => Err(err.into()),
    }
}
