//! Error types for the command API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Game
//! errors keep their player-facing message; storage failures are logged
//! and reported as a bare 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use dafarmz_core::challenges::ChallengeError;
use dafarmz_core::{ConfigError, GameError};
use dafarmz_farm::FarmError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A player command was rejected or failed.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The catalog file could not be reloaded.
    #[error("catalog reload failed: {0}")]
    Catalog(#[from] ConfigError),
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Game(err) => game_status(err),
            Self::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

const fn game_status(err: &GameError) -> StatusCode {
    match err {
        GameError::NotRegistered(_)
        | GameError::UnknownRecipient(_)
        | GameError::UnknownItem(_)
        | GameError::NoScenario => StatusCode::NOT_FOUND,
        GameError::AlreadyRegistered(_)
        | GameError::CannotPlant { .. }
        | GameError::NothingToHarvest
        | GameError::NotEnough { .. } => StatusCode::CONFLICT,
        GameError::LevelTooLow { .. } => StatusCode::FORBIDDEN,
        GameError::NotForSale(_)
        | GameError::NotSellable(_)
        | GameError::InvalidQuantity
        | GameError::SelfPayment
        | GameError::Overflow => StatusCode::BAD_REQUEST,
        GameError::Farm(err) => farm_status(err),
        GameError::Challenge(err) => challenge_status(err),
        GameError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn farm_status(err: &FarmError) -> StatusCode {
    match err {
        FarmError::InvalidLocation(_) | FarmError::LocationOutOfBounds { .. } => {
            StatusCode::BAD_REQUEST
        }
        FarmError::NothingHere(_) | FarmError::UnknownItem(_) => StatusCode::NOT_FOUND,
        FarmError::Blocked { .. } => StatusCode::CONFLICT,
        FarmError::DuplicateItem(_) | FarmError::DuplicatePlanet(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

const fn challenge_status(err: &ChallengeError) -> StatusCode {
    match err {
        ChallengeError::NoSuchChallenge(_) => StatusCode::NOT_FOUND,
        ChallengeError::AlreadyAccepted(_)
        | ChallengeError::TooManyActive { .. }
        | ChallengeError::NotCompleted(_) => StatusCode::CONFLICT,
        ChallengeError::TooSoon { .. } => StatusCode::TOO_MANY_REQUESTS,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            String::from("internal error")
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use dafarmz_core::StoreError;
    use dafarmz_types::OwnerId;

    use super::*;

    #[test]
    fn statuses_follow_the_failure() {
        let missing = ApiError::from(GameError::NotRegistered(OwnerId(1)));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let full = ApiError::from(GameError::NothingToHarvest);
        assert_eq!(full.status(), StatusCode::CONFLICT);

        let early = ApiError::from(GameError::Challenge(ChallengeError::NotCompleted(0)));
        assert_eq!(early.status(), StatusCode::CONFLICT);

        let backend = ApiError::from(GameError::Store(StoreError::Backend {
            message: String::from("down"),
        }));
        assert_eq!(backend.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn server_errors_hide_details() {
        let backend = ApiError::from(GameError::Store(StoreError::Backend {
            message: String::from("connection refused"),
        }));
        let response = backend.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
