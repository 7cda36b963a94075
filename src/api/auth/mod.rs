//! Authentication endpoint
//!
//! Checks an email/password pair. No session or token is issued.

use axum::{extract::State, routing::post, Router};
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, UserResponse};
use crate::domain::user::Credentials;

/// Create the authentication router
pub fn create_auth_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Verify credentials
///
/// POST /login
///
/// Returns the matching user, or 401 for any mismatch without saying whether
/// the email exists.
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(&credentials)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    info!(user_id = %user.id(), "User authenticated");
    Ok(Json(UserResponse::from(&user)))
}
