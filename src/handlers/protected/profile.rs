// handlers/protected/profile.rs - GET /api/auth/profile

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::UserProfile;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// Fresh read of the caller's row; the token's copy of role may be stale.
pub async fn profile_get(State(state): State<AppState>, user: AuthUser) -> ApiResult<UserProfile> {
    Ok(ApiResponse::success(state.accounts.profile(user.id()).await?))
}
