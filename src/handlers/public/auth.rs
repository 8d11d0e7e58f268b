// handlers/public/auth.rs - POST /api/auth/register, POST /api/auth/login

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::UserProfile;
use crate::handlers::ApiJson;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{LoginRequest, RegisterRequest, Session};

/// Create a `usuario` account. 409 when the username or email is taken.
pub async fn register_post(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<UserProfile> {
    let user = state.accounts.register(request).await?;
    Ok(ApiResponse::created(user))
}

/// Exchange username (or email) and password for a session token.
pub async fn login_post(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Session> {
    let session = state.accounts.login(request).await?;
    Ok(ApiResponse::success(session))
}
