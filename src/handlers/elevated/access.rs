// handlers/elevated/access.rs - POST /api/access/generate, POST /api/access/revoke,
// GET /api/access/permissions

use axum::extract::State;
use serde::Serialize;

use crate::app::AppState;
use crate::database::models::Permission;
use crate::handlers::ApiJson;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{GenerateAccessRequest, IssuedToken, RevokeAccessRequest};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Revoked {
    pub message: &'static str,
    pub user_id: i64,
}

pub async fn generate_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<GenerateAccessRequest>,
) -> ApiResult<IssuedToken> {
    let issued = state.delegation.issue(user.actor(), request).await?;
    Ok(ApiResponse::success(issued))
}

pub async fn revoke_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<RevokeAccessRequest>,
) -> ApiResult<Revoked> {
    let user_id = request.user_id;
    state.delegation.revoke(user.actor(), request).await?;
    Ok(ApiResponse::success(Revoked {
        message: "Access token revoked",
        user_id: user_id.unwrap_or_default(),
    }))
}

pub async fn permissions_get(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<Permission>> {
    Ok(ApiResponse::success(state.delegation.list_permissions(user.actor()).await?))
}
