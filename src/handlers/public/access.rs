// handlers/public/access.rs - POST /api/access/verify
//
// Deliberately unauthenticated: a client checks a delegated token before
// using it.

use axum::extract::State;

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::ApiJson;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{VerifiedToken, VerifyAccessRequest};

pub async fn verify_post(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyAccessRequest>,
) -> ApiResult<VerifiedToken> {
    let token = request
        .token
        .ok_or_else(|| ApiError::bad_request("token is required"))?;
    let verified = state.delegation.verify(&token).await?;
    Ok(ApiResponse::success(verified))
}
