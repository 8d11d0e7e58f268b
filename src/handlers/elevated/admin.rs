// handlers/elevated/admin.rs - GET /api/admin/dashboard, GET /api/admin/users,
// PUT /api/admin/users/role

use axum::extract::State;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::{Clock, Role};
use crate::database::models::{DashboardStats, UserSummary};
use crate::error::ApiError;
use crate::handlers::ApiJson;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

const RECENT_SALES_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleRequest {
    pub user_id: Option<i64>,
    pub new_role: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChanged {
    pub user_id: i64,
    pub role: Role,
}

pub async fn dashboard_get(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let now = state.clock.now();
    let counts = state.reports.table_counts().await?;
    let recent_sales = state
        .reports
        .sales_since(now - Duration::days(RECENT_SALES_DAYS))
        .await?;

    Ok(ApiResponse::success(DashboardStats {
        users: counts.users,
        products: counts.products,
        categories: counts.categories,
        orders: counts.orders,
        recent_sales,
        server_time: now,
        server_ip: state.config.server.server_ip.clone(),
    }))
}

/// Never includes password hashes or token columns.
pub async fn users_get(State(state): State<AppState>) -> ApiResult<Vec<UserSummary>> {
    Ok(ApiResponse::success(state.store.list_users().await?))
}

pub async fn role_put(
    State(state): State<AppState>,
    admin: AuthUser,
    ApiJson(request): ApiJson<ChangeRoleRequest>,
) -> ApiResult<RoleChanged> {
    let role: Role = request
        .new_role
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid role. Allowed roles are: admin, vendedor, usuario"))?;
    let user_id = request
        .user_id
        .ok_or_else(|| ApiError::bad_request("userId is required"))?;

    if !state.store.update_role(user_id, role).await? {
        return Err(ApiError::not_found(format!("User {} not found", user_id)));
    }

    tracing::info!("Admin {} set role of user {} to {}", admin.id(), user_id, role);
    Ok(ApiResponse::success(RoleChanged { user_id, role }))
}
