// handlers/public/products.rs - GET /api/products, GET /api/products/:id

use axum::extract::{Path, State};

use crate::app::AppState;
use crate::database::models::Product;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn list_get(State(state): State<AppState>) -> ApiResult<Vec<Product>> {
    Ok(ApiResponse::success(state.products.list().await?))
}

pub async fn show_get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Product> {
    Ok(ApiResponse::success(state.products.select_404(id).await?))
}
