// handlers/protected/products.rs - POST /api/products, PUT and DELETE /api/products/:id

use axum::extract::{Path, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{NewProduct, Product, ProductChanges};
use crate::error::ApiError;
use crate::handlers::ApiJson;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub image: Option<String>,
}

impl CreateProductRequest {
    fn validate(self) -> Result<NewProduct, ApiError> {
        let name = self.name.filter(|n| !n.trim().is_empty());
        let category = self.category.filter(|c| !c.trim().is_empty());

        match (name, self.price, category) {
            (Some(name), Some(price), Some(category)) => {
                if price <= Decimal::ZERO {
                    return Err(ApiError::bad_request("price must be greater than zero"));
                }
                Ok(NewProduct {
                    name,
                    description: self.description,
                    price,
                    stock: self.stock,
                    category,
                    image: self.image,
                })
            }
            (name, price, category) => {
                let missing: Vec<&str> = [
                    name.is_none().then_some("name"),
                    price.is_none().then_some("price"),
                    category.is_none().then_some("category"),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(ApiError::validation_error(
                    "Please provide at least name, price and category",
                    Some(json!({ "missing": missing })),
                ))
            }
        }
    }
}

pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateProductRequest>,
) -> ApiResult<Product> {
    let product = state.products.create(request.validate()?).await?;
    tracing::info!("User {} created product {}", user.id(), product.id);
    Ok(ApiResponse::created(product))
}

/// Partial update: omitted fields keep their stored value.
pub async fn update_put(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ApiJson(changes): ApiJson<ProductChanges>,
) -> ApiResult<Product> {
    if changes.price.is_some_and(|p| p <= Decimal::ZERO) {
        return Err(ApiError::bad_request("price must be greater than zero"));
    }
    let product = state.products.update(id, changes).await?;
    tracing::info!("User {} updated product {}", user.id(), id);
    Ok(ApiResponse::success(product))
}

pub async fn delete_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    state.products.delete(id).await?;
    tracing::info!("User {} deleted product {}", user.id(), id);
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
