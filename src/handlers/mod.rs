// handlers/mod.rs - Three security tiers
//
// Public (no token) → Protected (bearer token, plus a permission gate where
// noted) → Elevated (administrator role).
pub mod elevated;
pub mod protected;
pub mod public;

use axum::extract::FromRequest;

use crate::error::ApiError;

/// `Json` whose rejections render as [`ApiError::InvalidJson`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
