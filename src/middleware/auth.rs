use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{Claims, Role};
use crate::error::ApiError;
use crate::services::Actor;

/// Authenticated caller, inserted into request extensions by [`authenticate`].
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub claims: Claims,
    /// The bearer token as presented; needed for the delegated dual check.
    pub token: String,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.claims.id
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn actor(&self) -> Actor {
        Actor::from(&self.claims)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Access denied. No token provided."))
    }
}

/// Bearer authentication: no token is 401, a token the codec rejects is 403.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Access denied. No token provided."))?;

    let claims = state.codec.verify(&token).map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(AuthUser { claims, token });
    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`.
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
