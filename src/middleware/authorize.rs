use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::Role;
use crate::database::CredentialStore;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::DelegationService;

fn auth_user(request: &Request) -> Result<&AuthUser, ApiError> {
    request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Access denied. User not authenticated."))
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    if auth_user(&request)?.role() != Role::Admin {
        return Err(ApiError::forbidden("Access denied. Administrator privileges required."));
    }
    Ok(next.run(request).await)
}

pub async fn require_vendor_or_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    if !matches!(auth_user(&request)?.role(), Role::Admin | Role::Vendor) {
        return Err(ApiError::forbidden("Access denied. Vendor or administrator privileges required."));
    }
    Ok(next.run(request).await)
}

/// State for the two permission checks. Either check passes when the caller
/// holds ANY of `required`; admins always pass.
#[derive(Debug, Clone)]
pub struct PermissionGate {
    required: Arc<[&'static str]>,
    store: Arc<dyn CredentialStore>,
    delegation: DelegationService,
}

impl PermissionGate {
    pub fn new(store: Arc<dyn CredentialStore>, delegation: DelegationService, required: &[&'static str]) -> Self {
        Self {
            required: required.into(),
            store,
            delegation,
        }
    }

    fn describe(&self) -> String {
        self.required.join(", ")
    }
}

/// Live check against `usuario_permisos`, read fresh on every request.
pub async fn require_granted_permission(
    State(gate): State<PermissionGate>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = auth_user(&request)?;

    if user.role() != Role::Admin {
        let granted = gate.store.granted_permissions(user.id()).await?;
        if !gate.required.iter().any(|r| granted.iter().any(|g| g == r)) {
            tracing::debug!("User {} lacks granted permission ({})", user.id(), gate.describe());
            return Err(ApiError::forbidden(
                "Access denied. You do not have sufficient permissions for this action.",
            ));
        }
    }

    Ok(next.run(request).await)
}

/// Check against the permission list frozen into a delegated token. The token
/// must also still be the holder's stored, unexpired access token.
pub async fn require_token_permission(
    State(gate): State<PermissionGate>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = auth_user(&request)?;

    if user.role() != Role::Admin {
        if !gate.required.iter().any(|r| user.claims.embeds_permission(r)) {
            return Err(ApiError::forbidden(format!(
                "Access denied. Requires permission: {}",
                gate.describe()
            )));
        }
        gate.delegation.authorize_delegated(&user.claims, &user.token).await?;
    }

    Ok(next.run(request).await)
}
