use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::auth::{Claims, Clock, Role, TokenCodec, TokenError, TokenSubject};
use crate::database::models::{Permission, UserProfile};
use crate::database::{CredentialStore, DatabaseError};

/// Errors raised while issuing, revoking or checking delegated tokens.
#[derive(Debug, Error)]
pub enum DelegationError {
    #[error("Only administrators can manage delegated access tokens")]
    Forbidden,

    #[error("{0}")]
    InvalidInput(String),

    /// Some requested names are not in the catalog; `valid` lists the ones
    /// that are, in request order.
    #[error("Some requested permissions are not valid")]
    UnknownPermissions { valid: Vec<String> },

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Access token is invalid or not registered")]
    InvalidToken,

    #[error("Access token has expired according to the stored expiration")]
    StoredExpired,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Who is acting. HTTP callers are built from verified claims; the admin CLI
/// acts as [`Actor::system`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn system() -> Self {
        Self { id: 0, role: Role::Admin }
    }

    fn require_admin(&self) -> Result<(), DelegationError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(DelegationError::Forbidden)
        }
    }
}

impl From<&Claims> for Actor {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.id,
            role: claims.role,
        }
    }
}

/// Longest lifetime a delegated token may be issued for (one year).
pub const MAX_TOKEN_HOURS: i64 = 24 * 366;

/// Token lifetime as sent by clients: `8`, `"8"` or `"8h"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TokenDuration {
    Hours(i64),
    Text(String),
}

impl TokenDuration {
    pub fn hours(&self) -> Result<i64, DelegationError> {
        let hours = match self {
            TokenDuration::Hours(h) => Some(*h),
            TokenDuration::Text(raw) => {
                let raw = raw.trim();
                let digits = raw
                    .strip_suffix('h')
                    .or_else(|| raw.strip_suffix('H'))
                    .unwrap_or(raw);
                digits.parse::<i64>().ok()
            }
        };

        match hours {
            Some(h) if (1..=MAX_TOKEN_HOURS).contains(&h) => Ok(h),
            _ => Err(DelegationError::InvalidInput(format!(
                "duration must be a whole number of hours between 1 and {} (e.g. 8 or \"8h\")",
                MAX_TOKEN_HOURS
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAccessRequest {
    pub user_id: Option<i64>,
    /// Kept loose so a non-list value is reported as invalid input rather
    /// than as a body parse failure.
    pub permissions: Option<Value>,
    pub duration: Option<TokenDuration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeAccessRequest {
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyAccessRequest {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedToken {
    pub user: UserProfile,
    pub permissions: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Admin-initiated issuance and revocation of permission-scoped tokens.
///
/// A delegated token is honoured only while the codec accepts it AND it is
/// still the value stored in the holder's `token_acceso` column with an
/// unexpired `token_expiracion`. Revocation clears the column.
#[derive(Debug, Clone)]
pub struct DelegationService {
    store: Arc<dyn CredentialStore>,
    codec: TokenCodec,
    default_ttl_hours: i64,
}

impl DelegationService {
    pub fn new(store: Arc<dyn CredentialStore>, codec: TokenCodec, default_ttl_hours: u32) -> Self {
        Self {
            store,
            codec,
            default_ttl_hours: i64::from(default_ttl_hours),
        }
    }

    pub async fn issue(&self, issuer: Actor, request: GenerateAccessRequest) -> Result<IssuedToken, DelegationError> {
        issuer.require_admin()?;

        let user_id = request
            .user_id
            .ok_or_else(|| DelegationError::InvalidInput("userId and a list of permissions are required".to_string()))?;
        let requested = parse_permission_list(request.permissions)?;
        let hours = match &request.duration {
            Some(duration) => duration.hours()?,
            None => self.default_ttl_hours,
        };

        let target = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(DelegationError::UserNotFound(user_id))?;

        let known = self.store.existing_permissions(&requested).await?;
        let valid: Vec<String> = requested.iter().filter(|name| known.contains(name)).cloned().collect();
        if valid.len() != requested.len() {
            return Err(DelegationError::UnknownPermissions { valid });
        }

        let ttl = Duration::try_hours(hours)
            .ok_or_else(|| DelegationError::InvalidInput(format!("duration of {} hours is out of range", hours)))?;
        let signed = self.codec.sign(&TokenSubject::from(&target), Some(valid.clone()), Some(ttl))?;
        let expires_at = signed.expires_at();

        self.store
            .store_access_token(target.id, &signed.token, expires_at)
            .await?;

        info!(
            target: "audit",
            action = "delegated_token_issued",
            issuer_id = issuer.id,
            target_id = target.id,
            at = %self.codec.clock().now().to_rfc3339(),
            expires_at = %expires_at.to_rfc3339(),
            permissions = ?valid,
            fingerprint = %fingerprint(&signed.token),
            "Admin {} issued a delegated token for user {}",
            issuer.id,
            target.id
        );

        Ok(IssuedToken {
            token: signed.token,
            expires_at,
            permissions: valid,
        })
    }

    /// Clears the stored token. Succeeds for users that never had one, and
    /// for ids that match no row.
    pub async fn revoke(&self, issuer: Actor, request: RevokeAccessRequest) -> Result<(), DelegationError> {
        issuer.require_admin()?;

        let user_id = request
            .user_id
            .ok_or_else(|| DelegationError::InvalidInput("userId is required".to_string()))?;

        self.store.clear_access_token(user_id).await?;

        info!(
            target: "audit",
            action = "delegated_token_revoked",
            issuer_id = issuer.id,
            target_id = user_id,
            at = %self.codec.clock().now().to_rfc3339(),
            "Admin {} revoked the delegated token of user {}",
            issuer.id,
            user_id
        );
        Ok(())
    }

    /// Public self-check. The stored column is consulted before the codec so
    /// that revoked or database-expired tokens are reported as such.
    pub async fn verify(&self, token: &str) -> Result<VerifiedToken, DelegationError> {
        if token.trim().is_empty() {
            return Err(DelegationError::InvalidInput("token is required".to_string()));
        }

        let holder = self
            .store
            .find_by_access_token(token)
            .await?
            .ok_or(DelegationError::InvalidToken)?;

        if let Some(expires_at) = holder.token_expiration {
            if expires_at <= self.codec.clock().now() {
                return Err(DelegationError::StoredExpired);
            }
        }

        let claims = self.codec.verify(token)?;

        Ok(VerifiedToken {
            user: holder.user,
            permissions: claims.permissions.unwrap_or_default(),
            expires_at: holder.token_expiration,
        })
    }

    pub async fn list_permissions(&self, issuer: Actor) -> Result<Vec<Permission>, DelegationError> {
        issuer.require_admin()?;
        Ok(self.store.permission_catalog().await?)
    }

    /// Stored-column half of the dual check for a token whose signature and
    /// embedded expiry were already verified into `claims`.
    pub async fn authorize_delegated(&self, claims: &Claims, token: &str) -> Result<(), DelegationError> {
        let holder = self
            .store
            .find_by_access_token(token)
            .await?
            .filter(|holder| holder.user.id == claims.id)
            .ok_or(DelegationError::InvalidToken)?;

        match holder.token_expiration {
            Some(expires_at) if expires_at <= self.codec.clock().now() => Err(DelegationError::StoredExpired),
            _ => Ok(()),
        }
    }
}

/// Requested names as a de-duplicated list, first occurrence kept.
fn parse_permission_list(raw: Option<Value>) -> Result<Vec<String>, DelegationError> {
    let invalid = || DelegationError::InvalidInput("userId and a non-empty list of permission names are required".to_string());

    let items = match raw {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => return Err(invalid()),
    };

    let mut names: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let name = item.as_str().ok_or_else(invalid)?;
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Short SHA-256 prefix identifying a token in logs without revealing it.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let hex = format!("{:x}", digest);
    hex[..16].to_string()
}
