use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use super::{Claims, Clock, Role};

/// TTL in hours applied when a caller does not ask for one.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    InvalidSignature(String),

    #[error("token has expired")]
    Expired,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Identity fields every token carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: Claims,
}

impl SignedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.claims.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// HS256 signer/verifier. Expiry is judged against the injected clock rather
/// than the library's wall clock.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").field("clock", &self.clock).finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Mint a token for `subject`. `permissions` is embedded verbatim (order
    /// preserved); `ttl` defaults to [`DEFAULT_TOKEN_TTL_HOURS`].
    pub fn sign(
        &self,
        subject: &TokenSubject,
        permissions: Option<Vec<String>>,
        ttl: Option<Duration>,
    ) -> Result<SignedToken, TokenError> {
        let now = self.clock.now();
        let ttl = ttl.unwrap_or_else(|| Duration::hours(DEFAULT_TOKEN_TTL_HOURS));
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenError::Signing(format!("token lifetime {} is out of range", ttl)))?;

        let claims = Claims {
            id: subject.id,
            username: subject.username.clone(),
            email: subject.email.clone(),
            role: subject.role,
            permissions,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(SignedToken { token, claims })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::InvalidSignature(e.to_string()),
        })?;

        if data.claims.exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}
