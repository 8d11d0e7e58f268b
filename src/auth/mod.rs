pub mod clock;
pub mod codec;
pub mod password;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use clock::{Clock, SystemClock};
pub use codec::{SignedToken, TokenCodec, TokenError, TokenSubject, DEFAULT_TOKEN_TTL_HOURS};
pub use password::{hash_password, verify_password, PasswordError};

/// Fixed role enumeration stored in `usuarios.rol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "vendedor")]
    Vendor,
    #[serde(rename = "usuario")]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Vendor => "vendedor",
            Role::User => "usuario",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role '{0}' (allowed: admin, vendedor, usuario)")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "vendedor" => Ok(Role::Vendor),
            "usuario" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Signed claim set carried by every bearer token.
///
/// Session tokens leave `permissions` empty; delegated tokens embed the exact
/// permission list approved at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn is_delegated(&self) -> bool {
        self.permissions.is_some()
    }

    pub fn embeds_permission(&self, name: &str) -> bool {
        self.permissions
            .as_deref()
            .is_some_and(|granted| granted.iter().any(|p| p == name))
    }
}
