use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};

use crate::auth::{Role, TokenSubject};

/// Public identity fields of a `usuarios` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<&UserProfile> for TokenSubject {
    fn from(user: &UserProfile) -> Self {
        TokenSubject {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Admin listing row. Never carries the password hash or token columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub profile: UserProfile,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
}

/// The user owning a stored delegated token, plus that token's stored expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHolder {
    pub user: UserProfile,
    pub token_expiration: Option<DateTime<Utc>>,
}

pub(crate) fn decode_role(row: &PgRow) -> sqlx::Result<Role> {
    let raw: String = row.try_get("rol")?;
    raw.parse::<Role>().map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

impl<'r> FromRow<'r, PgRow> for UserProfile {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            role: decode_role(row)?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for UserSummary {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            first_name: row.try_get("nombre")?,
            last_name: row.try_get("apellido")?,
            phone: row.try_get("telefono")?,
            role: decode_role(row)?,
            created_at: row.try_get("created_at")?,
            last_login: row.try_get("last_login")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for UserCredentials {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            profile: UserProfile::from_row(row)?,
            password_hash: row.try_get("password")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for TokenHolder {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            user: UserProfile::from_row(row)?,
            token_expiration: row.try_get("token_expiracion")?,
        })
    }
}
