use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, Clock, PasswordError, Role, TokenCodec, TokenError, TokenSubject};
use crate::database::models::{NewUser, UserProfile};
use crate::database::{CredentialStore, DatabaseError};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(alias = "email")]
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Registration, password login and profile reads.
#[derive(Debug, Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    codec: TokenCodec,
    session_ttl_hours: i64,
}

impl AccountService {
    pub fn new(store: Arc<dyn CredentialStore>, codec: TokenCodec, session_ttl_hours: u32) -> Self {
        Self {
            store,
            codec,
            session_ttl_hours: i64::from(session_ttl_hours),
        }
    }

    /// New accounts always get the plain `usuario` role.
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile, AccountError> {
        let username = required(request.username, "username")?;
        let email = required(request.email, "email")?;
        let password = request
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AccountError::InvalidInput("password is required".to_string()))?;

        validate_username(&username)?;
        validate_email(&email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::InvalidInput(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let user = self
            .store
            .create_user(NewUser {
                username,
                email,
                password_hash: hash_password(&password)?,
                first_name: request.first_name,
                last_name: request.last_name,
                phone: request.phone,
                role: Role::User,
            })
            .await?;

        info!("Registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Session, AccountError> {
        let login = required(request.username, "username")?;
        let password = request
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AccountError::InvalidInput("password is required".to_string()))?;

        let Some(credentials) = self.store.find_credentials(&login).await? else {
            warn!("Login failed for '{}': no such user", login);
            return Err(AccountError::InvalidCredentials);
        };

        // Hashes the store cannot parse count as a mismatch for the caller.
        let matches = match verify_password(&password, &credentials.password_hash) {
            Ok(matches) => matches,
            Err(PasswordError::MalformedHash(_)) => {
                warn!("Stored password hash for user {} is unreadable", credentials.profile.id);
                false
            }
            Err(e) => return Err(e.into()),
        };
        if !matches {
            warn!("Login failed for user {}: wrong password", credentials.profile.id);
            return Err(AccountError::InvalidCredentials);
        }

        let signed = self.codec.sign(
            &TokenSubject::from(&credentials.profile),
            None,
            Some(Duration::hours(self.session_ttl_hours)),
        )?;
        self.store
            .touch_last_login(credentials.profile.id, self.codec.clock().now())
            .await?;

        info!("User {} logged in", credentials.profile.id);
        Ok(Session {
            expires_at: signed.expires_at(),
            token: signed.token,
            user: credentials.profile,
        })
    }

    pub async fn profile(&self, user_id: i64) -> Result<UserProfile, AccountError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(AccountError::NotFound(user_id))
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, AccountError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AccountError::InvalidInput(format!("{} is required", field)))
}

fn validate_username(username: &str) -> Result<(), AccountError> {
    let len = username.chars().count();
    let charset_ok = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if !(3..=50).contains(&len) || !charset_ok {
        return Err(AccountError::InvalidInput(
            "username must be 3-50 characters of letters, digits, '_' or '-'".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AccountError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AccountError::InvalidInput("email is not a valid address".to_string()))
    }
}
