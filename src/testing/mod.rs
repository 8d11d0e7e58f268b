//! In-process doubles for the clock and the credential store, plus a router
//! builder wired to them.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use crate::app::{build_router, AppState};
use crate::auth::{Clock, Role, TokenSubject};
use crate::config::{AppConfig, DatabaseConfig};
use crate::database::models::{
    catalog, NewUser, Permission, TokenHolder, UserCredentials, UserProfile, UserSummary,
};
use crate::database::{CredentialStore, DatabaseError, DatabaseManager};

pub const TEST_SECRET: &str = "feria-test-secret-0123456789abcdef";

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    profile: UserProfile,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
    access_token: Option<String>,
    token_expiration: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct State {
    users: Vec<StoredUser>,
    catalog: Vec<Permission>,
    grants: Vec<(i64, i64)>,
}

/// `CredentialStore` backed by a mutex-guarded vector, seeded with the same
/// permission catalog as the initial migration.
#[derive(Debug)]
pub struct InMemoryCredentialStore {
    state: Mutex<State>,
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        let catalog = [
            catalog::EDIT_PRODUCTS,
            catalog::VIEW_REPORTS,
            catalog::VIEW_DASHBOARD,
            catalog::MANAGE_USERS,
            catalog::MANAGE_ORDERS,
        ]
        .iter()
        .enumerate()
        .map(|(i, name)| Permission {
            id: i as i64 + 1,
            name: name.to_string(),
            description: None,
        })
        .collect();

        Self {
            state: Mutex::new(State {
                catalog,
                ..State::default()
            }),
        }
    }
}

impl InMemoryCredentialStore {
    /// Insert a user with a fixed id. The password hash is a placeholder and
    /// will not verify; use `create_user` for login tests.
    pub fn seed_user(&self, id: i64, username: &str, role: Role) -> UserProfile {
        let profile = UserProfile {
            id,
            username: username.to_string(),
            email: format!("{}@feria.test", username),
            role,
        };
        self.state.lock().unwrap().users.push(StoredUser {
            profile: profile.clone(),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            phone: None,
            created_at: Utc::now(),
            last_login: None,
            access_token: None,
            token_expiration: None,
        });
        profile
    }

    pub fn grant(&self, user_id: i64, permission: &str) {
        let mut state = self.state.lock().unwrap();
        let permission_id = state
            .catalog
            .iter()
            .find(|p| p.name == permission)
            .map(|p| p.id)
            .unwrap();
        state.grants.push((user_id, permission_id));
    }

    pub fn stored_token(&self, user_id: i64) -> (Option<String>, Option<DateTime<Utc>>) {
        let state = self.state.lock().unwrap();
        let user = state.users.iter().find(|u| u.profile.id == user_id).unwrap();
        (user.access_token.clone(), user.token_expiration)
    }

    pub fn last_login(&self, user_id: i64) -> Option<DateTime<Utc>> {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|u| u.profile.id == user_id)
            .and_then(|u| u.last_login)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_user(&self, id: i64) -> Result<Option<UserProfile>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.profile.id == id).map(|u| u.profile.clone()))
    }

    async fn find_credentials(&self, login: &str) -> Result<Option<UserCredentials>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|u| u.profile.username == login || u.profile.email == login)
            .map(|u| UserCredentials {
                profile: u.profile.clone(),
                password_hash: u.password_hash.clone(),
            }))
    }

    async fn create_user(&self, user: NewUser) -> Result<UserProfile, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        if state
            .users
            .iter()
            .any(|u| u.profile.username == user.username || u.profile.email == user.email)
        {
            return Err(DatabaseError::Conflict("username or email already exists".to_string()));
        }

        let id = state.users.iter().map(|u| u.profile.id).max().unwrap_or(0) + 1;
        let profile = UserProfile {
            id,
            username: user.username,
            email: user.email,
            role: user.role,
        };
        state.users.push(StoredUser {
            profile: profile.clone(),
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            created_at: Utc::now(),
            last_login: None,
            access_token: None,
            token_expiration: None,
        });
        Ok(profile)
    }

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.profile.id == id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .map(|u| UserSummary {
                id: u.profile.id,
                username: u.profile.username.clone(),
                email: u.profile.email.clone(),
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
                phone: u.phone.clone(),
                role: u.profile.role,
                created_at: Some(u.created_at),
                last_login: u.last_login,
            })
            .collect())
    }

    async fn update_role(&self, id: i64, role: Role) -> Result<bool, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        match state.users.iter_mut().find(|u| u.profile.id == id) {
            Some(user) => {
                user.profile.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn permission_catalog(&self) -> Result<Vec<Permission>, DatabaseError> {
        Ok(self.state.lock().unwrap().catalog.clone())
    }

    async fn existing_permissions(&self, names: &[String]) -> Result<Vec<String>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .catalog
            .iter()
            .filter(|p| names.contains(&p.name))
            .map(|p| p.name.clone())
            .collect())
    }

    async fn granted_permissions(&self, user_id: i64) -> Result<Vec<String>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .grants
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, pid)| state.catalog.iter().find(|p| p.id == *pid))
            .map(|p| p.name.clone())
            .collect())
    }

    async fn store_access_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.profile.id == user_id) {
            user.access_token = Some(token.to_string());
            user.token_expiration = Some(expires_at);
        }
        Ok(())
    }

    async fn clear_access_token(&self, user_id: i64) -> Result<(), DatabaseError> {
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.profile.id == user_id) {
            user.access_token = None;
            user.token_expiration = None;
        }
        Ok(())
    }

    async fn find_by_access_token(&self, token: &str) -> Result<Option<TokenHolder>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|u| u.access_token.as_deref() == Some(token))
            .map(|u| TokenHolder {
                user: u.profile.clone(),
                token_expiration: u.token_expiration,
            }))
    }
}

/// Shared fixture: in-memory store, manual clock and an `AppState` whose pool
/// points at a closed port and is never expected to connect.
pub struct TestApp {
    pub store: Arc<InMemoryCredentialStore>,
    pub clock: Arc<ManualClock>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryCredentialStore::default());
        let clock = Arc::new(ManualClock::default());

        let mut config = AppConfig::development();
        config.security.jwt_secret = TEST_SECRET.to_string();
        config.security.expose_internal_errors = false;
        config.database = DatabaseConfig {
            url: Some("postgres://feria@127.0.0.1:1/feria_test".to_string()),
            acquire_timeout_secs: 1,
            ..DatabaseConfig::default()
        };

        let database = DatabaseManager::connect_lazy(&config.database).unwrap();
        let state = AppState::with_store(config, database, store.clone(), clock.clone());

        Self { store, clock, state }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Session token for `user`, as login would issue it.
    pub fn session_token(&self, user: &UserProfile) -> String {
        self.state
            .codec
            .sign(&TokenSubject::from(user), None, None)
            .unwrap()
            .token
    }
}

/// Drive one request through `router` and decode the JSON body (`Null` when
/// empty).
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
