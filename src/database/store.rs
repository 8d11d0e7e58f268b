//! Credential store: users, the permission catalog and its assignments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::auth::Role;
use crate::database::manager::DatabaseError;
use crate::database::models::{NewUser, Permission, TokenHolder, UserCredentials, UserProfile, UserSummary};

const PROFILE_COLUMNS: &str = "id, username, email, rol";

/// Persistent truth for identity and authorization.
///
/// None of these calls are combined into transactions; read-then-write
/// sequences built on top of them are not atomic.
#[async_trait]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    async fn find_user(&self, id: i64) -> Result<Option<UserProfile>, DatabaseError>;

    /// Look up login credentials by username or email.
    async fn find_credentials(&self, login: &str) -> Result<Option<UserCredentials>, DatabaseError>;

    async fn create_user(&self, user: NewUser) -> Result<UserProfile, DatabaseError>;

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), DatabaseError>;

    async fn list_users(&self) -> Result<Vec<UserSummary>, DatabaseError>;

    /// Returns `false` when no row matched `id`.
    async fn update_role(&self, id: i64, role: Role) -> Result<bool, DatabaseError>;

    async fn permission_catalog(&self) -> Result<Vec<Permission>, DatabaseError>;

    /// The subset of `names` present in the catalog, in catalog order.
    async fn existing_permissions(&self, names: &[String]) -> Result<Vec<String>, DatabaseError>;

    /// Permission names assigned to `user_id` through `usuario_permisos`.
    async fn granted_permissions(&self, user_id: i64) -> Result<Vec<String>, DatabaseError>;

    async fn store_access_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// Clears both token columns; succeeds whether or not anything was stored.
    async fn clear_access_token(&self, user_id: i64) -> Result<(), DatabaseError>;

    async fn find_by_access_token(&self, token: &str) -> Result<Option<TokenHolder>, DatabaseError>;
}

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user(&self, id: i64) -> Result<Option<UserProfile>, DatabaseError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM usuarios WHERE id = $1");
        let user = sqlx::query_as::<_, UserProfile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_credentials(&self, login: &str) -> Result<Option<UserCredentials>, DatabaseError> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS}, password FROM usuarios WHERE username = $1 OR email = $1 LIMIT 1"
        );
        let credentials = sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(credentials)
    }

    async fn create_user(&self, user: NewUser) -> Result<UserProfile, DatabaseError> {
        let sql = format!(
            "INSERT INTO usuarios (username, email, password, nombre, apellido, telefono, rol) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, UserProfile>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_write(e, "username or email"))
    }

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE usuarios SET last_login = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>, DatabaseError> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, email, nombre, apellido, telefono, rol, created_at, last_login \
             FROM usuarios ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_role(&self, id: i64, role: Role) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE usuarios SET rol = $1 WHERE id = $2")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn permission_catalog(&self) -> Result<Vec<Permission>, DatabaseError> {
        let permissions = sqlx::query_as::<_, Permission>("SELECT id, nombre, descripcion FROM permisos ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(permissions)
    }

    async fn existing_permissions(&self, names: &[String]) -> Result<Vec<String>, DatabaseError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<String> = sqlx::query_scalar("SELECT nombre FROM permisos WHERE nombre = ANY($1) ORDER BY id")
            .bind(names)
            .fetch_all(&self.pool)
            .await?;
        Ok(found)
    }

    async fn granted_permissions(&self, user_id: i64) -> Result<Vec<String>, DatabaseError> {
        let granted: Vec<String> = sqlx::query_scalar(
            "SELECT p.nombre FROM permisos p \
             JOIN usuario_permisos up ON p.id = up.permiso_id \
             WHERE up.usuario_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(granted)
    }

    async fn store_access_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE usuarios SET token_acceso = $1, token_expiracion = $2 WHERE id = $3")
            .bind(token)
            .bind(expires_at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_access_token(&self, user_id: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE usuarios SET token_acceso = NULL, token_expiracion = NULL WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_access_token(&self, token: &str) -> Result<Option<TokenHolder>, DatabaseError> {
        let sql = format!("SELECT {PROFILE_COLUMNS}, token_expiracion FROM usuarios WHERE token_acceso = $1");
        let holder = sqlx::query_as::<_, TokenHolder>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(holder)
    }
}
