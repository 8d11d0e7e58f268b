use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Fallback signing secret for local development only. Never accepted outside
/// `Environment::Development`.
pub const DEVELOPMENT_JWT_SECRET: &str = "feria-development-secret-do-not-deploy";

/// Secret shipped as the default by earlier deployments; refused everywhere
/// except development.
const KNOWN_WEAK_SECRETS: &[&str] = &["tu_clave_secreta", "secret", "changeme"];

const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a strong value in {0:?} (got {1})")]
    WeakSecret(Environment, &'static str),

    #[error("Invalid database configuration: {0}")]
    InvalidDatabase(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Label reported by `/` and the admin dashboard, not used for binding.
    pub server_ip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; when set it wins over the individual parts.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub session_token_hours: u32,
    pub delegated_token_hours: u32,
    /// Pass store and codec error messages through to clients on 500s.
    pub expose_internal_errors: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides();

        config.validate()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_IP") {
            self.server.server_ip = v;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DB_HOST") {
            self.database.host = v;
        }
        if let Ok(v) = env::var("DB_PORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Ok(v) = env::var("DB_USER") {
            self.database.user = v;
        }
        if let Ok(v) = env::var("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Ok(v) = env::var("DB_NAME") {
            self.database.name = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_SESSION_TOKEN_HOURS") {
            self.security.session_token_hours = v.parse().unwrap_or(self.security.session_token_hours);
        }
        if let Ok(v) = env::var("SECURITY_DELEGATED_TOKEN_HOURS") {
            self.security.delegated_token_hours = v.parse().unwrap_or(self.security.delegated_token_hours);
        }
        if let Ok(v) = env::var("SECURITY_EXPOSE_INTERNAL_ERRORS") {
            self.security.expose_internal_errors = v.parse().unwrap_or(self.security.expose_internal_errors);
        }

        self
    }

    /// Enforce the signing-secret posture for the selected environment.
    fn validate(mut self) -> Result<Self, ConfigError> {
        let secret = self.security.jwt_secret.trim();

        if self.environment == Environment::Development {
            if secret.is_empty() {
                tracing::warn!(
                    "JWT_SECRET is not set; using the development-only fallback secret. \
                     Tokens signed now are forgeable by anyone who has read this source."
                );
                self.security.jwt_secret = DEVELOPMENT_JWT_SECRET.to_string();
            } else if KNOWN_WEAK_SECRETS.contains(&secret) {
                tracing::warn!("JWT_SECRET is a well-known weak value; acceptable in development only");
            }
            return Ok(self);
        }

        if secret.is_empty() {
            return Err(ConfigError::WeakSecret(self.environment, "an empty secret"));
        }
        if KNOWN_WEAK_SECRETS.contains(&secret) || secret == DEVELOPMENT_JWT_SECRET {
            return Err(ConfigError::WeakSecret(self.environment, "a well-known default"));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret(self.environment, "fewer than 16 bytes"));
        }

        Ok(self)
    }

    pub(crate) fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::default(),
            database: DatabaseConfig {
                max_connections: 10,
                acquire_timeout_secs: 30,
                ..DatabaseConfig::default()
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                session_token_hours: 2,
                delegated_token_hours: 8,
                expose_internal_errors: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig::default(),
            database: DatabaseConfig {
                max_connections: 10,
                acquire_timeout_secs: 10,
                ..DatabaseConfig::default()
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                session_token_hours: 2,
                delegated_token_hours: 8,
                expose_internal_errors: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig::default(),
            database: DatabaseConfig {
                max_connections: 10,
                acquire_timeout_secs: 5,
                ..DatabaseConfig::default()
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                session_token_hours: 2,
                delegated_token_hours: 8,
                expose_internal_errors: false,
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            server_ip: "localhost".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "feria_puno_db".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    /// Connection URL, either taken verbatim from `DATABASE_URL` or assembled
    /// from the individual `DB_*` settings.
    pub fn connection_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let mut url = url::Url::parse("postgres://localhost")
            .map_err(|e| ConfigError::InvalidDatabase(e.to_string()))?;
        url.set_host(Some(&self.host))
            .map_err(|e| ConfigError::InvalidDatabase(format!("host '{}': {}", self.host, e)))?;
        url.set_port(Some(self.port))
            .map_err(|_| ConfigError::InvalidDatabase("port".to_string()))?;
        url.set_username(&self.user)
            .map_err(|_| ConfigError::InvalidDatabase("user".to_string()))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| ConfigError::InvalidDatabase("password".to_string()))?;
        }
        url.set_path(&format!("/{}", self.name));

        Ok(url.into())
    }
}
