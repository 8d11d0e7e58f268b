// HTTP API Error Types
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::auth::TokenError;
use crate::database::DatabaseError;
use crate::services::{AccountError, DelegationError};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        details: Option<Value>,
    },
    InvalidJson(String),

    // 401 Unauthorized (no credentials presented, or bad login)
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),
    InvalidToken(String),
    TokenExpired(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error; `detail` is the underlying cause, withheld
    // from clients unless exposure is enabled
    InternalServerError {
        message: String,
        detail: Option<String>,
    },

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

/// Response extension carried by 500s so the error layer can re-render them
/// with the underlying cause when the deployment allows it.
#[derive(Debug, Clone)]
pub struct InternalDetail {
    pub body: Value,
    pub detail: String,
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidToken(_) => StatusCode::FORBIDDEN,
            ApiError::TokenExpired(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::InvalidToken(msg) => msg,
            ApiError::TokenExpired(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::InvalidToken(_) => "INVALID_TOKEN",
            ApiError::TokenExpired(_) => "TOKEN_EXPIRED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError {
            details: Some(Value::Object(details)),
            ..
        } = self
        {
            for (key, value) in details {
                body[key] = value.clone();
            }
        }

        body
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, details: Option<Value>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            details,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    /// Logs `cause` and keeps it as the withheld detail.
    pub fn internal(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        let message = message.into();
        tracing::error!("{}: {}", message, cause);
        ApiError::InternalServerError {
            message,
            detail: Some(cause.to_string()),
        }
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::Conflict(msg),
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) => {
                tracing::error!("Database pool timed out");
                ApiError::ServiceUnavailable("Database temporarily unavailable".to_string())
            }
            DatabaseError::Migration(e) => ApiError::internal("Database schema error", e),
            other => ApiError::internal("Database error occurred", other),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature(_) => ApiError::InvalidToken(err.to_string()),
            TokenError::Expired => ApiError::TokenExpired(err.to_string()),
            TokenError::Signing(_) => ApiError::internal("Failed to sign token", err),
        }
    }
}

impl From<DelegationError> for ApiError {
    fn from(err: DelegationError) -> Self {
        match err {
            DelegationError::Forbidden => ApiError::forbidden(err.to_string()),
            DelegationError::InvalidInput(msg) => ApiError::bad_request(msg),
            DelegationError::UnknownPermissions { ref valid } => ApiError::validation_error(
                err.to_string(),
                Some(json!({ "validPermissions": valid })),
            ),
            DelegationError::UserNotFound(_) => ApiError::not_found(err.to_string()),
            DelegationError::InvalidToken => ApiError::InvalidToken(err.to_string()),
            DelegationError::StoredExpired => ApiError::TokenExpired(err.to_string()),
            DelegationError::Token(e) => e.into(),
            DelegationError::Database(e) => e.into(),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidInput(msg) => ApiError::bad_request(msg),
            AccountError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AccountError::NotFound(_) => ApiError::not_found(err.to_string()),
            AccountError::Password(e) => ApiError::internal("Password processing failed", e),
            AccountError::Token(e) => ApiError::internal("Failed to issue session token", e),
            AccountError::Database(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidJson(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_json();

        let mut response = (status, Json(body.clone())).into_response();
        if let ApiError::InternalServerError { detail: Some(detail), .. } = self {
            response.extensions_mut().insert(InternalDetail { body, detail });
        }
        response
    }
}
