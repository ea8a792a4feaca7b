use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Credential error: {0}")]
    CredentialError(#[from] CredentialError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StorageError(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::StorageError(StorageError::Migration(err.to_string()))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl AppError {
    /// Machine-readable hint for clients, e.g. `TOKEN_EXPIRED` to trigger a silent refresh.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            AppError::AuthError(AuthError::Unauthenticated(rejection)) => Some(rejection.code()),
            AppError::AuthError(AuthError::MissingRefresh) => Some("REFRESH_MISSING"),
            AppError::AuthError(AuthError::InvalidRefresh) => Some("INVALID_REFRESH"),
            AppError::AuthError(AuthError::InvalidCredentials) => Some("INVALID_CREDENTIALS"),
            _ => None,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::AuthError(e) => e.to_string(),
            AppError::ValidationError(msg) => msg.clone(),
            AppError::CredentialError(_) | AppError::StorageError(_) | AppError::ConfigError(_) | AppError::InternalError(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut error = json!({
            "status": status.as_u16(),
            "message": self.public_message(),
        });
        if let Some(code) = self.code() {
            error["code"] = json!(code);
        }
        HttpResponse::build(status).json(json!({ "error": error }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::Unauthenticated(Rejection::InvalidToken) => StatusCode::FORBIDDEN,
                AuthError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
                AuthError::MissingRefresh | AuthError::InvalidRefresh => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            },
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures of the credential codec itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Malformed credential")]
    Malformed,

    #[error("Credential expired")]
    Expired,

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Why the request gate turned a bearer credential away.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("missing token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("unknown subject")]
    UnknownSubject,
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::MissingToken => "TOKEN_MISSING",
            Rejection::InvalidToken => "TOKEN_INVALID",
            Rejection::TokenExpired => "TOKEN_EXPIRED",
            Rejection::UnknownSubject => "UNKNOWN_SUBJECT",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Unauthenticated(Rejection),

    #[error("Refresh token required")]
    MissingRefresh,

    // Revoked, rotated, expired and never-issued all collapse here.
    #[error("Invalid refresh token")]
    InvalidRefresh,

    #[error("Invalid credentials")]
    InvalidCredentials,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Connection(err.to_string())
            }
            _ => StorageError::Query(err.to_string()),
        }
    }
}
