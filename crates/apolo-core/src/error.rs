//! Unified error handling for the action engine
//!
//! Every failure an action handler, store or transport can produce maps to
//! one variant here. Not-found conditions are kept distinct so callers can
//! decide whether they are benign.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Storage Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    // ==================== Cache Errors ====================
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Cache connection failed: {0}")]
    CacheConnection(String),

    // ==================== Lock Errors ====================
    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Timed out waiting for lock: {0}")]
    LockTimeout(String),

    // ==================== Action Errors ====================
    #[error("nil account")]
    NilAccount,

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Unsupported action type: {0}")]
    UnsupportedAction(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Template error: {0}")]
    Template(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ==================== External Service Errors ====================
    #[error("HTTP delivery failed: {0}")]
    Http(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("RPC call failed: {0}")]
    Rpc(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_)
            | AppError::InvalidInput(_)
            | AppError::InvalidKey(_)
            | AppError::Parser(_)
            | AppError::Template(_)
            | AppError::NilAccount
            | AppError::UnsupportedAction(_) => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::AccountNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,

            // 502 Bad Gateway
            AppError::Http(_) | AppError::Mail(_) | AppError::Rpc(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::LockTimeout(_) | AppError::CacheConnection(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Cache(_) => "cache_error",
            AppError::CacheConnection(_) => "cache_connection_error",
            AppError::Lock(_) => "lock_error",
            AppError::LockTimeout(_) => "lock_timeout",
            AppError::NilAccount => "nil_account",
            AppError::AccountNotFound(_) => "account_not_found",
            AppError::UnsupportedAction(_) => "unsupported_action",
            AppError::InvalidKey(_) => "invalid_key",
            AppError::Parser(_) => "parser_error",
            AppError::Template(_) => "template_error",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::AlreadyExists(_) => "already_exists",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::Http(_) => "http_error",
            AppError::Mail(_) => "mail_error",
            AppError::Rpc(_) => "rpc_error",
        }
    }

    /// True for the not-found family, which callers may treat as benign
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_) | AppError::AccountNotFound(_))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
