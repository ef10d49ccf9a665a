//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::{DomainError, EntityKind};
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    PinHash(#[from] crate::security::PinHashError),
}

impl AppError {
    /// Lost an optimistic-concurrency race; a fresh attempt may succeed
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, AppError::Store(e) if e.is_concurrency_conflict())
    }

    /// Borrow the domain error, if this is one
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            AppError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn domain_status(err: &DomainError) -> (StatusCode, &'static str, Option<String>) {
    match err {
        // 404 Not Found
        DomainError::NotFound { entity, key } => {
            let code = match entity {
                EntityKind::Account => "account_not_found",
                EntityKind::User => "user_not_found",
                EntityKind::Bank => "bank_not_found",
            };
            (StatusCode::NOT_FOUND, code, Some(key.clone()))
        }

        // 400 Bad Request
        DomainError::InactiveAccount(number) => {
            (StatusCode::BAD_REQUEST, "account_inactive", Some(number.clone()))
        }
        DomainError::InvalidAmount(msg) => {
            (StatusCode::BAD_REQUEST, "invalid_amount", Some(msg.clone()))
        }
        DomainError::InsufficientBalance { .. } => {
            (StatusCode::BAD_REQUEST, "insufficient_balance", Some(err.to_string()))
        }

        // 401 Unauthorized
        DomainError::InvalidPin(number) => {
            (StatusCode::UNAUTHORIZED, "invalid_pin", Some(number.clone()))
        }

        // 409 Conflict
        DomainError::DuplicateIdentifier(number) => {
            (StatusCode::CONFLICT, "duplicate_account_number", Some(number.clone()))
        }
        DomainError::Conflict { account, .. } => {
            (StatusCode::CONFLICT, "version_conflict", Some(account.clone()))
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(domain_err) => domain_status(domain_err),

            // Races that escaped the ledger's retry loop
            AppError::Store(StoreError::ConcurrencyConflict { account_id, .. }) => {
                (StatusCode::CONFLICT, "version_conflict", Some(account_id.to_string()))
            }
            AppError::Store(StoreError::DuplicateAccountNumber(number)) => {
                (StatusCode::CONFLICT, "duplicate_account_number", Some(number.clone()))
            }

            // 500 Internal Server Error
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
            AppError::PinHash(e) => {
                tracing::error!("PIN hashing error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
