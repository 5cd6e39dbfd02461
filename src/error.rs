//! Error handling module
//!
//! Centralized error types and HTTP response conversion. Business-rule
//! failures keep their distinct kinds so callers can pick a status; storage
//! and collaborator failures collapse into generic retryable responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;

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

    // External collaborator failures
    #[error("Rate lookup failed: {0}")]
    RateLookup(String),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(ref domain_err) => {
                let status = if domain_err.is_not_found() {
                    StatusCode::NOT_FOUND
                } else if domain_err.is_validation() {
                    StatusCode::BAD_REQUEST
                } else {
                    // CreditAlreadySettled: the operation conflicts with the
                    // credit's current state.
                    StatusCode::CONFLICT
                };

                let code = match domain_err {
                    DomainError::UserNotFound(_) => "user_not_found",
                    DomainError::AccountNotFound(_) => "account_not_found",
                    DomainError::CreditNotFound(_) => "credit_not_found",
                    DomainError::PaymentNotFound(_) => "payment_not_found",
                    DomainError::TransferNotFound(_) => "transfer_not_found",
                    DomainError::InvalidAmount(_) => "invalid_amount",
                    DomainError::CurrencyMismatch { .. } => "currency_mismatch",
                    DomainError::SameAccountTransfer => "same_account_transfer",
                    DomainError::InsufficientFunds { .. } => "insufficient_funds",
                    DomainError::PaymentTooSmall { .. } => "payment_too_small",
                    DomainError::PaymentExceedsBalance { .. } => "payment_exceeds_balance",
                    DomainError::CreditAlreadySettled(_) => "credit_already_settled",
                };

                (status, code, Some(domain_err.to_string()))
            }

            // 502 Bad Gateway: the upstream rate feed failed; retry later
            AppError::RateLookup(msg) => {
                tracing::error!("Rate lookup failed: {}", msg);
                (StatusCode::BAD_GATEWAY, "rate_lookup_failed", None)
            }

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err = AppError::Domain(DomainError::AccountNotFound(Uuid::nil()));
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_maps_to_400() {
        let err = AppError::Domain(DomainError::InsufficientFunds {
            required: Decimal::new(100, 0),
            available: Decimal::ZERO,
        });
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_settled_maps_to_409() {
        let err = AppError::Domain(DomainError::CreditAlreadySettled(Uuid::nil()));
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn test_rate_lookup_maps_to_502() {
        let err = AppError::RateLookup("timeout".to_string());
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }
}
