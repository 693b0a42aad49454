//! Error types for the library rental server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::value_objects::{ValidationError, ValidationKind};

/// Stable error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    BadValue = 5,
    Duplicate = 6,
    NotAvailable = 7,
    InvalidTransition = 8,
    IdentityProviderFailure = 9,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not available: {0}")]
    NotAvailable(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),
}

impl AppError {
    /// Re-wrap an unexpected failure as a generic business error, keeping the
    /// original message
    pub fn business(context: &str, err: impl std::fmt::Display) -> Self {
        AppError::BusinessRule(format!("{}: {}", context, err))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(e) if e.kind == ValidationKind::Conflict => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) | AppError::NotAvailable(_) | AppError::InvalidTransition(_) => {
                StatusCode::CONFLICT
            }
            AppError::Database(_) | AppError::Internal(_) | AppError::BusinessRule(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::IdentityProvider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            AppError::Authentication(msg) | AppError::Authorization(msg) => {
                (ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (ErrorCode::NotFound, msg.clone()),
            AppError::Validation(e) if e.kind == ValidationKind::Conflict => {
                (ErrorCode::Duplicate, e.to_string())
            }
            AppError::Validation(e) => (ErrorCode::BadValue, e.to_string()),
            AppError::BadRequest(msg) => (ErrorCode::BadValue, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (ErrorCode::DbFailure, "Database error".to_string())
            }
            AppError::Conflict(msg) => (ErrorCode::Duplicate, msg.clone()),
            AppError::NotAvailable(msg) => (ErrorCode::NotAvailable, msg.clone()),
            AppError::InvalidTransition(msg) => (ErrorCode::InvalidTransition, msg.clone()),
            AppError::IdentityProvider(msg) => {
                tracing::warn!("Identity provider error: {}", msg);
                (ErrorCode::IdentityProviderFailure, "Identity provider unavailable".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (ErrorCode::Failure, "Internal server error".to_string())
            }
            AppError::BusinessRule(msg) => {
                tracing::error!("Business operation failed: {}", msg);
                (ErrorCode::Failure, msg.clone())
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
