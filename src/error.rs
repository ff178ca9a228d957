//! Error types for Biblioteca server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes exposed in API error responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchRecord = 4,
    BadValue = 5,
    Duplicate = 6,
    MaxLoansReached = 7,
    NotLoanable = 8,
    NoCopiesAvailable = 9,
    BadDate = 10,
    BadLoanState = 11,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Loan limit reached: {0}")]
    LimitExceeded(String),

    #[error("Material cannot be loaned: {0}")]
    NotLoanable(String),

    #[error("No copies available: {0}")]
    NoCopiesAvailable(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid loan state: {0}")]
    InvalidState(String),

    #[error("Internal server error: {0}")]
    Internal(String),
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
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchRecord, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone())
            }
            AppError::LimitExceeded(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::MaxLoansReached, msg.clone())
            }
            AppError::NotLoanable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::NotLoanable, msg.clone())
            }
            AppError::NoCopiesAvailable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::NoCopiesAvailable, msg.clone())
            }
            AppError::InvalidDate(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadDate, msg.clone())
            }
            AppError::InvalidState(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::BadLoanState, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
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
