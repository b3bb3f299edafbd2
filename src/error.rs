use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use std::fmt::Display;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Completed: {0}")]
    Completed(String),

    #[error("No eligible entries found")]
    NoEligibleEntries,

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// Errors the caller cannot act on; their details never leave the process.
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(_)
                | AppError::ConfigError(_)
                | AppError::InternalError(_)
                | AppError::JwtError(_)
                | AppError::SerdeJsonError(_)
        )
    }

    /// Log unexpected failures with the operation and subject id, then pass the error on.
    pub fn logged(self, operation: &str, subject: impl Display) -> Self {
        if self.is_unexpected() {
            log::error!("{operation} failed for {subject}: {self}");
        }
        self
    }
}

/// Translate a unique-key conflict into the given domain error, keep anything else as is.
pub fn map_unique_violation(err: DbErr, on_conflict: impl FnOnce() -> AppError) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            log::debug!("Unique constraint violation: {detail}");
            on_conflict()
        }
        _ => AppError::DatabaseError(err),
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) | AppError::InvalidSignature(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) | AppError::QuotaExceeded(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) | AppError::AlreadyExists(_) | AppError::Completed(_) => {
                StatusCode::CONFLICT
            }
            AppError::NoEligibleEntries => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                ("VALIDATION_ERROR", msg.clone())
            }
            AppError::Unauthenticated(msg) => {
                log::warn!("Authentication error: {msg}");
                ("UNAUTHENTICATED", msg.clone())
            }
            AppError::Forbidden(msg) => {
                log::warn!("Forbidden access: {msg}");
                ("FORBIDDEN", msg.clone())
            }
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::InvalidState(msg) => ("INVALID_STATE", msg.clone()),
            AppError::QuotaExceeded(msg) => ("QUOTA_EXCEEDED", msg.clone()),
            AppError::AlreadyExists(msg) => ("ALREADY_EXISTS", msg.clone()),
            AppError::Completed(msg) => ("COMPLETED", msg.clone()),
            AppError::NoEligibleEntries => ("NO_ELIGIBLE_ENTRIES", self.to_string()),
            AppError::InvalidSignature(msg) => {
                log::warn!("Webhook signature rejected: {msg}");
                ("INVALID_SIGNATURE", "Invalid signature".to_string())
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                ("DATABASE_ERROR", "An unexpected error occurred".to_string())
            }
            _ => {
                log::error!("Internal error: {self}");
                ("INTERNAL_ERROR", "An unexpected error occurred".to_string())
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}
