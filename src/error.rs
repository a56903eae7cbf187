use crate::database::DatabaseError;
use crate::pricing::PricingError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sqlx::Error as SqlxError;
use thiserror::Error;
use tracing::error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed request: non-positive shares, unknown side, bad body
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Player or user missing
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Buy larger than the player's available shares
    #[error("Insufficient supply: {0}")]
    InsufficientSupply(String),

    /// Buy costs more than the user's balance
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Sell larger than the user's holding
    #[error("Insufficient holdings: {0}")]
    InsufficientHoldings(String),

    /// Concurrent trades kept invalidating the commit
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Storage layer failures (transaction commit, network)
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic internal error with message
    #[error("{0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Check if error is a client-recoverable business rejection
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AppError::InsufficientSupply(_)
                | AppError::InsufficientFunds(_)
                | AppError::InsufficientHoldings(_)
        )
    }

    /// Stable error code returned to API clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientSupply(_) => "INSUFFICIENT_SUPPLY",
            AppError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            AppError::InsufficientHoldings(_) => "INSUFFICIENT_HOLDINGS",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Database(_) | AppError::StorageFailure(_) => "STORAGE_FAILURE",
            AppError::Config(_) => "CONFIG",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_)
            | AppError::InsufficientSupply(_)
            | AppError::InsufficientFunds(_)
            | AppError::InsufficientHoldings(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::StorageFailure(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to API clients
    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::StorageFailure(_) => {
                "Failed to execute request against the data store".to_string()
            }
            AppError::Config(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        }

        let body = axum::Json(json!({
            "success": false,
            "error": self.code(),
            "message": self.public_message(),
        }));

        (status, body).into_response()
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidArgument(msg) => AppError::InvalidArgument(msg),
        }
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Rows changed between read and commit
    #[error("Write conflict: {0}")]
    Conflict(String),
}

/// Result type alias for store operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Duplicate(msg) => AppError::InvalidArgument(format!("Duplicate: {}", msg)),
            RepositoryError::Conflict(msg) => AppError::Conflict(msg),
            RepositoryError::ConstraintViolation(msg) => {
                AppError::StorageFailure(format!("Constraint violation: {}", msg))
            }
            RepositoryError::Query(e) => AppError::StorageFailure(e.to_string()),
        }
    }
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => {
                // Check for common PostgreSQL error codes
                let code = db_err.code().map(|c| c.to_string());
                match code.as_deref() {
                    // Unique violation
                    Some("23505") => RepositoryError::Duplicate(db_err.message().to_string()),
                    // Foreign key / check violation
                    Some("23503") | Some("23514") => {
                        RepositoryError::ConstraintViolation(db_err.message().to_string())
                    }
                    // Serialization failure
                    Some("40001") => RepositoryError::Conflict(db_err.message().to_string()),
                    _ => RepositoryError::Query(err),
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        RepositoryError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(AppError::InvalidArgument("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InsufficientSupply("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InsufficientFunds("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InsufficientHoldings("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::StorageFailure("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors_map_to_app_errors() {
        let err: AppError = RepositoryError::Conflict("player".into()).into();
        assert_eq!(err.code(), "CONFLICT");

        let err: AppError = RepositoryError::Query(SqlxError::PoolTimedOut).into();
        assert_eq!(err.code(), "STORAGE_FAILURE");

        let err: AppError = RepositoryError::NotFound("user".into()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_storage_failures_hide_details() {
        let err = AppError::StorageFailure("connection refused 10.0.0.3:5432".into());
        assert!(!err.public_message().contains("10.0.0.3"));

        let err = AppError::InsufficientFunds("required 2020.00, available 100.00".into());
        assert!(err.public_message().contains("2020.00"));
        assert!(err.is_rejection());
    }

    #[test]
    fn test_pricing_errors_are_invalid_arguments() {
        let err: AppError = PricingError::InvalidArgument("total shares".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
