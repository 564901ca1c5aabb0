//! Error types for the library server

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes returned to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 3,
    NoSuchUser = 4,
    NoSuchBook = 5,
    BookNotAvailable = 7,
    Duplicate = 8,
    BadValue = 18,
    NoSuchData = 20,
    BookNotRented = 22,
    RentalLedgerInconsistent = 23,
}

/// Failure raised by a storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("transaction timed out after {0} ms")]
    TimedOut(u64),
}

/// Step of a rent/return unit, reported with storage failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentalStep {
    Begin,
    LoadBook,
    LoadUser,
    OpenRental,
    CloseRental,
    UpdateAvailability,
    ListRentals,
    Commit,
    Deadline,
}

impl fmt::Display for RentalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RentalStep::Begin => "begin transaction",
            RentalStep::LoadBook => "load book",
            RentalStep::LoadUser => "load user",
            RentalStep::OpenRental => "open rental",
            RentalStep::CloseRental => "close rental",
            RentalStep::UpdateAvailability => "update availability",
            RentalStep::ListRentals => "list rentals",
            RentalStep::Commit => "commit",
            RentalStep::Deadline => "deadline",
        };
        f.write_str(name)
    }
}

/// Outcomes of the rental engine other than success
#[derive(Error, Debug)]
pub enum RentalError {
    #[error("book with id {0} not found")]
    BookNotFound(i32),

    #[error("user with id {0} not found")]
    UserNotFound(i32),

    #[error("book {0} is not available")]
    BookUnavailable(i32),

    #[error("book {0} is not rented")]
    BookNotRented(i32),

    /// The book is flagged unavailable but the ledger has no open rental for it.
    #[error("book {0} is marked rented but has no open rental")]
    NoOpenRental(i32),

    #[error("storage failure during {step}: {source}")]
    Storage {
        step: RentalStep,
        #[source]
        source: StorageError,
    },
}

impl RentalError {
    /// Wrap a storage failure with the step it happened in
    pub fn storage(step: RentalStep) -> impl FnOnce(StorageError) -> RentalError {
        move |source| RentalError::Storage { step, source }
    }

    fn response_parts(&self) -> (StatusCode, ErrorCode) {
        match self {
            RentalError::BookNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook),
            RentalError::UserNotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchUser),
            RentalError::BookUnavailable(_) => (StatusCode::CONFLICT, ErrorCode::BookNotAvailable),
            RentalError::BookNotRented(_) => (StatusCode::CONFLICT, ErrorCode::BookNotRented),
            RentalError::NoOpenRental(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::RentalLedgerInconsistent,
            ),
            RentalError::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Rental(#[from] RentalError),
}

impl From<StorageError> for AppError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Database(e) => AppError::Database(e),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
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
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Rental(e) => {
                let (status, code) = e.response_parts();
                let message = match e {
                    RentalError::Storage { step, source } => {
                        tracing::error!("Rental storage failure during {}: {:?}", step, source);
                        "Database error".to_string()
                    }
                    RentalError::NoOpenRental(_) => "Rental ledger is inconsistent".to_string(),
                    other => other.to_string(),
                };
                (status, code, message)
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

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rental_errors_map_to_distinct_codes() {
        let cases = [
            (RentalError::BookNotFound(1), StatusCode::NOT_FOUND, ErrorCode::NoSuchBook),
            (RentalError::UserNotFound(2), StatusCode::NOT_FOUND, ErrorCode::NoSuchUser),
            (RentalError::BookUnavailable(1), StatusCode::CONFLICT, ErrorCode::BookNotAvailable),
            (RentalError::BookNotRented(1), StatusCode::CONFLICT, ErrorCode::BookNotRented),
            (
                RentalError::NoOpenRental(1),
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::RentalLedgerInconsistent,
            ),
        ];

        for (error, status, code) in cases {
            let response = AppError::from(error).into_response();
            assert_eq!(response.status(), status);
            let body = body_json(response).await;
            assert_eq!(body["code"], code as u32);
            assert_eq!(body["error"], format!("{:?}", code));
        }
    }

    #[tokio::test]
    async fn test_storage_failure_hides_details() {
        let error = RentalError::storage(RentalStep::Commit)(StorageError::Backend(
            "connection reset".to_string(),
        ));
        assert_eq!(
            error.to_string(),
            "storage failure during commit: storage backend error: connection reset"
        );

        let response = AppError::from(error).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["code"], ErrorCode::DbFailure as u32);
        assert_eq!(body["message"], "Database error");
    }
}
