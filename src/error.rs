//! Error types for the premium service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::payment::CardRejection;

// == App Error Enum ==
/// Unified error type for the cache and premium services.
#[derive(Error, Debug)]
pub enum AppError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Card details failed a format or checksum check
    #[error("{0}")]
    CardRejected(#[from] CardRejection),

    /// The payment simulator declined the charge
    #[error("{0}")]
    PaymentDeclined(String),

    /// The payment gateway did not answer in time
    #[error("Payment timed out after {0} ms")]
    PaymentTimeout(u64),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Subscription not found for user: {0}")]
    SubscriptionNotFound(String),

    /// Subscription store could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::UserNotFound(_) | AppError::SubscriptionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::CardRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::PaymentTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the service.
pub type Result<T> = std::result::Result<T, AppError>;
