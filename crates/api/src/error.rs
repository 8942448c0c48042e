//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Order(order_err) => match order_err {
            OrderError::InvalidStateTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
            OrderError::MissingField { .. }
            | OrderError::NoItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::AmountOverflow { .. }
            | OrderError::SubtotalMismatch { .. }
            | OrderError::TotalMismatch { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        },
        DomainError::Store(store_err) => match store_err {
            StoreError::OrderNotFound(_) | StoreError::ProductNotFound(_) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            StoreError::InsufficientStock { .. } => (StatusCode::CONFLICT, err.to_string()),
            StoreError::InvalidItems(_) => (StatusCode::BAD_REQUEST, err.to_string()),
            // Persistence detail stays in the logs; the client gets a
            // generic failure.
            StoreError::OrderNumberConflict { .. }
            | StoreError::Database(_)
            | StoreError::Migration(_) => {
                tracing::error!(error = %err, "persistence failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        },
        DomainError::Storage(_) => {
            tracing::error!(error = %err, "payment evidence upload failed");
            (
                StatusCode::BAD_GATEWAY,
                "payment evidence upload failed".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
