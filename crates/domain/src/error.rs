//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::order::OrderError;
use crate::storage::StorageError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A request failed validation before any transaction was opened.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred in the order store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The payment-evidence upload failed; order creation was aborted
    /// before any database write.
    #[error("Object storage error: {0}")]
    Storage(#[from] StorageError),
}
