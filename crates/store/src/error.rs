use common::{OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A stock decrement would take the product's stock below zero.
    /// The whole order-creation transaction is rolled back.
    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: ProductId, requested: u32 },

    /// The generated order number is already taken. The caller should
    /// regenerate and retry.
    #[error("Order number already taken: {order_number}")]
    OrderNumberConflict { order_number: String },

    /// The item list failed a precondition check before any transaction
    /// was opened.
    #[error("Invalid order items: {0}")]
    InvalidItems(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
