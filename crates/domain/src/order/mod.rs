//! Order placement workflow and related types.

mod number;
mod request;
mod service;

pub use number::generate_order_number;
pub use request::{CreateOrderRequest, OrderItemRequest, PlacedOrder};
pub use service::OrderService;

use common::{Money, OrderStatus};
use thiserror::Error;

/// Errors that can occur while validating or transitioning an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A required field is missing or blank.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// The item list is empty.
    #[error("Order has no items")]
    NoItems,

    /// An item quantity is not a positive integer.
    #[error("Invalid quantity for item {line}: {quantity} (must be greater than 0)")]
    InvalidQuantity { line: usize, quantity: u32 },

    /// A money computation on an item would overflow.
    #[error("Amount overflow for item {line}")]
    AmountOverflow { line: usize },

    /// A line's subtotal does not equal quantity times unit price.
    #[error("Subtotal mismatch for item {line}: expected {expected}, got {actual}")]
    SubtotalMismatch {
        line: usize,
        expected: Money,
        actual: Money,
    },

    /// The order total does not equal the sum of line subtotals.
    #[error("Total mismatch: items sum to {expected}, order total is {actual}")]
    TotalMismatch { expected: Money, actual: Money },

    /// The requested status change is not a legal transition.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStateTransition { from: OrderStatus, to: OrderStatus },
}
