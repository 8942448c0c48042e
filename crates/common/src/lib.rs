//! Shared vocabulary types for the storefront backend.

pub mod status;
pub mod types;

pub use status::OrderStatus;
pub use types::{Money, OrderId, ProductId};
