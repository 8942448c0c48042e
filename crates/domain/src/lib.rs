//! Order orchestration for the storefront backend.
//!
//! This crate owns the order-placement workflow: request validation,
//! product-name resolution, order-number generation, payment-evidence
//! upload, and the call into the transactional store. It also validates
//! administrative status transitions against the order state machine.

pub mod error;
pub mod order;
pub mod storage;

pub use common::{Money, OrderId, OrderStatus, ProductId};
pub use error::DomainError;
pub use order::{
    CreateOrderRequest, OrderError, OrderItemRequest, OrderService, PlacedOrder,
    generate_order_number,
};
pub use storage::{InMemoryObjectStorage, ObjectStorage, StorageError, UploadedObject};
