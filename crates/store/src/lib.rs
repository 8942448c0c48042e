//! Relational persistence for the storefront backend.
//!
//! The [`OrderStore`] trait covers the order repository, the inventory
//! store, and the transaction boundary around order creation: one call to
//! [`OrderStore::create_order`] inserts the order header, all of its line
//! items, and decrements product stock, atomically. Two implementations are
//! provided: [`PostgresOrderStore`] for production and
//! [`InMemoryOrderStore`] for tests and database-less local runs.

pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;

pub use common::{Money, OrderId, OrderStatus, ProductId};
pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use order::{
    CreatedOrder, NewOrder, NewOrderItem, NewProduct, OrderItemRecord, OrderRecord, OrderStore,
};
pub use postgres::PostgresOrderStore;
