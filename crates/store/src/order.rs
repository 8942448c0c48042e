//! The order store trait and its record types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderStatus, ProductId};

use crate::{Result, StoreError};

/// An order header to be inserted.
///
/// The status is not part of the input: every new order enters the
/// lifecycle as [`OrderStatus::Pending`].
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Human-readable order number; unique across all orders.
    pub order_number: String,
    /// Optional reference to a registered customer account.
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub delivery_address: String,
    /// Sum of all line-item subtotals; enforced by the service layer.
    pub total_amount: Money,
    /// Reference to the uploaded payment-evidence artifact, if any.
    pub payment_evidence_url: Option<String>,
    pub admin_note: Option<String>,
}

/// A line item to be inserted alongside its order header.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    /// Product reference; `None` when the caller could not identify the
    /// product (no stock is moved in that case).
    pub product_id: Option<ProductId>,
    /// Name snapshot captured at order time, resolved by the caller.
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// A product to be inserted (the stock-relevant slice of the catalog).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: i32,
}

/// Identity assigned to a freshly created order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedOrder {
    pub id: OrderId,
    pub order_number: String,
}

/// A stored order header together with its line items.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_evidence_url: Option<String>,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemRecord>,
}

/// A stored line item.
#[derive(Debug, Clone)]
pub struct OrderItemRecord {
    pub id: i64,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Persistence operations for orders and the product stock they consume.
///
/// `create_order` is the single transactional entry point: header insert,
/// item inserts, and stock decrements either all persist or all revert.
/// The stock decrement is guarded (`stock >= quantity`); an oversell
/// attempt fails the whole call with [`StoreError::InsufficientStock`].
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Atomically creates an order header with its items and decrements
    /// product stock for every item carrying a product reference.
    async fn create_order(&self, order: NewOrder, items: Vec<NewOrderItem>)
    -> Result<CreatedOrder>;

    /// Loads an order with its items. Returns `None` if it does not exist.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Lists all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<OrderRecord>>;

    /// Sets the status of an existing order.
    ///
    /// Transition legality is the caller's concern; the store only fails
    /// with [`StoreError::OrderNotFound`] when the order does not exist.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()>;

    /// Inserts a product and returns its assigned identity.
    async fn insert_product(&self, product: NewProduct) -> Result<ProductId>;

    /// Returns the current name of a product, or `None` if it does not
    /// exist.
    async fn product_name(&self, id: ProductId) -> Result<Option<String>>;

    /// Returns the current stock count of a product, or `None` if it does
    /// not exist.
    async fn product_stock(&self, id: ProductId) -> Result<Option<i32>>;
}

/// Largest quantity a single line item may carry. Bound by the `INTEGER`
/// quantity column; quantities beyond it would wrap when bound as i32.
pub const MAX_ITEM_QUANTITY: u32 = i32::MAX as u32;

/// Checks item-list preconditions before any transaction is opened.
pub fn validate_items_for_create(items: &[NewOrderItem]) -> Result<()> {
    if items.is_empty() {
        return Err(StoreError::InvalidItems("item list is empty".to_string()));
    }
    for (index, item) in items.iter().enumerate() {
        if item.quantity == 0 {
            return Err(StoreError::InvalidItems(format!(
                "item {index} has zero quantity"
            )));
        }
        if item.quantity > MAX_ITEM_QUANTITY {
            return Err(StoreError::InvalidItems(format!(
                "item {index} quantity {} exceeds the maximum of {MAX_ITEM_QUANTITY}",
                item.quantity
            )));
        }
        if item.product_name.trim().is_empty() {
            return Err(StoreError::InvalidItems(format!(
                "item {index} has no product name"
            )));
        }
    }
    Ok(())
}
