//! Order placement request and result types.

use common::{Money, OrderId, OrderStatus, ProductId};

/// A purchase request as accepted from the API layer.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    /// Optional reference to a registered customer account.
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub delivery_address: String,
    /// Client-supplied order total; must equal the sum of item subtotals.
    pub total_amount: Money,
    pub items: Vec<OrderItemRequest>,
    /// Raw bytes of a proof-of-payment artifact, uploaded to object
    /// storage before any database write.
    pub payment_evidence: Option<Vec<u8>>,
}

/// One requested line item.
#[derive(Debug, Clone)]
pub struct OrderItemRequest {
    pub product_id: Option<ProductId>,
    /// Optional name; when absent the service resolves a snapshot name
    /// from the live product, with placeholder fallbacks.
    pub product_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Identity and initial status of a successfully placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
}
