use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{Money, OrderId, OrderStatus, ProductId};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    order::{
        CreatedOrder, NewOrder, NewOrderItem, NewProduct, OrderItemRecord, OrderRecord, OrderStore,
        validate_items_for_create,
    },
};

#[derive(Debug, Clone)]
struct ProductRow {
    name: String,
    #[allow(dead_code)]
    price: Money,
    stock: i32,
}

#[derive(Default)]
struct MemoryState {
    products: HashMap<i64, ProductRow>,
    orders: HashMap<i64, OrderRecord>,
    next_order_id: i64,
    next_product_id: i64,
    next_item_id: i64,
    fail_on_item_insert: bool,
}

/// In-memory order store implementation for testing.
///
/// Mirrors the observable semantics of the PostgreSQL implementation:
/// order-number uniqueness, the guarded stock decrement, and all-or-nothing
/// order creation. All mutations for one create call happen under a single
/// write lock, so a failed call leaves no trace.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the total number of stored line items across all orders.
    pub async fn item_count(&self) -> usize {
        self.state
            .read()
            .await
            .orders
            .values()
            .map(|o| o.items.len())
            .sum()
    }

    /// Configures the store to fail the next item insert, simulating a
    /// mid-transaction database failure.
    pub async fn set_fail_on_item_insert(&self, fail: bool) {
        self.state.write().await.fail_on_item_insert = fail;
    }

    /// Clears all orders and products.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.products.clear();
        state.orders.clear();
        state.next_order_id = 0;
        state.next_product_id = 0;
        state.next_item_id = 0;
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<CreatedOrder> {
        validate_items_for_create(&items)?;

        let mut state = self.state.write().await;

        if state
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::OrderNumberConflict {
                order_number: order.order_number,
            });
        }

        if state.fail_on_item_insert {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "injected item insert failure".to_string(),
            )));
        }

        // Stage all decrements on a working copy so that an oversell or a
        // missing product leaves the live stock untouched.
        let mut staged_stock: HashMap<i64, i32> = HashMap::new();
        for item in &items {
            if let Some(product_id) = item.product_id {
                let key = product_id.as_i64();
                let current = match staged_stock.get(&key) {
                    Some(stock) => *stock,
                    None => {
                        state
                            .products
                            .get(&key)
                            .ok_or(StoreError::ProductNotFound(product_id))?
                            .stock
                    }
                };
                let quantity = item.quantity as i32;
                if current < quantity {
                    return Err(StoreError::InsufficientStock {
                        product_id,
                        requested: item.quantity,
                    });
                }
                staged_stock.insert(key, current - quantity);
            }
        }

        for (key, stock) in staged_stock {
            if let Some(product) = state.products.get_mut(&key) {
                product.stock = stock;
            }
        }

        state.next_order_id += 1;
        let id = state.next_order_id;

        let items: Vec<OrderItemRecord> = items
            .into_iter()
            .map(|item| {
                state.next_item_id += 1;
                OrderItemRecord {
                    id: state.next_item_id,
                    product_id: item.product_id,
                    product_name: item.product_name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    subtotal: item.subtotal,
                }
            })
            .collect();

        let now = Utc::now();
        let record = OrderRecord {
            id: OrderId::new(id),
            order_number: order.order_number.clone(),
            customer_id: order.customer_id,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone,
            delivery_address: order.delivery_address,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            payment_evidence_url: order.payment_evidence_url,
            admin_note: order.admin_note,
            created_at: now,
            updated_at: now,
            items,
        };
        state.orders.insert(id, record);

        Ok(CreatedOrder {
            id: OrderId::new(id),
            order_number: order.order_number,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id.as_i64()).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_i64().cmp(&a.id.as_i64()))
        });
        Ok(orders)
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id.as_i64())
            .ok_or(StoreError::OrderNotFound(id))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<ProductId> {
        let mut state = self.state.write().await;
        state.next_product_id += 1;
        let id = state.next_product_id;
        state.products.insert(
            id,
            ProductRow {
                name: product.name,
                price: product.price,
                stock: product.stock,
            },
        );
        Ok(ProductId::new(id))
    }

    async fn product_name(&self, id: ProductId) -> Result<Option<String>> {
        let state = self.state.read().await;
        Ok(state.products.get(&id.as_i64()).map(|p| p.name.clone()))
    }

    async fn product_stock(&self, id: ProductId) -> Result<Option<i32>> {
        let state = self.state.read().await;
        Ok(state.products.get(&id.as_i64()).map(|p| p.stock))
    }
}
